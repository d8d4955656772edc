//! Synchronous host for a [`Viewer`]
//!
//! Runs every render request on the calling thread against a
//! [`RasterEngine`]. The CLI and the integration tests use it; an interactive
//! host would run the same requests on workers and post results back.

use crate::events::{RenderRequest, RenderedPage, RequestKind, ViewerEvent};
use crate::viewer::Viewer;
use log::{debug, trace};
use pageview_engine::{DocumentHandle, EngineError, OpenSource, RasterEngine};
use std::time::Instant;

/// Upper bound on request/response rounds in one [`SyncDriver::pump`].
const MAX_PUMP_ROUNDS: usize = 16;

/// Upper bound on deadline hops in one [`SyncDriver::settle`].
const MAX_SETTLE_STEPS: usize = 32;

pub struct SyncDriver<E: RasterEngine> {
    engine: E,
    handle: Option<DocumentHandle>,
}

impl<E: RasterEngine> SyncDriver<E> {
    pub fn new(engine: E) -> Self {
        Self { engine, handle: None }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn handle(&self) -> Option<DocumentHandle> {
        self.handle
    }

    /// Open `source` into `viewer` and run the dimension probes. Returns
    /// whether the document is ready.
    pub fn open(&mut self, viewer: &mut Viewer, source: OpenSource, now: Instant) -> bool {
        self.close(viewer);
        viewer.begin_load();

        let mut progress = Vec::new();
        let opened = self.engine.open(source, &mut |update| progress.push(update));
        for update in progress {
            viewer.post(ViewerEvent::LoadProgress(update));
        }

        match opened.and_then(|handle| Ok((handle, self.engine.page_count(handle)?))) {
            Ok((handle, page_count)) => {
                self.handle = Some(handle);
                viewer.post(ViewerEvent::DocumentOpened { page_count });
            }
            Err(err) => viewer.post(ViewerEvent::DocumentFailed(err)),
        }
        viewer.process_events(now);
        self.pump(viewer, now);
        viewer.status().is_ready()
    }

    /// Run queued requests and feed the results back until the viewer stops
    /// asking. Returns how many requests were executed.
    pub fn pump(&mut self, viewer: &mut Viewer, now: Instant) -> usize {
        let mut executed = 0;
        for _ in 0..MAX_PUMP_ROUNDS {
            let requests = viewer.take_render_requests();
            if requests.is_empty() {
                break;
            }
            for request in requests {
                if request.is_cancelled() {
                    trace!("page {}: skipping cancelled {:?}", request.page, request.kind);
                    continue;
                }
                viewer.post(self.execute(&request));
                executed += 1;
            }
            viewer.process_events(now);
        }
        executed
    }

    /// Advance time through every pending deadline (zoom commit, snapshot
    /// capture), pumping after each. Returns the time reached.
    pub fn settle(&mut self, viewer: &mut Viewer, mut now: Instant) -> Instant {
        for _ in 0..MAX_SETTLE_STEPS {
            let Some(deadline) = viewer.next_deadline() else {
                break;
            };
            now = now.max(deadline);
            let outcome = viewer.tick(now);
            debug!("settled tick: {outcome:?}");
            self.pump(viewer, now);
        }
        now
    }

    /// Tear the viewer down and release the engine's document.
    pub fn close(&mut self, viewer: &mut Viewer) {
        viewer.teardown();
        if let Some(handle) = self.handle.take() {
            if let Err(err) = self.engine.close(handle) {
                debug!("closing document {}: {err}", handle.raw());
            }
        }
    }

    fn execute(&self, request: &RenderRequest) -> ViewerEvent {
        let Some(handle) = self.handle else {
            let err = EngineError::InvalidHandle(0);
            return match request.kind {
                RequestKind::Probe => ViewerEvent::DimensionsProbed { page: request.page, result: Err(err) },
                _ => ViewerEvent::render_finished(request, Err(err)),
            };
        };

        match request.kind {
            RequestKind::Probe => ViewerEvent::DimensionsProbed {
                page: request.page,
                result: self.engine.viewport(handle, request.page, 1.0),
            },
            RequestKind::Page | RequestKind::Thumbnail => {
                let result = self
                    .engine
                    .render(handle, request.page, request.scale, request.rotation)
                    .and_then(|surface| {
                        let intrinsic = self.engine.page_size(handle, request.page)?.into();
                        Ok(RenderedPage { surface, intrinsic })
                    });
                ViewerEvent::render_finished(request, result)
            }
        }
    }
}
