//! Work requests out of the viewer and results back in
//!
//! The viewer never calls the engine. It queues [`RenderRequest`]s for the
//! host, and the host posts each outcome back as a [`ViewerEvent`]. Events go
//! through one FIFO inbox and are applied one at a time, so completions that
//! arrive out of page order are still handled independently and in arrival
//! order.

use pageview_engine::{EngineError, LoadProgress, RgbaImage};
use pageview_layout::{PageDimensions, Rotation};
use pageview_scheduler::CancellationToken;
use std::collections::VecDeque;

/// What a request asks the engine for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    /// Intrinsic size only, at scale 1
    Probe,
    /// Main-column render
    Page,
    /// Thumbnail-strip render
    Thumbnail,
}

#[derive(Debug, Clone)]
pub struct RenderRequest {
    /// 1-based page number
    pub page: u32,
    pub kind: RequestKind,
    pub scale: f32,
    pub rotation: Rotation,
    /// Must be echoed back in the result
    pub generation: u64,
    /// Set once the viewer no longer wants the result
    pub token: CancellationToken,
}

impl RenderRequest {
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// A finished render plus the page's intrinsic (scale 1, unrotated) size.
#[derive(Debug)]
pub struct RenderedPage {
    pub surface: RgbaImage,
    pub intrinsic: PageDimensions,
}

#[derive(Debug)]
pub enum ViewerEvent {
    /// Progress while the engine opens the document
    LoadProgress(LoadProgress),

    /// The engine opened the document
    DocumentOpened { page_count: u32 },

    /// The engine could not open the document
    DocumentFailed(EngineError),

    /// Result of a [`RequestKind::Probe`] request
    DimensionsProbed { page: u32, result: Result<PageDimensions, EngineError> },

    /// Result of a [`RequestKind::Page`] or [`RequestKind::Thumbnail`] request
    RenderFinished {
        page: u32,
        kind: RequestKind,
        generation: u64,
        scale: f32,
        rotation: Rotation,
        result: Result<RenderedPage, EngineError>,
    },
}

impl ViewerEvent {
    /// Build the completion event for `request`.
    pub fn render_finished(request: &RenderRequest, result: Result<RenderedPage, EngineError>) -> Self {
        ViewerEvent::RenderFinished {
            page: request.page,
            kind: request.kind,
            generation: request.generation,
            scale: request.scale,
            rotation: request.rotation,
            result,
        }
    }
}

/// Single ordered inbox
#[derive(Debug, Default)]
pub struct Inbox {
    events: VecDeque<ViewerEvent>,
}

impl Inbox {
    pub fn push(&mut self, event: ViewerEvent) {
        self.events.push_back(event);
    }

    pub fn pop(&mut self) -> Option<ViewerEvent> {
        self.events.pop_front()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inbox_is_fifo() {
        let mut inbox = Inbox::default();
        inbox.push(ViewerEvent::DocumentOpened { page_count: 2 });
        inbox.push(ViewerEvent::LoadProgress(LoadProgress { loaded: 1, total: 1 }));

        assert_eq!(inbox.len(), 2);
        assert!(matches!(inbox.pop(), Some(ViewerEvent::DocumentOpened { page_count: 2 })));
        assert!(matches!(inbox.pop(), Some(ViewerEvent::LoadProgress(_))));
        assert!(inbox.pop().is_none());
    }

    #[test]
    fn completion_echoes_request() {
        let request = RenderRequest {
            page: 4,
            kind: RequestKind::Thumbnail,
            scale: 0.16,
            rotation: Rotation::Deg90,
            generation: 9,
            token: CancellationToken::new(),
        };
        let event = ViewerEvent::render_finished(&request, Err(EngineError::Backend("boom".into())));
        match event {
            ViewerEvent::RenderFinished { page, kind, generation, scale, rotation, result } => {
                assert_eq!((page, kind, generation), (4, RequestKind::Thumbnail, 9));
                assert_eq!((scale, rotation), (0.16, Rotation::Deg90));
                assert!(result.is_err());
            }
            other => panic!("unexpected event {other:?}"),
        }
    }
}
