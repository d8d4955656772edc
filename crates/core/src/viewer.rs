//! The viewer: one owner for layout, lifecycle and caches
//!
//! The host feeds it time and events and drains render requests from it:
//!
//! 1. [`Viewer::begin_load`], then post the engine's open progress and result
//! 2. drain [`Viewer::take_render_requests`], run them, post each result
//! 3. call [`Viewer::process_events`] and [`Viewer::tick`] from the event loop
//! 4. paint [`Viewer::paint_plan`] and [`Viewer::thumbnail_paint_plan`]
//!
//! All user controls take the current [`Instant`] so tests can drive time.

use crate::config::ViewerConfig;
use crate::document::DocumentStatus;
use crate::error::ViewerError;
use crate::events::{Inbox, RenderRequest, RenderedPage, RequestKind, ViewerEvent};
use crate::lifecycle::{Completion, PageLifecycle, PageState, RenderTarget, RenderingSet};
use crate::paint::{page_face, PagePaint};
use crate::remeasure::{remeasure_anchored, remeasure_proportional, RemeasureOutcome};
use crate::state::ViewState;
use crate::thumbnails::{SidebarState, ThumbnailWindow};
use log::{debug, error, info, warn};
use pageview_cache::{CacheStats, RenderCacheStore, SnapshotImage};
use pageview_engine::{EngineError, LoadProgress};
use pageview_layout::{
    CurrentPageTracker, DimensionStore, PageDimensions, Rotation, SizeEstimator, ViewportWindow, VirtualWindow,
};
use pageview_scheduler::{CancellationToken, DeferredQueue, Ticket};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SnapshotJob {
    page: u32,
    generation: u64,
}

/// What a call to [`Viewer::tick`] did.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TickOutcome {
    /// A settled zoom was committed and the layout remeasured
    pub remeasure: Option<RemeasureOutcome>,
    /// Snapshots written to the render cache
    pub snapshots_captured: usize,
}

/// Counters for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ViewerStats {
    pub cache: CacheStats,
    pub thumbnails_cached: usize,
    pub rendering: usize,
    pub in_flight: usize,
    pub queued_requests: usize,
}

#[derive(Debug)]
pub struct Viewer {
    config: ViewerConfig,
    status: DocumentStatus,
    page_count: u32,
    state: ViewState,
    estimator: SizeEstimator,
    window: VirtualWindow,
    tracker: CurrentPageTracker,
    pages: PageLifecycle,
    cache: RenderCacheStore,
    snapshot_jobs: DeferredQueue<SnapshotJob>,
    thumbnails: ThumbnailWindow,
    sidebar: SidebarState,
    inbox: Inbox,
    outbox: Vec<RenderRequest>,
    pending_probes: BTreeSet<u32>,
    errors: Vec<ViewerError>,
    layout_dirty: bool,
}

impl Viewer {
    /// Create a viewer with no document.
    pub fn new(config: ViewerConfig) -> Result<Self, ViewerError> {
        config.validate()?;

        let mut window = VirtualWindow::new(0.0, config.overscan);
        window.set_enabled(false);

        Ok(Self {
            status: DocumentStatus::Idle,
            page_count: 0,
            state: ViewState::new(
                config.initial_zoom,
                config.zoom_limits(),
                config.zoom_debounce(),
                config.default_page_size(),
            ),
            estimator: SizeEstimator::new(config.page_margin),
            window,
            tracker: CurrentPageTracker::new(config.page_tracker_interval()),
            pages: PageLifecycle::new(),
            cache: RenderCacheStore::new(config.max_snapshots_per_page),
            snapshot_jobs: DeferredQueue::new(),
            thumbnails: ThumbnailWindow::new(&config),
            sidebar: SidebarState::new(config.sidebar_width, config.sidebar_min_width, config.sidebar_max_width),
            inbox: Inbox::default(),
            outbox: Vec::new(),
            pending_probes: BTreeSet::new(),
            errors: Vec::new(),
            layout_dirty: false,
            config,
        })
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn status(&self) -> &DocumentStatus {
        &self.status
    }

    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    /// Committed zoom, used for layout and renders.
    pub fn zoom(&self) -> f32 {
        self.state.zoom()
    }

    /// Zoom the user currently sees.
    pub fn visual_zoom(&self) -> f32 {
        self.state.visual_zoom()
    }

    /// Whether a zoom change is waiting for the debounce to settle.
    pub fn zoom_pending(&self) -> bool {
        self.state.zoom_pending()
    }

    /// Scale applied to rendered content while visual and committed zoom differ.
    pub fn zoom_compensation(&self) -> f32 {
        self.state.compensation()
    }

    pub fn rotation(&self) -> Rotation {
        self.state.rotation()
    }

    pub fn current_page(&self) -> u32 {
        self.tracker.current_page()
    }

    pub fn dims(&self) -> &DimensionStore {
        self.state.dims()
    }

    pub fn window(&self) -> &VirtualWindow {
        &self.window
    }

    pub fn scroll_offset(&self) -> f32 {
        self.window.scroll_offset()
    }

    pub fn total_extent(&self) -> f32 {
        self.window.total_extent()
    }

    pub fn page_state(&self, page: u32) -> PageState {
        self.pages.state(page)
    }

    pub fn rendering_set(&self) -> &RenderingSet {
        self.pages.rendering_set()
    }

    pub fn cache(&self) -> &RenderCacheStore {
        &self.cache
    }

    pub fn thumbnails(&self) -> &ThumbnailWindow {
        &self.thumbnails
    }

    pub fn sidebar(&self) -> &SidebarState {
        &self.sidebar
    }

    pub fn stats(&self) -> ViewerStats {
        ViewerStats {
            cache: self.cache.stats(),
            thumbnails_cached: self.thumbnails.cache().len(),
            rendering: self.pages.rendering_set().len(),
            in_flight: self.pages.in_flight() + self.thumbnails.lifecycle().in_flight(),
            queued_requests: self.outbox.len(),
        }
    }

    /// Earliest instant at which [`Viewer::tick`] has work to do.
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.state.zoom_deadline(), self.snapshot_jobs.next_deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    // ----- document loading -----

    /// Start loading a new document, dropping whatever was shown before.
    pub fn begin_load(&mut self) {
        self.teardown();
        self.status = DocumentStatus::Loading { progress: LoadProgress::default(), page_count: None };
        info!("loading document");
    }

    /// Queue an event for the next [`Viewer::process_events`].
    pub fn post(&mut self, event: ViewerEvent) {
        self.inbox.push(event);
    }

    pub fn pending_events(&self) -> usize {
        self.inbox.len()
    }

    /// Apply every queued event in arrival order. Returns how many were handled.
    pub fn process_events(&mut self, now: Instant) -> usize {
        let mut handled = 0;
        while let Some(event) = self.inbox.pop() {
            self.handle(event, now);
            handled += 1;
        }
        if self.layout_dirty {
            self.apply_dimension_changes(now);
        }
        handled
    }

    fn handle(&mut self, event: ViewerEvent, now: Instant) {
        match event {
            ViewerEvent::LoadProgress(update) => {
                if let DocumentStatus::Loading { progress, .. } = &mut self.status {
                    *progress = update;
                }
            }
            ViewerEvent::DocumentOpened { page_count } => self.on_document_opened(page_count, now),
            ViewerEvent::DocumentFailed(err) => self.fail_document(err),
            ViewerEvent::DimensionsProbed { page, result } => self.on_dimensions_probed(page, result, now),
            ViewerEvent::RenderFinished { page, kind, generation, scale, rotation, result } => {
                if !self.status.is_ready() {
                    debug!("page {page}: ignoring render result, no document ready");
                    return;
                }
                let target = RenderTarget::new(scale, rotation);
                match kind {
                    RequestKind::Page => self.on_page_rendered(page, generation, target, result, now),
                    RequestKind::Thumbnail => self.on_thumbnail_rendered(page, generation, target, result, now),
                    RequestKind::Probe => debug!("page {page}: probe result posted as render, ignored"),
                }
            }
        }
    }

    fn on_document_opened(&mut self, page_count: u32, now: Instant) {
        if !self.status.is_loading() {
            debug!("document opened while not loading, ignored");
            return;
        }
        if page_count == 0 {
            self.fail_document(EngineError::EmptyDocument);
            return;
        }

        self.page_count = page_count;
        self.status = DocumentStatus::Loading {
            progress: LoadProgress { loaded: 1, total: 1 },
            page_count: Some(page_count),
        };
        self.cache.set_page_count(page_count);

        let preload = self.config.preload_dimension_pages.min(page_count);
        info!("document opened with {page_count} pages, probing {preload}");
        for page in 1..=preload {
            self.pending_probes.insert(page);
            self.outbox.push(RenderRequest {
                page,
                kind: RequestKind::Probe,
                scale: 1.0,
                rotation: Rotation::Deg0,
                generation: 0,
                token: CancellationToken::new(),
            });
        }
        if self.pending_probes.is_empty() {
            self.finish_load(now);
        }
    }

    fn fail_document(&mut self, err: EngineError) {
        error!("document failed to load: {err}");
        self.status = DocumentStatus::Failed { reason: err.to_string() };
        self.errors.push(ViewerError::DocumentLoad(err));
        self.pending_probes.clear();
        self.cancel_outbox();
        self.pages.clear();
        self.thumbnails.clear();
        self.window.set_enabled(false);
    }

    fn on_dimensions_probed(&mut self, page: u32, result: Result<PageDimensions, EngineError>, now: Instant) {
        let expected = self.pending_probes.remove(&page);
        match result {
            Ok(size) => {
                self.record_dimensions(page, size);
                if page == 1 && self.state.set_default_size(size) {
                    debug!("default page size now {}x{}", size.width, size.height);
                    self.layout_dirty |= self.status.is_ready();
                }
            }
            Err(source) => {
                warn!("page {page}: dimension probe failed: {source}");
                self.errors.push(ViewerError::PageDimensionProbe { page, source });
            }
        }
        if expected && self.pending_probes.is_empty() && self.status.is_loading() {
            self.finish_load(now);
        }
    }

    fn finish_load(&mut self, now: Instant) {
        self.status = DocumentStatus::Ready { page_count: self.page_count };

        let estimator = self.estimator;
        let zoom = self.state.zoom();
        let rotation = self.state.rotation();
        let dims = self.state.dims();
        self.window.set_count(self.page_count as usize, &|index| estimator.estimate(index, zoom, rotation, dims));
        self.window.set_enabled(true);

        self.thumbnails.set_count(self.page_count, dims);
        self.thumbnails.set_enabled(self.sidebar.is_open());
        self.layout_dirty = false;

        self.sync_windows();
        let items = self.window.virtual_items();
        self.tracker.set_current_page(1);
        self.tracker.force(now, &items, self.window.scroll_offset());
        info!("document ready: {} pages, extent {:.0}", self.page_count, self.window.total_extent());
    }

    fn record_dimensions(&mut self, page: u32, size: PageDimensions) {
        if page == 0 || page > self.page_count {
            return;
        }
        let update = self.state.record_dims(page, size);
        if update.changes_layout() {
            debug!("page {page}: dimensions {update:?} to {}x{}", size.width, size.height);
            self.layout_dirty |= self.status.is_ready();
        }
        self.pages.mark_loaded(page);
    }

    fn on_page_rendered(
        &mut self,
        page: u32,
        generation: u64,
        target: RenderTarget,
        result: Result<RenderedPage, EngineError>,
        now: Instant,
    ) {
        match result {
            Ok(rendered) => {
                // sizes are worth keeping even from a stale render
                self.record_dimensions(page, rendered.intrinsic);
                if self.pages.complete(page, generation, rendered.surface, target) == Completion::Applied {
                    self.snapshot_jobs.schedule(SnapshotJob { page, generation }, now + self.config.snapshot_delay());
                }
            }
            Err(source) => {
                if self.pages.fail(page, generation) {
                    self.errors.push(ViewerError::PageRender { page, source });
                } else {
                    debug!("page {page}: stale render failed: {source}");
                }
            }
        }
    }

    fn on_thumbnail_rendered(
        &mut self,
        page: u32,
        generation: u64,
        target: RenderTarget,
        result: Result<RenderedPage, EngineError>,
        now: Instant,
    ) {
        match result {
            Ok(rendered) => {
                self.record_dimensions(page, rendered.intrinsic);
                let (_, capture_error) = self.thumbnails.complete(page, generation, rendered.surface, target, now);
                if let Some(source) = capture_error {
                    debug!("page {page}: thumbnail not cached: {source}");
                    self.errors.push(ViewerError::SnapshotCapture { page, source });
                }
            }
            Err(source) => {
                if self.thumbnails.fail(page, generation) {
                    warn!("page {page}: thumbnail render failed: {source}");
                    self.errors.push(ViewerError::PageRender { page, source });
                }
            }
        }
    }

    fn apply_dimension_changes(&mut self, now: Instant) {
        self.layout_dirty = false;
        if !self.status.is_ready() {
            return;
        }
        let estimator = self.estimator;
        let zoom = self.state.zoom();
        let rotation = self.state.rotation();
        let dims = self.state.dims();
        remeasure_anchored(&mut self.window, &|index| estimator.estimate(index, zoom, rotation, dims));
        self.thumbnails.remeasure(dims);
        self.sync_windows();
        self.track_scroll(now);
    }

    // ----- time -----

    /// Commit a settled zoom and capture due snapshots.
    pub fn tick(&mut self, now: Instant) -> TickOutcome {
        let mut outcome = TickOutcome::default();
        if self.state.poll_zoom(now) {
            info!("zoom committed at {:.2}", self.state.zoom());
            outcome.remeasure = self.relayout(now);
        }
        for job in self.snapshot_jobs.drain_due(now) {
            if self.capture_snapshot(job, now) {
                outcome.snapshots_captured += 1;
            }
        }
        outcome
    }

    fn capture_snapshot(&mut self, job: SnapshotJob, now: Instant) -> bool {
        let Some(surface) = self.pages.surface(job.page).filter(|s| s.generation == job.generation) else {
            debug!("page {}: snapshot skipped, surface superseded", job.page);
            return false;
        };
        let image = Arc::clone(&surface.image);
        let target = surface.target;

        match SnapshotImage::encode(&image, self.config.snapshot_quality) {
            Ok(encoded) => {
                let outcome = self.cache.capture(job.page, encoded, target.scale, target.rotation, now);
                outcome.was_stored()
            }
            Err(source) => {
                debug!("page {}: snapshot capture failed: {source}", job.page);
                self.errors.push(ViewerError::SnapshotCapture { page: job.page, source });
                false
            }
        }
    }

    // ----- user controls -----

    /// Set the zoom. The view scales at once; layout follows once input settles.
    pub fn set_zoom(&mut self, zoom: f32, now: Instant) -> f32 {
        self.state.request_zoom(zoom, now)
    }

    pub fn zoom_in(&mut self, now: Instant) -> f32 {
        self.state.step_zoom_in(now)
    }

    pub fn zoom_out(&mut self, now: Instant) -> f32 {
        self.state.step_zoom_out(now)
    }

    pub fn reset_zoom(&mut self, now: Instant) -> f32 {
        self.state.reset_zoom(now)
    }

    /// Rotate a quarter turn clockwise. Any pending zoom is committed first so
    /// both changes share a single remeasure.
    pub fn rotate_clockwise(&mut self, now: Instant) -> Rotation {
        self.state.flush_zoom();
        let rotation = self.state.rotate_clockwise();
        info!("rotated to {rotation}");
        self.thumbnails.mark_rotated();
        self.relayout(now);
        rotation
    }

    /// Remeasure after a zoom or rotation change, keeping the relative
    /// position and flagging every live page as stale.
    fn relayout(&mut self, now: Instant) -> Option<RemeasureOutcome> {
        if !self.status.is_ready() {
            return None;
        }
        let estimator = self.estimator;
        let zoom = self.state.zoom();
        let rotation = self.state.rotation();
        let dims = self.state.dims();
        let outcome =
            remeasure_proportional(&mut self.window, &|index| estimator.estimate(index, zoom, rotation, dims));

        let live: Vec<u32> = self.window.virtual_items().iter().map(|item| item.page()).collect();
        // a surface that has not been snapshotted yet is about to be hidden
        for job in self.snapshot_jobs.take_where(|job| live.contains(&job.page)) {
            self.capture_snapshot(job, now);
        }
        self.pages.mark_stale(&live);
        let visual = self.state.visual_zoom();
        for &page in &live {
            self.cache.record_lookup(page, visual, rotation);
        }
        self.sync_windows();
        self.track_scroll(now);
        Some(outcome)
    }

    pub fn set_viewport_height(&mut self, height: f32) {
        self.window.set_viewport_size(height);
        self.thumbnails.set_viewport_height(height);
        if self.status.is_ready() {
            self.sync_windows();
        }
    }

    pub fn scroll_to_offset(&mut self, offset: f32, now: Instant) {
        if !self.status.is_ready() {
            return;
        }
        self.window.scroll_to_offset(offset);
        self.sync_windows();
        self.track_scroll(now);
    }

    /// Jump to `page`, clamped to the document. The current page is updated
    /// immediately. Returns the new current page.
    pub fn scroll_to_page(&mut self, page: u32, now: Instant) -> u32 {
        if !self.status.is_ready() {
            return self.current_page();
        }
        let page = page.clamp(1, self.page_count);
        self.window.scroll_to_index(page as usize - 1);
        self.sync_windows();

        let items = self.window.virtual_items();
        if let Some(current) = self.tracker.force(now, &items, self.window.scroll_offset()) {
            self.on_current_page_changed(current);
        }
        self.current_page()
    }

    /// Scroll the thumbnail strip.
    pub fn scroll_thumbnails(&mut self, offset: f32) {
        self.thumbnails.scroll_to_offset(offset);
        if self.status.is_ready() {
            self.sync_windows();
        }
    }

    /// Show or hide the thumbnail sidebar. Returns whether it is now open.
    pub fn toggle_sidebar(&mut self) -> bool {
        let open = self.sidebar.toggle();
        self.thumbnails.set_enabled(open && self.status.is_ready());
        if self.status.is_ready() {
            self.sync_windows();
        }
        open
    }

    /// Drag the sidebar edge by `delta`. Returns the clamped width.
    pub fn resize_sidebar(&mut self, delta: f32) -> f32 {
        self.sidebar.resize_by(delta)
    }

    fn track_scroll(&mut self, now: Instant) {
        let items = self.window.virtual_items();
        if let Some(page) = self.tracker.on_scroll(now, &items, self.window.scroll_offset()) {
            self.on_current_page_changed(page);
        }
    }

    fn on_current_page_changed(&mut self, page: u32) {
        debug!("current page {page}");
        self.thumbnails.reveal(page);
        if self.sidebar.is_open() {
            self.sync_thumbnails();
        }
    }

    // ----- render requests -----

    /// Release pages that left either window and request renders for live
    /// pages without a fresh one. Visible pages are requested before overscan.
    fn sync_windows(&mut self) {
        let items = self.window.virtual_items();
        let live: BTreeSet<u32> = items.iter().map(|item| item.page()).collect();
        let dims = self.state.dims();
        self.pages.retain_window(&live, |page| dims.contains(page));

        let mut order: Vec<u32> = live.into_iter().collect();
        if let Some((first, last)) = self.window.visible_range() {
            let (first, last) = (first as u32 + 1, last as u32 + 1);
            order.sort_by_key(|&page| {
                let visible = (first..=last).contains(&page);
                (!visible, page.abs_diff(first))
            });
        }

        let target = self.state.render_target();
        for page in order {
            if self.pages.needs_render(page, target) {
                let ticket = self.pages.begin(page, target);
                self.push_request(page, RequestKind::Page, target, ticket);
            }
        }
        self.sync_thumbnails();
    }

    fn sync_thumbnails(&mut self) {
        let issued = self.thumbnails.sync(self.state.rotation(), self.state.dims());
        for (page, target, ticket) in issued {
            self.push_request(page, RequestKind::Thumbnail, target, ticket);
        }
    }

    fn push_request(&mut self, page: u32, kind: RequestKind, target: RenderTarget, ticket: Ticket) {
        self.outbox.push(RenderRequest {
            page,
            kind,
            scale: target.scale,
            rotation: target.rotation,
            generation: ticket.generation,
            token: ticket.token,
        });
    }

    /// Drain queued requests, dropping any cancelled since they were queued.
    pub fn take_render_requests(&mut self) -> Vec<RenderRequest> {
        let mut requests = std::mem::take(&mut self.outbox);
        requests.retain(|request| !request.is_cancelled());
        requests
    }

    fn cancel_outbox(&mut self) {
        for request in self.outbox.drain(..) {
            request.token.cancel();
        }
    }

    /// Errors recorded since the last call.
    pub fn take_errors(&mut self) -> Vec<ViewerError> {
        std::mem::take(&mut self.errors)
    }

    // ----- painting -----

    /// Paint instructions for the live pages of the main column.
    pub fn paint_plan(&self) -> Vec<PagePaint> {
        let visual = self.state.visual_zoom();
        let rotation = self.state.rotation();
        let current = self.current_page();

        self.window
            .virtual_items()
            .into_iter()
            .map(|item| {
                let page = item.page();
                let state = self.pages.state(page);
                let snapshot = if state == PageState::Rendered {
                    None
                } else {
                    self.cache.best_match(page, visual, rotation)
                };
                PagePaint {
                    page,
                    top: item.start,
                    height: item.size,
                    page_box: self.estimator.page_box(page, self.state.zoom(), rotation, self.state.dims()),
                    state,
                    current: page == current,
                    face: page_face(state, self.pages.surface(page), snapshot, visual, rotation),
                }
            })
            .collect()
    }

    /// Paint instructions for the thumbnail strip; empty while it is closed.
    pub fn thumbnail_paint_plan(&self) -> Vec<PagePaint> {
        self.thumbnails.paint_plan(self.state.rotation(), self.state.dims(), self.current_page())
    }

    // ----- teardown -----

    /// Drop the document: cancel every render, release every surface and
    /// empty both caches.
    pub fn teardown(&mut self) {
        self.cancel_outbox();
        self.inbox.clear();
        self.pages.clear();
        self.thumbnails.clear();
        self.cache.clear();
        self.cache.set_page_count(0);
        self.snapshot_jobs.clear();
        self.pending_probes.clear();
        self.window.set_count(0, &|_| 0.0);
        self.window.set_enabled(false);
        self.state.reset_document(self.config.default_page_size());
        self.tracker.set_current_page(1);
        self.page_count = 0;
        self.layout_dirty = false;
        self.status = DocumentStatus::Idle;
    }
}
