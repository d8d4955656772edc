//! Shared view state: zoom, rotation and page dimensions.
//!
//! One owner holds everything the size estimator reads. Each setter reports
//! whether the layout is now out of date so the caller can remeasure.

use pageview_layout::{DimensionStore, DimensionUpdate, PageDimensions, Rotation, ZoomLimits, ZoomState};
use pageview_scheduler::Debouncer;
use std::time::{Duration, Instant};

use crate::lifecycle::RenderTarget;

#[derive(Debug, Clone)]
pub struct ViewState {
    /// Zoom used for layout and renders
    zoom: ZoomState,
    /// Zoom the user currently sees; runs ahead of `zoom` while input settles
    visual_zoom: f32,
    pending_zoom: Debouncer<f32>,
    initial_zoom: f32,
    rotation: Rotation,
    dims: DimensionStore,
}

impl ViewState {
    pub fn new(initial_zoom: f32, limits: ZoomLimits, debounce: Duration, default_size: PageDimensions) -> Self {
        let zoom = ZoomState::new(initial_zoom, limits);
        Self {
            visual_zoom: zoom.value(),
            initial_zoom: zoom.value(),
            zoom,
            pending_zoom: Debouncer::new(debounce),
            rotation: Rotation::Deg0,
            dims: DimensionStore::new(default_size),
        }
    }

    /// Committed zoom.
    pub fn zoom(&self) -> f32 {
        self.zoom.value()
    }

    pub fn visual_zoom(&self) -> f32 {
        self.visual_zoom
    }

    pub fn zoom_limits(&self) -> ZoomLimits {
        self.zoom.limits()
    }

    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    pub fn dims(&self) -> &DimensionStore {
        &self.dims
    }

    /// Factor between what is shown and what is laid out.
    pub fn compensation(&self) -> f32 {
        self.visual_zoom / self.zoom.value()
    }

    /// Target for main-view renders.
    pub fn render_target(&self) -> RenderTarget {
        RenderTarget::new(self.zoom.value(), self.rotation)
    }

    pub fn zoom_pending(&self) -> bool {
        self.pending_zoom.is_pending()
    }

    pub fn zoom_deadline(&self) -> Option<Instant> {
        self.pending_zoom.deadline()
    }

    /// Request a zoom. The visual zoom follows at once; the committed zoom
    /// follows once input has been quiet for the debounce period.
    /// Returns the clamped value.
    pub fn request_zoom(&mut self, zoom: f32, now: Instant) -> f32 {
        if !zoom.is_finite() {
            return self.visual_zoom;
        }
        let zoom = self.zoom.limits().clamp(zoom);
        self.visual_zoom = zoom;
        self.pending_zoom.push(zoom, now);
        zoom
    }

    pub fn step_zoom_in(&mut self, now: Instant) -> f32 {
        let step = self.zoom.limits().step;
        self.request_zoom(self.visual_zoom + step, now)
    }

    pub fn step_zoom_out(&mut self, now: Instant) -> f32 {
        let step = self.zoom.limits().step;
        self.request_zoom(self.visual_zoom - step, now)
    }

    pub fn reset_zoom(&mut self, now: Instant) -> f32 {
        self.request_zoom(self.initial_zoom, now)
    }

    /// Commit a settled zoom request. Returns `true` if the committed zoom changed.
    pub fn poll_zoom(&mut self, now: Instant) -> bool {
        match self.pending_zoom.poll(now) {
            Some(zoom) => self.zoom.set(zoom),
            None => false,
        }
    }

    /// Commit any pending zoom immediately.
    pub fn flush_zoom(&mut self) -> bool {
        match self.pending_zoom.flush() {
            Some(zoom) => self.zoom.set(zoom),
            None => false,
        }
    }

    /// Rotate a quarter turn clockwise. Always changes the layout.
    pub fn rotate_clockwise(&mut self) -> Rotation {
        self.rotation = self.rotation.clockwise();
        self.rotation
    }

    pub fn record_dims(&mut self, page: u32, size: PageDimensions) -> DimensionUpdate {
        self.dims.record(page, size)
    }

    pub fn set_default_size(&mut self, size: PageDimensions) -> bool {
        self.dims.set_default_size(size)
    }

    /// Forget measured sizes and pending input, keeping zoom and rotation.
    pub fn reset_document(&mut self, default_size: PageDimensions) {
        self.dims = DimensionStore::new(default_size);
        self.pending_zoom.cancel();
        self.visual_zoom = self.zoom.value();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> ViewState {
        ViewState::new(1.0, ZoomLimits::default(), Duration::from_millis(150), PageDimensions::new(500.0, 1000.0))
    }

    #[test]
    fn visual_zoom_leads_committed_zoom() {
        let mut state = state();
        let t0 = Instant::now();

        assert_eq!(state.request_zoom(2.0, t0), 2.0);
        assert_eq!(state.visual_zoom(), 2.0);
        assert_eq!(state.zoom(), 1.0);
        assert_eq!(state.compensation(), 2.0);

        assert!(!state.poll_zoom(t0 + Duration::from_millis(100)));
        assert!(state.poll_zoom(t0 + Duration::from_millis(150)));
        assert_eq!(state.zoom(), 2.0);
        assert_eq!(state.compensation(), 1.0);
    }

    #[test]
    fn rapid_zoom_coalesces_to_last_value() {
        let mut state = state();
        let t0 = Instant::now();
        state.step_zoom_in(t0);
        state.step_zoom_in(t0 + Duration::from_millis(50));
        state.step_zoom_in(t0 + Duration::from_millis(100));

        assert!(!state.poll_zoom(t0 + Duration::from_millis(200)));
        assert!(state.poll_zoom(t0 + Duration::from_millis(250)));
        assert!((state.zoom() - 1.9).abs() < 1e-5);
    }

    #[test]
    fn zoom_requests_are_clamped() {
        let mut state = state();
        let t0 = Instant::now();
        assert_eq!(state.request_zoom(10.0, t0), 3.0);
        assert_eq!(state.request_zoom(f32::NAN, t0), 3.0);
        assert_eq!(state.request_zoom(0.0, t0), 0.1);
        assert!(state.flush_zoom());
        assert_eq!(state.zoom(), 0.1);
        assert_eq!(state.reset_zoom(t0), 1.0);
    }

    #[test]
    fn rotation_wraps() {
        let mut state = state();
        for _ in 0..3 {
            state.rotate_clockwise();
        }
        assert_eq!(state.rotation(), Rotation::Deg270);
        assert_eq!(state.rotate_clockwise(), Rotation::Deg0);
    }
}
