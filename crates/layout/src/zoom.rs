//! Bounded zoom multiplier.

use serde::{Deserialize, Serialize};

/// Inclusive zoom range plus the increment used by zoom in/out.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoomLimits {
    pub min: f32,
    pub max: f32,
    pub step: f32,
}

impl Default for ZoomLimits {
    fn default() -> Self {
        Self { min: 0.1, max: 3.0, step: 0.3 }
    }
}

impl ZoomLimits {
    pub fn clamp(&self, zoom: f32) -> f32 {
        zoom.clamp(self.min, self.max)
    }
}

/// A zoom multiplier that can only be changed through clamping setters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomState {
    value: f32,
    limits: ZoomLimits,
}

impl ZoomState {
    pub fn new(initial: f32, limits: ZoomLimits) -> Self {
        let value = if initial.is_finite() { limits.clamp(initial) } else { limits.clamp(1.0) };
        Self { value, limits }
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn limits(&self) -> ZoomLimits {
        self.limits
    }

    /// Set the zoom, clamped to the limits. Returns `true` if the value changed.
    /// Non-finite input is ignored.
    pub fn set(&mut self, zoom: f32) -> bool {
        if !zoom.is_finite() {
            return false;
        }
        let next = self.limits.clamp(zoom);
        if (next - self.value).abs() <= f32::EPSILON {
            return false;
        }
        self.value = next;
        true
    }

    pub fn zoom_in(&mut self) -> bool {
        self.set(self.value + self.limits.step)
    }

    pub fn zoom_out(&mut self) -> bool {
        self.set(self.value - self.limits.step)
    }

    pub fn at_min(&self) -> bool {
        self.value <= self.limits.min
    }

    pub fn at_max(&self) -> bool {
        self.value >= self.limits.max
    }
}

impl Default for ZoomState {
    fn default() -> Self {
        Self::new(1.0, ZoomLimits::default())
    }
}
