//! Zoom state for page rendering

/// Zoom factor with a configurable floor
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Zoom {
    /// Current zoom factor (1.0 = 100%)
    factor: f32,
    /// Lowest factor the zoom may reach
    min_scale: f32,
}

impl Default for Zoom {
    fn default() -> Self {
        Self::new(Self::DEFAULT_SCALE, Self::DEFAULT_MIN_SCALE)
    }
}

impl Zoom {
    /// Scale a freshly opened viewer starts at
    pub const DEFAULT_SCALE: f32 = 1.5;
    /// Default lowest allowed zoom factor
    pub const DEFAULT_MIN_SCALE: f32 = 0.5;
    /// Default zoom in/out step
    pub const DEFAULT_STEP: f32 = 0.25;

    #[must_use]
    pub fn new(factor: f32, min_scale: f32) -> Self {
        let min_scale = if min_scale.is_finite() && min_scale > 0.0 {
            min_scale
        } else {
            Self::DEFAULT_MIN_SCALE
        };
        let mut zoom = Self {
            factor: min_scale,
            min_scale,
        };
        zoom.factor = zoom.clamp_factor(factor);
        zoom
    }

    #[must_use]
    pub fn factor(&self) -> f32 {
        self.factor
    }

    #[must_use]
    pub fn min_scale(&self) -> f32 {
        self.min_scale
    }

    /// Apply `delta`, never going below the floor.
    /// Returns true if the factor actually changed.
    pub fn change(&mut self, delta: f32) -> bool {
        self.set(self.factor + delta)
    }

    /// Returns true if the factor actually changed.
    pub fn set(&mut self, factor: f32) -> bool {
        let clamped = self.clamp_factor(factor);
        if (clamped - self.factor).abs() > f32::EPSILON {
            self.factor = clamped;
            true
        } else {
            false
        }
    }

    /// Clamp factor to valid range, handling NaN/Inf
    #[must_use]
    pub fn clamp_factor(&self, factor: f32) -> f32 {
        if !factor.is_finite() {
            self.factor
        } else {
            factor.max(self.min_scale)
        }
    }
}
