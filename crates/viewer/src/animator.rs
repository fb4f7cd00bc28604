use foundation::math::Vec2;
use pyramid::{PyramidConfig, map_size_at_zoom, screen_to_image, viewport_offset, zoom_scale};

use crate::state::{PanDirection, ViewerState};

/// Damping divisor for zoom interpolation, calibrated against 60 fps.
pub const ZOOM_DAMPING: f64 = 5.0;
/// Damping divisor for pan interpolation (per tick, not time-scaled).
pub const DRAG_DAMPING: f64 = 5.0;
/// Below this remaining distance the interpolation is considered done.
pub const SETTLE_THRESHOLD: f64 = 0.01;

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct ZoomStep {
    pub moved: bool,
    /// The pointer anchor shifted the center this step.
    pub recentered: bool,
}

#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct AutoPanStep {
    pub moved: bool,
    /// New direction after bouncing off an image edge.
    pub flipped: Option<PanDirection>,
}

/// Advances zoom and pan toward their targets with exponential damping, and
/// drives the auto-pan bounce between the image edges.
///
/// Pure arithmetic over `ViewerState`; owns no mutable state itself.
#[derive(Debug, Clone)]
pub struct ZoomPanAnimator {
    min_zoom: f64,
    max_zoom: f64,
    image_width: u32,
    image_height: u32,
}

impl ZoomPanAnimator {
    pub fn new(config: &PyramidConfig) -> Self {
        Self {
            min_zoom: config.min_zoom,
            max_zoom: config.max_zoom,
            image_width: config.width,
            image_height: config.height,
        }
    }

    /// Set a new zoom target.
    ///
    /// Returns the clamped target on acceptance. A raw value exactly equal
    /// to the min or max boundary is rejected as "already at the extreme"
    /// and changes nothing (long-standing quirk, kept as is).
    pub fn request_zoom(
        &self,
        state: &mut ViewerState,
        zoom: f64,
        follow_pointer: bool,
    ) -> Option<f64> {
        if zoom == self.min_zoom || zoom == self.max_zoom {
            return None;
        }
        let clamped = zoom.clamp(self.min_zoom, self.max_zoom);
        state.follow_pointer = follow_pointer;
        state.target_zoom = clamped;
        Some(clamped)
    }

    /// One damped zoom step. `force` applies the whole remaining delta in a
    /// single tick (pinch tracking must not lag behind the fingers).
    pub fn update_zoom(
        &self,
        state: &mut ViewerState,
        dt_ms: f64,
        force: bool,
        viewport: Vec2,
        dpr: f64,
    ) -> ZoomStep {
        if (state.current_zoom - state.target_zoom).abs() <= SETTLE_THRESHOLD {
            return ZoomStep::default();
        }
        if dt_ms <= 0.0 && !force {
            return ZoomStep::default();
        }

        let remaining = state.target_zoom - state.current_zoom;
        let delta = if force {
            remaining
        } else {
            remaining / (ZOOM_DAMPING * (60.0 / dt_ms)).max(1.0)
        };

        let mut recentered = false;
        if state.follow_pointer {
            // Keep the image point under the pointer fixed on screen across
            // the zoom change: with scale ratio r = 2^delta the center that
            // cancels the apparent drift is anchor + (center - anchor) * r.
            let offset = viewport_offset(state.center, state.current_zoom, viewport);
            let anchor = screen_to_image(state.pointer, state.current_zoom, offset, dpr);
            let ratio = 2f64.powf(delta);
            let center = anchor + (state.center - anchor).scale(ratio);
            state.center = center;
            state.target_center = center;
            recentered = true;
        }

        state.current_zoom += delta;
        ZoomStep {
            moved: true,
            recentered,
        }
    }

    /// One damped pan step, per axis. Returns whether either axis moved.
    pub fn update_position(&self, state: &mut ViewerState) -> bool {
        let mut moved = false;
        if (state.center.x - state.target_center.x).abs() > SETTLE_THRESHOLD {
            state.center.x += (state.target_center.x - state.center.x) / DRAG_DAMPING;
            moved = true;
        }
        if (state.center.y - state.target_center.y).abs() > SETTLE_THRESHOLD {
            state.center.y += (state.target_center.y - state.center.y) / DRAG_DAMPING;
            moved = true;
        }
        moved
    }

    /// Begin auto-panning, sweeping the full image over `duration_ms`.
    ///
    /// No-op when the rendered map is narrower than the viewport.
    pub fn start_auto_pan(&self, state: &mut ViewerState, viewport: Vec2, duration_ms: f64) -> bool {
        let map = map_size_at_zoom(self.image_width, self.image_height, state.current_zoom);
        if map.width - viewport.x < 0.0 {
            return false;
        }
        state.pan_speed =
            (self.image_width as f64 - viewport.x * 2f64.powf(state.current_zoom)) / duration_ms;
        true
    }

    pub fn stop_auto_pan(&self, state: &mut ViewerState) {
        state.pan_speed = 0.0;
    }

    /// One auto-pan step: bounce off an image edge (flip, no movement that
    /// tick) or advance the center along the pan direction.
    pub fn update_auto_pan(
        &self,
        state: &mut ViewerState,
        dt_ms: f64,
        viewport: Vec2,
        dpr: f64,
    ) -> AutoPanStep {
        if state.pan_speed.abs() == 0.0 {
            return AutoPanStep::default();
        }

        let offset = viewport_offset(state.center, state.current_zoom, viewport);
        let left = screen_to_image(Vec2::ZERO, state.current_zoom, offset, dpr);
        let right = screen_to_image(viewport, state.current_zoom, offset, dpr);

        if left.x < 0.0 && state.pan_direction == PanDirection::Backward {
            state.pan_direction = PanDirection::Forward;
            AutoPanStep {
                moved: false,
                flipped: Some(state.pan_direction),
            }
        } else if right.x > self.image_width as f64 && state.pan_direction == PanDirection::Forward
        {
            state.pan_direction = PanDirection::Backward;
            AutoPanStep {
                moved: false,
                flipped: Some(state.pan_direction),
            }
        } else {
            let step = state.pan_speed * dt_ms * state.pan_direction.sign();
            state.center.x += step;
            state.target_center.x = state.center.x;
            AutoPanStep {
                moved: true,
                flipped: None,
            }
        }
    }

    pub fn zoom_bounds(&self) -> (f64, f64) {
        (self.min_zoom, self.max_zoom)
    }
}
