use foundation::math::Vec2;

/// Direction of the automatic pan sweep along the image's x axis.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PanDirection {
    /// Toward increasing x (rightward).
    Forward,
    /// Toward decreasing x (leftward).
    Backward,
}

impl PanDirection {
    pub fn sign(self) -> f64 {
        match self {
            PanDirection::Forward => 1.0,
            PanDirection::Backward => -1.0,
        }
    }

    pub fn flipped(self) -> Self {
        match self {
            PanDirection::Forward => PanDirection::Backward,
            PanDirection::Backward => PanDirection::Forward,
        }
    }
}

/// Mutable navigation state of one viewer session.
///
/// One instance per session, owned by the session and handed by reference to
/// the animator and resolver. `center`/`current_zoom` are the rendered
/// values; the `target_*` fields are where damped interpolation is heading.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewerState {
    /// Displayed focal point, image coordinates.
    pub center: Vec2,
    pub target_center: Vec2,
    /// Continuous, animated zoom.
    pub current_zoom: f64,
    pub target_zoom: f64,
    /// Active tile layer: floor of the clamped continuous zoom.
    pub current_zoom_level: u32,
    pub pan_direction: PanDirection,
    /// Auto-pan speed in image units per millisecond; 0 when inactive.
    pub pan_speed: f64,
    /// Whether zoom interpolation re-centers on the pointer-anchored point.
    pub follow_pointer: bool,
    /// Last reported pointer position, screen coordinates.
    pub pointer: Vec2,
}

impl ViewerState {
    pub fn new(center: Vec2, zoom: f64, zoom_level: u32) -> Self {
        Self {
            center,
            target_center: center,
            current_zoom: zoom,
            target_zoom: zoom,
            current_zoom_level: zoom_level,
            pan_direction: PanDirection::Forward,
            pan_speed: 0.0,
            follow_pointer: false,
            pointer: Vec2::ZERO,
        }
    }
}
