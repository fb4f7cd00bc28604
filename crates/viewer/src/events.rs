use foundation::math::Vec2;
use pyramid::TileAddress;

use crate::state::PanDirection;

/// Lifecycle notifications emitted by a viewer session.
///
/// Delivery is deferred: events queue on the session's bus and fan out to
/// every subscriber at the end of the tick that produced them.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewerEvent {
    /// The target zoom changed (value already clamped).
    ZoomChanged(f64),
    PanDirectionChanged(PanDirection),
    /// Pointer click, in image coordinates.
    Click(Vec2),
    /// Double click, in image coordinates. Also triggers a one-level zoom-out.
    DoubleClick(Vec2),
    /// Every outstanding tile load finished; non-active layers were hidden.
    TilesSettled { level: u32 },
    /// A single tile failed to load; the next resolution may retry it.
    TileLoadFailed { address: TileAddress, reason: String },
}
