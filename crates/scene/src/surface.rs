use foundation::math::Vec2;

/// Decoded tile pixels, ready for upload to the rendering surface.
///
/// Decoding itself happens behind the tile transport; this is just the
/// hand-off format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileBitmap {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl TileBitmap {
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            data,
        }
    }
}

/// Handle to one positioned image node owned by the rendering surface.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub u64);

/// The external rendering surface, as seen by the viewer core.
///
/// The surface owns one display layer per tile zoom level. Layers carry an
/// independent scale transform and a draw order; nodes are positioned image
/// rectangles inside a layer. Nothing here draws pixels.
pub trait RenderSurface {
    /// Current viewport size in CSS pixels.
    fn viewport_size(&self) -> Vec2;

    /// Create a node for a tile at `origin` (level space) on `level`'s layer.
    fn create_tile_node(&mut self, level: u32, origin: Vec2, bitmap: &TileBitmap) -> NodeId;

    fn set_node_visible(&mut self, node: NodeId, visible: bool);

    fn set_layer_visible(&mut self, level: u32, visible: bool);

    fn set_layer_scale(&mut self, level: u32, scale: f64);

    /// Move a level's layer to the top of the draw order.
    fn bring_layer_to_front(&mut self, level: u32);
}
