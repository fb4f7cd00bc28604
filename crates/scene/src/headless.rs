use std::collections::BTreeMap;

use foundation::math::Vec2;

use crate::surface::{NodeId, RenderSurface, TileBitmap};

#[derive(Debug, Clone, PartialEq)]
pub struct HeadlessNode {
    pub level: u32,
    pub origin: Vec2,
    pub visible: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeadlessLayer {
    pub visible: bool,
    pub scale: f64,
}

/// Deterministic in-memory rendering surface.
///
/// Tracks exactly the state the viewer core manipulates (nodes, per-layer
/// visibility/scale, draw order) in queryable form. Used by tests and by
/// headless hosts that only need the scene description.
#[derive(Debug)]
pub struct HeadlessSurface {
    viewport: Vec2,
    next_node: u64,
    nodes: BTreeMap<NodeId, HeadlessNode>,
    layers: BTreeMap<u32, HeadlessLayer>,
    draw_order: Vec<u32>,
}

impl HeadlessSurface {
    pub fn new(viewport_width: f64, viewport_height: f64) -> Self {
        Self {
            viewport: Vec2::new(viewport_width, viewport_height),
            next_node: 1,
            nodes: BTreeMap::new(),
            layers: BTreeMap::new(),
            draw_order: Vec::new(),
        }
    }

    pub fn set_viewport_size(&mut self, width: f64, height: f64) {
        self.viewport = Vec2::new(width, height);
    }

    pub fn node(&self, id: NodeId) -> Option<&HeadlessNode> {
        self.nodes.get(&id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn layer(&self, level: u32) -> Option<&HeadlessLayer> {
        self.layers.get(&level)
    }

    /// Levels from back to front.
    pub fn draw_order(&self) -> &[u32] {
        &self.draw_order
    }

    pub fn visible_node_count(&self, level: u32) -> usize {
        self.nodes
            .values()
            .filter(|n| n.level == level && n.visible)
            .count()
    }

    fn layer_mut(&mut self, level: u32) -> &mut HeadlessLayer {
        // New layers stack beneath existing ones; only an explicit
        // bring_layer_to_front moves one to the top.
        if !self.draw_order.contains(&level) {
            self.draw_order.insert(0, level);
        }
        self.layers.entry(level).or_insert(HeadlessLayer {
            visible: true,
            scale: 1.0,
        })
    }
}

impl RenderSurface for HeadlessSurface {
    fn viewport_size(&self) -> Vec2 {
        self.viewport
    }

    fn create_tile_node(&mut self, level: u32, origin: Vec2, _bitmap: &TileBitmap) -> NodeId {
        self.layer_mut(level);
        let id = NodeId(self.next_node);
        self.next_node += 1;
        self.nodes.insert(
            id,
            HeadlessNode {
                level,
                origin,
                visible: true,
            },
        );
        id
    }

    fn set_node_visible(&mut self, node: NodeId, visible: bool) {
        if let Some(n) = self.nodes.get_mut(&node) {
            n.visible = visible;
        }
    }

    fn set_layer_visible(&mut self, level: u32, visible: bool) {
        self.layer_mut(level).visible = visible;
    }

    fn set_layer_scale(&mut self, level: u32, scale: f64) {
        self.layer_mut(level).scale = scale;
    }

    fn bring_layer_to_front(&mut self, level: u32) {
        self.layer_mut(level);
        self.draw_order.retain(|l| *l != level);
        self.draw_order.push(level);
    }
}
