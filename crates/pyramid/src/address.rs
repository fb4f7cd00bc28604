use foundation::math::Vec2;
use serde::{Deserialize, Serialize};

/// Cache key of one tile: its zoom level and the pixel origin of the tile in
/// that level's coordinate space (always multiples of the tile edge length).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TileAddress {
    pub level: u32,
    pub x: u32,
    pub y: u32,
}

impl TileAddress {
    pub fn new(level: u32, x: u32, y: u32) -> Self {
        Self { level, x, y }
    }

    /// Tile origin in level space, where the rendering surface places the node.
    pub fn origin(&self) -> Vec2 {
        Vec2::new(self.x as f64, self.y as f64)
    }

    /// Transport path for this tile under `base`.
    pub fn path(&self, base: &str) -> String {
        format!(
            "{}/{}/tile_{}_{}.jpg",
            base.trim_end_matches('/'),
            self.level,
            self.x,
            self.y
        )
    }
}

impl std::fmt::Display for TileAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}_{}", self.level, self.x, self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::TileAddress;

    #[test]
    fn path_format() {
        let addr = TileAddress::new(6, 1024, 512);
        assert_eq!(addr.path("/tiles"), "/tiles/6/tile_1024_512.jpg");
        assert_eq!(addr.path("/tiles/"), "/tiles/6/tile_1024_512.jpg");
    }

    #[test]
    fn orders_by_level_then_position() {
        let mut addrs = vec![
            TileAddress::new(2, 0, 512),
            TileAddress::new(1, 512, 0),
            TileAddress::new(1, 0, 0),
        ];
        addrs.sort();
        assert_eq!(addrs[0], TileAddress::new(1, 0, 0));
        assert_eq!(addrs[2], TileAddress::new(2, 0, 512));
    }
}
