use foundation::bounds::Aabb2;
use foundation::math::Vec2;
use log::debug;
use pyramid::{
    PyramidConfig, TileAddress, map_size_at_zoom, quantize_to_tile, truncate_tenth, zoom_scale,
};
use scene::RenderSurface;
use streaming::{RequestOutcome, TileRegistry, TileTransport};

/// Accounting for one resolution pass.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct ResolveStats {
    pub level: u32,
    /// New loads started inside the visible rectangle.
    pub requested: usize,
    /// New loads started in the prefetch ring.
    pub prefetched: usize,
    pub hidden: usize,
    pub level_changed: bool,
}

impl ResolveStats {
    pub fn loads_started(&self) -> usize {
        self.requested + self.prefetched
    }
}

/// Turns (center, zoom, viewport) into tile requests and hides.
///
/// The visible rectangle is computed in the active level's coordinate space
/// and doubled around the center as a prefetch margin; a one-tile ring just
/// outside it is requested without hiding anything there.
#[derive(Debug, Clone)]
pub struct ViewportResolver {
    image_width: u32,
    image_height: u32,
    tile_size: u32,
    min_tile_zoom: u32,
    max_tile_zoom: u32,
}

impl ViewportResolver {
    pub fn new(config: &PyramidConfig) -> Self {
        Self {
            image_width: config.width,
            image_height: config.height,
            tile_size: config.tile_size,
            min_tile_zoom: config.min_tile_zoom,
            max_tile_zoom: config.max_tile_zoom,
        }
    }

    /// The tile layer a continuous zoom resolves to.
    pub fn level_for_zoom(&self, zoom: f64) -> u32 {
        let clamped = zoom.clamp(self.min_tile_zoom as f64, self.max_tile_zoom as f64);
        pyramid::effective_level(clamped).clamp(self.min_tile_zoom, self.max_tile_zoom)
    }

    /// One resolution pass over the registry.
    ///
    /// `current_level` is the previously active layer; when the zoom has
    /// crossed into a new layer that layer is promoted to the top of the
    /// draw order. Returns the new active level in the stats.
    pub fn resolve(
        &self,
        center: Vec2,
        current_zoom: f64,
        current_level: u32,
        viewport: Vec2,
        registry: &mut TileRegistry,
        transport: &mut dyn TileTransport,
        surface: &mut dyn RenderSurface,
    ) -> ResolveStats {
        let mut stats = ResolveStats::default();

        let clamped = current_zoom.clamp(self.min_tile_zoom as f64, self.max_tile_zoom as f64);
        let level = self.level_for_zoom(current_zoom);
        stats.level = level;
        if level != current_level {
            surface.bring_layer_to_front(level);
            stats.level_changed = true;
        }

        // Fractional part of the zoom relative to the active layer; the
        // viewport covers 2^zoom_diff times more of the layer's pixels.
        let zoom_diff = truncate_tenth(clamped) - level as f64;
        let extent = viewport.scale(2f64.powf(zoom_diff));
        let center_level = center.scale(1.0 / zoom_scale(level as f64));
        // Half-extent of one full viewport: twice the visible area.
        let rect = Aabb2::from_center(center_level, extent);

        let tile = self.tile_size as i64;
        let start_x = quantize_to_tile(rect.min.x, self.tile_size);
        let start_y = quantize_to_tile(rect.min.y, self.tile_size);
        let end_x = quantize_to_tile(rect.max.x, self.tile_size) + tile;
        let end_y = quantize_to_tile(rect.max.y, self.tile_size) + tile;

        let map = map_size_at_zoom(self.image_width, self.image_height, level as f64);
        let max_x = quantize_to_tile(map.width, self.tile_size);
        let max_y = quantize_to_tile(map.height, self.tile_size);

        let inside = |x: i64, y: i64| start_x <= x && x <= end_x && start_y <= y && y <= end_y;

        let mut x = 0;
        while x <= max_x {
            let mut y = 0;
            while y <= max_y {
                let addr = TileAddress::new(level, x as u32, y as u32);
                if inside(x, y) {
                    if registry.request(addr, transport, surface) == RequestOutcome::NowLoading {
                        stats.requested += 1;
                    }
                } else if registry.hide(addr, surface) {
                    stats.hidden += 1;
                }
                y += tile;
            }
            x += tile;
        }

        // One-tile prefetch ring just outside the visible rectangle.
        let mut x = (start_x - tile).max(0);
        while x <= (end_x + tile).min(max_x) {
            let mut y = (start_y - tile).max(0);
            while y <= (end_y + tile).min(max_y) {
                if !inside(x, y) {
                    let addr = TileAddress::new(level, x as u32, y as u32);
                    if registry.request(addr, transport, surface) == RequestOutcome::NowLoading {
                        stats.prefetched += 1;
                    }
                }
                y += tile;
            }
            x += tile;
        }

        if stats.loads_started() == 0 {
            // Nothing new to wait for; drop back to the active layer only.
            self.hide_inactive_layers(level, surface);
        } else {
            // Keep every layer visible until the new loads settle, so the
            // background never flashes through during a zoom transition.
            self.show_all_layers(surface);
        }

        debug!(
            "resolve level={} requested={} prefetched={} hidden={}",
            level, stats.requested, stats.prefetched, stats.hidden
        );
        stats
    }

    /// Request every tile of one layer. Used for the coarsest level at
    /// session start, which then acts as the permanent backdrop.
    pub fn preload_level(
        &self,
        level: u32,
        registry: &mut TileRegistry,
        transport: &mut dyn TileTransport,
        surface: &mut dyn RenderSurface,
    ) -> usize {
        let map = map_size_at_zoom(self.image_width, self.image_height, level as f64);
        let max_x = quantize_to_tile(map.width, self.tile_size);
        let max_y = quantize_to_tile(map.height, self.tile_size);
        let tile = self.tile_size as i64;

        let mut started = 0;
        let mut x = 0;
        while x <= max_x {
            let mut y = 0;
            while y <= max_y {
                let addr = TileAddress::new(level, x as u32, y as u32);
                if registry.request(addr, transport, surface) == RequestOutcome::NowLoading {
                    started += 1;
                }
                y += tile;
            }
            x += tile;
        }
        started
    }

    pub fn show_all_layers(&self, surface: &mut dyn RenderSurface) {
        for level in self.min_tile_zoom..=self.max_tile_zoom {
            surface.set_layer_visible(level, true);
        }
    }

    pub fn hide_inactive_layers(&self, active: u32, surface: &mut dyn RenderSurface) {
        for level in self.min_tile_zoom..=self.max_tile_zoom {
            surface.set_layer_visible(level, level == active);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ViewportResolver;
    use foundation::math::Vec2;
    use pretty_assertions::assert_eq;
    use pyramid::{PyramidConfig, TileAddress};
    use scene::{HeadlessSurface, RenderSurface, TileBitmap};
    use streaming::{ManualTransport, TileRegistry, TileState};

    fn config() -> PyramidConfig {
        PyramidConfig {
            width: 8192,
            height: 8192,
            tile_size: 256,
            min_tile_zoom: 1,
            max_tile_zoom: 5,
            min_zoom: 1.0,
            max_zoom: 5.0,
            default_zoom: 3.0,
            tile_path: "/tiles".into(),
            center: None,
        }
    }

    fn fixture() -> (ViewportResolver, TileRegistry, ManualTransport, HeadlessSurface) {
        (
            ViewportResolver::new(&config()),
            TileRegistry::new("/tiles"),
            ManualTransport::new(),
            HeadlessSurface::new(512.0, 512.0),
        )
    }

    #[test]
    fn requests_a_contiguous_rectangle_with_prefetch_ring() {
        let (resolver, mut registry, mut transport, mut surface) = fixture();

        // Level 3: map is 2048x2048, center sits at (256, 256) in level space.
        let stats = resolver.resolve(
            Vec2::new(1024.0, 1024.0),
            3.0,
            3,
            Vec2::new(512.0, 512.0),
            &mut registry,
            &mut transport,
            &mut surface,
        );

        assert_eq!(stats.level, 3);
        assert_eq!(stats.hidden, 0);

        // Visible rect [-256, 768] quantizes to [0, 1024]; ring adds 1280.
        let mut expected = Vec::new();
        for x in (0..=1280).step_by(256) {
            for y in (0..=1280).step_by(256) {
                expected.push(TileAddress::new(3, x, y));
            }
        }
        for addr in &expected {
            assert_eq!(registry.state(*addr), Some(TileState::Loading), "{addr}");
        }
        assert_eq!(registry.len(), expected.len());
        assert_eq!(stats.loads_started(), expected.len());
        assert_eq!(stats.requested, 25);
        assert_eq!(stats.prefetched, 11);
    }

    #[test]
    fn hides_ready_tiles_that_leave_the_rectangle() {
        let (resolver, mut registry, mut transport, mut surface) = fixture();
        let viewport = Vec2::new(512.0, 512.0);

        resolver.resolve(
            Vec2::new(1024.0, 1024.0),
            3.0,
            3,
            viewport,
            &mut registry,
            &mut transport,
            &mut surface,
        );
        transport.succeed_all(&TileBitmap::new(256, 256, Vec::new()));
        registry.poll_loads(&mut transport, &mut surface);

        // Pan to the far corner of the level: old tiles fall out of range.
        let stats = resolver.resolve(
            Vec2::new(7936.0, 7936.0),
            3.0,
            3,
            viewport,
            &mut registry,
            &mut transport,
            &mut surface,
        );
        assert!(stats.hidden > 0);
        assert_eq!(
            registry.state(TileAddress::new(3, 0, 0)),
            Some(TileState::Hidden)
        );
    }

    #[test]
    fn level_change_promotes_the_new_layer() {
        let (resolver, mut registry, mut transport, mut surface) = fixture();
        surface.set_layer_scale(3, 1.0);
        surface.set_layer_scale(4, 1.0);

        let stats = resolver.resolve(
            Vec2::new(1024.0, 1024.0),
            4.0,
            3,
            Vec2::new(512.0, 512.0),
            &mut registry,
            &mut transport,
            &mut surface,
        );
        assert!(stats.level_changed);
        assert_eq!(stats.level, 4);
        assert_eq!(surface.draw_order().last(), Some(&4));
    }

    #[test]
    fn zoom_is_clamped_into_the_tile_range() {
        let (resolver, _, _, _) = fixture();
        assert_eq!(resolver.level_for_zoom(0.2), 1);
        assert_eq!(resolver.level_for_zoom(9.7), 5);
        assert_eq!(resolver.level_for_zoom(3.4), 3);
    }

    #[test]
    fn quiet_pass_hides_inactive_layers() {
        let (resolver, mut registry, mut transport, mut surface) = fixture();
        let viewport = Vec2::new(512.0, 512.0);
        let center = Vec2::new(1024.0, 1024.0);

        resolver.resolve(
            center,
            3.0,
            3,
            viewport,
            &mut registry,
            &mut transport,
            &mut surface,
        );
        // New loads force every layer visible.
        assert!(surface.layer(1).expect("layer").visible);
        assert!(surface.layer(5).expect("layer").visible);

        transport.succeed_all(&TileBitmap::new(256, 256, Vec::new()));
        registry.poll_loads(&mut transport, &mut surface);

        // Second pass over the same view starts nothing: only the active
        // layer stays visible.
        let stats = resolver.resolve(
            center,
            3.0,
            3,
            viewport,
            &mut registry,
            &mut transport,
            &mut surface,
        );
        assert_eq!(stats.loads_started(), 0);
        assert!(surface.layer(3).expect("layer").visible);
        assert!(!surface.layer(2).expect("layer").visible);
        assert!(!surface.layer(4).expect("layer").visible);
    }

    #[test]
    fn preload_covers_the_whole_level() {
        let (resolver, mut registry, mut transport, mut surface) = fixture();

        // Level 5: map is 512x512, tiles at 0, 256 and the inclusive 512 edge.
        let started = resolver.preload_level(5, &mut registry, &mut transport, &mut surface);
        assert_eq!(started, 9);
        assert_eq!(transport.begun(), 9);
    }
}
