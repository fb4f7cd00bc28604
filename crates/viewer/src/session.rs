use foundation::math::Vec2;
use foundation::time::Time;
use log::debug;
use pyramid::{ConfigError, PyramidConfig, viewport_offset, zoom_scale};
use runtime::event_bus::EventBus;
use runtime::frame::Frame;
use runtime::throttle::Throttle;
use scene::RenderSurface;
use streaming::{TileRegistry, TileTransport};

use crate::animator::ZoomPanAnimator;
use crate::events::ViewerEvent;
use crate::resolver::ViewportResolver;
use crate::state::ViewerState;

const DEFAULT_FRAME_MS: f64 = 1000.0 / 60.0;

/// Rate-limit tier for tile resolution. Direct navigation commands resolve
/// at the immediate tier; continuous interpolation at the medium tier;
/// auto-pan at the slow tier. The tiers are independent gates over the same
/// resolution routine, so no trigger can starve another.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Cadence {
    Immediate,
    Medium,
    Slow,
}

/// Composition root: owns the navigation state, tile cache, animator and
/// resolver, and exposes the public navigation API plus the per-frame tick.
///
/// Everything runs on one logical thread: tile completions are polled from
/// `tick`, never delivered concurrently with it.
pub struct ViewerSession<T: TileTransport, S: RenderSurface> {
    config: PyramidConfig,
    state: ViewerState,
    animator: ZoomPanAnimator,
    resolver: ViewportResolver,
    registry: TileRegistry,
    events: EventBus<ViewerEvent>,
    transport: T,
    surface: S,
    immediate: Throttle,
    medium: Throttle,
    slow: Throttle,
    clock: Time,
    last_tick: Option<Time>,
    frame: Frame,
    resolves: u64,
    dpr: f64,
}

impl<T: TileTransport, S: RenderSurface> ViewerSession<T, S> {
    pub fn new(config: PyramidConfig, transport: T, surface: S) -> Result<Self, ConfigError> {
        config.validate()?;

        let center = config
            .center
            .map(|c| Vec2::new(c[0], c[1]))
            .unwrap_or(Vec2::new(config.width as f64 / 2.0, config.height as f64 / 2.0));
        let zoom = config.default_zoom.clamp(config.min_zoom, config.max_zoom);

        let animator = ZoomPanAnimator::new(&config);
        let resolver = ViewportResolver::new(&config);
        let level = resolver.level_for_zoom(zoom);

        let mut session = Self {
            registry: TileRegistry::new(config.tile_path.clone()),
            state: ViewerState::new(center, zoom, level),
            animator,
            resolver,
            events: EventBus::new(),
            transport,
            surface,
            immediate: Throttle::new(250.0),
            medium: Throttle::new(1250.0),
            slow: Throttle::new(3000.0),
            clock: Time::ZERO,
            last_tick: None,
            frame: Frame::new(0, DEFAULT_FRAME_MS),
            resolves: 0,
            dpr: 1.0,
            config,
        };

        session.apply_layer_scales();
        session.surface.bring_layer_to_front(level);
        session.request_resolve(Cadence::Immediate);

        // The coarsest layer is fully preloaded and stays cached as the
        // backdrop under every later zoom level.
        let preloaded = session.resolver.preload_level(
            session.config.max_tile_zoom,
            &mut session.registry,
            &mut session.transport,
            &mut session.surface,
        );
        if preloaded > 0 {
            session.resolver.show_all_layers(&mut session.surface);
        }
        debug!("session start: preloaded {preloaded} backdrop tiles");

        Ok(session)
    }

    pub fn config(&self) -> &PyramidConfig {
        &self.config
    }

    pub fn state(&self) -> &ViewerState {
        &self.state
    }

    pub fn registry(&self) -> &TileRegistry {
        &self.registry
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Number of resolution passes run so far.
    pub fn resolve_count(&self) -> u64 {
        self.resolves
    }

    pub fn set_dpr(&mut self, dpr: f64) {
        self.dpr = dpr;
    }

    pub fn subscribe(&mut self, callback: impl FnMut(&ViewerEvent) + 'static) {
        self.events.subscribe(callback);
    }

    pub fn center(&self) -> Vec2 {
        self.state.center
    }

    /// Target zoom (what navigation commands see).
    pub fn zoom(&self) -> f64 {
        self.state.target_zoom
    }

    /// Animated zoom currently rendered.
    pub fn current_zoom(&self) -> f64 {
        self.state.current_zoom
    }

    /// Glide the view toward a new focal point.
    pub fn pan_to(&mut self, target: Vec2) {
        self.state.target_center = target;
    }

    /// Jump the view to a focal point without animation.
    pub fn set_center(&mut self, center: Vec2) {
        self.state.center = center;
        self.state.target_center = center;
        self.request_resolve(Cadence::Immediate);
    }

    /// Apply a drag delta in screen pixels; content follows the pointer.
    pub fn pan_by(&mut self, screen_delta: Vec2) {
        let scale = self.dpr * zoom_scale(self.state.current_zoom);
        self.set_center(self.state.center - screen_delta.scale(scale));
    }

    /// Latest pointer position, used as the anchor for pointer-locked zoom.
    pub fn set_pointer(&mut self, screen: Vec2) {
        self.state.pointer = screen;
    }

    /// Set a new zoom target. `follow_pointer` keeps the image point under
    /// the pointer fixed while interpolating; `force` applies the change in
    /// one step (pinch tracking).
    pub fn set_zoom(&mut self, zoom: f64, follow_pointer: bool, force: bool) {
        let Some(clamped) = self
            .animator
            .request_zoom(&mut self.state, zoom, follow_pointer)
        else {
            return;
        };

        // Pre-show every layer before a cross-level transition starts while
        // nothing is loading, so the swap never exposes the background.
        if self.resolver.level_for_zoom(clamped) != self.state.current_zoom_level
            && self.registry.loading_count() == 0
        {
            self.resolver.show_all_layers(&mut self.surface);
        }

        self.events.emit(ViewerEvent::ZoomChanged(clamped));

        if force {
            self.step_zoom(self.frame.dt_ms, true);
        }
    }

    pub fn click(&mut self, screen: Vec2) {
        let coordinate = self.screen_to_image(screen);
        self.events.emit(ViewerEvent::Click(coordinate));
    }

    /// Double click zooms out one level, anchored at the pointer.
    pub fn double_click(&mut self, screen: Vec2) {
        let coordinate = self.screen_to_image(screen);
        self.events.emit(ViewerEvent::DoubleClick(coordinate));
        self.set_pointer(screen);
        self.set_zoom(self.state.target_zoom - 1.0, true, false);
    }

    /// Sweep the image edge to edge over `duration_ms`, bouncing at the
    /// edges. No-op when the rendered map fits inside the viewport.
    pub fn auto_pan(&mut self, duration_ms: f64) {
        let viewport = self.surface.viewport_size();
        self.animator
            .start_auto_pan(&mut self.state, viewport, duration_ms);
    }

    pub fn stop_auto_pan(&mut self) {
        self.animator.stop_auto_pan(&mut self.state);
    }

    pub fn screen_to_image(&self, point: Vec2) -> Vec2 {
        let offset = viewport_offset(
            self.state.center,
            self.state.current_zoom,
            self.surface.viewport_size(),
        );
        pyramid::screen_to_image(point, self.state.current_zoom, offset, self.dpr)
    }

    pub fn image_to_screen(&self, point: Vec2) -> Vec2 {
        let offset = viewport_offset(
            self.state.center,
            self.state.current_zoom,
            self.surface.viewport_size(),
        );
        pyramid::image_to_screen(point, self.state.current_zoom, offset, self.dpr)
    }

    /// One pass of the animation loop: zoom, pan, auto-pan, tile
    /// completions, throttled tile resolution, then event delivery.
    pub fn tick(&mut self, now_ms: f64) {
        let now = Time::ms(now_ms);
        let dt_ms = self
            .last_tick
            .map(|last| now.since(last))
            .unwrap_or(DEFAULT_FRAME_MS);
        self.last_tick = Some(now);
        self.clock = now;
        self.frame = Frame::at(self.frame.index + 1, now, dt_ms);

        self.step_zoom(dt_ms, false);

        if self.animator.update_position(&mut self.state) {
            self.request_resolve(Cadence::Medium);
        }

        let viewport = self.surface.viewport_size();
        let auto = self
            .animator
            .update_auto_pan(&mut self.state, dt_ms, viewport, self.dpr);
        if let Some(direction) = auto.flipped {
            self.events.emit(ViewerEvent::PanDirectionChanged(direction));
        }
        if auto.moved {
            self.request_resolve(Cadence::Slow);
        }

        let sweep = self.registry.poll_loads(&mut self.transport, &mut self.surface);
        for (address, err) in &sweep.failed {
            self.events.emit(ViewerEvent::TileLoadFailed {
                address: *address,
                reason: err.reason.clone(),
            });
        }
        if sweep.settled {
            let level = self.state.current_zoom_level;
            self.resolver.hide_inactive_layers(level, &mut self.surface);
            self.events.emit(ViewerEvent::TilesSettled { level });
        }

        // Trailing edges: the last navigation state before a quiet period
        // still gets resolved.
        let due = self.immediate.poll(now) | self.medium.poll(now) | self.slow.poll(now);
        if due {
            self.resolve_now();
        }

        self.events.dispatch();
    }

    fn step_zoom(&mut self, dt_ms: f64, force: bool) {
        let viewport = self.surface.viewport_size();
        let step = self
            .animator
            .update_zoom(&mut self.state, dt_ms, force, viewport, self.dpr);
        if !step.moved {
            return;
        }

        self.apply_layer_scales();
        self.surface
            .set_layer_visible(self.state.current_zoom_level, true);
        if step.recentered {
            self.request_resolve(Cadence::Immediate);
        }
        self.request_resolve(Cadence::Medium);
    }

    fn apply_layer_scales(&mut self) {
        for level in self.config.min_tile_zoom..=self.config.max_tile_zoom {
            let scale = 1.0 / 2f64.powf(self.state.current_zoom - level as f64);
            self.surface.set_layer_scale(level, scale);
        }
    }

    fn request_resolve(&mut self, cadence: Cadence) {
        let fired = match cadence {
            Cadence::Immediate => self.immediate.fire(self.clock),
            Cadence::Medium => self.medium.fire(self.clock),
            Cadence::Slow => self.slow.fire(self.clock),
        };
        if fired {
            self.resolve_now();
        }
    }

    fn resolve_now(&mut self) {
        let viewport = self.surface.viewport_size();
        let stats = self.resolver.resolve(
            self.state.center,
            self.state.current_zoom,
            self.state.current_zoom_level,
            viewport,
            &mut self.registry,
            &mut self.transport,
            &mut self.surface,
        );
        if stats.level_changed {
            self.state.current_zoom_level = stats.level;
        }
        self.resolves += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::ViewerSession;
    use crate::events::ViewerEvent;
    use crate::state::PanDirection;
    use foundation::math::Vec2;
    use pyramid::{PyramidConfig, TileAddress};
    use scene::{HeadlessSurface, TileBitmap};
    use streaming::{ManualTransport, TileState};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn config() -> PyramidConfig {
        PyramidConfig {
            width: 1024,
            height: 512,
            tile_size: 256,
            min_tile_zoom: 1,
            max_tile_zoom: 2,
            min_zoom: 1.0,
            max_zoom: 4.0,
            default_zoom: 3.0,
            tile_path: "/tiles".into(),
            center: None,
        }
    }

    fn session() -> ViewerSession<ManualTransport, HeadlessSurface> {
        ViewerSession::new(
            config(),
            ManualTransport::new(),
            HeadlessSurface::new(512.0, 512.0),
        )
        .expect("valid config")
    }

    fn collect_events(
        session: &mut ViewerSession<ManualTransport, HeadlessSurface>,
    ) -> Rc<RefCell<Vec<ViewerEvent>>> {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        session.subscribe(move |e| sink.borrow_mut().push(e.clone()));
        seen
    }

    #[test]
    fn rejects_invalid_config() {
        let bad = PyramidConfig {
            min_tile_zoom: 3,
            max_tile_zoom: 1,
            ..config()
        };
        assert!(
            ViewerSession::new(bad, ManualTransport::new(), HeadlessSurface::new(512.0, 512.0))
                .is_err()
        );
    }

    #[test]
    fn construction_resolves_and_preloads_the_backdrop() {
        let mut s = session();
        // Level 2 map is 512x256: tile columns {0,256,512}, rows {0,256}.
        assert_eq!(s.resolve_count(), 1);
        assert_eq!(s.registry().len(), 6);
        assert_eq!(s.transport_mut().begun(), 6);
        assert_eq!(
            s.registry().state(TileAddress::new(2, 512, 256)),
            Some(TileState::Loading)
        );
        assert_eq!(s.center(), Vec2::new(512.0, 256.0));
        assert_eq!(s.zoom(), 3.0);
    }

    #[test]
    fn set_zoom_at_exact_boundary_is_a_no_op() {
        let mut s = session();
        let events = collect_events(&mut s);

        s.set_zoom(1.0, false, false);
        s.set_zoom(4.0, true, false);
        s.tick(16.0);

        assert_eq!(s.zoom(), 3.0);
        assert!(
            !events
                .borrow()
                .iter()
                .any(|e| matches!(e, ViewerEvent::ZoomChanged(_)))
        );
    }

    #[test]
    fn set_zoom_clamps_values_past_the_boundary() {
        let mut s = session();
        let events = collect_events(&mut s);

        s.set_zoom(99.0, false, false);
        s.tick(16.0);

        assert_eq!(s.zoom(), 4.0);
        assert!(
            events
                .borrow()
                .contains(&ViewerEvent::ZoomChanged(4.0))
        );
    }

    #[test]
    fn ticking_interpolates_toward_the_zoom_target() {
        let mut s = session();
        s.set_zoom(2.0, false, false);

        let before = s.current_zoom();
        for i in 1..=10 {
            s.tick(i as f64 * 16.7);
        }
        let after = s.current_zoom();
        assert!(after < before, "zoom should move toward the target");
        assert!(after > 2.0);
    }

    #[test]
    fn forced_zoom_applies_in_one_call() {
        let mut s = session();
        s.set_zoom(2.0, false, true);
        assert!((s.current_zoom() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn settling_hides_inactive_layers_and_notifies() {
        let mut s = session();
        let events = collect_events(&mut s);

        s.transport_mut()
            .succeed_all(&TileBitmap::new(256, 256, Vec::new()));
        s.tick(16.0);

        assert!(
            events
                .borrow()
                .contains(&ViewerEvent::TilesSettled { level: 2 })
        );
        assert!(s.surface().layer(2).expect("layer").visible);
        assert!(!s.surface().layer(1).expect("layer").visible);
        assert_eq!(s.registry().loading_count(), 0);
    }

    #[test]
    fn failed_tiles_surface_as_events_and_can_retry() {
        let mut s = session();
        let events = collect_events(&mut s);
        let addr = TileAddress::new(2, 0, 0);

        s.transport_mut().fail(addr, "404");
        s.tick(16.0);

        let failures: Vec<_> = events
            .borrow()
            .iter()
            .filter(|e| matches!(e, ViewerEvent::TileLoadFailed { .. }))
            .cloned()
            .collect();
        assert_eq!(
            failures,
            vec![ViewerEvent::TileLoadFailed {
                address: addr,
                reason: "404".into()
            }]
        );
        assert_eq!(s.registry().state(addr), None);
    }

    #[test]
    fn set_center_resolution_waits_for_the_trailing_edge() {
        let mut s = session();
        assert_eq!(s.resolve_count(), 1);

        // Inside the 250ms immediate window: held as pending.
        s.set_center(Vec2::new(100.0, 100.0));
        assert_eq!(s.resolve_count(), 1);

        s.tick(100.0);
        assert_eq!(s.resolve_count(), 1);

        s.tick(300.0);
        assert_eq!(s.resolve_count(), 2);
    }

    #[test]
    fn pan_by_moves_against_the_drag_in_image_units() {
        let mut s = session();
        // current zoom 3.0: one screen pixel is 4 image units.
        s.pan_by(Vec2::new(10.0, -5.0));
        assert_eq!(s.center(), Vec2::new(512.0 - 40.0, 256.0 + 20.0));
        assert_eq!(s.state().target_center, s.center());
    }

    #[test]
    fn pan_to_glides_via_damping() {
        let mut s = session();
        s.pan_to(Vec2::new(612.0, 256.0));
        s.tick(16.0);
        // One damped step: a fifth of the remaining distance.
        assert!((s.center().x - 532.0).abs() < 1e-9);
        assert_eq!(s.center().y, 256.0);
    }

    #[test]
    fn click_reports_image_coordinates() {
        let mut s = session();
        let events = collect_events(&mut s);

        let screen = Vec2::new(256.0, 256.0); // viewport midpoint
        let expected = s.screen_to_image(screen);
        s.click(screen);
        s.tick(16.0);

        assert_eq!(events.borrow().as_slice(), &[ViewerEvent::Click(expected)]);
        // Viewport midpoint maps to the focal point.
        assert_eq!(expected, s.center());
    }

    #[test]
    fn double_click_zooms_out_one_level() {
        let mut s = session();
        let events = collect_events(&mut s);

        s.double_click(Vec2::new(256.0, 256.0));
        s.tick(16.0);

        let seen = events.borrow();
        assert!(seen.iter().any(|e| matches!(e, ViewerEvent::DoubleClick(_))));
        assert!(seen.contains(&ViewerEvent::ZoomChanged(2.0)));
        assert_eq!(s.zoom(), 2.0);
    }

    #[test]
    fn auto_pan_bounces_and_reports_direction_changes() {
        let mut s = session();
        let events = collect_events(&mut s);

        // Zoom fully out so the map (1024 wide at level 1) exceeds the
        // 512px viewport, then drive toward the right edge.
        s.set_zoom(1.01, false, true);
        s.auto_pan(10_000.0);
        assert!(s.state().pan_speed != 0.0);
        s.set_center(Vec2::new(1000.0, 256.0));

        let mut now = 16.0;
        let mut guard = 0;
        while !events
            .borrow()
            .iter()
            .any(|e| matches!(e, ViewerEvent::PanDirectionChanged(_)))
        {
            now += 16.0;
            s.tick(now);
            guard += 1;
            assert!(guard < 10_000, "auto-pan never reached the edge");
        }

        assert!(
            events
                .borrow()
                .contains(&ViewerEvent::PanDirectionChanged(PanDirection::Backward))
        );
        assert_eq!(s.state().pan_direction, PanDirection::Backward);
    }

    #[test]
    fn screen_image_round_trip_through_the_session() {
        let s = session();
        let p = Vec2::new(123.0, 456.0);
        let image = s.screen_to_image(p);
        let back = s.image_to_screen(image);
        assert!((back.x - p.x).abs() < 1e-6);
        assert!((back.y - p.y).abs() < 1e-6);
    }
}
