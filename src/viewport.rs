use eframe::egui::{Pos2, Rect, Vec2, vec2};
use serde::Deserialize;

#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct ViewportConfig {
    pub zoom_min: f32,
    pub zoom_max: f32,
    /// Zoom multiplier per wheel notch towards the user; the inverse is used
    /// for the other direction.
    pub wheel_factor: f32,
    pub button_zoom_in: f32,
    pub button_zoom_out: f32,
    pub default_pan: [f32; 2],
    pub default_zoom: f32,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            zoom_min: 0.3,
            zoom_max: 3.0,
            wheel_factor: 1.1,
            button_zoom_in: 1.2,
            button_zoom_out: 0.8,
            default_pan: [0.0, 0.0],
            default_zoom: 1.0,
        }
    }
}

impl ViewportConfig {
    fn clamp_zoom(&self, zoom: f32) -> f32 {
        zoom.clamp(self.zoom_min, self.zoom_max)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DragState {
    Idle,
    Panning { last: Pos2 },
}

/// Pan offset and zoom factor of the diagram canvas.
///
/// All positions are canvas-local screen coordinates:
/// `screen = pan + world * zoom`.
#[derive(Clone, Debug)]
pub struct Viewport {
    config: ViewportConfig,
    pan: Vec2,
    zoom: f32,
    drag: DragState,
}

impl Viewport {
    pub fn new(config: ViewportConfig) -> Self {
        let mut viewport = Self {
            config,
            pan: Vec2::ZERO,
            zoom: 1.0,
            drag: DragState::Idle,
        };
        viewport.reset();
        viewport
    }

    pub fn pan(&self) -> Vec2 {
        self.pan
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn drag_state(&self) -> DragState {
        self.drag
    }

    pub fn is_panning(&self) -> bool {
        matches!(self.drag, DragState::Panning { .. })
    }

    pub fn config(&self) -> &ViewportConfig {
        &self.config
    }

    pub fn world_to_screen(&self, world: Pos2) -> Pos2 {
        (world.to_vec2() * self.zoom + self.pan).to_pos2()
    }

    pub fn screen_to_world(&self, screen: Pos2) -> Pos2 {
        ((screen.to_vec2() - self.pan) / self.zoom).to_pos2()
    }

    /// Pointer pressed on the background (not on a node).
    pub fn begin_pan(&mut self, pointer: Pos2) {
        self.drag = DragState::Panning { last: pointer };
    }

    /// Pointer moved anywhere in the window. Only has an effect while panning;
    /// leaving the canvas does not end the drag.
    pub fn pointer_moved(&mut self, pointer: Pos2) {
        if let DragState::Panning { last } = self.drag {
            self.pan += pointer - last;
            self.drag = DragState::Panning { last: pointer };
        }
    }

    /// Pointer released, or left the window altogether.
    pub fn end_pan(&mut self) {
        self.drag = DragState::Idle;
    }

    pub fn pan_by(&mut self, delta: Vec2) {
        self.pan += delta;
    }

    /// Multiplies zoom by `factor` (clamped) while keeping the world point
    /// under `anchor` fixed on screen.
    pub fn zoom_at(&mut self, factor: f32, anchor: Pos2) {
        if !factor.is_finite() || factor <= 0.0 {
            return;
        }

        let old_zoom = self.zoom;
        let new_zoom = self.config.clamp_zoom(old_zoom * factor);
        if (new_zoom - old_zoom).abs() <= f32::EPSILON {
            return;
        }

        let anchor = anchor.to_vec2();
        self.pan = anchor - (anchor - self.pan) / old_zoom * new_zoom;
        self.zoom = new_zoom;
    }

    /// One wheel event: positive `scroll` zooms in.
    pub fn wheel(&mut self, scroll: f32, anchor: Pos2) {
        if scroll.abs() <= f32::EPSILON {
            return;
        }
        let factor = if scroll > 0.0 {
            self.config.wheel_factor
        } else {
            1.0 / self.config.wheel_factor
        };
        self.zoom_at(factor, anchor);
    }

    pub fn zoom_in(&mut self, anchor: Pos2) {
        self.zoom_at(self.config.button_zoom_in, anchor);
    }

    pub fn zoom_out(&mut self, anchor: Pos2) {
        self.zoom_at(self.config.button_zoom_out, anchor);
    }

    pub fn reset(&mut self) {
        let [x, y] = self.config.default_pan;
        self.pan = vec2(x, y);
        self.zoom = self.config.clamp_zoom(self.config.default_zoom);
        self.drag = DragState::Idle;
    }

    /// Chooses zoom and pan so `bounds` (world) fits inside a canvas of
    /// `canvas_size`, leaving `padding` pixels around it.
    pub fn fit(&mut self, bounds: Rect, canvas_size: Vec2, padding: f32) {
        if !bounds.is_positive() {
            return;
        }
        let available = canvas_size - Vec2::splat(padding * 2.0);
        if available.x <= 0.0 || available.y <= 0.0 {
            return;
        }

        let scale = (available.x / bounds.width()).min(available.y / bounds.height());
        self.zoom = self.config.clamp_zoom(scale);
        self.pan = canvas_size / 2.0 - bounds.center().to_vec2() * self.zoom;
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(ViewportConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use eframe::egui::pos2;

    use super::*;

    fn assert_close(a: Pos2, b: Pos2) {
        assert!((a - b).length() < 1e-3, "{a:?} != {b:?}");
    }

    #[test]
    fn drag_pans_by_pointer_delta() {
        let mut viewport = Viewport::default();
        viewport.begin_pan(pos2(10.0, 10.0));
        viewport.pointer_moved(pos2(15.0, 30.0));
        viewport.pointer_moved(pos2(20.0, 25.0));
        assert_eq!(viewport.pan(), vec2(10.0, 15.0));
        viewport.end_pan();
        assert!(!viewport.is_panning());
        viewport.pointer_moved(pos2(100.0, 100.0));
        assert_eq!(viewport.pan(), vec2(10.0, 15.0));
    }

    #[test]
    fn moves_outside_the_canvas_keep_panning() {
        let mut viewport = Viewport::default();
        viewport.begin_pan(pos2(5.0, 5.0));
        viewport.pointer_moved(pos2(-40.0, 5.0));
        assert!(viewport.is_panning());
        assert_eq!(viewport.pan(), vec2(-45.0, 0.0));
    }

    #[test]
    fn zoom_keeps_world_point_under_cursor() {
        let mut viewport = Viewport::default();
        viewport.pan_by(vec2(37.0, -12.0));
        let anchor = pos2(210.0, 145.0);
        let world_before = viewport.screen_to_world(anchor);

        viewport.wheel(1.0, anchor);
        assert!((viewport.zoom() - 1.1).abs() < 1e-6);
        assert_close(viewport.screen_to_world(anchor), world_before);

        viewport.zoom_at(0.5, anchor);
        assert_close(viewport.screen_to_world(anchor), world_before);
    }

    #[test]
    fn zoom_is_clamped() {
        let mut viewport = Viewport::default();
        for _ in 0..100 {
            viewport.wheel(1.0, pos2(0.0, 0.0));
        }
        assert_eq!(viewport.zoom(), 3.0);
        for _ in 0..100 {
            viewport.wheel(-1.0, pos2(0.0, 0.0));
        }
        assert_eq!(viewport.zoom(), 0.3);
    }

    #[test]
    fn clamped_zoom_does_not_move_pan() {
        let mut viewport = Viewport::default();
        viewport.zoom_at(3.0, pos2(0.0, 0.0));
        let pan = viewport.pan();
        viewport.zoom_at(2.0, pos2(400.0, 300.0));
        assert_eq!(viewport.pan(), pan);
    }

    #[test]
    fn reset_restores_defaults_and_stops_drag() {
        let mut viewport = Viewport::new(ViewportConfig {
            default_pan: [5.0, 6.0],
            default_zoom: 0.5,
            ..ViewportConfig::default()
        });
        viewport.begin_pan(pos2(0.0, 0.0));
        viewport.pointer_moved(pos2(50.0, 50.0));
        viewport.zoom_in(pos2(10.0, 10.0));
        viewport.reset();
        assert_eq!(viewport.pan(), vec2(5.0, 6.0));
        assert_eq!(viewport.zoom(), 0.5);
        assert_eq!(viewport.drag_state(), DragState::Idle);
    }

    #[test]
    fn fit_centers_bounds() {
        let mut viewport = Viewport::default();
        let bounds = Rect::from_min_size(pos2(100.0, 100.0), vec2(400.0, 200.0));
        viewport.fit(bounds, vec2(800.0, 600.0), 0.0);
        assert_eq!(viewport.zoom(), 2.0);
        assert_close(viewport.world_to_screen(bounds.center()), pos2(400.0, 300.0));
    }
}
