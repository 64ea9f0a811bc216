//! Pan/zoom state of the virtual canvas.
//!
//! The transform maps world (canvas) coordinates to screen coordinates. Screen points handed
//! in by gesture handlers are first normalised against the surface's client rectangle.

use crate::config::ViewportConfig;
use crate::geom::{Point, Rect, Size, Transform, Vector, point, vector};

/// Redraw coalescing: any number of transform changes between two frames produce one redraw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrameState {
    #[default]
    Idle,
    Scheduled,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Pinch {
    distance: f64,
    midpoint: Point,
}

#[derive(Debug, Clone)]
pub struct Viewport {
    config: ViewportConfig,
    transform: Transform,
    zoom: f64,
    /// Client rectangle of the surface and its backing pixel size, when attached.
    surface: Option<(Rect, Size)>,
    /// World-space anchor of an active pan.
    anchor: Option<Point>,
    press_origin: Option<Point>,
    dragged: bool,
    pinch: Option<Pinch>,
    frame: FrameState,
}

impl Viewport {
    pub fn new(config: ViewportConfig) -> Self {
        Self {
            config,
            transform: Transform::identity(),
            zoom: 1.0,
            surface: None,
            anchor: None,
            press_origin: None,
            dragged: false,
            pinch: None,
            frame: FrameState::Idle,
        }
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn frame_state(&self) -> FrameState {
        self.frame
    }

    pub fn set_surface(&mut self, client_rect: Option<Rect>, pixel_size: Size) {
        self.surface = client_rect.map(|r| (r, pixel_size));
    }

    /// Size of the visible area in canvas pixels (configured fallback when detached).
    pub fn size(&self) -> Size {
        match self.surface {
            Some((_, px)) if px.width > 0.0 && px.height > 0.0 => px,
            _ => Size::new(self.config.fallback_width, self.config.fallback_height),
        }
    }

    /// Client (page) coordinates to canvas pixels. Without usable geometry the ratio is 1:1.
    pub fn canvas_point(&self, client: Point) -> Point {
        match self.surface {
            Some((rect, px)) if rect.size.width > 0.0 && rect.size.height > 0.0 => point(
                (client.x - rect.origin.x) * px.width / rect.size.width,
                (client.y - rect.origin.y) * px.height / rect.size.height,
            ),
            Some((rect, _)) => client - rect.origin.to_vector(),
            None => client,
        }
    }

    /// Screen → world through the inverse of the current transform.
    pub fn transformed_point(&self, screen: Point) -> Point {
        let canvas = self.canvas_point(screen);
        self.transform
            .inverse()
            .map(|inv| inv.transform_point(canvas))
            .unwrap_or(canvas)
    }

    pub fn to_screen(&self, world: Point) -> Point {
        self.transform.transform_point(world)
    }

    /// Marks the transform dirty. Returns `true` when a new frame must be requested.
    fn invalidate(&mut self) -> bool {
        match self.frame {
            FrameState::Idle => {
                self.frame = FrameState::Scheduled;
                true
            }
            FrameState::Scheduled => false,
        }
    }

    /// Consumes the pending redraw, if any, yielding the transform to apply.
    pub fn take_frame(&mut self) -> Option<Transform> {
        match self.frame {
            FrameState::Scheduled => {
                self.frame = FrameState::Idle;
                Some(self.transform)
            }
            FrameState::Idle => None,
        }
    }

    pub fn set_transform(&mut self, transform: Transform) -> bool {
        self.transform = transform;
        self.zoom = transform.m11.hypot(transform.m12);
        self.invalidate()
    }

    /// Shifts the world under the viewport by `delta` world units.
    pub fn translate_world(&mut self, delta: Vector) -> bool {
        if delta.x == 0.0 && delta.y == 0.0 {
            return false;
        }
        self.transform = Transform::translation(delta.x, delta.y).then(&self.transform);
        self.invalidate()
    }

    pub fn pointer_down(&mut self, screen: Point) {
        self.anchor = Some(self.transformed_point(screen));
        self.press_origin = Some(screen);
        self.dragged = false;
    }

    /// Pans while a button is held. `buttons == 0` ends the pan (button released elsewhere).
    pub fn pointer_move(&mut self, screen: Point, buttons: u16) -> bool {
        if buttons == 0 {
            self.anchor = None;
            return false;
        }
        let Some(anchor) = self.anchor else {
            return false;
        };
        if let Some(origin) = self.press_origin {
            if (screen - origin).length() > self.config.drag_threshold {
                self.dragged = true;
            }
        }
        let here = self.transformed_point(screen);
        let redraw = self.translate_world(here - anchor);
        self.anchor = Some(self.transformed_point(screen));
        redraw
    }

    /// Ends a press. Returns `true` when it was a click rather than a drag.
    pub fn pointer_up(&mut self) -> bool {
        let was_press = self.press_origin.is_some();
        self.anchor = None;
        self.press_origin = None;
        was_press && !std::mem::take(&mut self.dragged)
    }

    /// Scales around `screen`, keeping the world point under it fixed.
    pub fn zoom_at(&mut self, screen: Point, factor: f64) -> bool {
        if !factor.is_finite() || factor <= 0.0 {
            return false;
        }
        let target = (self.zoom * factor).clamp(self.config.min_zoom, self.config.max_zoom);
        let factor = target / self.zoom;
        if (factor - 1.0).abs() < f64::EPSILON {
            return false;
        }
        let w = self.transformed_point(screen);
        let local = Transform::translation(-w.x, -w.y)
            .then_scale(factor, factor)
            .then_translate(w.to_vector());
        self.transform = local.then(&self.transform);
        self.zoom = target;
        self.invalidate()
    }

    /// Wheel zoom; negative `delta_y` zooms in.
    pub fn wheel(&mut self, screen: Point, delta_y: f64) -> bool {
        let factor = self.config.wheel_step.powf(-delta_y / 100.0);
        self.zoom_at(screen, factor)
    }

    pub fn pinch_start(&mut self, a: Point, b: Point) {
        self.anchor = None;
        self.pinch = Some(Pinch {
            distance: (a - b).length(),
            midpoint: a.lerp(b, 0.5),
        });
    }

    pub fn pinch_move(&mut self, a: Point, b: Point) -> bool {
        let Some(prev) = self.pinch else {
            return false;
        };
        let distance = (a - b).length();
        let midpoint = a.lerp(b, 0.5);
        let from = self.transformed_point(prev.midpoint);
        let to = self.transformed_point(midpoint);
        let mut redraw = self.translate_world(to - from);
        if prev.distance > 0.0 && distance > 0.0 {
            redraw |= self.zoom_at(midpoint, distance / prev.distance);
        }
        self.pinch = Some(Pinch { distance, midpoint });
        redraw
    }

    pub fn pinch_end(&mut self) {
        self.pinch = None;
    }

    /// Places a world-space rectangle so that its point at `center_bias` of its height lands on
    /// the configured target position of the viewport.
    pub fn center_on(&mut self, world: Rect) -> bool {
        let anchor = point(
            world.center().x,
            world.origin.y + world.size.height * self.config.center_bias,
        );
        let size = self.size();
        let target = point(size.width / 2.0, size.height * self.config.center_target_y);
        let current = self.to_screen(anchor);
        self.move_screen(target - current)
    }

    /// Horizontal-only variant of [`Viewport::center_on`].
    pub fn center_horizontally(&mut self, world: Rect) -> bool {
        let size = self.size();
        let current = self.to_screen(world.center());
        self.move_screen(vector(size.width / 2.0 - current.x, 0.0))
    }

    fn move_screen(&mut self, delta: Vector) -> bool {
        if delta.x == 0.0 && delta.y == 0.0 {
            return false;
        }
        let t = self.transform.then_translate(delta);
        self.set_transform(t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::rect;

    fn close(a: Point, b: Point) -> bool {
        (a - b).length() < 1e-9
    }

    #[test]
    fn screen_world_round_trip_survives_gestures() {
        let mut vp = Viewport::new(ViewportConfig::default());
        vp.pointer_down(point(10.0, 10.0));
        vp.pointer_move(point(70.0, 35.0), 1);
        vp.pointer_up();
        vp.wheel(point(300.0, 200.0), -240.0);
        vp.pinch_start(point(100.0, 100.0), point(200.0, 100.0));
        vp.pinch_move(point(90.0, 110.0), point(230.0, 120.0));
        vp.pinch_end();

        for p in [point(0.0, 0.0), point(123.5, -40.0), point(900.0, 700.0)] {
            let world = vp.transformed_point(p);
            assert!(close(vp.to_screen(world), p));
        }
    }

    #[test]
    fn pan_keeps_the_grabbed_world_point_under_the_pointer() {
        let mut vp = Viewport::new(ViewportConfig::default());
        vp.zoom_at(point(0.0, 0.0), 2.0);
        let grabbed = vp.transformed_point(point(50.0, 50.0));
        vp.pointer_down(point(50.0, 50.0));
        vp.pointer_move(point(80.0, 20.0), 1);
        assert!(close(vp.transformed_point(point(80.0, 20.0)), grabbed));
        assert!(!vp.pointer_up(), "moved past the drag threshold");
    }

    #[test]
    fn small_movement_is_still_a_click() {
        let mut vp = Viewport::new(ViewportConfig::default());
        vp.pointer_down(point(50.0, 50.0));
        vp.pointer_move(point(51.0, 52.0), 1);
        assert!(vp.pointer_up());
        // released without a press
        assert!(!vp.pointer_up());
    }

    #[test]
    fn zoom_is_clamped_and_keeps_cursor_point_fixed() {
        let mut vp = Viewport::new(ViewportConfig::default());
        let cursor = point(400.0, 300.0);
        let world = vp.transformed_point(cursor);
        for _ in 0..50 {
            vp.wheel(cursor, -500.0);
        }
        assert!((vp.zoom() - 3.0).abs() < 1e-9);
        assert!(close(vp.to_screen(world), cursor));
        for _ in 0..50 {
            vp.wheel(cursor, 500.0);
        }
        assert!((vp.zoom() - 0.2).abs() < 1e-9);
        assert!(!vp.zoom_at(cursor, 0.5), "already at the minimum");
    }

    #[test]
    fn redraws_are_coalesced_per_frame() {
        let mut vp = Viewport::new(ViewportConfig::default());
        assert!(vp.translate_world(vector(5.0, 0.0)));
        assert!(!vp.translate_world(vector(5.0, 0.0)));
        assert!(!vp.wheel(point(0.0, 0.0), -100.0));
        assert_eq!(vp.frame_state(), FrameState::Scheduled);
        let t = vp.take_frame().unwrap();
        assert_eq!(t, *vp.transform());
        assert_eq!(vp.take_frame(), None);
        assert!(vp.translate_world(vector(1.0, 1.0)));
    }

    #[test]
    fn client_points_scale_by_surface_ratio_or_fall_back() {
        let mut vp = Viewport::new(ViewportConfig::default());
        assert_eq!(vp.canvas_point(point(30.0, 40.0)), point(30.0, 40.0));
        vp.set_surface(Some(rect(10.0, 20.0, 100.0, 50.0)), Size::new(200.0, 100.0));
        assert_eq!(vp.canvas_point(point(60.0, 45.0)), point(100.0, 50.0));
        vp.set_surface(Some(rect(10.0, 20.0, 0.0, 0.0)), Size::new(200.0, 100.0));
        assert_eq!(vp.canvas_point(point(60.0, 45.0)), point(50.0, 25.0));
        assert_eq!(vp.size(), Size::new(200.0, 100.0));
    }

    #[test]
    fn centering_lands_on_the_target_position() {
        let mut vp = Viewport::new(ViewportConfig::default());
        vp.zoom_at(point(0.0, 0.0), 1.5);
        let node = rect(1000.0, 2000.0, 180.0, 80.0);
        vp.center_on(node);
        let anchor = point(1090.0, 2020.0);
        assert!(close(vp.to_screen(anchor), point(640.0, 240.0)));
    }
}
