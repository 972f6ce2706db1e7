use std::f32::consts::{FRAC_PI_2, TAU};

use glam::Vec2;

use crate::camera::OrbitCamera;

/// Pointer-drag orbiting. The polar range is pinned to π/2 on both ends and
/// zooming is off, so the user can only swing the camera horizontally around
/// the product.
pub struct OrbitControls {
    rotate_speed: f32,
    min_polar: f32,
    max_polar: f32,
    zoom_enabled: bool,
    dragging: bool,
    last_cursor: Option<Vec2>,
}

impl OrbitControls {
    pub fn new() -> Self {
        Self {
            rotate_speed: 1.0,
            min_polar: FRAC_PI_2,
            max_polar: FRAC_PI_2,
            zoom_enabled: false,
            dragging: false,
            last_cursor: None,
        }
    }

    pub fn on_mouse_button(&mut self, pressed: bool) {
        self.dragging = pressed;
        if !pressed {
            self.last_cursor = None;
        }
    }

    /// A full horizontal sweep across the viewport equals one full orbit.
    pub fn on_cursor_moved(&mut self, position: Vec2, viewport_width: f32, camera: &mut OrbitCamera) {
        if self.dragging {
            if let Some(last) = self.last_cursor {
                let delta_x = position.x - last.x;
                if viewport_width > 0.0 {
                    camera.azimuth -= delta_x / viewport_width * TAU * self.rotate_speed;
                }
            }
            self.last_cursor = Some(position);
        }
    }

    pub fn on_scroll(&mut self, delta: f32, camera: &mut OrbitCamera) {
        if self.zoom_enabled {
            camera.distance = (camera.distance - delta).max(0.1);
        }
    }

    pub fn update(&self, camera: &mut OrbitCamera) {
        camera.polar = camera.polar.clamp(self.min_polar, self.max_polar);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drag_rotates_horizontally() {
        let mut controls = OrbitControls::new();
        let mut camera = OrbitCamera::new();

        controls.on_mouse_button(true);
        controls.on_cursor_moved(Vec2::new(100.0, 50.0), 1000.0, &mut camera);
        controls.on_cursor_moved(Vec2::new(600.0, 50.0), 1000.0, &mut camera);

        // Half the viewport width maps to half a turn.
        assert!((camera.azimuth + TAU / 2.0).abs() < 1e-5);
    }

    #[test]
    fn cursor_movement_without_a_press_does_nothing() {
        let mut controls = OrbitControls::new();
        let mut camera = OrbitCamera::new();

        controls.on_cursor_moved(Vec2::new(100.0, 50.0), 1000.0, &mut camera);
        controls.on_cursor_moved(Vec2::new(900.0, 50.0), 1000.0, &mut camera);

        assert_eq!(camera.azimuth, 0.0);
    }

    #[test]
    fn release_ends_the_drag() {
        let mut controls = OrbitControls::new();
        let mut camera = OrbitCamera::new();

        controls.on_mouse_button(true);
        controls.on_cursor_moved(Vec2::new(0.0, 0.0), 1000.0, &mut camera);
        controls.on_mouse_button(false);
        controls.on_mouse_button(true);
        // The first move after a fresh press only anchors the cursor.
        controls.on_cursor_moved(Vec2::new(500.0, 0.0), 1000.0, &mut camera);

        assert_eq!(camera.azimuth, 0.0);
    }

    #[test]
    fn zoom_is_disabled() {
        let mut controls = OrbitControls::new();
        let mut camera = OrbitCamera::new();

        controls.on_scroll(2.0, &mut camera);
        controls.on_scroll(-2.0, &mut camera);

        assert_eq!(camera.distance, crate::camera::ORBIT_DISTANCE);
    }

    #[test]
    fn polar_angle_stays_locked() {
        let controls = OrbitControls::new();
        let mut camera = OrbitCamera::new();

        camera.polar = 0.3;
        controls.update(&mut camera);
        assert_eq!(camera.polar, FRAC_PI_2);

        camera.polar = 2.8;
        controls.update(&mut camera);
        assert_eq!(camera.polar, FRAC_PI_2);
    }
}
