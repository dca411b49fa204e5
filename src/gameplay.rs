use glam::Vec2;
use winit::event::MouseButton;

use crate::{camera::OrbitCamera, engine::InputEvent};

/// Turns mouse input into orbit camera movement.
///
/// Dragging with the left button held orbits the camera. Horizontal drags
/// change the azimuth and vertical drags the elevation, scaled by how far the
/// cursor moved as a fraction of the viewport. The mouse wheel zooms.
#[derive(Debug, Default)]
pub struct OrbitCameraController {
    /// Cursor position at the last drag update, `None` when not dragging.
    drag_from: Option<Vec2>,
}

impl OrbitCameraController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_dragging(&self) -> bool {
        self.drag_from.is_some()
    }

    /// Updates the camera with the given input event. This method returns
    /// `true` if `event` was used, otherwise `false` is returned.
    pub fn process_input(&mut self, event: &InputEvent, camera: &mut OrbitCamera) -> bool {
        match event {
            InputEvent::MouseDown {
                button: MouseButton::Left,
                position,
            } => {
                self.drag_from = Some(*position);
                true
            }
            InputEvent::MouseUp {
                button: MouseButton::Left,
                ..
            } => {
                self.drag_from = None;
                true
            }
            InputEvent::MouseMove { position } => match self.drag_from {
                Some(last) => {
                    let move_x = (last.x - position.x) / camera.viewport_width();
                    let move_y = (position.y - last.y) / camera.viewport_height();

                    camera.pan(move_x, move_y);
                    self.drag_from = Some(*position);
                    true
                }
                None => false,
            },
            InputEvent::Wheel { delta_y } => {
                camera.zoom(*delta_y);
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::camera::{PAN_SENSITIVITY, ZOOM_STEP};
    use crate::config::EyeConfig;

    fn camera() -> OrbitCamera {
        let eye = EyeConfig {
            theta: 0.0,
            phi: 0.0,
            r: 10.0,
            look_at: Vec3::ZERO,
            fov: 45.0,
            near_plane: 0.1,
            far_plane: 100.0,
        };

        OrbitCamera::new(&eye, 800, 400).unwrap()
    }

    fn mouse_down(x: f32, y: f32) -> InputEvent {
        InputEvent::MouseDown {
            button: MouseButton::Left,
            position: Vec2::new(x, y),
        }
    }

    fn mouse_move(x: f32, y: f32) -> InputEvent {
        InputEvent::MouseMove {
            position: Vec2::new(x, y),
        }
    }

    #[test]
    fn moving_without_drag_does_nothing() {
        let mut controller = OrbitCameraController::new();
        let mut camera = camera();

        assert!(!controller.process_input(&mouse_move(100.0, 100.0), &mut camera));
        assert_eq!(camera.theta(), 0.0);
        assert_eq!(camera.phi(), 0.0);
    }

    #[test]
    fn drag_orbits_by_viewport_fraction() {
        let mut controller = OrbitCameraController::new();
        let mut camera = camera();

        controller.process_input(&mouse_down(400.0, 200.0), &mut camera);
        assert!(controller.is_dragging());

        // Drag left by a quarter of the width and down by a quarter of the
        // height.
        controller.process_input(&mouse_move(200.0, 300.0), &mut camera);

        assert_eq!(camera.theta(), 0.25 * PAN_SENSITIVITY);
        assert_eq!(camera.phi(), 0.25 * PAN_SENSITIVITY / 4.0);
    }

    #[test]
    fn drag_deltas_are_incremental() {
        let mut controller = OrbitCameraController::new();
        let mut camera = camera();

        controller.process_input(&mouse_down(400.0, 200.0), &mut camera);
        controller.process_input(&mouse_move(300.0, 200.0), &mut camera);
        controller.process_input(&mouse_move(200.0, 200.0), &mut camera);

        assert!((camera.theta() - 0.25 * PAN_SENSITIVITY).abs() < 1.0e-6);
    }

    #[test]
    fn release_stops_dragging() {
        let mut controller = OrbitCameraController::new();
        let mut camera = camera();

        controller.process_input(&mouse_down(400.0, 200.0), &mut camera);
        controller.process_input(
            &InputEvent::MouseUp {
                button: MouseButton::Left,
                position: Vec2::new(400.0, 200.0),
            },
            &mut camera,
        );
        controller.process_input(&mouse_move(0.0, 0.0), &mut camera);

        assert!(!controller.is_dragging());
        assert_eq!(camera.theta(), 0.0);
    }

    #[test]
    fn right_button_does_not_drag() {
        let mut controller = OrbitCameraController::new();
        let mut camera = camera();

        let used = controller.process_input(
            &InputEvent::MouseDown {
                button: MouseButton::Right,
                position: Vec2::ZERO,
            },
            &mut camera,
        );

        assert!(!used);
        assert!(!controller.is_dragging());
    }

    #[test]
    fn wheel_zooms() {
        let mut controller = OrbitCameraController::new();
        let mut camera = camera();

        controller.process_input(&InputEvent::Wheel { delta_y: 1.0 }, &mut camera);
        assert_eq!(camera.radius(), 10.0 + ZOOM_STEP);

        controller.process_input(&InputEvent::Wheel { delta_y: -3.0 }, &mut camera);
        assert_eq!(camera.radius(), 10.0);
    }
}
