use glam::Vec2;
use winit::{
    event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent},
    keyboard::Key,
};

/// Input events the engine reacts to, translated from window system events.
#[derive(Clone, Debug, PartialEq)]
pub enum InputEvent {
    /// The user asked to close the window.
    Quit,
    KeyDown(Key),
    KeyUp(Key),
    /// A mouse button was pressed with the cursor at `position` (pixels from
    /// the top left of the window).
    MouseDown { button: MouseButton, position: Vec2 },
    MouseUp { button: MouseButton, position: Vec2 },
    MouseMove { position: Vec2 },
    /// Vertical wheel movement. Positive values scroll away from the user.
    Wheel { delta_y: f32 },
}

/// Translates winit window events into `InputEvent`s.
///
/// winit reports button presses without a cursor position, so the translator
/// remembers the last cursor position it saw.
#[derive(Debug, Default)]
pub struct InputTranslator {
    cursor: Vec2,
}

impl InputTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Translate `event`, or return `None` for events the engine ignores.
    pub fn translate(&mut self, event: &WindowEvent) -> Option<InputEvent> {
        match event {
            WindowEvent::CloseRequested => Some(InputEvent::Quit),
            WindowEvent::KeyboardInput { event, .. } => Some(match event.state {
                ElementState::Pressed => InputEvent::KeyDown(event.logical_key.clone()),
                ElementState::Released => InputEvent::KeyUp(event.logical_key.clone()),
            }),
            WindowEvent::MouseInput { state, button, .. } => Some(match state {
                ElementState::Pressed => InputEvent::MouseDown {
                    button: *button,
                    position: self.cursor,
                },
                ElementState::Released => InputEvent::MouseUp {
                    button: *button,
                    position: self.cursor,
                },
            }),
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor = Vec2::new(position.x as f32, position.y as f32);
                Some(InputEvent::MouseMove {
                    position: self.cursor,
                })
            }
            WindowEvent::MouseWheel { delta, .. } => Some(InputEvent::Wheel {
                delta_y: match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(position) => position.y as f32,
                },
            }),
            _ => None,
        }
    }

    /// The last known cursor position.
    pub fn cursor(&self) -> Vec2 {
        self.cursor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn close_requested_is_quit() {
        let mut input = InputTranslator::new();
        assert_eq!(
            input.translate(&WindowEvent::CloseRequested),
            Some(InputEvent::Quit)
        );
    }

    #[test]
    fn unrelated_events_are_ignored() {
        let mut input = InputTranslator::new();
        assert_eq!(input.translate(&WindowEvent::Focused(true)), None);
        assert_eq!(input.translate(&WindowEvent::RedrawRequested), None);
    }
}
