use winit::event::{ElementState, MouseButton, MouseScrollDelta};

/// Pixels of trackpad scroll that count as one wheel notch.
const PIXELS_PER_NOTCH: f64 = 50.0;

/// Pointer state feeding the orbit controls.
#[derive(Default, Debug, Clone, Copy)]
pub struct InputState {
    rotating: bool,
    cursor: Option<(f64, f64)>,
}

impl InputState {
    /// Returns true when the button starts or ends a drag.
    pub fn handle_button(&mut self, button: MouseButton, state: ElementState) -> bool {
        if button != MouseButton::Left {
            return false;
        }
        self.rotating = state == ElementState::Pressed;
        true
    }

    /// Track the cursor; yields the movement since the last position while
    /// a drag is active.
    pub fn handle_cursor(&mut self, x: f64, y: f64) -> Option<(f32, f32)> {
        let previous = self.cursor.replace((x, y));
        match previous {
            Some((px, py)) if self.rotating => Some(((x - px) as f32, (y - py) as f32)),
            _ => None,
        }
    }

    pub fn cursor_left(&mut self) {
        self.cursor = None;
        self.rotating = false;
    }

    #[cfg(test)]
    pub fn is_rotating(&self) -> bool {
        self.rotating
    }
}

/// Wheel notches, positive when scrolling toward the scene.
pub fn scroll_steps(delta: MouseScrollDelta) -> f32 {
    match delta {
        MouseScrollDelta::LineDelta(_, y) => y,
        MouseScrollDelta::PixelDelta(position) => (position.y / PIXELS_PER_NOTCH) as f32,
    }
}
