//! # Input State
//!
//! Per-frame key and mouse button states as seen by the render thread.
//! A state is derived from whether the input was down on the previous frame and
//! whether it is down now.

use std::collections::HashMap;
use winit::{event::MouseButton, keyboard::KeyCode};

/// Represents the state of a key or button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RawInputState {
    /// Key/button is not pressed
    #[default]
    NotPressed,
    /// Key/button went down this frame
    Pressed,
    /// Key/button has been down for more than one frame
    Held,
    /// Key/button went up this frame
    Released,
}

impl RawInputState {
    /// Whether the input is down (pressed or held)
    pub fn is_active(&self) -> bool {
        matches!(self, RawInputState::Pressed | RawInputState::Held)
    }

    /// Whether the input went down this frame
    pub fn is_just_pressed(&self) -> bool {
        matches!(self, RawInputState::Pressed)
    }

    /// Whether the input went up this frame
    pub fn is_just_released(&self) -> bool {
        matches!(self, RawInputState::Released)
    }

    /// Derives the state from the previous and current "is down" values
    pub fn from_raw_states(previous: bool, current: bool) -> Self {
        match (previous, current) {
            (false, true) => RawInputState::Pressed,
            (true, true) => RawInputState::Held,
            (true, false) => RawInputState::Released,
            (false, false) => RawInputState::NotPressed,
        }
    }
}

/// The input of one frame, with every tracked key and button translated into a
/// [`RawInputState`].
#[derive(Debug, Default, Clone)]
pub struct ProcessedInputState {
    /// State of every tracked keyboard key
    pub keyboard_states: HashMap<KeyCode, RawInputState>,

    /// State of every tracked mouse button
    pub mouse_button_states: HashMap<MouseButton, RawInputState>,

    /// Mouse movement accumulated over the frame (x, y)
    pub mouse_delta: Option<(f64, f64)>,
}

impl ProcessedInputState {
    /// Gets the state of a keyboard key. Untracked keys read as not pressed.
    pub fn get_key_state(&self, key: KeyCode) -> RawInputState {
        self.keyboard_states.get(&key).copied().unwrap_or_default()
    }

    /// Gets the state of a mouse button
    pub fn get_mouse_button_state(&self, button: MouseButton) -> RawInputState {
        self.mouse_button_states.get(&button).copied().unwrap_or_default()
    }

    /// Gets the mouse movement delta of the frame
    pub fn get_mouse_delta(&self) -> Option<(f64, f64)> {
        self.mouse_delta
    }

    /// Keys that went down this frame.
    pub fn just_pressed_keys(&self) -> impl Iterator<Item = KeyCode> + '_ {
        self.keyboard_states
            .iter()
            .filter(|(_, state)| state.is_just_pressed())
            .map(|(key, _)| *key)
    }
}

/// Tracks the state of mouse buttons and movement.
#[derive(Debug, Default)]
pub struct MouseInput {
    /// Whether each button was down on the previous frame
    pub mouse_button_inputs_old: HashMap<MouseButton, bool>,
    /// Whether each button is down now
    pub mouse_button_inputs_new: HashMap<MouseButton, bool>,

    /// Mouse movement accumulated since the last frame (x, y)
    pub mouse_delta: Option<(f64, f64)>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_transitions() {
        assert_eq!(RawInputState::from_raw_states(false, true), RawInputState::Pressed);
        assert_eq!(RawInputState::from_raw_states(true, true), RawInputState::Held);
        assert!(RawInputState::Held.is_active());
        assert!(RawInputState::from_raw_states(true, false).is_just_released());
        assert!(!RawInputState::default().is_active());
    }
}
