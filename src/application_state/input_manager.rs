//! # Input Manager
//!
//! Turns the raw key, button and motion events a window reports into one
//! [`ProcessedInputState`] per frame.
//!
//! Only keys registered with the manager are tracked. The control bindings and the GUI
//! key bindings register the keys they care about when a graphical session opens.

use std::collections::HashMap;

use winit::{event::MouseButton, keyboard::KeyCode};

use super::input_state::{MouseInput, ProcessedInputState, RawInputState};

const MOUSE_BUTTONS: [MouseButton; 3] = [MouseButton::Left, MouseButton::Right, MouseButton::Middle];

/// Manages the state of all input devices for the render thread.
#[derive(Debug)]
pub struct InputManager {
    /// Whether each tracked key was down on the previous frame
    pub keyboard_inputs_old: HashMap<KeyCode, bool>,
    /// Whether each tracked key is down now
    pub keyboard_inputs_new: HashMap<KeyCode, bool>,

    /// Current state of mouse inputs
    pub mouse_inputs: MouseInput,
}

impl Default for InputManager {
    fn default() -> Self {
        Self::new(&[])
    }
}

impl InputManager {
    /// Creates a manager tracking `keys` and the left, right and middle mouse buttons.
    ///
    /// # Arguments
    /// * `keys` - Keyboard keys to track from the start
    pub fn new(keys: &[KeyCode]) -> Self {
        let mut manager = Self {
            keyboard_inputs_old: HashMap::new(),
            keyboard_inputs_new: HashMap::new(),
            mouse_inputs: MouseInput::default(),
        };
        for key in keys {
            manager.track_key(*key);
        }
        for button in MOUSE_BUTTONS {
            manager.mouse_inputs.mouse_button_inputs_old.insert(button, false);
            manager.mouse_inputs.mouse_button_inputs_new.insert(button, false);
        }
        manager
    }

    /// Starts tracking `key`. Tracking a key twice has no effect.
    pub fn track_key(&mut self, key: KeyCode) {
        self.keyboard_inputs_old.entry(key).or_insert(false);
        self.keyboard_inputs_new.entry(key).or_insert(false);
    }

    pub fn is_tracked(&self, key: KeyCode) -> bool {
        self.keyboard_inputs_new.contains_key(&key)
    }

    /// Records a key going down or up. Untracked keys are ignored.
    pub fn intake_key(&mut self, key: KeyCode, pressed: bool) {
        if let Some(key_state) = self.keyboard_inputs_new.get_mut(&key) {
            *key_state = pressed;
        }
    }

    /// Records a mouse button going down or up.
    pub fn intake_button(&mut self, button: MouseButton, pressed: bool) {
        if let Some(button_state) = self.mouse_inputs.mouse_button_inputs_new.get_mut(&button) {
            *button_state = pressed;
        }
    }

    /// Adds mouse movement to what was accumulated this frame.
    ///
    /// # Arguments
    /// * `delta` - The (x, y) delta of mouse movement since the last update
    pub fn intake_mouse_motion(&mut self, delta: (f64, f64)) {
        let (x, y) = self.mouse_inputs.mouse_delta.unwrap_or((0.0, 0.0));
        self.mouse_inputs.mouse_delta = Some((x + delta.0, y + delta.1));
    }

    /// Copies the current "is down" values over the previous ones.
    pub fn move_old_states(&mut self) {
        for (key, new_state) in self.keyboard_inputs_new.iter() {
            if let Some(old_state) = self.keyboard_inputs_old.get_mut(key) {
                *old_state = *new_state;
            }
        }

        for (button, new_state) in self.mouse_inputs.mouse_button_inputs_new.iter() {
            if let Some(old_state) = self.mouse_inputs.mouse_button_inputs_old.get_mut(button) {
                *old_state = *new_state;
            }
        }
    }

    /// Translates the raw values into a [`ProcessedInputState`].
    pub fn create_processed_input_state(&self) -> ProcessedInputState {
        let keyboard_states = self
            .keyboard_inputs_new
            .iter()
            .map(|(key, &new_state)| {
                let old_state = self.keyboard_inputs_old.get(key).copied().unwrap_or(false);
                (*key, RawInputState::from_raw_states(old_state, new_state))
            })
            .collect();

        let mouse_button_states = self
            .mouse_inputs
            .mouse_button_inputs_new
            .iter()
            .map(|(button, &new_state)| {
                let old_state = self
                    .mouse_inputs
                    .mouse_button_inputs_old
                    .get(button)
                    .copied()
                    .unwrap_or(false);
                (*button, RawInputState::from_raw_states(old_state, new_state))
            })
            .collect();

        ProcessedInputState {
            keyboard_states,
            mouse_button_states,
            mouse_delta: self.mouse_inputs.mouse_delta,
        }
    }

    /// Returns this frame's processed input and prepares for the next frame.
    pub fn get_and_reset_processed_input(&mut self) -> ProcessedInputState {
        let processed_input = self.create_processed_input_state();
        self.move_old_states();
        self.mouse_inputs.mouse_delta = None;
        processed_input
    }

    /// Releases every key and button, used when the window loses focus.
    pub fn release_all(&mut self) {
        self.keyboard_inputs_new.values_mut().for_each(|state| *state = false);
        self.mouse_inputs
            .mouse_button_inputs_new
            .values_mut()
            .for_each(|state| *state = false);
        self.mouse_inputs.mouse_delta = None;
    }
}
