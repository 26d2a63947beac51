//! # Control Bindings
//!
//! Maps keyboard keys to the in-level controls of the player. A binding either fires on
//! every frame its key is down (movement) or only on the frame the key goes down
//! (toggles, playback controls).

use std::collections::HashMap;

use winit::keyboard::KeyCode;

use super::input_state::ProcessedInputState;

/// Keys selecting the block placed by the player, in block id order starting at 1.
const BLOCK_SLOT_KEYS: [KeyCode; 9] = [
    KeyCode::Digit1,
    KeyCode::Digit2,
    KeyCode::Digit3,
    KeyCode::Digit4,
    KeyCode::Digit5,
    KeyCode::Digit6,
    KeyCode::Digit7,
    KeyCode::Digit8,
    KeyCode::Digit9,
];

/// Something the player can do with a key while a level is running.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Control {
    MoveUp,
    MoveDown,
    MoveNorth,
    MoveSouth,
    MoveEast,
    MoveWest,
    ToggleComplexLighting,
    PlaybackForward,
    PlaybackPause,
    PlaybackBackward,
    ExitPlayback,
    /// Pick the block id placed by the player.
    SelectBlock(u8),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Binding {
    control: Control,
    repeat: bool,
}

/// Key to control table of the running level.
#[derive(Clone, Debug, Default)]
pub struct ControlBindings {
    bindings: HashMap<KeyCode, Binding>,
}

impl ControlBindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Movement on WASD, Space and left Shift, and complex lighting on R.
    pub fn movement() -> Self {
        let mut bindings = Self::new();
        bindings.bind(KeyCode::Space, Control::MoveUp, true);
        bindings.bind(KeyCode::ShiftLeft, Control::MoveDown, true);
        bindings.bind(KeyCode::KeyW, Control::MoveNorth, true);
        bindings.bind(KeyCode::KeyS, Control::MoveSouth, true);
        bindings.bind(KeyCode::KeyA, Control::MoveEast, true);
        bindings.bind(KeyCode::KeyD, Control::MoveWest, true);
        bindings.bind(KeyCode::KeyR, Control::ToggleComplexLighting, false);
        bindings
    }

    /// Adds the playback controls on the arrow keys and X.
    pub fn bind_playback(&mut self) {
        self.bind(KeyCode::ArrowRight, Control::PlaybackForward, false);
        self.bind(KeyCode::ArrowDown, Control::PlaybackPause, false);
        self.bind(KeyCode::ArrowLeft, Control::PlaybackBackward, false);
        self.bind(KeyCode::KeyX, Control::ExitPlayback, false);
    }

    /// Adds block selection on the digit keys.
    pub fn bind_block_slots(&mut self) {
        for (slot, key) in BLOCK_SLOT_KEYS.into_iter().enumerate() {
            self.bind(key, Control::SelectBlock(slot as u8 + 1), false);
        }
    }

    /// Binds `key` to `control`, replacing any previous binding of the key.
    ///
    /// # Arguments
    /// * `key` - The key triggering the control
    /// * `control` - The control to trigger
    /// * `repeat` - Fire on every frame the key is down instead of only when it goes down
    pub fn bind(&mut self, key: KeyCode, control: Control, repeat: bool) {
        self.bindings.insert(key, Binding { control, repeat });
    }

    pub fn unbind(&mut self, key: KeyCode) {
        self.bindings.remove(&key);
    }

    /// Every bound key.
    pub fn keys(&self) -> impl Iterator<Item = KeyCode> + '_ {
        self.bindings.keys().copied()
    }

    /// The controls triggered by one frame of input.
    pub fn controls(&self, input: &ProcessedInputState) -> Vec<Control> {
        self.bindings
            .iter()
            .filter(|(key, binding)| {
                let state = input.get_key_state(**key);
                if binding.repeat {
                    state.is_active()
                } else {
                    state.is_just_pressed()
                }
            })
            .map(|(_, binding)| binding.control)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application_state::input_state::RawInputState;

    fn frame(states: &[(KeyCode, RawInputState)]) -> ProcessedInputState {
        ProcessedInputState {
            keyboard_states: states.iter().copied().collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_repeat_bindings_fire_while_held() {
        let bindings = ControlBindings::movement();
        let controls = bindings.controls(&frame(&[
            (KeyCode::KeyW, RawInputState::Held),
            (KeyCode::KeyR, RawInputState::Held),
        ]));
        assert_eq!(controls, vec![Control::MoveNorth]);
    }

    #[test]
    fn test_single_shot_bindings_fire_once() {
        let mut bindings = ControlBindings::movement();
        bindings.bind_playback();
        let controls = bindings.controls(&frame(&[(KeyCode::ArrowLeft, RawInputState::Pressed)]));
        assert_eq!(controls, vec![Control::PlaybackBackward]);
    }

    #[test]
    fn test_block_slots_start_at_one() {
        let mut bindings = ControlBindings::new();
        bindings.bind_block_slots();
        let controls = bindings.controls(&frame(&[(KeyCode::Digit3, RawInputState::Pressed)]));
        assert_eq!(controls, vec![Control::SelectBlock(3)]);
        assert_eq!(bindings.keys().count(), 9);
    }
}
