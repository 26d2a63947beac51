//! # Platform Seams
//!
//! The engine talks to the operating system through these traits only: a window that
//! reports input, the graphics backend, the GUI, and the headless AI-game menu. The
//! [`GraphicalSession`] bundles the graphical ones together with the render-thread
//! state that lives exactly as long as the window does.

use std::path::PathBuf;

use winit::{dpi::PhysicalSize, event::MouseButton, keyboard::KeyCode};

use super::{
    config::EngineConfig, input_bindings::ControlBindings, input_manager::InputManager,
    input_state::ProcessedInputState,
};
use crate::{
    engine_state::{
        camera_state::CameraState,
        rendering::{
            gui::{Gui, GuiAction},
            Graphics,
        },
    },
    error::EngineError,
};

/// Everything a window reported since the previous poll.
#[derive(Clone, Debug, Default)]
pub struct FrameInput {
    /// Key changes in arrival order, `true` meaning pressed.
    pub key_events: Vec<(KeyCode, bool)>,
    /// Mouse button changes in arrival order, `true` meaning pressed.
    pub button_events: Vec<(MouseButton, bool)>,
    /// Mouse movement since the previous poll.
    pub mouse_motion: Option<(f64, f64)>,
    /// Names of the GUI elements clicked.
    pub activations: Vec<String>,
    pub close_requested: bool,
    pub focus_lost: bool,
}

/// The application window.
pub trait Window {
    fn size(&self) -> PhysicalSize<u32>;

    /// The size the window was resized to since the last call, if any.
    fn take_resize(&mut self) -> Option<PhysicalSize<u32>>;

    /// Whether the cursor is released for the GUI.
    fn is_mouse_free(&self) -> bool;

    /// Captures the cursor for camera control, or releases it.
    fn set_mouse_lock(&mut self, locked: bool);

    /// Collects pending window events.
    fn poll_input(&mut self) -> FrameInput;
}

/// Opens graphical sessions.
pub trait Platform {
    /// Opens a window with its graphics context and GUI.
    fn open_session(&mut self, config: &EngineConfig) -> Result<GraphicalSession, EngineError>;
}

/// What the user picked in the AI-game menu.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AiMenuChoice {
    /// Open the graphical menu and its level editor.
    EnterEditor,
    /// Play back the given recording.
    PlayRecording(PathBuf),
    Exit,
}

/// The headless AI-game menu.
pub trait AiMenu {
    fn choose(&mut self) -> AiMenuChoice;
}

/// Window, graphics and GUI of the running graphical mode, plus the render-thread state
/// tied to them. Dropping the session closes the window.
pub struct GraphicalSession {
    pub window: Box<dyn Window>,
    pub graphics: Box<dyn Graphics>,
    pub gui: Box<dyn Gui>,
    pub camera: CameraState,
    pub bindings: ControlBindings,
    pub input: InputManager,
}

impl GraphicalSession {
    /// Builds a session around freshly opened platform objects.
    pub fn new(
        window: Box<dyn Window>,
        graphics: Box<dyn Graphics>,
        gui: Box<dyn Gui>,
        config: &EngineConfig,
    ) -> Self {
        let mut camera = CameraState::new(config);
        let size = window.size();
        camera.projection.resize(size.width, size.height);

        Self {
            window,
            graphics,
            gui,
            camera,
            bindings: ControlBindings::new(),
            input: InputManager::default(),
        }
    }

    /// Replaces the control bindings and tracks their keys.
    pub fn set_bindings(&mut self, bindings: ControlBindings) {
        for key in bindings.keys() {
            self.input.track_key(key);
        }
        self.bindings = bindings;
    }

    /// Binds a GUI action to a key and tracks the key.
    pub fn bind_gui_key(&mut self, key: KeyCode, action: GuiAction) {
        self.input.track_key(key);
        self.gui.bind_key(key, action);
    }

    /// Polls the window and returns the processed input of this frame with the raw
    /// report it was built from.
    pub fn poll_input(&mut self) -> (ProcessedInputState, FrameInput) {
        let frame = self.window.poll_input();
        if frame.focus_lost {
            self.input.release_all();
        }
        for (key, pressed) in &frame.key_events {
            self.input.intake_key(*key, *pressed);
        }
        for (button, pressed) in &frame.button_events {
            self.input.intake_button(*button, *pressed);
        }
        if let Some(delta) = frame.mouse_motion {
            self.input.intake_mouse_motion(delta);
        }
        (self.input.get_and_reset_processed_input(), frame)
    }

    /// GUI actions triggered by bound keys and clicked elements this frame.
    pub fn gui_actions(&self, input: &ProcessedInputState, frame: &FrameInput) -> Vec<GuiAction> {
        let mut actions: Vec<GuiAction> = input
            .just_pressed_keys()
            .filter_map(|key| self.gui.key_action(key))
            .collect();
        actions.extend(frame.activations.iter().filter_map(|name| self.gui.activate(name)));
        actions
    }
}
