//! # Application State Management
//!
//! This module owns the engine as a whole:
//! - The current [`EngineMode`](mode::EngineMode) and its transition table
//! - The graphical session (window, graphics, GUI) and its lifecycle
//! - The running level and the worker threads behind it
//! - The main loop driving menus and levels
//!
//! ## Key Components
//! - `EngineContext`: the single owner of all engine state, created once and shut down
//!   explicitly
//! - `Subsystems`: what the mode transitions act upon; implements
//!   [`ModeEffects`](mode::ModeEffects)

pub mod command_line;
pub mod config;
pub mod headless;
pub mod input_bindings;
pub mod input_manager;
pub mod input_state;
pub mod mode;
pub mod platform;

use std::path::PathBuf;

use log::{info, warn};

use config::EngineConfig;
use mode::{Effect, EngineMode, ModeController, ModeEffects};
use platform::{AiMenu, AiMenuChoice, GraphicalSession, Platform};

use crate::{
    core::WorkerSet,
    engine_state::{
        entities::recording::Recording,
        frame::LevelKind,
        level::{release_level_gui, LevelSession},
        rendering::{
            gui::{Gui, GuiAction},
            RenderMode,
        },
        workers::TerrainSource,
    },
    error::EngineError,
};

/// Main menu box.
pub const MAIN_MENU: &str = "mainMenu";
/// Main menu button starting a new level.
pub const NEW_LEVEL_BUTTON: &str = "newLevel";
/// Main menu button showing the load menu.
pub const LOAD_MENU_BUTTON: &str = "loadMenuButton";
/// Main menu button going back to the AI-game menu.
pub const EXIT_BUTTON: &str = "exitButton";
/// Box listing the save slots.
pub const LOAD_MENU: &str = "loadMenu";
/// Number of slots offered by the load menu.
pub const SAVE_SLOTS: u8 = 5;

/// Name of the load menu button for `slot`.
pub fn load_slot_button(slot: u8) -> String {
    format!("loadSlot{}", slot)
}

fn register_main_menu(gui: &mut dyn Gui) {
    gui.add_box(MAIN_MENU, None, true);
    gui.add_button(NEW_LEVEL_BUTTON, Some(MAIN_MENU), GuiAction::NewLevel, true);
    gui.add_button(LOAD_MENU_BUTTON, Some(MAIN_MENU), GuiAction::ToggleLoadMenu, true);
    gui.add_button(EXIT_BUTTON, Some(MAIN_MENU), GuiAction::Exit, true);
    gui.add_box(LOAD_MENU, Some(MAIN_MENU), false);
    for slot in 1..=SAVE_SLOTS {
        gui.add_button(
            &load_slot_button(slot),
            Some(LOAD_MENU),
            GuiAction::LoadSlot(slot),
            true,
        );
    }
}

/// Everything the mode transitions act upon.
pub struct Subsystems {
    config: EngineConfig,
    platform: Box<dyn Platform>,
    ai_mode: bool,
    graphics: Option<GraphicalSession>,
    level: Option<LevelSession>,
    workers: WorkerSet,
    terrain_source: Option<TerrainSource>,
    recording: Option<PathBuf>,
    frames_rendered: u64,
}

impl Subsystems {
    fn new(config: EngineConfig, platform: Box<dyn Platform>) -> Self {
        Self {
            config,
            platform,
            ai_mode: true,
            graphics: None,
            level: None,
            workers: WorkerSet::new(),
            terrain_source: None,
            recording: None,
            frames_rendered: 0,
        }
    }

    fn init_graphics(&mut self) -> Result<(), EngineError> {
        if self.graphics.is_some() {
            return Err(EngineError::AlreadyInitialised("graphical mode"));
        }
        if self.ai_mode {
            return Err(EngineError::GraphicsInAiMode);
        }

        let mut session = self.platform.open_session(&self.config)?;
        register_main_menu(session.gui.as_mut());
        info!("Graphical mode initialised");
        self.graphics = Some(session);
        Ok(())
    }

    fn release_graphics(&mut self) {
        if self.graphics.take().is_some() {
            info!("Graphical mode released");
        }
    }

    fn release_level(&mut self) {
        if self.level.take().is_some() {
            info!("Level released");
        }
        if let Some(session) = self.graphics.as_mut() {
            release_level_gui(session);
        }
    }

    fn start_level(&mut self, kind: LevelKind) -> Result<(), EngineError> {
        if self.level.is_some() {
            return Err(EngineError::AlreadyInitialised("level"));
        }
        let session = self.graphics.as_mut().ok_or(EngineError::GraphicsUnavailable)?;

        let (terrain, recording) = match kind {
            LevelKind::Edit => (
                self.terrain_source
                    .clone()
                    .ok_or(EngineError::MissingTerrainSource)?,
                None,
            ),
            LevelKind::Record => {
                let path = self
                    .recording
                    .clone()
                    .or_else(|| self.config.record_file.clone())
                    .ok_or(EngineError::MissingRecording)?;
                let recording = Recording::load(&path)?;
                (TerrainSource::from_config(&self.config)?, Some(recording))
            }
        };

        let level = LevelSession::start(
            kind,
            &terrain,
            recording,
            &self.config,
            &mut self.workers,
            session,
        )?;
        self.level = Some(level);
        Ok(())
    }

    /// Draws the menu and turns its GUI actions into a mode request.
    fn menu_frame(&mut self) -> Result<Option<EngineMode>, EngineError> {
        let session = self.graphics.as_mut().ok_or(EngineError::GraphicsUnavailable)?;

        if let Some(size) = session.window.take_resize() {
            session.camera.projection.resize(size.width, size.height);
            session.graphics.resize(size);
        }
        let graphics = session.graphics.as_mut();
        graphics.clear();
        graphics.set_render_mode(RenderMode::Overlay);
        graphics.set_depth_test(false);
        session.gui.draw(graphics);
        graphics.set_depth_test(true);
        graphics.present();
        self.frames_rendered += 1;

        let (input, frame) = session.poll_input();
        if frame.close_requested {
            return Ok(Some(EngineMode::Exit));
        }

        let mut request = None;
        for action in session.gui_actions(&input, &frame) {
            match action {
                GuiAction::NewLevel => {
                    self.terrain_source = Some(TerrainSource::from_config(&self.config)?);
                    request = Some(EngineMode::InitLevel);
                }
                GuiAction::LoadSlot(slot) => {
                    self.terrain_source = Some(TerrainSource::Finite(self.config.slot_path(slot)));
                    request = Some(EngineMode::InitLevel);
                }
                GuiAction::ToggleLoadMenu => {
                    let visible = session.gui.is_visible(LOAD_MENU);
                    session.gui.set_visible(LOAD_MENU, !visible);
                }
                GuiAction::Exit => request = Some(EngineMode::AiMenu),
                GuiAction::ToggleLevelMenu => {}
            }
        }
        Ok(request)
    }

    /// Runs one frame of the running level.
    fn level_frame(&mut self) -> Result<Option<EngineMode>, EngineError> {
        let session = self.graphics.as_mut().ok_or(EngineError::GraphicsUnavailable)?;
        let level = self.level.as_mut().ok_or(EngineError::LevelUnavailable)?;
        let outcome = level.run_frame(session);
        self.frames_rendered += 1;
        Ok(outcome.requested_mode)
    }
}

impl ModeEffects for Subsystems {
    fn apply(
        &mut self,
        effect: Effect,
        from: EngineMode,
        _to: EngineMode,
    ) -> Result<(), EngineError> {
        match effect {
            Effect::SetAiMode(enabled) => {
                if enabled != self.ai_mode {
                    if !from.allows_ai_toggle() {
                        return Err(EngineError::AiModeLocked(from));
                    }
                    self.ai_mode = enabled;
                    info!("AI mode {}", if enabled { "enabled" } else { "disabled" });
                }
            }
            Effect::InitGraphics => self.init_graphics()?,
            Effect::ReleaseGraphics => self.release_graphics(),
            Effect::MarkWorkersRunnable => self.workers.mark_all_runnable(),
            Effect::StopWorkers => self.workers.stop_all(),
            Effect::ReleaseLevel => self.release_level(),
            Effect::ClearTerrainSource => {
                self.terrain_source = None;
                self.recording = None;
            }
            Effect::Shutdown => {
                self.workers.stop_all();
                self.release_level();
                self.release_graphics();
            }
        }
        Ok(())
    }

    fn entered(&mut self, mode: EngineMode) {
        let Some(session) = self.graphics.as_mut() else {
            return;
        };
        match mode {
            EngineMode::GraphicalMenu => {
                session.gui.set_visible(MAIN_MENU, true);
                session.gui.set_visible(LOAD_MENU, false);
            }
            EngineMode::InitLevel | EngineMode::InitRecord => {
                session.gui.set_visible(MAIN_MENU, false);
            }
            _ => {}
        }
    }
}

/// The single owner of all engine state.
///
/// # Examples
///
/// ```
/// use voxel_frame_engine::application_state::{
///     config::EngineConfig,
///     headless::{HeadlessPlatform, ScriptedAiMenu},
///     mode::EngineMode,
///     EngineContext,
/// };
///
/// let mut context = EngineContext::create(
///     EngineConfig::default(),
///     Box::new(HeadlessPlatform::new()),
///     Box::new(ScriptedAiMenu::default()),
/// );
/// context.transition(EngineMode::GraphicalMenu).unwrap();
/// assert!(context.has_graphics());
/// context.shutdown().unwrap();
/// assert_eq!(context.mode(), EngineMode::Exit);
/// ```
pub struct EngineContext {
    controller: ModeController,
    subsystems: Subsystems,
    ai_menu: Box<dyn AiMenu>,
}

impl EngineContext {
    /// Creates the engine in [`EngineMode::AiMenu`] with AI mode on.
    ///
    /// # Arguments
    /// * `config` - Engine settings
    /// * `platform` - Opens windows when graphical mode is initialised
    /// * `ai_menu` - The AI-game menu consulted in [`EngineMode::AiMenu`]
    pub fn create(
        config: EngineConfig,
        platform: Box<dyn Platform>,
        ai_menu: Box<dyn AiMenu>,
    ) -> Self {
        info!("Engine context created");
        Self {
            controller: ModeController::new(),
            subsystems: Subsystems::new(config, platform),
            ai_menu,
        }
    }

    pub fn mode(&self) -> EngineMode {
        self.controller.mode()
    }

    /// Requests a mode change, running every side effect on the way.
    pub fn transition(&mut self, to: EngineMode) -> Result<(), EngineError> {
        self.controller.transition(to, &mut self.subsystems)
    }

    /// Turns AI mode on or off outside of a transition.
    pub fn set_ai_mode(&mut self, enabled: bool) -> Result<(), EngineError> {
        let mode = self.mode();
        self.subsystems
            .apply(Effect::SetAiMode(enabled), mode, mode)
    }

    /// Picks the terrain of the next editable level.
    pub fn select_terrain(&mut self, source: TerrainSource) {
        self.subsystems.terrain_source = Some(source);
    }

    /// Picks the recording of the next playback.
    pub fn select_recording(&mut self, path: PathBuf) {
        self.subsystems.recording = Some(path);
    }

    /// Loads the level of the current init mode and enters its running mode.
    ///
    /// # Returns
    /// `NotALevelMode` outside of [`EngineMode::InitLevel`] and [`EngineMode::InitRecord`],
    /// or the first error met while starting the level
    pub fn enter_level(&mut self) -> Result<(), EngineError> {
        let kind = LevelKind::for_init_mode(self.mode())?;
        self.subsystems.start_level(kind)?;
        self.transition(kind.running_mode())
    }

    /// Runs one iteration of the main loop for the current mode.
    pub fn step(&mut self) -> Result<(), EngineError> {
        match self.mode() {
            EngineMode::AiMenu => match self.ai_menu.choose() {
                AiMenuChoice::EnterEditor => self.transition(EngineMode::GraphicalMenu),
                AiMenuChoice::PlayRecording(path) => {
                    self.select_recording(path);
                    self.transition(EngineMode::InitRecord)
                }
                AiMenuChoice::Exit => self.transition(EngineMode::Exit),
            },
            EngineMode::GraphicalMenu => match self.subsystems.menu_frame()? {
                Some(mode) => self.transition(mode),
                None => Ok(()),
            },
            EngineMode::InitLevel | EngineMode::InitRecord => self.enter_level(),
            EngineMode::EditLevel | EngineMode::PlayingRecord => {
                match self.subsystems.level_frame()? {
                    Some(mode) => self.transition(mode),
                    None => Ok(()),
                }
            }
            EngineMode::ExitLevel => self.transition(EngineMode::GraphicalMenu),
            EngineMode::ExitRecord => self.transition(EngineMode::AiMenu),
            EngineMode::Exit => Ok(()),
        }
    }

    /// Runs the main loop until [`EngineMode::Exit`].
    ///
    /// # Arguments
    /// * `frame_limit` - Shut down after this many rendered frames
    pub fn run(&mut self, frame_limit: Option<u64>) -> Result<(), EngineError> {
        while self.mode() != EngineMode::Exit {
            if frame_limit.is_some_and(|limit| self.subsystems.frames_rendered >= limit) {
                info!("Frame limit reached after {} frames", self.subsystems.frames_rendered);
                return self.shutdown();
            }
            self.step()?;
        }
        Ok(())
    }

    /// Leaves whatever mode the engine is in for [`EngineMode::Exit`].
    pub fn shutdown(&mut self) -> Result<(), EngineError> {
        if self.mode() == EngineMode::Exit {
            return Ok(());
        }
        self.transition(EngineMode::Exit)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.subsystems.config
    }

    pub fn workers(&self) -> &WorkerSet {
        &self.subsystems.workers
    }

    pub fn level(&self) -> Option<&LevelSession> {
        self.subsystems.level.as_ref()
    }

    pub fn has_level(&self) -> bool {
        self.subsystems.level.is_some()
    }

    pub fn graphics(&self) -> Option<&GraphicalSession> {
        self.subsystems.graphics.as_ref()
    }

    pub fn has_graphics(&self) -> bool {
        self.subsystems.graphics.is_some()
    }

    pub fn ai_mode(&self) -> bool {
        self.subsystems.ai_mode
    }

    pub fn terrain_source(&self) -> Option<&TerrainSource> {
        self.subsystems.terrain_source.as_ref()
    }

    /// Frames rendered so far, menus included.
    pub fn frames_rendered(&self) -> u64 {
        self.subsystems.frames_rendered
    }
}

impl Drop for EngineContext {
    fn drop(&mut self) {
        if self.mode() != EngineMode::Exit {
            warn!("Engine context dropped in {:?}", self.mode());
            self.subsystems.workers.stop_all();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        application_state::headless::{HeadlessPlatform, ScriptedAiMenu},
        error::ErrorKind,
    };

    fn context() -> EngineContext {
        EngineContext::create(
            EngineConfig {
                render_distance: 0,
                ..EngineConfig::default()
            },
            Box::new(HeadlessPlatform::new()),
            Box::new(ScriptedAiMenu::default()),
        )
    }

    #[test]
    fn test_graphics_cannot_initialise_twice() {
        let mut context = context();
        context.transition(EngineMode::GraphicalMenu).unwrap();
        let error = context.subsystems.init_graphics().unwrap_err();
        assert!(matches!(error, EngineError::AlreadyInitialised(_)));
        assert_eq!(error.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_graphics_refused_in_ai_mode() {
        let mut context = context();
        let error = context
            .subsystems
            .apply(Effect::InitGraphics, EngineMode::AiMenu, EngineMode::GraphicalMenu)
            .unwrap_err();
        assert!(matches!(error, EngineError::GraphicsInAiMode));
    }

    #[test]
    fn test_ai_mode_locked_in_level() {
        let mut context = context();
        context.transition(EngineMode::GraphicalMenu).unwrap();
        context.select_terrain(TerrainSource::Infinite { seed: 3 });
        context.transition(EngineMode::InitLevel).unwrap();
        context.enter_level().unwrap();

        let error = context.set_ai_mode(true).unwrap_err();
        assert!(matches!(error, EngineError::AiModeLocked(EngineMode::EditLevel)));
        context.shutdown().unwrap();
    }

    #[test]
    fn test_enter_level_outside_init_mode() {
        let mut context = context();
        assert!(matches!(
            context.enter_level(),
            Err(EngineError::NotALevelMode(EngineMode::AiMenu))
        ));
    }

    #[test]
    fn test_main_menu_is_registered_with_graphics() {
        let mut context = context();
        context.transition(EngineMode::GraphicalMenu).unwrap();
        let gui = &context.graphics().unwrap().gui;
        assert!(gui.is_visible(NEW_LEVEL_BUTTON));
        assert!(!gui.is_visible(&load_slot_button(1)));
    }
}
