//! # Level Session
//!
//! Loading a level starts its workers in a fixed order:
//!
//! 1. the terrain worker, then a blocking wait for its first snapshot
//! 2. the tick worker, with record playback registered when a recording is played
//! 3. the input worker, for editable levels only
//!
//! The resulting [`LevelSession`] owns the render-thread side of the level. The worker
//! threads themselves belong to the engine's [`WorkerSet`] and are stopped there before
//! the session is dropped.

use std::sync::mpsc::{channel, Sender};

use log::info;
use winit::keyboard::KeyCode;

use super::{
    entities::{
        recording::{Playback, Recording, PLAYBACK_TICK_NAME},
        EntityCommand, TickRegistry,
    },
    frame::{
        FrameCoordinator, FrameOutcome, FrameSources, LevelKind, TimeStep, BLOCK_PREVIEW,
        LEVEL_MENU, LEVEL_MENU_EXIT, PAUSE_ICON,
    },
    rendering::gui::GuiAction,
    voxels::world::TerrainSnapshot,
    workers::{InputWorker, Selection, TerrainSource, TerrainWorker, TickWorker},
};
use crate::{
    application_state::{
        config::EngineConfig, input_bindings::ControlBindings, platform::GraphicalSession,
    },
    core::{DoubleBuffer, MtResource, WorkerSet, WorkerSlot},
    error::EngineError,
};

/// Render-thread state of a running level.
pub struct LevelSession {
    frame: FrameCoordinator,
    entity_commands: Sender<EntityCommand>,
}

impl LevelSession {
    /// Starts the workers of a level and waits until its terrain is ready.
    ///
    /// # Arguments
    /// * `kind` - Editable level or record playback
    /// * `terrain` - Where the terrain comes from
    /// * `recording` - The recording to play back; required for record playback
    /// * `config` - Engine settings
    /// * `workers` - The worker set the threads are started in; every slot must be runnable
    /// * `session` - The graphical session the level is shown in
    ///
    /// # Returns
    /// The running level, or the first error met. Workers started before the error keep
    /// running until the worker set stops them.
    pub fn start(
        kind: LevelKind,
        terrain: &TerrainSource,
        recording: Option<Recording>,
        config: &EngineConfig,
        workers: &mut WorkerSet,
        session: &mut GraphicalSession,
    ) -> Result<Self, EngineError> {
        let mut registry = TickRegistry::new();
        let playback = match (kind, recording) {
            (LevelKind::Edit, _) => None,
            (LevelKind::Record, None) => return Err(EngineError::MissingRecording),
            (LevelKind::Record, Some(recording)) => {
                info!("Playing back {} recorded frames", recording.frames.len());
                let (controls, receiver) = channel();
                registry.add(
                    PLAYBACK_TICK_NAME,
                    Playback::new(recording, receiver).into_tick_function(),
                );
                Some(controls)
            }
        };

        let pose = MtResource::new(session.camera.pose());
        let time_step = TimeStep::default();

        let (terrain_publisher, mut terrain_reader) =
            DoubleBuffer::channel(TerrainSnapshot::default(), TerrainSnapshot::default());
        let (block_commands, block_receiver) = channel();
        let signal = terrain_publisher.stop_signal();
        let worker = TerrainWorker::new(
            terrain_publisher,
            terrain,
            pose.clone(),
            block_receiver,
            config,
        );
        workers.spawn(WorkerSlot::Terrain, signal, move || worker.run())?;
        terrain_reader.wait_until_first_ready()?;
        terrain_reader.consume();
        info!(
            "Terrain ready with {} chunks",
            terrain_reader.current().blocks.len()
        );

        let (entity_publisher, entity_reader) = DoubleBuffer::channel(Vec::new(), Vec::new());
        let (entity_commands, entity_receiver) = channel();
        let signal = entity_publisher.stop_signal();
        let worker = TickWorker::new(
            entity_publisher,
            registry,
            entity_receiver,
            time_step.clone(),
            config,
        );
        workers.spawn(WorkerSlot::Tick, signal, move || worker.run())?;

        let selection = match kind {
            LevelKind::Edit => {
                let (publisher, reader) =
                    DoubleBuffer::channel(Selection::default(), Selection::default());
                let signal = publisher.stop_signal();
                let worker =
                    InputWorker::new(publisher, terrain_reader.clone(), pose.clone(), config);
                workers.spawn(WorkerSlot::Input, signal, move || worker.run())?;
                Some(reader)
            }
            LevelKind::Record => None,
        };

        register_level_gui(kind, session);

        let frame = FrameCoordinator::new(
            kind,
            FrameSources {
                terrain: terrain_reader,
                entities: entity_reader,
                selection,
                pose,
                time_step,
                block_commands,
                playback,
            },
        );

        Ok(Self {
            frame,
            entity_commands,
        })
    }

    pub fn kind(&self) -> LevelKind {
        self.frame.kind()
    }

    pub fn frame(&self) -> &FrameCoordinator {
        &self.frame
    }

    /// Runs one render iteration of the level.
    pub fn run_frame(&mut self, session: &mut GraphicalSession) -> FrameOutcome {
        self.frame.run_frame(session)
    }

    /// Sends an entity command to the tick worker.
    ///
    /// # Returns
    /// `false` if the tick worker is gone
    pub fn send_entity_command(&self, command: EntityCommand) -> bool {
        self.entity_commands.send(command).is_ok()
    }
}

fn register_level_gui(kind: LevelKind, session: &mut GraphicalSession) {
    session.gui.add_box(LEVEL_MENU, None, false);
    session
        .gui
        .add_button(LEVEL_MENU_EXIT, Some(LEVEL_MENU), GuiAction::Exit, true);
    session.bind_gui_key(KeyCode::KeyE, GuiAction::ToggleLevelMenu);

    let mut bindings = ControlBindings::movement();
    match kind {
        LevelKind::Edit => {
            session.gui.add_box(BLOCK_PREVIEW, None, true);
            bindings.bind_block_slots();
        }
        LevelKind::Record => {
            session.gui.add_box(PAUSE_ICON, None, false);
            bindings.bind_playback();
        }
    }
    session.set_bindings(bindings);
    session.window.set_mouse_lock(true);
}

/// Removes everything a level added to the graphical session.
pub fn release_level_gui(session: &mut GraphicalSession) {
    for name in [LEVEL_MENU, BLOCK_PREVIEW, PAUSE_ICON] {
        session.gui.remove(name);
    }
    session.set_bindings(ControlBindings::new());
    session.window.set_mouse_lock(false);
}
