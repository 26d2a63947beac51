//! # Frame Coordinator
//!
//! Everything the render thread does once per frame while a level runs:
//!
//! 1. apply a pending window resize
//! 2. move the camera, hand the view-projection to the graphics backend and publish
//!    the player pose for the workers
//! 3. try to capture fresh terrain, entity and selection snapshots
//! 4. draw every non-empty chunk and entity batch plus the selection outline
//! 5. draw the GUI overlay with depth testing off, then present
//! 6. poll input and turn it into camera movement, block edits, playback controls and
//!    mode requests
//!
//! The coordinator never blocks on a worker. A snapshot that could not be captured this
//! frame is simply the previous one drawn again.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    mpsc::Sender,
    Arc,
};

use log::{debug, info};
use web_time::{Duration, Instant};
use winit::event::MouseButton;

use super::{
    camera_state::PlayerPose,
    entities::{recording::PlaybackControl, EntityBatchList},
    rendering::{gui::GuiAction, mesher, Graphics, RenderMode},
    voxels::{block::block_type::BlockType, raycast::BlockHit, world::TerrainSnapshot},
    workers::{Selection, TerrainCommand},
    PlayerAction,
};
use crate::{
    application_state::{input_bindings::Control, mode::EngineMode, platform::GraphicalSession},
    core::{MtResource, SnapshotReader},
    error::EngineError,
};

/// GUI box shown while the in-level menu is open.
pub const LEVEL_MENU: &str = "levelMenu";
/// Button of the in-level menu leaving the level.
pub const LEVEL_MENU_EXIT: &str = "levelMenuExit";
/// GUI box shown while playback is paused.
pub const PAUSE_ICON: &str = "pauseIcon";
/// GUI box previewing the block the player places.
pub const BLOCK_PREVIEW: &str = "blockPreview";

/// Seconds between the last two render iterations, shared with the tick worker.
#[derive(Clone, Debug, Default)]
pub struct TimeStep(Arc<AtomicU64>);

impl TimeStep {
    pub fn set(&self, seconds: f64) {
        self.0.store(seconds.to_bits(), Ordering::Relaxed);
    }

    pub fn get(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Relaxed))
    }
}

/// Which kind of level is running.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LevelKind {
    /// An editable level.
    Edit,
    /// Playback of a recorded game.
    Record,
}

impl LevelKind {
    /// The level kind loaded by an init mode.
    pub fn for_init_mode(mode: EngineMode) -> Result<Self, EngineError> {
        match mode {
            EngineMode::InitLevel => Ok(LevelKind::Edit),
            EngineMode::InitRecord => Ok(LevelKind::Record),
            other => Err(EngineError::NotALevelMode(other)),
        }
    }

    /// The mode the level runs in once loaded.
    pub fn running_mode(self) -> EngineMode {
        match self {
            LevelKind::Edit => EngineMode::EditLevel,
            LevelKind::Record => EngineMode::PlayingRecord,
        }
    }

    /// The mode requested when the player leaves the level.
    pub fn exit_mode(self) -> EngineMode {
        match self {
            LevelKind::Edit => EngineMode::ExitLevel,
            LevelKind::Record => EngineMode::ExitRecord,
        }
    }
}

/// What a frame asks of the engine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameOutcome {
    pub requested_mode: Option<EngineMode>,
}

/// The reader ends and command channels the coordinator works with.
pub struct FrameSources {
    pub terrain: SnapshotReader<TerrainSnapshot>,
    pub entities: SnapshotReader<EntityBatchList>,
    /// Absent when no input worker runs.
    pub selection: Option<SnapshotReader<Selection>>,
    pub pose: MtResource<PlayerPose>,
    pub time_step: TimeStep,
    pub block_commands: Sender<TerrainCommand>,
    /// Present during record playback.
    pub playback: Option<Sender<PlaybackControl>>,
}

/// Draw statistics, logged and reset once per second.
#[derive(Clone, Debug)]
pub struct FrameStats {
    window_start: Instant,
    pub frames: u32,
    pub chunk_draws: u32,
    pub batch_draws: u32,
    pub vertices: usize,
    /// Frames that redrew the terrain captured by an earlier frame.
    pub stale_frames: u32,
}

impl FrameStats {
    fn new(now: Instant) -> Self {
        Self {
            window_start: now,
            frames: 0,
            chunk_draws: 0,
            batch_draws: 0,
            vertices: 0,
            stale_frames: 0,
        }
    }

    fn end_frame(&mut self, now: Instant) {
        self.frames += 1;
        if now.duration_since(self.window_start) >= Duration::from_secs(1) {
            debug!(
                "{} frames, {} chunk draws, {} batch draws, {} vertices, {} stale",
                self.frames, self.chunk_draws, self.batch_draws, self.vertices, self.stale_frames
            );
            *self = Self::new(now);
        }
    }
}

/// The render-thread half of a running level.
pub struct FrameCoordinator {
    kind: LevelKind,
    terrain: SnapshotReader<TerrainSnapshot>,
    entities: SnapshotReader<EntityBatchList>,
    selection: Option<SnapshotReader<Selection>>,
    pose: MtResource<PlayerPose>,
    time_step: TimeStep,
    block_commands: Sender<TerrainCommand>,
    playback: Option<Sender<PlaybackControl>>,
    last_frame: Instant,
    stats: FrameStats,
    frames: u64,
    complex_lighting: bool,
    selected_block: BlockType,
}

impl FrameCoordinator {
    pub fn new(kind: LevelKind, sources: FrameSources) -> Self {
        let now = Instant::now();
        Self {
            kind,
            terrain: sources.terrain,
            entities: sources.entities,
            selection: sources.selection,
            pose: sources.pose,
            time_step: sources.time_step,
            block_commands: sources.block_commands,
            playback: sources.playback,
            last_frame: now,
            stats: FrameStats::new(now),
            frames: 0,
            complex_lighting: false,
            selected_block: BlockType::DIRT,
        }
    }

    pub fn kind(&self) -> LevelKind {
        self.kind
    }

    /// Number of frames run so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn stats(&self) -> &FrameStats {
        &self.stats
    }

    pub fn complex_lighting(&self) -> bool {
        self.complex_lighting
    }

    pub fn selected_block(&self) -> BlockType {
        self.selected_block
    }

    /// The terrain drawn by the last frame.
    pub fn terrain(&self) -> &TerrainSnapshot {
        self.terrain.current()
    }

    /// Runs one render iteration.
    ///
    /// # Arguments
    /// * `session` - The graphical session owning the window and graphics context
    ///
    /// # Returns
    /// The mode change the player asked for during this frame, if any
    pub fn run_frame(&mut self, session: &mut GraphicalSession) -> FrameOutcome {
        let now = Instant::now();
        let dt = now.duration_since(self.last_frame);
        self.last_frame = now;
        self.time_step.set(dt.as_secs_f64());

        if let Some(size) = session.window.take_resize() {
            session.camera.projection.resize(size.width, size.height);
            session.graphics.resize(size);
        }

        if !session.window.is_mouse_free() {
            session.camera.update(dt);
        }
        session
            .graphics
            .set_view_projection(session.camera.view_projection().into());
        if let Some(mut pose) = self.pose.try_get_mut() {
            *pose = session.camera.pose();
        }

        if !self.terrain.try_consume() {
            self.stats.stale_frames += 1;
        }
        self.entities.try_consume();
        if let Some(selection) = &mut self.selection {
            selection.try_consume();
        }

        let graphics = session.graphics.as_mut();
        graphics.clear();
        graphics.set_complex_lighting(self.complex_lighting);
        self.draw_world(graphics);

        graphics.set_render_mode(RenderMode::Overlay);
        graphics.set_depth_test(false);
        session.gui.draw(graphics);
        graphics.set_depth_test(true);
        graphics.present();

        self.frames += 1;
        self.stats.end_frame(now);
        self.handle_input(session)
    }

    fn draw_world(&mut self, graphics: &mut dyn Graphics) {
        graphics.set_render_mode(RenderMode::Terrain);
        for mesh in self.terrain.current().drawable.values() {
            if mesh.is_empty() {
                continue;
            }
            graphics.upload_static(mesh);
            graphics.draw(mesh.len());
            self.stats.chunk_draws += 1;
            self.stats.vertices += mesh.len();
        }

        graphics.set_render_mode(RenderMode::Entities);
        for batch in self.entities.current().iter() {
            if batch.is_empty() {
                continue;
            }
            graphics.upload_static(batch);
            graphics.draw(batch.len());
            self.stats.batch_draws += 1;
            self.stats.vertices += batch.len();
        }

        if let Some(hit) = self.selected_hit() {
            graphics.set_render_mode(RenderMode::Highlight);
            let outline = mesher::block_outline(hit.block);
            graphics.upload_static(&outline);
            graphics.draw(outline.len());
        }
    }

    fn selected_hit(&self) -> Option<BlockHit> {
        self.selection.as_ref().and_then(|selection| selection.current().hit)
    }

    fn handle_input(&mut self, session: &mut GraphicalSession) -> FrameOutcome {
        let (input, frame) = session.poll_input();
        let mut outcome = FrameOutcome::default();
        if frame.close_requested {
            outcome.requested_mode = Some(EngineMode::Exit);
        }

        let mut actions = PlayerAction::default();
        for control in session.bindings.controls(&input) {
            match control {
                Control::MoveUp => actions.move_up = true,
                Control::MoveDown => actions.move_down = true,
                Control::MoveNorth => actions.move_forward = true,
                Control::MoveSouth => actions.move_backward = true,
                Control::MoveEast => actions.move_left = true,
                Control::MoveWest => actions.move_right = true,
                Control::ToggleComplexLighting => {
                    self.complex_lighting = !self.complex_lighting;
                    info!("Complex lighting {}", if self.complex_lighting { "on" } else { "off" });
                }
                Control::PlaybackForward => self.send_playback(session, PlaybackControl::Forward),
                Control::PlaybackPause => self.send_playback(session, PlaybackControl::Pause),
                Control::PlaybackBackward => self.send_playback(session, PlaybackControl::Backward),
                Control::ExitPlayback => {
                    if self.kind == LevelKind::Record {
                        outcome.requested_mode.get_or_insert(EngineMode::ExitRecord);
                    }
                }
                Control::SelectBlock(id) => {
                    if let Some(block) = BlockType::from_id(id).filter(|block| block.is_solid()) {
                        self.selected_block = block;
                    }
                }
            }
        }

        let mouse_locked = !session.window.is_mouse_free();
        if mouse_locked {
            actions.rotate_view = input.get_mouse_delta();
            session.camera.intake_actions(&actions);
        }

        for action in session.gui_actions(&input, &frame) {
            match action {
                GuiAction::ToggleLevelMenu => {
                    let open = !session.gui.is_visible(LEVEL_MENU);
                    session.gui.set_visible(LEVEL_MENU, open);
                    session.window.set_mouse_lock(!open);
                }
                GuiAction::Exit => {
                    outcome.requested_mode.get_or_insert(self.kind.exit_mode());
                }
                GuiAction::NewLevel | GuiAction::ToggleLoadMenu | GuiAction::LoadSlot(_) => {}
            }
        }

        if self.kind == LevelKind::Edit && mouse_locked {
            if let Some(hit) = self.selected_hit() {
                let command = if input.get_mouse_button_state(MouseButton::Left).is_just_pressed() {
                    Some(TerrainCommand::SetBlock {
                        position: hit.block,
                        block: BlockType::AIR,
                    })
                } else if input.get_mouse_button_state(MouseButton::Right).is_just_pressed() {
                    Some(TerrainCommand::SetBlock {
                        position: hit.adjacent(),
                        block: self.selected_block,
                    })
                } else {
                    None
                };
                if let Some(command) = command {
                    if self.block_commands.send(command).is_err() {
                        debug!("Terrain worker gone, dropping block edit");
                    }
                }
            }
        }

        outcome
    }

    fn send_playback(&self, session: &mut GraphicalSession, control: PlaybackControl) {
        let Some(playback) = &self.playback else {
            return;
        };
        if playback.send(control).is_err() {
            debug!("Playback worker gone, dropping {:?}", control);
        }
        session
            .gui
            .set_visible(PAUSE_ICON, control == PlaybackControl::Pause);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        application_state::{
            config::EngineConfig,
            headless::HeadlessPlatform,
            platform::{FrameInput, Platform},
        },
        core::DoubleBuffer,
        engine_state::rendering::vertex::Vertex,
    };
    use cgmath::Point3;
    use std::sync::mpsc::channel;
    use winit::keyboard::KeyCode;

    struct Fixture {
        coordinator: FrameCoordinator,
        session: GraphicalSession,
        terrain: crate::core::Publisher<TerrainSnapshot>,
        commands: std::sync::mpsc::Receiver<TerrainCommand>,
        stats: Arc<parking_lot::Mutex<crate::application_state::headless::GraphicsStats>>,
    }

    fn fixture(kind: LevelKind, script: Vec<FrameInput>) -> Fixture {
        let mut platform = HeadlessPlatform::new();
        platform.push_script(script);
        let stats = platform.stats();
        let session = platform.open_session(&EngineConfig::default()).unwrap();

        let (terrain, terrain_reader) =
            DoubleBuffer::channel(TerrainSnapshot::default(), TerrainSnapshot::default());
        let (_entities, entity_reader) = DoubleBuffer::channel(Vec::new(), Vec::new());
        let (block_commands, commands) = channel();
        let coordinator = FrameCoordinator::new(
            kind,
            FrameSources {
                terrain: terrain_reader,
                entities: entity_reader,
                selection: None,
                pose: MtResource::new(session.camera.pose()),
                time_step: TimeStep::default(),
                block_commands,
                playback: None,
            },
        );

        Fixture {
            coordinator,
            session,
            terrain,
            commands,
            stats,
        }
    }

    #[test]
    fn test_redraws_previous_snapshot_without_new_publish() {
        let mut fixture = fixture(LevelKind::Edit, vec![FrameInput::default(); 2]);
        let mesh: Arc<[Vertex]> = Arc::from(vec![Vertex::default(); 24]);
        fixture
            .terrain
            .write()
            .drawable
            .insert(Point3::new(0, 0, 0), mesh);
        fixture.terrain.publish();

        fixture.coordinator.run_frame(&mut fixture.session);
        fixture.coordinator.run_frame(&mut fixture.session);

        let stats = fixture.stats.lock();
        assert_eq!(stats.draws, 2);
        assert_eq!(stats.vertices_drawn, 48);
        assert_eq!(stats.presents, 2);
        assert!(stats.depth_test);
        assert_eq!(fixture.coordinator.stats().stale_frames, 1);
    }

    #[test]
    fn test_close_request_asks_for_exit() {
        let mut fixture = fixture(LevelKind::Edit, Vec::new());
        let outcome = fixture.coordinator.run_frame(&mut fixture.session);
        assert_eq!(outcome.requested_mode, Some(EngineMode::Exit));
    }

    #[test]
    fn test_level_menu_exit_leaves_level() {
        let mut fixture = fixture(
            LevelKind::Record,
            vec![
                FrameInput {
                    key_events: vec![(KeyCode::KeyE, true)],
                    ..Default::default()
                },
                FrameInput {
                    activations: vec![LEVEL_MENU_EXIT.to_owned()],
                    ..Default::default()
                },
            ],
        );
        fixture.session.window.set_mouse_lock(true);
        fixture.session.gui.add_box(LEVEL_MENU, None, false);
        fixture
            .session
            .gui
            .add_button(LEVEL_MENU_EXIT, Some(LEVEL_MENU), GuiAction::Exit, true);
        fixture.session.bind_gui_key(KeyCode::KeyE, GuiAction::ToggleLevelMenu);

        let first = fixture.coordinator.run_frame(&mut fixture.session);
        assert_eq!(first.requested_mode, None);
        assert!(fixture.session.window.is_mouse_free());

        let second = fixture.coordinator.run_frame(&mut fixture.session);
        assert_eq!(second.requested_mode, Some(EngineMode::ExitRecord));
    }

    #[test]
    fn test_edit_after_terrain_worker_exit_is_dropped() {
        let mut fixture = fixture(
            LevelKind::Edit,
            vec![FrameInput {
                button_events: vec![(MouseButton::Left, true)],
                ..Default::default()
            }],
        );
        let (mut selection, selection_reader) =
            DoubleBuffer::channel(Selection::default(), Selection::default());
        selection.write().hit = Some(BlockHit {
            block: Point3::new(1, 0, 1),
            normal: cgmath::Vector3::new(0, 1, 0),
            distance: 2.0,
        });
        selection.publish();
        fixture.coordinator.selection = Some(selection_reader);
        fixture.session.window.set_mouse_lock(true);
        drop(fixture.commands);

        let outcome = fixture.coordinator.run_frame(&mut fixture.session);
        assert_eq!(outcome.requested_mode, None);
        assert_eq!(fixture.stats.lock().presents, 1);
    }

    #[test]
    fn test_pause_after_playback_worker_exit_still_shows_icon() {
        let mut fixture = fixture(
            LevelKind::Record,
            vec![FrameInput {
                key_events: vec![(KeyCode::ArrowDown, true)],
                ..Default::default()
            }],
        );
        let mut bindings = crate::application_state::input_bindings::ControlBindings::new();
        bindings.bind_playback();
        fixture.session.set_bindings(bindings);
        fixture.session.gui.add_box(PAUSE_ICON, None, false);
        let (playback, playback_receiver) = channel();
        drop(playback_receiver);
        fixture.coordinator.playback = Some(playback);

        let outcome = fixture.coordinator.run_frame(&mut fixture.session);
        assert_eq!(outcome.requested_mode, None);
        assert!(fixture.session.gui.is_visible(PAUSE_ICON));
    }

    #[test]
    fn test_lighting_toggle_and_block_selection() {
        let mut fixture = fixture(
            LevelKind::Edit,
            vec![FrameInput {
                key_events: vec![(KeyCode::KeyR, true), (KeyCode::Digit3, true)],
                ..Default::default()
            }],
        );
        let mut bindings = crate::application_state::input_bindings::ControlBindings::movement();
        bindings.bind_block_slots();
        fixture.session.set_bindings(bindings);

        fixture.coordinator.run_frame(&mut fixture.session);
        assert!(fixture.coordinator.complex_lighting());
        assert_eq!(fixture.coordinator.selected_block(), BlockType::WOOD);
        assert!(fixture.commands.try_recv().is_err());
    }
}
