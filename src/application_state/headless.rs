//! # Headless Platform
//!
//! A [`Platform`] without a GPU or a display. Windows replay a scripted list of
//! [`FrameInput`]s, one per poll, and request closing once the script runs out.
//! Graphics calls are counted into shared [`GraphicsStats`].
//!
//! Used by `--frames` runs and by the lifecycle tests.

use std::{collections::VecDeque, sync::Arc};

use parking_lot::Mutex;
use winit::dpi::PhysicalSize;

use super::{
    config::EngineConfig,
    platform::{AiMenu, AiMenuChoice, FrameInput, GraphicalSession, Platform, Window},
};
use crate::{
    engine_state::rendering::{gui::GuiRegistry, vertex::Vertex, Graphics, RenderMode},
    error::EngineError,
};

/// Counters of every graphics call made through a [`HeadlessGraphics`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GraphicsStats {
    pub clears: usize,
    pub presents: usize,
    pub draws: usize,
    pub indexed_draws: usize,
    pub vertices_drawn: usize,
    pub uploads: usize,
    pub resizes: usize,
    pub complex_lighting: bool,
    pub depth_test: bool,
    pub render_mode: Option<RenderMode>,
    /// Draw calls per render mode, in the order they were issued this frame.
    pub frame_modes: Vec<RenderMode>,
}

/// Graphics backend that only counts.
pub struct HeadlessGraphics {
    stats: Arc<Mutex<GraphicsStats>>,
}

impl HeadlessGraphics {
    pub fn new(stats: Arc<Mutex<GraphicsStats>>) -> Self {
        Self { stats }
    }
}

impl Graphics for HeadlessGraphics {
    fn clear(&mut self) {
        let mut stats = self.stats.lock();
        stats.clears += 1;
        stats.frame_modes.clear();
    }

    fn set_view_projection(&mut self, _matrix: [[f32; 4]; 4]) {}

    fn set_render_mode(&mut self, mode: RenderMode) {
        self.stats.lock().render_mode = Some(mode);
    }

    fn set_depth_test(&mut self, enabled: bool) {
        self.stats.lock().depth_test = enabled;
    }

    fn set_complex_lighting(&mut self, enabled: bool) {
        self.stats.lock().complex_lighting = enabled;
    }

    fn upload_static(&mut self, _vertices: &[Vertex]) {
        self.stats.lock().uploads += 1;
    }

    fn draw(&mut self, vertex_count: usize) {
        let mut stats = self.stats.lock();
        stats.draws += 1;
        stats.vertices_drawn += vertex_count;
        if let Some(mode) = stats.render_mode {
            stats.frame_modes.push(mode);
        }
    }

    fn draw_indexed(&mut self, _index_count: usize) {
        let mut stats = self.stats.lock();
        stats.indexed_draws += 1;
        if let Some(mode) = stats.render_mode {
            stats.frame_modes.push(mode);
        }
    }

    fn resize(&mut self, _size: PhysicalSize<u32>) {
        self.stats.lock().resizes += 1;
    }

    fn present(&mut self) {
        self.stats.lock().presents += 1;
    }
}

/// A window replaying scripted input.
pub struct HeadlessWindow {
    size: PhysicalSize<u32>,
    pending_resize: Option<PhysicalSize<u32>>,
    mouse_locked: bool,
    script: VecDeque<FrameInput>,
}

impl HeadlessWindow {
    pub fn new(size: PhysicalSize<u32>, script: impl IntoIterator<Item = FrameInput>) -> Self {
        Self {
            size,
            pending_resize: None,
            mouse_locked: false,
            script: script.into_iter().collect(),
        }
    }

    /// Queues a resize reported on the next [`Window::take_resize`].
    pub fn resize(&mut self, size: PhysicalSize<u32>) {
        self.size = size;
        self.pending_resize = Some(size);
    }
}

impl Window for HeadlessWindow {
    fn size(&self) -> PhysicalSize<u32> {
        self.size
    }

    fn take_resize(&mut self) -> Option<PhysicalSize<u32>> {
        self.pending_resize.take()
    }

    fn is_mouse_free(&self) -> bool {
        !self.mouse_locked
    }

    fn set_mouse_lock(&mut self, locked: bool) {
        self.mouse_locked = locked;
    }

    fn poll_input(&mut self) -> FrameInput {
        self.script.pop_front().unwrap_or(FrameInput {
            close_requested: true,
            ..Default::default()
        })
    }
}

/// Opens [`HeadlessWindow`]s, each with the next queued script.
#[derive(Default)]
pub struct HeadlessPlatform {
    scripts: VecDeque<Vec<FrameInput>>,
    stats: Arc<Mutex<GraphicsStats>>,
    sessions_opened: Arc<Mutex<usize>>,
}

impl HeadlessPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// A platform whose sessions run `frames` empty frames before asking to close.
    pub fn idle_frames(frames: usize) -> Self {
        let mut platform = Self::new();
        platform.push_script(vec![FrameInput::default(); frames]);
        platform
    }

    /// Queues the input of the next session to be opened.
    pub fn push_script(&mut self, script: Vec<FrameInput>) {
        self.scripts.push_back(script);
    }

    /// Counters shared by every session this platform opens.
    pub fn stats(&self) -> Arc<Mutex<GraphicsStats>> {
        self.stats.clone()
    }

    /// Number of sessions opened so far, readable after the platform was moved.
    pub fn sessions_opened(&self) -> Arc<Mutex<usize>> {
        self.sessions_opened.clone()
    }
}

impl Platform for HeadlessPlatform {
    fn open_session(&mut self, config: &EngineConfig) -> Result<GraphicalSession, EngineError> {
        let script = self.scripts.pop_front().unwrap_or_default();
        let size = PhysicalSize::new(config.window_width, config.window_height);
        *self.sessions_opened.lock() += 1;

        Ok(GraphicalSession::new(
            Box::new(HeadlessWindow::new(size, script)),
            Box::new(HeadlessGraphics::new(self.stats.clone())),
            Box::new(GuiRegistry::new()),
            config,
        ))
    }
}

/// An AI-game menu answering from a fixed list, then choosing [`AiMenuChoice::Exit`].
#[derive(Default)]
pub struct ScriptedAiMenu {
    choices: VecDeque<AiMenuChoice>,
}

impl ScriptedAiMenu {
    pub fn new(choices: impl IntoIterator<Item = AiMenuChoice>) -> Self {
        Self {
            choices: choices.into_iter().collect(),
        }
    }
}

impl AiMenu for ScriptedAiMenu {
    fn choose(&mut self) -> AiMenuChoice {
        self.choices.pop_front().unwrap_or(AiMenuChoice::Exit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_closes_after_script() {
        let mut window = HeadlessWindow::new(PhysicalSize::new(10, 10), vec![FrameInput::default()]);
        assert!(!window.poll_input().close_requested);
        assert!(window.poll_input().close_requested);
    }

    #[test]
    fn test_sessions_share_stats() {
        let mut platform = HeadlessPlatform::idle_frames(1);
        let stats = platform.stats();
        let mut session = platform.open_session(&EngineConfig::default()).unwrap();
        session.graphics.clear();
        session.graphics.present();
        assert_eq!(stats.lock().presents, 1);
        assert_eq!(*platform.sessions_opened().lock(), 1);
    }

    #[test]
    fn test_scripted_menu_ends_with_exit() {
        let mut menu = ScriptedAiMenu::new([AiMenuChoice::EnterEditor]);
        assert_eq!(menu.choose(), AiMenuChoice::EnterEditor);
        assert_eq!(menu.choose(), AiMenuChoice::Exit);
    }
}
