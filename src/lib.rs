#![warn(rustdoc::missing_crate_level_docs)]
#![warn(rustdoc::invalid_rust_codeblocks)]

//! # Voxel Frame Engine
//!
//! The concurrency core of a voxel engine: a render thread that never waits on its
//! producers, and three worker threads that stream terrain, tick the world and
//! raycast the player's target.
//!
//! ## Key Modules
//!
//! * `application_state` - Engine modes, the engine context and its main loop, platform seams
//! * `core` - The double buffer handoff and worker thread bookkeeping
//! * `engine_state` - Levels, workers, voxels, entities and rendering
//! * `error` - The engine error type
//!
//! ## Architecture
//!
//! Every worker publishes into its own [`core::DoubleBuffer`]. The render thread
//! try-locks the read side once per frame and redraws the last snapshot it got when
//! the lock is contended. Mode changes go through a single transition table, so
//! starting and stopping graphics, levels and workers always happens in the same order.
//!
//! ## Usage
//!
//! ```no_run
//! fn main() {
//!     voxel_frame_engine::run();
//! }
//! ```
//!
//! Command line:
//!
//! ```text
//! voxel-frame-engine [--graphical | --ai-menu] [--config <path>] [--frames <n>]
//! ```

use log::{error, info};

use application_state::{
    command_line::CommandLine,
    config::EngineConfig,
    headless::{HeadlessPlatform, ScriptedAiMenu},
    mode::EngineMode,
    platform::{AiMenuChoice, FrameInput},
    EngineContext, NEW_LEVEL_BUTTON,
};
use error::EngineError;

pub mod application_state;
pub mod core;
pub mod engine_state;
pub mod error;

/// Frames a headless session runs when no `--frames` limit is given.
pub const DEFAULT_SESSION_FRAMES: u64 = 600;

/// Initialises logging, runs the engine with the process arguments and exits with a
/// non-zero status on failure.
pub fn run() {
    let mut log_builder = env_logger::Builder::new();
    log_builder
        .target(env_logger::Target::Stdout)
        .parse_env("RUST_LOG")
        .init();
    info!("Logger initialized");

    if let Err(error) = run_with_args(std::env::args().skip(1)) {
        error!("{} ({:?} error)", error, error.kind());
        std::process::exit(1);
    }
}

/// Runs the engine on the headless platform.
///
/// # Arguments
/// * `args` - Command line arguments without the program name
///
/// # Returns
/// The first error that stopped the engine
pub fn run_with_args<I>(args: I) -> Result<(), EngineError>
where
    I: IntoIterator<Item = String>,
{
    let options = CommandLine::parse(args)?;
    let config = match &options.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };

    let session_frames = options.frames.unwrap_or(DEFAULT_SESSION_FRAMES) as usize;
    let mut platform = HeadlessPlatform::new();
    let ai_menu = if options.graphical {
        let mut script = vec![FrameInput {
            activations: vec![NEW_LEVEL_BUTTON.to_string()],
            ..Default::default()
        }];
        script.resize(session_frames.max(1), FrameInput::default());
        platform.push_script(script);
        ScriptedAiMenu::default()
    } else {
        platform.push_script(vec![FrameInput::default(); session_frames]);
        ScriptedAiMenu::new(config.record_file.clone().map(AiMenuChoice::PlayRecording))
    };

    let mut context = EngineContext::create(config, Box::new(platform), Box::new(ai_menu));
    if options.graphical {
        context.transition(EngineMode::GraphicalMenu)?;
    }
    context.run(options.frames)?;
    info!("Engine stopped after {} frames", context.frames_rendered());
    Ok(())
}
