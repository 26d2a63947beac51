//! Engine error type.

use std::{io, path::PathBuf};

use thiserror::Error;

use crate::{application_state::mode::EngineMode, core::WorkerSlot};

/// Broad classes of failure, used to decide how the caller reacts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// The engine was asked to do something its current state does not allow.
    Configuration,
    /// A file or other external resource could not be used.
    Resource,
    /// A worker thread could not be started or stopped as expected.
    Concurrency,
}

/// Every error the engine reports.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no transition from {from:?} to {to:?}")]
    InvalidTransition { from: EngineMode, to: EngineMode },

    #[error("{0} is already initialised")]
    AlreadyInitialised(&'static str),

    #[error("graphical mode cannot be initialised while AI mode is on")]
    GraphicsInAiMode,

    #[error("AI mode cannot be toggled while in {0:?}")]
    AiModeLocked(EngineMode),

    #[error("graphical mode is not initialised")]
    GraphicsUnavailable,

    #[error("no level is loaded")]
    LevelUnavailable,

    #[error("{0:?} does not load a level")]
    NotALevelMode(EngineMode),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("could not read {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },

    #[error("could not parse {}: {source}", path.display())]
    Format {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("terrain source {} is invalid: {reason}", path.display())]
    InvalidTerrain { path: PathBuf, reason: String },

    #[error("a finite world needs a terrain source")]
    MissingTerrainSource,

    #[error("record playback needs a recording")]
    MissingRecording,

    #[error("chunk ({x}, {y}, {z}) is outside the world")]
    ChunkOutOfWorld { x: i32, y: i32, z: i32 },

    #[error("snapshot unavailable: {0}")]
    SnapshotUnavailable(String),

    #[error("{0} worker is not marked runnable")]
    WorkerNotRunnable(WorkerSlot),

    #[error("could not spawn the {slot} worker: {source}")]
    Spawn { slot: WorkerSlot, source: io::Error },
}

impl EngineError {
    /// Classifies the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::InvalidTransition { .. }
            | EngineError::AlreadyInitialised(_)
            | EngineError::GraphicsInAiMode
            | EngineError::AiModeLocked(_)
            | EngineError::GraphicsUnavailable
            | EngineError::LevelUnavailable
            | EngineError::NotALevelMode(_)
            | EngineError::InvalidArgument(_) => ErrorKind::Configuration,
            EngineError::Io { .. }
            | EngineError::Format { .. }
            | EngineError::InvalidTerrain { .. }
            | EngineError::MissingTerrainSource
            | EngineError::MissingRecording
            | EngineError::ChunkOutOfWorld { .. }
            | EngineError::SnapshotUnavailable(_) => ErrorKind::Resource,
            EngineError::WorkerNotRunnable(_) | EngineError::Spawn { .. } => {
                ErrorKind::Concurrency
            }
        }
    }
}
