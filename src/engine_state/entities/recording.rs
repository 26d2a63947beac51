//! # Recorded Games
//!
//! A recording is a JSON list of frames, each listing the entities present in that
//! frame. Playback runs as the `playRecordTick` global tick function: every tick it
//! moves one frame forward or backward, or stays put while paused, and mirrors that
//! frame into the entity manager.

use std::{fs, path::Path, sync::mpsc::Receiver};

use cgmath::Point3;
use serde::{Deserialize, Serialize};

use super::{Entity, EntityId, EntityManager, TickFunction};
use crate::{engine_state::voxels::block::block_type::BlockType, error::EngineError};

/// Name under which playback is registered as a global tick function.
pub const PLAYBACK_TICK_NAME: &str = "playRecordTick";

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct RecordedEntity {
    pub id: EntityId,
    pub position: [f32; 3],
    pub block_type: u8,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct Recording {
    pub frames: Vec<Vec<RecordedEntity>>,
}

impl Recording {
    pub fn load(path: &Path) -> Result<Self, EngineError> {
        let text = fs::read_to_string(path).map_err(|source| EngineError::Io {
            path: path.to_owned(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| EngineError::Format {
            path: path.to_owned(),
            source,
        })
    }
}

/// Playback controls sent from the render thread.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaybackControl {
    Forward,
    Pause,
    Backward,
}

/// Playback state of one recording.
pub struct Playback {
    recording: Recording,
    cursor: usize,
    direction: PlaybackControl,
    applied: Option<usize>,
    controls: Receiver<PlaybackControl>,
}

impl Playback {
    pub fn new(recording: Recording, controls: Receiver<PlaybackControl>) -> Self {
        Self {
            recording,
            cursor: 0,
            direction: PlaybackControl::Forward,
            applied: None,
            controls,
        }
    }

    /// Runs one playback tick.
    pub fn tick(&mut self, entities: &mut EntityManager) {
        while let Ok(control) = self.controls.try_recv() {
            self.direction = control;
        }
        if self.recording.frames.is_empty() {
            return;
        }

        if self.applied.is_some() {
            let last = self.recording.frames.len() - 1;
            self.cursor = match self.direction {
                PlaybackControl::Forward => (self.cursor + 1).min(last),
                PlaybackControl::Backward => self.cursor.saturating_sub(1),
                PlaybackControl::Pause => self.cursor,
            };
        }

        if self.applied != Some(self.cursor) {
            entities.clear();
            for recorded in &self.recording.frames[self.cursor] {
                let block_type = BlockType::from_id(recorded.block_type).unwrap_or(BlockType::WHITE);
                entities.insert(
                    recorded.id,
                    Entity {
                        position: Point3::from(recorded.position),
                        block_type,
                    },
                );
            }
            self.applied = Some(self.cursor);
        }
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Wraps this playback into a tick function.
    pub fn into_tick_function(mut self) -> TickFunction {
        Box::new(move |entities, _| self.tick(entities))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc::channel;

    fn recording() -> Recording {
        Recording {
            frames: (0..3)
                .map(|frame| {
                    vec![RecordedEntity {
                        id: 0,
                        position: [frame as f32, 0.0, 0.0],
                        block_type: 1,
                    }]
                })
                .collect(),
        }
    }

    #[test]
    fn test_forward_stops_at_last_frame() {
        let (_sender, receiver) = channel();
        let mut playback = Playback::new(recording(), receiver);
        let mut entities = EntityManager::new();
        for _ in 0..5 {
            playback.tick(&mut entities);
        }
        assert_eq!(playback.cursor(), 2);
        assert_eq!(entities.get(0).unwrap().position.x, 2.0);
    }

    #[test]
    fn test_pause_and_backward_controls() {
        let (sender, receiver) = channel();
        let mut playback = Playback::new(recording(), receiver);
        let mut entities = EntityManager::new();
        playback.tick(&mut entities);
        playback.tick(&mut entities);
        assert_eq!(playback.cursor(), 1);

        sender.send(PlaybackControl::Pause).unwrap();
        playback.tick(&mut entities);
        assert_eq!(playback.cursor(), 1);

        sender.send(PlaybackControl::Backward).unwrap();
        playback.tick(&mut entities);
        playback.tick(&mut entities);
        assert_eq!(playback.cursor(), 0);
        assert_eq!(entities.get(0).unwrap().position.x, 0.0);
    }

    #[test]
    fn test_parse_recording() {
        let recording: Recording = serde_json::from_str(
            r#"{ "frames": [[{ "id": 4, "position": [1.0, 2.0, 3.0], "block_type": 2 }]] }"#,
        )
        .unwrap();
        assert_eq!(recording.frames[0][0].id, 4);
    }
}
