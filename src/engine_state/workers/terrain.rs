//! # Terrain Worker
//!
//! Keeps the chunks around the player loaded and meshed, and hands the result to the
//! render thread through a [`DoubleBuffer`](crate::core::DoubleBuffer) of
//! [`TerrainSnapshot`]s.
//!
//! ## World Modes
//! - Infinite: chunks in a cube of `render_distance` around the player are generated,
//!   nearest first, a few per iteration. Chunks further than `render_distance + 1` are
//!   unloaded into an LRU cache so walking back does not regenerate them.
//! - Finite: every chunk of a terrain source file is loaded once and never unloaded.
//!   A source that cannot be loaded aborts the buffer, which fails the level load.
//!
//! Block edits arrive over a channel, are applied between iterations and republished.

use std::{
    collections::{HashMap, HashSet},
    num::NonZeroUsize,
    path::PathBuf,
    sync::{mpsc::Receiver, Arc},
    thread,
};

use cgmath::Point3;
use log::{debug, error, info, warn};
use lru::LruCache;

use crate::{
    application_state::config::EngineConfig,
    core::{MtResource, Publisher},
    engine_state::{
        camera_state::PlayerPose,
        rendering::{mesher, vertex::Vertex},
        voxels::{
            block::block_type::BlockType,
            chunk::{Chunk, ChunkPos},
            generator::{ChunkGenerator, PerlinGenerator},
            terrain_source,
            world::{split_world_position, TerrainSnapshot},
        },
    },
    error::EngineError,
};

/// Where the terrain of a level comes from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TerrainSource {
    /// Procedural terrain from the given seed.
    Infinite { seed: u32 },
    /// A terrain source file.
    Finite(PathBuf),
}

impl TerrainSource {
    /// The source the configuration asks for.
    pub fn from_config(config: &EngineConfig) -> Result<Self, EngineError> {
        if config.infinite_world {
            return Ok(TerrainSource::Infinite {
                seed: config.world_seed,
            });
        }
        config
            .terrain_file
            .clone()
            .map(TerrainSource::Finite)
            .ok_or(EngineError::MissingTerrainSource)
    }
}

/// A change to the terrain requested by another thread.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TerrainCommand {
    /// Replace the block at a world block coordinate.
    SetBlock {
        position: Point3<i32>,
        block: BlockType,
    },
}

enum Streaming {
    Infinite(Box<dyn ChunkGenerator>),
    Finite(PathBuf),
}

/// Chebyshev distance between two chunk positions.
fn chunk_distance(a: ChunkPos, b: ChunkPos) -> i32 {
    (a.x - b.x).abs().max((a.y - b.y).abs()).max((a.z - b.z).abs())
}

/// The terrain worker loop and the state it owns.
pub struct TerrainWorker {
    publisher: Publisher<TerrainSnapshot>,
    streaming: Streaming,
    pose: MtResource<PlayerPose>,
    commands: Receiver<TerrainCommand>,
    chunks: HashMap<ChunkPos, Arc<Chunk>>,
    meshes: HashMap<ChunkPos, Arc<[Vertex]>>,
    unloaded: LruCache<ChunkPos, Arc<Chunk>>,
    failed: HashSet<ChunkPos>,
    render_distance: i32,
    generation_batch: usize,
    force_publish_after: u32,
    dirty: bool,
}

impl TerrainWorker {
    /// Creates a worker for `source`.
    ///
    /// # Arguments
    /// * `publisher` - Write end of the terrain buffer
    /// * `source` - Where chunks come from
    /// * `pose` - Player pose written by the render thread
    /// * `commands` - Block edits
    /// * `config` - Streaming radius, batch size and publish limit
    pub fn new(
        publisher: Publisher<TerrainSnapshot>,
        source: &TerrainSource,
        pose: MtResource<PlayerPose>,
        commands: Receiver<TerrainCommand>,
        config: &EngineConfig,
    ) -> Self {
        let streaming = match source {
            TerrainSource::Infinite { seed } => {
                Streaming::Infinite(Box::new(PerlinGenerator::new(*seed)))
            }
            TerrainSource::Finite(path) => Streaming::Finite(path.clone()),
        };
        Self::with_streaming(publisher, streaming, pose, commands, config)
    }

    /// Creates an infinite-world worker around a custom generator.
    pub fn with_generator(
        publisher: Publisher<TerrainSnapshot>,
        generator: Box<dyn ChunkGenerator>,
        pose: MtResource<PlayerPose>,
        commands: Receiver<TerrainCommand>,
        config: &EngineConfig,
    ) -> Self {
        Self::with_streaming(
            publisher,
            Streaming::Infinite(generator),
            pose,
            commands,
            config,
        )
    }

    fn with_streaming(
        publisher: Publisher<TerrainSnapshot>,
        streaming: Streaming,
        pose: MtResource<PlayerPose>,
        commands: Receiver<TerrainCommand>,
        config: &EngineConfig,
    ) -> Self {
        let cache_size = NonZeroUsize::new(config.unloaded_chunk_cache).unwrap_or(NonZeroUsize::MIN);
        Self {
            publisher,
            streaming,
            pose,
            commands,
            chunks: HashMap::new(),
            meshes: HashMap::new(),
            unloaded: LruCache::new(cache_size),
            failed: HashSet::new(),
            render_distance: config.render_distance.max(0),
            generation_batch: config.generation_batch.max(1),
            force_publish_after: config.force_publish_after,
            // The first iteration always publishes so the level load never waits forever.
            dirty: true,
        }
    }

    /// Runs until the run flag is cleared.
    pub fn run(mut self) {
        if let Streaming::Finite(path) = &self.streaming {
            match terrain_source::load(path) {
                Ok(chunks) => {
                    info!("Loaded {} chunks from {}", chunks.len(), path.display());
                    for chunk in chunks {
                        self.insert_chunk(Arc::new(chunk));
                    }
                }
                Err(error) => {
                    error!("Terrain source could not be loaded: {}", error);
                    self.publisher.abort(error.to_string());
                    return;
                }
            }
        }

        while self.publisher.is_running() {
            self.apply_commands();
            let pending = self.stream();

            if self.dirty {
                self.sync_write_side();
                if self.publisher.publish_bounded(self.force_publish_after) {
                    debug!("Published terrain with {} chunks", self.chunks.len());
                    self.dirty = false;
                }
            }

            if pending || self.dirty {
                thread::yield_now();
                continue;
            }
            if !self.publisher.wait_for_wakeup() {
                break;
            }
        }
    }

    fn apply_commands(&mut self) {
        while let Ok(command) = self.commands.try_recv() {
            match command {
                TerrainCommand::SetBlock { position, block } => {
                    let (chunk_position, local) = split_world_position(position);
                    let Some(chunk) = self.chunks.get(&chunk_position) else {
                        debug!("Ignoring edit of unloaded chunk {:?}", chunk_position);
                        continue;
                    };
                    let mut edited = Chunk::clone(chunk);
                    if edited.set(local.x, local.y, local.z, block) {
                        self.insert_chunk(Arc::new(edited));
                    }
                }
            }
        }
    }

    /// Unloads far chunks and loads one batch of missing ones.
    ///
    /// # Returns
    /// `true` if chunks are still missing after this batch
    fn stream(&mut self) -> bool {
        let Streaming::Infinite(generator) = &self.streaming else {
            return false;
        };
        let center = self.pose.get().chunk_position();
        let radius = self.render_distance;

        let far: Vec<ChunkPos> = self
            .chunks
            .keys()
            .filter(|position| chunk_distance(**position, center) > radius + 1)
            .copied()
            .collect();
        for position in far {
            if let Some(chunk) = self.chunks.remove(&position) {
                self.meshes.remove(&position);
                self.unloaded.put(position, chunk);
                self.dirty = true;
            }
        }
        self.failed
            .retain(|position| chunk_distance(*position, center) <= radius + 1);

        let mut wanted = Vec::new();
        for x in -radius..=radius {
            for y in -radius..=radius {
                for z in -radius..=radius {
                    let position = Point3::new(center.x + x, center.y + y, center.z + z);
                    if !self.chunks.contains_key(&position) && !self.failed.contains(&position) {
                        wanted.push(position);
                    }
                }
            }
        }
        wanted.sort_by_key(|position| {
            let (x, y, z) = (position.x - center.x, position.y - center.y, position.z - center.z);
            x * x + y * y + z * z
        });
        let pending = wanted.len() > self.generation_batch;

        let mut loaded = Vec::with_capacity(self.generation_batch);
        for position in wanted.into_iter().take(self.generation_batch) {
            if let Some(chunk) = self.unloaded.pop(&position) {
                loaded.push(chunk);
                continue;
            }
            match generator.generate(position) {
                Ok(chunk) => loaded.push(Arc::new(chunk)),
                Err(error) => {
                    warn!("Skipping chunk {:?}: {}", position, error);
                    self.failed.insert(position);
                }
            }
        }
        for chunk in loaded {
            self.insert_chunk(chunk);
        }

        pending
    }

    fn insert_chunk(&mut self, chunk: Arc<Chunk>) {
        let position = chunk.position;
        let mesh = mesher::mesh_chunk(&chunk);
        if mesh.is_empty() {
            self.meshes.remove(&position);
        } else {
            self.meshes.insert(position, Arc::from(mesh));
        }
        self.chunks.insert(position, chunk);
        self.dirty = true;
    }

    fn sync_write_side(&mut self) {
        let write = self.publisher.write();
        write.blocks.reconcile(&self.chunks);
        write.drawable.reconcile(&self.meshes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{DoubleBuffer, StopSignal};
    use cgmath::Vector3;
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        mpsc::channel,
    };

    /// One solid layer of dirt at the bottom of chunk layer 0, nothing elsewhere.
    struct FlatGenerator {
        calls: Arc<AtomicUsize>,
    }

    impl ChunkGenerator for FlatGenerator {
        fn generate(&self, position: ChunkPos) -> Result<Chunk, EngineError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if position.y < -1 {
                return Err(EngineError::ChunkOutOfWorld {
                    x: position.x,
                    y: position.y,
                    z: position.z,
                });
            }
            let mut chunk = Chunk::empty(position);
            if position.y == 0 {
                for x in 0..16 {
                    for z in 0..16 {
                        chunk.set(x, 0, z, BlockType::DIRT);
                    }
                }
            }
            Ok(chunk)
        }
    }

    /// Every chunk is empty except one that cannot be generated.
    struct HoleGenerator {
        hole: ChunkPos,
        calls: Arc<AtomicUsize>,
    }

    impl ChunkGenerator for HoleGenerator {
        fn generate(&self, position: ChunkPos) -> Result<Chunk, EngineError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if position == self.hole {
                return Err(EngineError::ChunkOutOfWorld {
                    x: position.x,
                    y: position.y,
                    z: position.z,
                });
            }
            Ok(Chunk::empty(position))
        }
    }

    fn origin_pose() -> MtResource<PlayerPose> {
        MtResource::new(PlayerPose {
            position: Point3::new(8.0, 8.0, 8.0),
            direction: Vector3::new(1.0, 0.0, 0.0),
        })
    }

    fn config(render_distance: i32) -> EngineConfig {
        EngineConfig {
            render_distance,
            generation_batch: 1_000,
            ..EngineConfig::default()
        }
    }

    #[test]
    fn test_streams_cube_around_player() {
        let (publisher, mut reader) =
            DoubleBuffer::channel(TerrainSnapshot::default(), TerrainSnapshot::default());
        let signal = publisher.stop_signal();
        let calls = Arc::new(AtomicUsize::new(0));
        let (_commands, receiver) = channel();
        let worker = TerrainWorker::with_generator(
            publisher,
            Box::new(FlatGenerator {
                calls: calls.clone(),
            }),
            origin_pose(),
            receiver,
            &config(1),
        );
        let handle = thread::spawn(move || worker.run());

        reader.wait_until_first_ready().unwrap();
        reader.consume();
        let snapshot = reader.snapshot();
        assert_eq!(snapshot.blocks.len(), 27);
        assert_eq!(snapshot.drawable.len(), 9);
        assert!(snapshot.is_solid(Point3::new(3, 0, -5)));

        signal.request_stop();
        handle.join().unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 27);
    }

    #[test]
    fn test_failed_chunk_is_skipped_and_not_retried() {
        let (publisher, mut reader) =
            DoubleBuffer::channel(TerrainSnapshot::default(), TerrainSnapshot::default());
        let signal = publisher.stop_signal();
        let calls = Arc::new(AtomicUsize::new(0));
        let hole = Point3::new(1, 0, 0);
        let (_commands, receiver) = channel();
        let worker = TerrainWorker::with_generator(
            publisher,
            Box::new(HoleGenerator {
                hole,
                calls: calls.clone(),
            }),
            origin_pose(),
            receiver,
            &config(1),
        );
        let handle = thread::spawn(move || worker.run());

        reader.wait_until_first_ready().unwrap();
        reader.consume();
        assert_eq!(reader.snapshot().blocks.len(), 26);
        assert!(reader.snapshot().blocks.get(&hole).is_none());

        for _ in 0..5 {
            reader.try_consume();
            thread::yield_now();
        }
        signal.request_stop();
        handle.join().unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 27);
    }

    #[test]
    fn test_failed_positions_are_forgotten_when_far() {
        let (publisher, _reader) =
            DoubleBuffer::channel(TerrainSnapshot::default(), TerrainSnapshot::default());
        let pose = origin_pose();
        let (_commands, receiver) = channel();
        let mut worker = TerrainWorker::with_generator(
            publisher,
            Box::new(FlatGenerator {
                calls: Arc::new(AtomicUsize::new(0)),
            }),
            pose.clone(),
            receiver,
            &config(2),
        );

        for _ in 0..40 {
            pose.get_mut().position.x += 16.0;
            worker.stream();

            let center = pose.get().chunk_position();
            assert!(!worker.failed.is_empty());
            assert!(worker.failed.len() <= 49);
            assert!(worker
                .failed
                .iter()
                .all(|position| chunk_distance(*position, center) <= 3));
        }
    }

    #[test]
    fn test_block_edit_is_republished() {
        let (publisher, mut reader) =
            DoubleBuffer::channel(TerrainSnapshot::default(), TerrainSnapshot::default());
        let signal = publisher.stop_signal();
        let (commands, receiver) = channel();
        let worker = TerrainWorker::with_generator(
            publisher,
            Box::new(FlatGenerator {
                calls: Arc::new(AtomicUsize::new(0)),
            }),
            origin_pose(),
            receiver,
            &config(0),
        );
        let handle = thread::spawn(move || worker.run());

        reader.wait_until_first_ready().unwrap();
        reader.consume();
        assert!(reader.current().is_solid(Point3::new(2, 0, 2)));

        commands
            .send(TerrainCommand::SetBlock {
                position: Point3::new(2, 0, 2),
                block: BlockType::AIR,
            })
            .unwrap();
        while reader.current().is_solid(Point3::new(2, 0, 2)) {
            reader.try_consume();
            thread::yield_now();
        }

        signal.request_stop();
        handle.join().unwrap();
    }

    #[test]
    fn test_missing_finite_source_aborts_first_wait() {
        let (publisher, reader) =
            DoubleBuffer::channel(TerrainSnapshot::default(), TerrainSnapshot::default());
        let (_commands, receiver) = channel();
        let worker = TerrainWorker::new(
            publisher,
            &TerrainSource::Finite(PathBuf::from("/no/such/terrain.json")),
            origin_pose(),
            receiver,
            &EngineConfig::default(),
        );
        let handle = thread::spawn(move || worker.run());

        let error = reader.wait_until_first_ready().unwrap_err();
        assert_eq!(error.kind(), crate::error::ErrorKind::Resource);
        handle.join().unwrap();
    }

    #[test]
    fn test_source_from_config() {
        let mut config = EngineConfig::default();
        assert_eq!(
            TerrainSource::from_config(&config).unwrap(),
            TerrainSource::Infinite { seed: 0 }
        );
        config.infinite_world = false;
        assert!(matches!(
            TerrainSource::from_config(&config),
            Err(EngineError::MissingTerrainSource)
        ));
    }
}
