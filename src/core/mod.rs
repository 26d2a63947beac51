//! # Core Module
//!
//! This module provides the concurrency primitives the rest of the engine is built on.
//!
//! ## Key Components
//! - `MtResource`: Thread-safe reference-counted resource with read-write locking
//! - `DoubleBuffer`: Try-lock handoff of whole snapshots from a worker to the render thread
//! - `WorkerSet`: The named worker threads and their start/stop protocol
//!
//! ## Usage
//! ```rust
//! use voxel_frame_engine::core::{DoubleBuffer, MtResource};
//!
//! let pose = MtResource::new(0.0f32);
//! *pose.get_mut() = 1.0;
//!
//! let (mut publisher, mut reader) = DoubleBuffer::channel(Vec::<u32>::new(), Vec::new());
//! publisher.write().push(24);
//! assert!(publisher.try_publish());
//! assert!(reader.try_consume());
//! assert_eq!(reader.current(), &vec![24]);
//! ```

pub mod double_buffer;
pub mod mt_resource;
pub mod worker;

pub use double_buffer::{DoubleBuffer, Publisher, SnapshotReader, StopSignal};
pub use mt_resource::MtResource;
pub use worker::{WorkerSet, WorkerSlot};
