//! # Terrain Sources
//!
//! Finite worlds are loaded once from a JSON terrain source:
//!
//! ```json
//! { "chunks": [ { "position": [0, 0, 0], "runs": [[4096, 0]] } ] }
//! ```
//!
//! Each chunk lists its cells in storage order as `[count, block id]` runs. A source is
//! validated completely before anything is returned; a bad source never yields a
//! partially loaded world.

use std::{collections::HashSet, fs, path::Path};

use cgmath::Point3;
use serde::{Deserialize, Serialize};

use super::{
    block::{block_type::BlockType, BlockTypeSize},
    chunk::{Chunk, CHUNK_SIZE},
};
use crate::error::EngineError;

#[derive(Debug, Deserialize, Serialize)]
pub struct TerrainFile {
    pub chunks: Vec<ChunkRecord>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ChunkRecord {
    pub position: [i32; 3],
    pub runs: Vec<(u32, BlockTypeSize)>,
}

impl ChunkRecord {
    /// Run-length encodes `chunk`.
    pub fn from_chunk(chunk: &Chunk) -> Self {
        let mut runs: Vec<(u32, BlockTypeSize)> = Vec::new();
        for (_, _, _, block_type) in chunk.cells() {
            match runs.last_mut() {
                Some((count, id)) if *id == block_type.id() => *count += 1,
                _ => runs.push((1, block_type.id())),
            }
        }
        Self {
            position: chunk.position.into(),
            runs,
        }
    }

    fn decode(&self) -> Result<Chunk, String> {
        let total: u64 = self.runs.iter().map(|(count, _)| *count as u64).sum();
        if total != CHUNK_SIZE as u64 {
            return Err(format!(
                "chunk {:?} has {} cells instead of {}",
                self.position, total, CHUNK_SIZE
            ));
        }

        let mut cells = Vec::with_capacity(CHUNK_SIZE as usize);
        for (count, id) in &self.runs {
            let block_type = BlockType::from_id(*id)
                .ok_or_else(|| format!("chunk {:?} uses unknown block id {}", self.position, id))?;
            cells.extend(std::iter::repeat(block_type).take(*count as usize));
        }

        Chunk::from_cells(Point3::from(self.position), cells)
            .ok_or_else(|| format!("chunk {:?} could not be decoded", self.position))
    }
}

/// Loads every chunk of the terrain source at `path`.
pub fn load(path: &Path) -> Result<Vec<Chunk>, EngineError> {
    let text = fs::read_to_string(path).map_err(|source| EngineError::Io {
        path: path.to_owned(),
        source,
    })?;
    let file: TerrainFile = serde_json::from_str(&text).map_err(|source| EngineError::Format {
        path: path.to_owned(),
        source,
    })?;
    decode(&file).map_err(|reason| EngineError::InvalidTerrain {
        path: path.to_owned(),
        reason,
    })
}

fn decode(file: &TerrainFile) -> Result<Vec<Chunk>, String> {
    let mut seen = HashSet::new();
    let mut chunks = Vec::with_capacity(file.chunks.len());
    for record in &file.chunks {
        if !seen.insert(record.position) {
            return Err(format!("chunk {:?} appears twice", record.position));
        }
        chunks.push(record.decode()?);
    }
    Ok(chunks)
}
