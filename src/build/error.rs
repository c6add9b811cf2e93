//! Build errors.

use thiserror::Error;

use super::BuildState;
use crate::grid::{ChunkCoord, TileCoord};
use crate::mesh::SourceMeshError;

/// Errors that abort the build of one tile system.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BuildError {
    #[error("Build was cancelled while in state {state}")]
    Cancelled { state: BuildState },

    #[error("Tile system has already been built")]
    AlreadyBuilt,

    #[error("Invalid tile system grid: {reason}")]
    InvalidGrid { reason: String },

    #[error("Tile {tile} has an invalid source mesh in part {part}: {source}")]
    InvalidSourceMesh {
        tile: TileCoord,
        part: usize,
        #[source]
        source: SourceMeshError,
    },

    #[error(
        "Procedural mesh for chunk {chunk} needs {vertex_count} vertices, more than the 16-bit index limit of {limit}; reduce the chunk size"
    )]
    ProceduralIndexOverflow {
        chunk: ChunkCoord,
        vertex_count: usize,
        limit: usize,
    },
}

impl BuildError {
    /// Whether the error came from the progress callback.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}
