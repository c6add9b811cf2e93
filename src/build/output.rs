//! What a build hands back to the host.

use std::fmt;

use bevy::prelude::*;

use super::{ReducedCollider, StrippingOptions, StrippingPlan};
use crate::grid::{ChunkCoord, TileCoord};
use crate::mesh::CombinedMesh;

/// Where a combined renderer should be placed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RendererContainer {
    /// Reuse the existing container of a storage chunk.
    StorageChunk(ChunkCoord),
    /// Create a new container under the tile system.
    New { name: String },
}

/// A renderer the host should spawn for a merged mesh.
#[derive(Clone, Debug)]
pub struct ChunkRenderer<M> {
    /// Combine-chunk the mesh was merged from.
    pub chunk: ChunkCoord,
    /// Index into [`BuildOutput::meshes`].
    pub mesh: usize,
    /// Material of each submesh of the mesh, in order.
    pub materials: Vec<M>,
    pub container: RendererContainer,
    /// Transform of the renderer relative to the tile system. Merged meshes
    /// are already in tile-system space, so this is the identity.
    pub local_transform: Transform,
    /// Baked geometry never moves.
    pub is_static: bool,
    pub source_tile_count: usize,
}

/// A baked procedural mesh the host should place in a storage chunk.
#[derive(Clone, Debug)]
pub struct ProceduralRenderer<M> {
    pub chunk: ChunkCoord,
    /// Index into [`BuildOutput::meshes`].
    pub mesh: usize,
    pub materials: Vec<M>,
}

/// Non-fatal conditions worth surfacing to the user.
#[derive(Clone, Debug, PartialEq)]
pub enum BuildNotice {
    /// Procedural meshes are generated on first use, so data they depend on
    /// was kept even though stripping asked for its removal.
    ProceduralDataRetained {
        tile_count: usize,
        requested: StrippingOptions,
        effective: StrippingOptions,
    },
}

impl fmt::Display for BuildNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ProceduralDataRetained { tile_count, .. } => write!(
                f,
                "{} procedural tile(s) are generated at runtime; the tile system component, chunk map and tile data were not stripped",
                tile_count
            ),
        }
    }
}

/// Everything produced by building one tile system.
#[derive(Clone, Debug)]
pub struct BuildOutput<M> {
    /// Every generated mesh, merged and procedural, referenced by index from
    /// [`ChunkRenderer::mesh`] and [`ProceduralRenderer::mesh`].
    pub meshes: Vec<CombinedMesh<M>>,
    pub renderers: Vec<ChunkRenderer<M>>,
    /// Tiles whose source meshes now live in a combined mesh. The host should
    /// remove their original renderers.
    pub merged_tiles: Vec<TileCoord>,
    pub reduced_colliders: Vec<ReducedCollider>,
    /// Tiles whose box colliders are covered by `reduced_colliders`.
    pub replaced_colliders: Vec<TileCoord>,
    pub procedural_renderers: Vec<ProceduralRenderer<M>>,
    pub stripping: StrippingPlan,
    pub notices: Vec<BuildNotice>,
}

impl<M> Default for BuildOutput<M> {
    fn default() -> Self {
        Self {
            meshes: Vec::new(),
            renderers: Vec::new(),
            merged_tiles: Vec::new(),
            reduced_colliders: Vec::new(),
            replaced_colliders: Vec::new(),
            procedural_renderers: Vec::new(),
            stripping: StrippingPlan::default(),
            notices: Vec::new(),
        }
    }
}

impl<M> BuildOutput<M> {
    /// Total triangles across all generated meshes.
    pub fn triangle_count(&self) -> usize {
        self.meshes.iter().map(CombinedMesh::triangle_count).sum()
    }
}
