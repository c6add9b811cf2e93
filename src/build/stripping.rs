//! Stripping of editor-only data from a built tile system.

use std::collections::HashSet;

use super::TileSystem;
use crate::grid::{ChunkCoord, TileCoord};
use crate::mesh::MaterialKey;

/// What the host may remove once a tile system is built.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StrippingOptions {
    /// Remove the tile system component itself.
    pub strip_tile_system_component: bool,
    /// Remove the storage chunk lookup.
    pub strip_chunk_map: bool,
    /// Remove per-tile data.
    pub strip_tile_data: bool,
    /// Remove brush references from tile data.
    pub strip_brush_references: bool,
    /// Remove storage chunks left without content.
    pub strip_empty_chunks: bool,
    /// Remove tile objects left empty after their meshes were merged.
    pub strip_combined_empty_objects: bool,
}

impl StrippingOptions {
    /// Strip everything.
    pub fn all() -> Self {
        Self {
            strip_tile_system_component: true,
            strip_chunk_map: true,
            strip_tile_data: true,
            strip_brush_references: true,
            strip_empty_chunks: true,
            strip_combined_empty_objects: true,
        }
    }

    /// Applies implied options: stripping the component strips the chunk map
    /// and tile data, and stripping tile data strips brush references.
    pub fn normalized(mut self) -> Self {
        if self.strip_tile_system_component {
            self.strip_chunk_map = true;
            self.strip_tile_data = true;
        }
        if self.strip_tile_data {
            self.strip_brush_references = true;
        }
        self
    }

    /// Keeps the data needed to regenerate procedural meshes at runtime.
    ///
    /// Returns the adjusted options and whether anything changed.
    pub fn retain_procedural_data(self) -> (Self, bool) {
        let retained = Self {
            strip_tile_system_component: false,
            strip_chunk_map: false,
            strip_tile_data: false,
            ..self
        };
        (retained, retained != self)
    }
}

/// Result of the stripping step.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StrippingPlan {
    /// Effective options after implications and downgrades.
    pub options: StrippingOptions,
    /// Storage chunks with no remaining content.
    pub empty_chunks: Vec<ChunkCoord>,
    /// Tiles whose objects hold nothing after merging.
    pub emptied_tiles: Vec<TileCoord>,
}

/// Works out which chunks and tile objects the host may remove.
///
/// A merged tile is emptied unless it still carries an unreduced box
/// collider or procedural data that must stay. Storage chunks that hold
/// merged renderers are never empty.
pub(crate) fn plan_stripping<M: MaterialKey>(
    options: StrippingOptions,
    system: &TileSystem<M>,
    merged_tiles: &[TileCoord],
    colliders_reduced: bool,
    container_chunks: &HashSet<ChunkCoord>,
) -> StrippingPlan {
    let options = options.normalized();
    let merged: HashSet<TileCoord> = merged_tiles.iter().copied().collect();

    let is_emptied = |coord: TileCoord| {
        merged.contains(&coord)
            && system.tile(coord).is_some_and(|tile| {
                (!tile.box_collider || colliders_reduced) && tile.procedural.is_none()
            })
    };

    let emptied_tiles = if options.strip_combined_empty_objects {
        merged_tiles
            .iter()
            .copied()
            .filter(|&coord| is_emptied(coord))
            .collect()
    } else {
        Vec::new()
    };

    let empty_chunks = if options.strip_empty_chunks {
        system
            .grid
            .storage_chunks()
            .into_iter()
            .filter(|chunk| !container_chunks.contains(&chunk.coord))
            .filter(|chunk| {
                chunk.tiles().all(|coord| {
                    system.tile(coord).is_none()
                        || (options.strip_combined_empty_objects && is_emptied(coord))
                })
            })
            .map(|chunk| chunk.coord)
            .collect()
    } else {
        Vec::new()
    };

    StrippingPlan {
        options,
        empty_chunks,
        emptied_tiles,
    }
}
