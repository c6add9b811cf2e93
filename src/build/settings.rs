//! Per tile system build configuration.

use bevy::prelude::*;

use super::StrippingOptions;
use crate::grid::CombineMethod;
use crate::snap::SnapSettings;

/// Settings read by a build.
///
/// Inserted as a resource by [`TileBakePlugin`](crate::prelude::TileBakePlugin).
/// A build only reads the settings of its [`TileSystem`](super::TileSystem);
/// hand the resource over with
/// [`TileSystem::with_settings`](super::TileSystem::with_settings).
///
/// # Example
///
/// ```ignore
/// let settings = BuildSettings::default()
///     .with_combine_method(CombineMethod::CustomChunkInTiles)
///     .with_combine_chunk_size(8, 8)
///     .with_vertex_snapping(true, 0.002);
/// ```
#[derive(Resource, Clone, Debug, PartialEq)]
pub struct BuildSettings {
    pub combine_method: CombineMethod,
    /// Only read for [`CombineMethod::CustomChunkInTiles`].
    pub combine_chunk_width: usize,
    /// Only read for [`CombineMethod::CustomChunkInTiles`].
    pub combine_chunk_height: usize,
    /// One multi-submesh mesh per chunk instead of one mesh per material.
    pub combine_into_submeshes: bool,
    pub static_vertex_snapping: bool,
    pub vertex_snap_threshold: f32,
    /// Merge per-tile box colliders into larger boxes.
    pub reduce_box_colliders: bool,
    /// Bake procedural tiles now rather than on first use.
    pub pre_generate_procedural: bool,
    pub stripping: StrippingOptions,
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            combine_method: CombineMethod::ByChunk,
            combine_chunk_width: 30,
            combine_chunk_height: 30,
            combine_into_submeshes: true,
            static_vertex_snapping: false,
            vertex_snap_threshold: 0.001,
            reduce_box_colliders: false,
            pre_generate_procedural: true,
            stripping: StrippingOptions::default(),
        }
    }
}

impl BuildSettings {
    pub fn with_combine_method(mut self, method: CombineMethod) -> Self {
        self.combine_method = method;
        self
    }

    /// Set the size used by [`CombineMethod::CustomChunkInTiles`].
    pub fn with_combine_chunk_size(mut self, width: usize, height: usize) -> Self {
        self.combine_chunk_width = width;
        self.combine_chunk_height = height;
        self
    }

    pub fn with_combine_into_submeshes(mut self, enabled: bool) -> Self {
        self.combine_into_submeshes = enabled;
        self
    }

    /// Enable static snapping and set the snap threshold.
    ///
    /// The threshold is also used by smooth tiles. Negative values are clamped
    /// to zero.
    pub fn with_vertex_snapping(mut self, static_snapping: bool, threshold: f32) -> Self {
        self.static_vertex_snapping = static_snapping;
        self.vertex_snap_threshold = threshold.max(0.0);
        self
    }

    pub fn with_collider_reduction(mut self, enabled: bool) -> Self {
        self.reduce_box_colliders = enabled;
        self
    }

    pub fn with_procedural_pregeneration(mut self, enabled: bool) -> Self {
        self.pre_generate_procedural = enabled;
        self
    }

    pub fn with_stripping(mut self, stripping: StrippingOptions) -> Self {
        self.stripping = stripping;
        self
    }

    pub fn snap_settings(&self) -> SnapSettings {
        SnapSettings {
            static_vertex_snapping: self.static_vertex_snapping,
            threshold: self.vertex_snap_threshold.max(0.0),
        }
    }
}
