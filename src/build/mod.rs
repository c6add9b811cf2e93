//! Building tile systems into combined chunk meshes.
//!
//! [`TileSystemBuilder`] drives one build through its [`BuildState`]s:
//!
//! 1. optionally reduce box colliders,
//! 2. extract every static tile into a per-tile buffer (one step per row),
//! 3. snap and smooth across tile boundaries (one step per row),
//! 4. merge buffers per combine-chunk (one step per chunk),
//! 5. bake or defer procedural meshes,
//! 6. work out what may be stripped.
//!
//! The build never touches the scene. It returns a [`BuildOutput`] describing
//! the meshes, renderers and removals the host should apply.

use bevy::prelude::Resource;

mod builder;
mod chunks;
mod colliders;
mod error;
mod extract;
mod input;
mod output;
mod procedural;
mod progress;
mod settings;
mod stripping;

pub use builder::{BuildState, TileSystemBuilder, build_tile_systems};
pub use colliders::ReducedCollider;
pub use error::BuildError;
pub use input::{TileInput, TileMeshPart, TileSystem};
pub use output::{BuildNotice, BuildOutput, ChunkRenderer, ProceduralRenderer, RendererContainer};
pub use procedural::{PROCEDURAL_VERTEX_LIMIT, ProceduralTile};
pub use progress::{BuildProgress, NoProgress};
pub use settings::BuildSettings;
pub use stripping::{StrippingOptions, StrippingPlan};

use crate::mesh::{MaterialKey, MeshAssembler};
use crate::snap::ClusterScratch;

/// Working memory reused across builds.
///
/// Keep one around (the plugin inserts it as a resource) so consecutive
/// builds reuse allocations.
#[derive(Resource, Debug)]
pub struct BuildScratch<M: MaterialKey> {
    pub(crate) assembler: MeshAssembler<M>,
    pub(crate) cluster: ClusterScratch,
}

impl<M: MaterialKey> Default for BuildScratch<M> {
    fn default() -> Self {
        Self {
            assembler: MeshAssembler::new(),
            cluster: ClusterScratch::new(),
        }
    }
}
