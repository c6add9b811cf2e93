//! # bevy_tile_baker
//!
//! Build-time optimisation of grid tile systems into static, render-efficient
//! chunk meshes.
//!
//! A tile system is a grid of cells where every painted tile contributes one
//! or more source meshes. Building it:
//!
//! - extracts each tile's meshes into a [`MeshBuffer`](mesh::MeshBuffer),
//! - snaps near-coincident vertices across tile boundaries and blends normals
//!   for tiles flagged as smooth,
//! - merges tiles into combine-chunks and corrects them into tile-system space,
//! - emits one multi-submesh mesh per chunk, or one mesh per chunk material.
//!
//! ## Quick Start
//!
//! ```ignore
//! use bevy::prelude::*;
//! use bevy_tile_baker::prelude::*;
//!
//! fn bake(mut system: TileSystem<Handle<StandardMaterial>>) {
//!     let mut scratch = BuildScratch::default();
//!     let output = TileSystemBuilder::new(&mut system, &mut scratch)
//!         .build(&mut NoProgress)
//!         .expect("tile system build failed");
//!
//!     for renderer in &output.renderers {
//!         // one Bevy mesh per submesh, paired with the material that draws it
//!         for (material, mesh) in output.meshes[renderer.mesh].to_submesh_meshes() {
//!             // spawn `Mesh3d(meshes.add(mesh))` with `MeshMaterial3d(material.clone())`
//!         }
//!     }
//! }
//! ```

pub mod build;
pub mod grid;
pub mod mesh;
mod plugin;
pub mod snap;

pub mod prelude {
    pub use crate::build::{
        BuildError, BuildNotice, BuildOutput, BuildProgress, BuildScratch, BuildSettings,
        BuildState, ChunkRenderer, NoProgress, ProceduralRenderer, ProceduralTile,
        RendererContainer,
        StrippingOptions, TileInput, TileMeshPart, TileSystem, TileSystemBuilder,
        build_tile_systems,
    };
    pub use crate::grid::{ChunkCoord, CombineMethod, CombinePlan, GridGeometry, TileCoord};
    pub use crate::mesh::{CombinedMesh, MaterialKey, MeshAssembler, MeshBuffer, SourceMesh, Submesh};
    pub use crate::plugin::TileBakePlugin;
    pub use crate::snap::SnapSettings;
}
