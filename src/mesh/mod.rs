//! Mesh buffers and the assembler used to merge them.
//!
//! Buffers keep parallel attribute arrays plus an ordered material → triangle
//! list mapping. Optional attributes are either absent or exactly as long as
//! the position array; the assembler pads with the defaults from
//! [`attributes`] whenever merged meshes disagree on which attributes they
//! carry.

use std::hash::Hash;

mod assembler;
mod attributes;
mod buffer;
mod output;
mod source;
mod tangents;

pub use assembler::MeshAssembler;
pub use attributes::{DEFAULT_COLOR, DEFAULT_NORMAL, DEFAULT_TANGENT, DEFAULT_UV, VertexAttributes};
pub use buffer::{MeshBuffer, Submesh};
pub use output::{CombinedMesh, PackedVertex, vertex_bytes};
pub use source::{SourceMesh, SourceMeshError};

/// A material reference carried alongside triangle lists.
///
/// Materials are shared, externally owned references; the pipeline only
/// compares, hashes and clones them. `Handle<StandardMaterial>` qualifies, as
/// do plain ids.
pub trait MaterialKey: Clone + Eq + Hash + Send + Sync + 'static {}

impl<T: Clone + Eq + Hash + Send + Sync + 'static> MaterialKey for T {}
