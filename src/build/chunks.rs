//! Merging per-tile buffers into combine-chunks.

use bevy::log::debug;
use bevy::math::Mat4;
use bevy::prelude::Transform;

use super::{BuildOutput, ChunkRenderer, RendererContainer};
use crate::grid::{CombineChunk, TileMeshMap};
use crate::mesh::{CombinedMesh, MaterialKey, MeshAssembler, MeshBuffer};

/// How merged chunks are emitted.
#[derive(Clone, Copy, Debug)]
pub(crate) struct ChunkEmit<'a> {
    pub system_name: &'a str,
    pub world_to_local: &'a Mat4,
    pub combine_into_submeshes: bool,
    pub reuse_storage_container: bool,
}

/// Merges the buffers of `chunk` and appends the resulting meshes and
/// renderers to `output`.
///
/// Chunks without any buffer produce nothing.
pub(crate) fn merge_chunk<M: MaterialKey>(
    chunk: &CombineChunk,
    map: &TileMeshMap<M>,
    assembler: &mut MeshAssembler<M>,
    emit: ChunkEmit<'_>,
    output: &mut BuildOutput<M>,
) {
    let mut source_tile_count = 0;
    for coord in chunk.tiles() {
        let Some(buffer) = map.get(coord) else {
            continue;
        };
        if source_tile_count == 0 {
            assembler.mount(buffer);
        } else {
            assembler.append_buffer(buffer);
        }
        source_tile_count += 1;
    }
    if source_tile_count == 0 {
        return;
    }

    let mut merged = MeshBuffer::new();
    assembler.apply(&mut merged);
    merged.apply_transform(emit.world_to_local);
    if merged.tangents.is_some() {
        merged.compute_tangents();
    }
    if merged.is_empty() {
        return;
    }

    debug!(
        "{}: chunk {} merged {} tiles into {} vertices",
        emit.system_name,
        chunk.coord,
        source_tile_count,
        merged.vertex_count()
    );

    if emit.combine_into_submeshes {
        let container = if emit.reuse_storage_container {
            RendererContainer::StorageChunk(chunk.coord)
        } else {
            RendererContainer::New {
                name: format!("Combined Mesh {}", chunk.coord),
            }
        };
        push_renderer(output, chunk, merged.to_single_mesh(), container, source_tile_count);
    } else {
        for (index, mesh) in merged.to_meshes_per_material(assembler).into_iter().enumerate() {
            let container = RendererContainer::New {
                name: format!("Combined Mesh {} #{}", chunk.coord, index),
            };
            push_renderer(output, chunk, mesh, container, source_tile_count);
        }
    }
}

fn push_renderer<M: MaterialKey>(
    output: &mut BuildOutput<M>,
    chunk: &CombineChunk,
    mesh: CombinedMesh<M>,
    container: RendererContainer,
    source_tile_count: usize,
) {
    output.renderers.push(ChunkRenderer {
        chunk: chunk.coord,
        mesh: output.meshes.len(),
        materials: mesh.materials().cloned().collect(),
        container,
        local_transform: Transform::IDENTITY,
        is_static: true,
        source_tile_count,
    });
    output.meshes.push(mesh);
}
