//! Procedural tile meshes.
//!
//! Procedural tiles have no authored mesh. Each one becomes a single quad
//! covering its cell, facing +Z, and the quads of a storage chunk share one
//! mesh whose indices must fit in 16 bits.

use bevy::math::{Vec2, Vec3, vec2, vec3};

use super::{BuildError, TileSystem};
use crate::grid::ChunkCoord;
use crate::mesh::{CombinedMesh, MaterialKey, MeshBuffer, Submesh};

/// Vertex limit of a procedural chunk mesh.
pub const PROCEDURAL_VERTEX_LIMIT: usize = u16::MAX as usize + 1;

/// A tile drawn as a flat, generated quad.
#[derive(Clone, Debug, PartialEq)]
pub struct ProceduralTile<M> {
    pub material: M,
    pub uv_min: Vec2,
    pub uv_max: Vec2,
    pub color: [f32; 4],
}

impl<M> ProceduralTile<M> {
    pub fn new(material: M) -> Self {
        Self {
            material,
            uv_min: Vec2::ZERO,
            uv_max: Vec2::ONE,
            color: [1.0; 4],
        }
    }

    /// Set the atlas rectangle sampled by the quad.
    pub fn with_uv_rect(mut self, uv_min: Vec2, uv_max: Vec2) -> Self {
        self.uv_min = uv_min;
        self.uv_max = uv_max;
        self
    }

    pub fn with_color(mut self, color: [f32; 4]) -> Self {
        self.color = color;
        self
    }
}

/// Baked procedural mesh of one storage chunk.
#[derive(Clone, Debug)]
pub(crate) struct ProceduralChunkMesh<M> {
    pub chunk: ChunkCoord,
    pub mesh: CombinedMesh<M>,
}

/// Number of tiles with procedural data.
pub(crate) fn procedural_tile_count<M: MaterialKey>(system: &TileSystem<M>) -> usize {
    system
        .tiles
        .iter()
        .flatten()
        .filter(|tile| tile.procedural.is_some())
        .count()
}

/// Bakes one mesh per storage chunk that holds procedural tiles.
pub(crate) fn generate_procedural_meshes<M: MaterialKey>(
    system: &TileSystem<M>,
) -> Result<Vec<ProceduralChunkMesh<M>>, BuildError> {
    let grid = &system.grid;
    let mut meshes = Vec::new();

    for chunk in grid.storage_chunks() {
        let tiles: Vec<_> = chunk
            .tiles()
            .filter_map(|coord| {
                system
                    .tile(coord)
                    .and_then(|tile| tile.procedural.as_ref())
                    .map(|procedural| (coord, procedural))
            })
            .collect();
        if tiles.is_empty() {
            continue;
        }

        let vertex_count = tiles.len() * 4;
        if vertex_count > PROCEDURAL_VERTEX_LIMIT {
            return Err(BuildError::ProceduralIndexOverflow {
                chunk: chunk.coord,
                vertex_count,
                limit: PROCEDURAL_VERTEX_LIMIT,
            });
        }

        let mut buffer = MeshBuffer::<M> {
            positions: Vec::with_capacity(vertex_count),
            normals: Some(Vec::with_capacity(vertex_count)),
            uv0: Some(Vec::with_capacity(vertex_count)),
            colors: Some(Vec::with_capacity(vertex_count)),
            ..Default::default()
        };

        for (coord, tile) in tiles {
            let origin = grid.cell_origin(coord);
            let base = buffer.positions.len() as u32;
            push_quad(&mut buffer, origin, grid.cell_size, tile);

            let slot = match buffer
                .submeshes
                .iter()
                .position(|submesh| submesh.material == tile.material)
            {
                Some(slot) => slot,
                None => {
                    buffer
                        .submeshes
                        .push(Submesh::new(tile.material.clone(), Vec::new()));
                    buffer.submeshes.len() - 1
                }
            };
            buffer.submeshes[slot]
                .indices
                .extend([0, 1, 2, 0, 2, 3].map(|i| base + i));
        }

        meshes.push(ProceduralChunkMesh {
            chunk: chunk.coord,
            mesh: buffer.to_single_mesh(),
        });
    }

    Ok(meshes)
}

/// Counter-clockwise when seen from +Z, starting bottom-left.
fn push_quad<M>(buffer: &mut MeshBuffer<M>, origin: Vec3, cell: Vec3, tile: &ProceduralTile<M>) {
    let corners = [
        (vec3(0.0, -cell.y, 0.0), vec2(tile.uv_min.x, tile.uv_max.y)),
        (vec3(cell.x, -cell.y, 0.0), tile.uv_max),
        (vec3(cell.x, 0.0, 0.0), vec2(tile.uv_max.x, tile.uv_min.y)),
        (Vec3::ZERO, tile.uv_min),
    ];

    for (offset, uv) in corners {
        buffer.positions.push(origin + offset);
        if let Some(normals) = &mut buffer.normals {
            normals.push(Vec3::Z);
        }
        if let Some(uvs) = &mut buffer.uv0 {
            uvs.push(uv);
        }
        if let Some(colors) = &mut buffer.colors {
            colors.push(tile.color);
        }
    }
}
