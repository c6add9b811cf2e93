//! Extraction of tile meshes into per-tile buffers.

use bevy::log::debug;

use super::{BuildError, TileSystem};
use crate::grid::{TileCoord, TileMeshMap};
use crate::mesh::{MaterialKey, MeshAssembler, MeshBuffer};

/// Extracts every static tile of `row` into `map`.
///
/// All parts of a tile are merged into one buffer in world space.
/// Tiles that produced a buffer are appended to `merged`.
pub(crate) fn extract_row<M: MaterialKey>(
    system: &TileSystem<M>,
    row: usize,
    map: &mut TileMeshMap<M>,
    assembler: &mut MeshAssembler<M>,
    merged: &mut Vec<TileCoord>,
) -> Result<(), BuildError> {
    for column in 0..system.grid.column_count {
        let coord = TileCoord::new(row, column);
        let Some(tile) = system.tile(coord) else {
            continue;
        };
        if !tile.contributes_mesh() {
            continue;
        }

        assembler.reset();
        for (part_index, part) in tile.parts.iter().enumerate() {
            part.mesh
                .validate()
                .map_err(|source| BuildError::InvalidSourceMesh {
                    tile: coord,
                    part: part_index,
                    source,
                })?;
            assembler.append_mesh_with_materials(&part.local_to_world, &part.mesh, &part.materials);
        }

        if assembler.index_count() == 0 {
            debug!("Tile {} has no drawable triangles", coord);
            assembler.reset();
            continue;
        }

        let mut buffer = MeshBuffer::new();
        assembler.apply(&mut buffer);
        buffer.smooth = tile.smooth;
        buffer.freeze_normals();

        map.insert(coord, buffer);
        merged.push(coord);
    }

    Ok(())
}
