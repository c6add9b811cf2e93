//! Box collider reduction.

use bevy::math::{Vec3, vec3};

use super::TileSystem;
use crate::grid::TileCoord;
use crate::mesh::MaterialKey;

/// A box collider covering a rectangle of tiles.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ReducedCollider {
    /// Top-left tile of the rectangle.
    pub origin: TileCoord,
    pub rows: usize,
    pub columns: usize,
    /// Center in tile-system local space.
    pub center: Vec3,
    pub size: Vec3,
}

/// Merges the box colliders of all tiles into as few boxes as the greedy
/// sweep finds.
///
/// Returns the boxes and the tiles whose colliders they replace.
pub(crate) fn reduce_box_colliders<M: MaterialKey>(
    system: &TileSystem<M>,
) -> (Vec<ReducedCollider>, Vec<TileCoord>) {
    let grid = &system.grid;
    let (rows, columns) = (grid.row_count, grid.column_count);

    let solid: Vec<bool> = system
        .tiles
        .iter()
        .map(|tile| tile.as_ref().is_some_and(|tile| tile.box_collider))
        .collect();
    let mut visited = vec![false; solid.len()];

    let open = |visited: &[bool], row: usize, column: usize| {
        let index = row * columns + column;
        solid[index] && !visited[index]
    };

    let mut colliders = Vec::new();
    let mut replaced = Vec::new();

    for row in 0..rows {
        for column in 0..columns {
            if !open(&visited, row, column) {
                continue;
            }

            let mut width = 1;
            while column + width < columns && open(&visited, row, column + width) {
                width += 1;
            }

            let mut height = 1;
            while row + height < rows
                && (column..column + width).all(|c| open(&visited, row + height, c))
            {
                height += 1;
            }

            for r in row..row + height {
                for c in column..column + width {
                    visited[r * columns + c] = true;
                    replaced.push(TileCoord::new(r, c));
                }
            }

            let origin = TileCoord::new(row, column);
            let size = vec3(
                width as f32 * grid.cell_size.x,
                height as f32 * grid.cell_size.y,
                grid.cell_size.z,
            );
            let center = grid.cell_origin(origin) + vec3(size.x * 0.5, -size.y * 0.5, 0.0);

            colliders.push(ReducedCollider {
                origin,
                rows: height,
                columns: width,
                center,
                size,
            });
        }
    }

    replaced.sort();
    (colliders, replaced)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::TileInput;
    use crate::grid::GridGeometry;

    fn system_with(rows: usize, columns: usize, solid: &[(usize, usize)]) -> TileSystem<u32> {
        let mut system = TileSystem::new("colliders", GridGeometry::new(rows, columns));
        for &(row, column) in solid {
            system.set_tile(TileCoord::new(row, column), TileInput::new().with_box_collider(true));
        }
        system
    }

    #[test]
    fn test_full_block_is_one_collider() {
        let cells: Vec<_> = (0..3).flat_map(|r| (0..4).map(move |c| (r, c))).collect();
        let system = system_with(3, 4, &cells);

        let (colliders, replaced) = reduce_box_colliders(&system);
        assert_eq!(colliders.len(), 1);
        assert_eq!(replaced.len(), 12);

        let collider = colliders[0];
        assert_eq!((collider.rows, collider.columns), (3, 4));
        assert_eq!(collider.size, vec3(4.0, 3.0, 1.0));
        assert_eq!(collider.center, vec3(2.0, -1.5, 0.0));
    }

    #[test]
    fn test_l_shape_splits() {
        // ##
        // #.
        let system = system_with(2, 2, &[(0, 0), (0, 1), (1, 0)]);
        let (colliders, replaced) = reduce_box_colliders(&system);

        assert_eq!(colliders.len(), 2);
        assert_eq!((colliders[0].rows, colliders[0].columns), (1, 2));
        assert_eq!(colliders[1].origin, TileCoord::new(1, 0));
        assert_eq!(replaced.len(), 3);
    }

    #[test]
    fn test_tiles_without_colliders_are_ignored() {
        let mut system = system_with(1, 3, &[(0, 0), (0, 2)]);
        system.set_tile(TileCoord::new(0, 1), TileInput::new());

        let (colliders, _) = reduce_box_colliders(&system);
        assert_eq!(colliders.len(), 2);
        assert!(colliders.iter().all(|collider| collider.columns == 1));
    }
}
