//! Tile-system grid geometry and chunk partitioning.
//!
//! Rows grow downwards: the cell at `(row, column)` has its top-left corner at
//! `(column * cell.x, -row * cell.y, 0)` in tile-system local space.

use std::fmt;
use std::ops::Range;

use bevy::math::{Vec3, vec3};

mod tile_map;

pub use tile_map::TileMeshMap;

/// Position of a tile in the grid.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileCoord {
    pub row: usize,
    pub column: usize,
}

impl TileCoord {
    #[inline]
    pub const fn new(row: usize, column: usize) -> Self {
        Self { row, column }
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.column)
    }
}

/// Position of a chunk in a chunk grid (storage or combine).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkCoord {
    pub row: usize,
    pub column: usize,
}

impl ChunkCoord {
    #[inline]
    pub const fn new(row: usize, column: usize) -> Self {
        Self { row, column }
    }
}

impl fmt::Display for ChunkCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.row, self.column)
    }
}

/// Shape of a tile system.
#[derive(Clone, Debug, PartialEq)]
pub struct GridGeometry {
    pub row_count: usize,
    pub column_count: usize,
    /// Storage chunk width in tiles.
    pub chunk_width: usize,
    /// Storage chunk height in tiles.
    pub chunk_height: usize,
    pub cell_size: Vec3,
}

impl Default for GridGeometry {
    fn default() -> Self {
        Self {
            row_count: 1,
            column_count: 1,
            chunk_width: 30,
            chunk_height: 30,
            cell_size: Vec3::ONE,
        }
    }
}

impl GridGeometry {
    /// Create a grid with default chunk and cell size.
    pub fn new(row_count: usize, column_count: usize) -> Self {
        Self {
            row_count,
            column_count,
            ..Default::default()
        }
    }

    pub fn with_chunk_size(mut self, width: usize, height: usize) -> Self {
        self.chunk_width = width;
        self.chunk_height = height;
        self
    }

    pub fn with_cell_size(mut self, cell_size: Vec3) -> Self {
        self.cell_size = cell_size;
        self
    }

    #[inline]
    pub fn tile_count(&self) -> usize {
        self.row_count * self.column_count
    }

    #[inline]
    pub fn contains(&self, coord: TileCoord) -> bool {
        coord.row < self.row_count && coord.column < self.column_count
    }

    /// Row-major index of `coord`.
    #[inline]
    pub fn index_of(&self, coord: TileCoord) -> usize {
        coord.row * self.column_count + coord.column
    }

    #[inline]
    pub fn coord_of(&self, index: usize) -> TileCoord {
        TileCoord::new(index / self.column_count, index % self.column_count)
    }

    /// Number of storage chunk rows, counting a cropped last row.
    pub fn chunk_rows(&self) -> usize {
        self.row_count.div_ceil(self.chunk_height.max(1))
    }

    /// Number of storage chunk columns, counting a cropped last column.
    pub fn chunk_columns(&self) -> usize {
        self.column_count.div_ceil(self.chunk_width.max(1))
    }

    pub fn chunk_of(&self, coord: TileCoord) -> ChunkCoord {
        ChunkCoord::new(
            coord.row / self.chunk_height.max(1),
            coord.column / self.chunk_width.max(1),
        )
    }

    /// Storage chunks row-major with their tile ranges.
    pub fn storage_chunks(&self) -> Vec<CombineChunk> {
        chunk_ranges(
            self.row_count,
            self.column_count,
            self.chunk_height.max(1),
            self.chunk_width.max(1),
        )
        .collect()
    }

    /// Top-left corner of a cell in tile-system local space.
    pub fn cell_origin(&self, coord: TileCoord) -> Vec3 {
        vec3(
            coord.column as f32 * self.cell_size.x,
            -(coord.row as f32) * self.cell_size.y,
            0.0,
        )
    }

    /// Center of a cell in tile-system local space.
    pub fn cell_center(&self, coord: TileCoord) -> Vec3 {
        self.cell_origin(coord) + vec3(self.cell_size.x * 0.5, -self.cell_size.y * 0.5, 0.0)
    }
}

/// How tiles are grouped when their meshes are combined.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CombineMethod {
    /// Tile meshes are left as they are.
    None,
    /// One combined mesh per storage chunk.
    #[default]
    ByChunk,
    /// One combined mesh for the whole tile system.
    ByTileSystem,
    /// Combine-chunks of a custom size in tiles.
    CustomChunkInTiles,
}

/// A rectangular range of tiles.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CombineChunk {
    pub coord: ChunkCoord,
    pub rows: Range<usize>,
    pub columns: Range<usize>,
}

impl CombineChunk {
    pub fn tiles(&self) -> impl Iterator<Item = TileCoord> + '_ {
        self.rows
            .clone()
            .flat_map(move |row| self.columns.clone().map(move |column| TileCoord::new(row, column)))
    }
}

/// Combine-chunk layout derived from a grid and a [`CombineMethod`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CombinePlan {
    /// Combine-chunk width in tiles.
    pub chunk_width: usize,
    /// Combine-chunk height in tiles.
    pub chunk_height: usize,
    pub chunk_rows: usize,
    pub chunk_columns: usize,
    /// Combine-chunks line up with storage chunks, so combined output can live
    /// in the storage chunk's existing container.
    pub can_reuse_storage_container: bool,
}

impl CombinePlan {
    /// Returns `None` for [`CombineMethod::None`].
    ///
    /// `custom_width` and `custom_height` are only read for
    /// [`CombineMethod::CustomChunkInTiles`] and are clamped to the grid.
    pub fn new(
        method: CombineMethod,
        grid: &GridGeometry,
        custom_width: usize,
        custom_height: usize,
    ) -> Option<Self> {
        let (width, height) = match method {
            CombineMethod::None => return None,
            CombineMethod::ByChunk => (grid.chunk_width, grid.chunk_height),
            CombineMethod::ByTileSystem => (grid.column_count, grid.row_count),
            CombineMethod::CustomChunkInTiles => (
                custom_width.clamp(1, grid.column_count.max(1)),
                custom_height.clamp(1, grid.row_count.max(1)),
            ),
        };
        let width = width.max(1);
        let height = height.max(1);

        Some(Self {
            chunk_width: width,
            chunk_height: height,
            chunk_rows: grid.row_count.div_ceil(height),
            chunk_columns: grid.column_count.div_ceil(width),
            can_reuse_storage_container: width == grid.chunk_width && height == grid.chunk_height,
        })
    }

    #[inline]
    pub fn chunk_count(&self) -> usize {
        self.chunk_rows * self.chunk_columns
    }

    /// Combine-chunks row-major, cropping the last row and column.
    pub fn chunks(&self, grid: &GridGeometry) -> Vec<CombineChunk> {
        chunk_ranges(grid.row_count, grid.column_count, self.chunk_height, self.chunk_width)
            .collect()
    }
}

fn chunk_ranges(
    row_count: usize,
    column_count: usize,
    chunk_height: usize,
    chunk_width: usize,
) -> impl Iterator<Item = CombineChunk> {
    let chunk_rows = row_count.div_ceil(chunk_height);
    let chunk_columns = column_count.div_ceil(chunk_width);

    (0..chunk_rows).flat_map(move |chunk_row| {
        (0..chunk_columns).map(move |chunk_column| {
            let row_start = chunk_row * chunk_height;
            let column_start = chunk_column * chunk_width;
            CombineChunk {
                coord: ChunkCoord::new(chunk_row, chunk_column),
                rows: row_start..(row_start + chunk_height).min(row_count),
                columns: column_start..(column_start + chunk_width).min(column_count),
            }
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_round_trip() {
        let grid = GridGeometry::new(3, 5);
        let coord = TileCoord::new(2, 4);
        assert_eq!(grid.index_of(coord), 14);
        assert_eq!(grid.coord_of(14), coord);
        assert!(grid.contains(coord));
        assert!(!grid.contains(TileCoord::new(3, 0)));
    }

    #[test]
    fn test_cell_origin_grows_down() {
        let grid = GridGeometry::new(4, 4).with_cell_size(vec3(2.0, 3.0, 1.0));
        assert_eq!(grid.cell_origin(TileCoord::new(1, 2)), vec3(4.0, -3.0, 0.0));
        assert_eq!(grid.cell_center(TileCoord::new(0, 0)), vec3(1.0, -1.5, 0.0));
    }

    #[test]
    fn test_by_chunk_plan() {
        let grid = GridGeometry::new(8, 8).with_chunk_size(4, 4);
        let plan = CombinePlan::new(CombineMethod::ByChunk, &grid, 0, 0).unwrap();

        assert_eq!(plan.chunk_count(), 4);
        assert!(plan.can_reuse_storage_container);

        let chunks = plan.chunks(&grid);
        assert_eq!(chunks[3].rows, 4..8);
        assert_eq!(chunks[3].columns, 4..8);
        assert_eq!(chunks[3].tiles().count(), 16);
    }

    #[test]
    fn test_custom_plan_crops_last_chunk() {
        let grid = GridGeometry::new(5, 7).with_chunk_size(4, 4);
        let plan = CombinePlan::new(CombineMethod::CustomChunkInTiles, &grid, 3, 2).unwrap();

        assert_eq!((plan.chunk_rows, plan.chunk_columns), (3, 3));
        assert!(!plan.can_reuse_storage_container);

        let last = plan.chunks(&grid).pop().unwrap();
        assert_eq!(last.coord, ChunkCoord::new(2, 2));
        assert_eq!(last.rows, 4..5);
        assert_eq!(last.columns, 6..7);
    }

    #[test]
    fn test_custom_plan_clamps_to_grid() {
        let grid = GridGeometry::new(2, 3);
        let plan = CombinePlan::new(CombineMethod::CustomChunkInTiles, &grid, 100, 0).unwrap();
        assert_eq!((plan.chunk_width, plan.chunk_height), (3, 1));
    }

    #[test]
    fn test_tile_system_plan() {
        let grid = GridGeometry::new(10, 12).with_chunk_size(4, 4);
        let plan = CombinePlan::new(CombineMethod::ByTileSystem, &grid, 0, 0).unwrap();
        assert_eq!(plan.chunk_count(), 1);
        assert!(CombinePlan::new(CombineMethod::None, &grid, 0, 0).is_none());
    }

    #[test]
    fn test_storage_chunks() {
        let grid = GridGeometry::new(5, 5).with_chunk_size(2, 3);
        assert_eq!(grid.chunk_rows(), 2);
        assert_eq!(grid.chunk_columns(), 3);
        assert_eq!(grid.storage_chunks().len(), 6);
        assert_eq!(grid.chunk_of(TileCoord::new(4, 4)), ChunkCoord::new(1, 2));
    }
}
