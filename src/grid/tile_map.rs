//! Arena of per-tile mesh buffers.

use bevy::math::Vec3;

use super::{GridGeometry, TileCoord};
use crate::mesh::{MaterialKey, MeshBuffer};

/// Per-tile mesh buffers of one build, indexed row-major.
///
/// Cells are addressed by a plain `usize` id (`row * columns + column`) so
/// clustering can refer to vertices as `(buffer id, vertex index)` pairs
/// instead of holding references into the buffers.
#[derive(Debug)]
pub struct TileMeshMap<M> {
    rows: usize,
    columns: usize,
    cells: Vec<Option<MeshBuffer<M>>>,
}

impl<M: MaterialKey> TileMeshMap<M> {
    pub fn new(rows: usize, columns: usize) -> Self {
        Self {
            rows,
            columns,
            cells: (0..rows * columns).map(|_| None).collect(),
        }
    }

    pub fn for_grid(grid: &GridGeometry) -> Self {
        Self::new(grid.row_count, grid.column_count)
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn columns(&self) -> usize {
        self.columns
    }

    /// Id of the cell at `(row, column)`.
    #[inline]
    pub fn cell_id(&self, row: usize, column: usize) -> usize {
        debug_assert!(row < self.rows && column < self.columns);
        row * self.columns + column
    }

    pub fn get(&self, coord: TileCoord) -> Option<&MeshBuffer<M>> {
        self.buffer(self.cell_id(coord.row, coord.column))
    }

    pub fn insert(&mut self, coord: TileCoord, buffer: MeshBuffer<M>) {
        let id = self.cell_id(coord.row, coord.column);
        self.cells[id] = Some(buffer);
    }

    #[inline]
    pub fn buffer(&self, id: usize) -> Option<&MeshBuffer<M>> {
        self.cells.get(id).and_then(Option::as_ref)
    }

    #[inline]
    pub fn buffer_mut(&mut self, id: usize) -> Option<&mut MeshBuffer<M>> {
        self.cells.get_mut(id).and_then(Option::as_mut)
    }

    /// Number of cells holding a buffer.
    pub fn occupied(&self) -> usize {
        self.cells.iter().filter(|cell| cell.is_some()).count()
    }

    pub(crate) fn set_position(&mut self, id: usize, vertex: usize, position: Vec3) {
        if let Some(buffer) = self.buffer_mut(id) {
            buffer.positions[vertex] = position;
        }
    }

    /// Normal of a vertex as it was at extraction, falling back to its
    /// current normal.
    pub(crate) fn original_normal(&self, id: usize, vertex: usize) -> Option<Vec3> {
        let buffer = self.buffer(id)?;
        buffer
            .original_normals
            .as_ref()
            .or(buffer.normals.as_ref())
            .map(|normals| normals[vertex])
    }

    pub(crate) fn set_normal(&mut self, id: usize, vertex: usize, normal: Vec3) {
        if let Some(normals) = self.buffer_mut(id).and_then(|buffer| buffer.normals.as_mut()) {
            normals[vertex] = normal;
        }
    }
}
