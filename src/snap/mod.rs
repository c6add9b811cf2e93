//! Vertex snapping and normal smoothing across tile boundaries.
//!
//! Tiles are authored independently, so the vertices along a shared edge
//! rarely line up exactly. Before tiles are merged, nearby vertices of
//! neighboring tiles are clustered and moved to their centroid ("snapping").
//! Tiles flagged as smooth additionally blend their normals across the
//! cluster so lighting shows no seam.
//!
//! Two passes run over the grid:
//!
//! - **Static pass** (when static snapping is enabled): every 2×2 window of
//!   cells snaps the vertices of its non-smooth buffers.
//! - **Smooth pass**: every cell acts as the anchor of the 3×3 footprint
//!   around it. Vertices of all smooth buffers in the footprint are snapped,
//!   but blended normals are only written into the anchor's vertices. Blending
//!   reads the normals frozen at extraction, so the result does not depend on
//!   which anchor is visited first.
//!
//! Windows are clipped at the grid edges; there is no wrap-around.

mod cluster;

pub use cluster::{centroid, find_snapped_vertices};

use bevy::math::Vec3;

use crate::grid::TileMeshMap;
use crate::mesh::MaterialKey;

/// Snapping configuration.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SnapSettings {
    /// Snap vertices of non-smooth tiles as well.
    pub static_vertex_snapping: bool,
    /// Maximum distance between a cluster seed and its members.
    pub threshold: f32,
}

impl Default for SnapSettings {
    fn default() -> Self {
        Self {
            static_vertex_snapping: false,
            threshold: 0.001,
        }
    }
}

/// One vertex of one tile buffer in the arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ClusterVertex {
    /// Cell id in the [`TileMeshMap`].
    pub buffer: usize,
    pub vertex: usize,
}

/// Reusable working memory for clustering.
#[derive(Debug, Default)]
pub struct ClusterScratch {
    candidates: Vec<ClusterVertex>,
    positions: Vec<Vec3>,
    consumed: Vec<bool>,
    members: Vec<usize>,
}

impl ClusterScratch {
    pub fn new() -> Self {
        Self::default()
    }

    fn clear(&mut self) {
        self.candidates.clear();
        self.positions.clear();
    }

    fn collect<M: MaterialKey>(&mut self, map: &TileMeshMap<M>, id: usize) {
        if let Some(buffer) = map.buffer(id) {
            for (vertex, &position) in buffer.positions.iter().enumerate() {
                self.candidates.push(ClusterVertex { buffer: id, vertex });
                self.positions.push(position);
            }
        }
    }
}

/// Runs both passes over every row.
pub fn snap_and_smooth<M: MaterialKey>(
    map: &mut TileMeshMap<M>,
    settings: &SnapSettings,
    scratch: &mut ClusterScratch,
) {
    for row in 0..map.rows() {
        snap_and_smooth_row(map, row, settings, scratch);
    }
}

/// Runs both passes for the windows starting on `row`.
pub fn snap_and_smooth_row<M: MaterialKey>(
    map: &mut TileMeshMap<M>,
    row: usize,
    settings: &SnapSettings,
    scratch: &mut ClusterScratch,
) {
    let rows = map.rows();
    let columns = map.columns();

    if settings.static_vertex_snapping && row < rows.saturating_sub(1).max(1) {
        for column in 0..columns.saturating_sub(1).max(1) {
            snap_static_window(map, row, column, settings.threshold, scratch);
        }
    }

    for column in 0..columns {
        smooth_around(map, row, column, settings.threshold, scratch);
    }
}

/// Static pass for the 2×2 window with top-left cell `(row, column)`.
fn snap_static_window<M: MaterialKey>(
    map: &mut TileMeshMap<M>,
    row: usize,
    column: usize,
    threshold: f32,
    scratch: &mut ClusterScratch,
) {
    scratch.clear();
    for r in row..(row + 2).min(map.rows()) {
        for c in column..(column + 2).min(map.columns()) {
            let id = map.cell_id(r, c);
            if map.buffer(id).is_some_and(|buffer| !buffer.smooth) {
                scratch.collect(map, id);
            }
        }
    }

    cluster_and_apply(map, scratch, threshold, None);
}

/// Smooth pass for the 3×3 footprint anchored at `(row, column)`.
fn smooth_around<M: MaterialKey>(
    map: &mut TileMeshMap<M>,
    row: usize,
    column: usize,
    threshold: f32,
    scratch: &mut ClusterScratch,
) {
    let rows = row.saturating_sub(1)..(row + 2).min(map.rows());
    let columns = column.saturating_sub(1)..(column + 2).min(map.columns());

    scratch.clear();
    for r in rows {
        for c in columns.clone() {
            let id = map.cell_id(r, c);
            if map.buffer(id).is_some_and(|buffer| buffer.smooth) {
                scratch.collect(map, id);
            }
        }
    }
    if scratch.candidates.is_empty() {
        return;
    }

    let anchor = map.cell_id(row, column);
    let anchor = map
        .buffer(anchor)
        .is_some_and(|buffer| buffer.smooth)
        .then_some(anchor);

    cluster_and_apply(map, scratch, threshold, anchor);
}

/// Clusters the collected candidates and writes the results back.
///
/// Clusters of two or more vertices are snapped to their centroid. With an
/// anchor, members belonging to the anchor buffer also receive the
/// normalized mean of all members' original normals.
fn cluster_and_apply<M: MaterialKey>(
    map: &mut TileMeshMap<M>,
    scratch: &mut ClusterScratch,
    threshold: f32,
    anchor: Option<usize>,
) {
    let count = scratch.candidates.len();
    if count < 2 {
        return;
    }

    scratch.consumed.clear();
    scratch.consumed.resize(count, false);

    for seed in 0..count {
        find_snapped_vertices(
            &scratch.positions,
            &mut scratch.consumed,
            seed,
            threshold,
            &mut scratch.members,
        );
        if scratch.members.len() < 2 {
            continue;
        }

        let snapped = centroid(&scratch.positions, &scratch.members);
        for &member in &scratch.members {
            let vertex = scratch.candidates[member];
            scratch.positions[member] = snapped;
            map.set_position(vertex.buffer, vertex.vertex, snapped);
        }

        let Some(anchor) = anchor else {
            continue;
        };
        if !scratch
            .members
            .iter()
            .any(|&member| scratch.candidates[member].buffer == anchor)
        {
            continue;
        }

        let blended = scratch
            .members
            .iter()
            .filter_map(|&member| {
                let vertex = scratch.candidates[member];
                map.original_normal(vertex.buffer, vertex.vertex)
            })
            .sum::<Vec3>()
            .normalize_or_zero();
        if blended == Vec3::ZERO {
            continue;
        }

        for &member in &scratch.members {
            let vertex = scratch.candidates[member];
            if vertex.buffer == anchor {
                map.set_normal(vertex.buffer, vertex.vertex, blended);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::TileCoord;
    use crate::mesh::{MeshBuffer, Submesh};
    use bevy::math::vec3;

    /// Unit quad with its top-left corner at `origin`, facing `normal`.
    fn tile(origin: Vec3, normal: Vec3, smooth: bool) -> MeshBuffer<u32> {
        let mut buffer = MeshBuffer {
            positions: vec![
                origin + vec3(0.0, -1.0, 0.0),
                origin + vec3(1.0, -1.0, 0.0),
                origin + vec3(1.0, 0.0, 0.0),
                origin,
            ],
            normals: Some(vec![normal; 4]),
            submeshes: vec![Submesh::new(0, vec![0, 1, 2, 0, 2, 3])],
            smooth,
            ..Default::default()
        };
        buffer.freeze_normals();
        buffer
    }

    fn settings(static_vertex_snapping: bool, threshold: f32) -> SnapSettings {
        SnapSettings {
            static_vertex_snapping,
            threshold,
        }
    }

    fn position(map: &TileMeshMap<u32>, row: usize, column: usize, vertex: usize) -> Vec3 {
        map.get(TileCoord::new(row, column)).unwrap().positions[vertex]
    }

    fn normal(map: &TileMeshMap<u32>, row: usize, column: usize, vertex: usize) -> Vec3 {
        map.get(TileCoord::new(row, column)).unwrap().normals.as_ref().unwrap()[vertex]
    }

    /// Two smooth tiles side by side with a 0.005 gap along the shared edge.
    fn smooth_pair() -> TileMeshMap<u32> {
        let tilt = vec3(0.3, 0.0, 1.0).normalize();
        let mut map = TileMeshMap::new(1, 2);
        map.insert(TileCoord::new(0, 0), tile(Vec3::ZERO, Vec3::Z, true));
        map.insert(TileCoord::new(0, 1), tile(vec3(1.005, 0.0, 0.0), tilt, true));
        map
    }

    #[test]
    fn test_smooth_pair_snaps_shared_edge() {
        let mut map = smooth_pair();
        let mut scratch = ClusterScratch::new();
        snap_and_smooth(&mut map, &settings(false, 0.01), &mut scratch);

        // Right edge of the left tile meets the left edge of the right tile.
        for (left, right) in [(1, 0), (2, 3)] {
            let a = position(&map, 0, 0, left);
            let b = position(&map, 0, 1, right);
            assert_eq!(a, b);
            assert!((a.x - 1.0025).abs() < 1e-5);

            let na = normal(&map, 0, 0, left);
            let nb = normal(&map, 0, 1, right);
            assert!(na.abs_diff_eq(nb, 1e-6));
            assert!((na.length() - 1.0).abs() < 1e-5);
            assert!(na.x > 0.0 && na.x < vec3(0.3, 0.0, 1.0).normalize().x);
        }

        // Outer corners are untouched.
        assert_eq!(position(&map, 0, 0, 0), vec3(0.0, -1.0, 0.0));
        assert_eq!(normal(&map, 0, 0, 0), Vec3::Z);
        assert_eq!(position(&map, 0, 1, 1), vec3(2.005, -1.0, 0.0));
    }

    #[test]
    fn test_gap_beyond_threshold_is_kept() {
        let mut map = smooth_pair();
        let mut scratch = ClusterScratch::new();
        snap_and_smooth(&mut map, &settings(false, 0.001), &mut scratch);

        assert_eq!(position(&map, 0, 0, 1), vec3(1.0, -1.0, 0.0));
        assert_eq!(position(&map, 0, 1, 0), vec3(1.005, -1.0, 0.0));
        assert_eq!(normal(&map, 0, 0, 1), Vec3::Z);
    }

    #[test]
    fn test_static_snapping_leaves_normals() {
        let mut map = TileMeshMap::new(2, 2);
        map.insert(TileCoord::new(0, 0), tile(Vec3::ZERO, Vec3::Z, false));
        map.insert(TileCoord::new(1, 1), tile(vec3(1.004, -1.004, 0.0), Vec3::X, false));

        let mut scratch = ClusterScratch::new();

        snap_and_smooth(&mut map, &settings(false, 0.01), &mut scratch);
        assert_eq!(position(&map, 0, 0, 1), vec3(1.0, -1.0, 0.0));

        snap_and_smooth(&mut map, &settings(true, 0.01), &mut scratch);
        // Bottom-right corner of (0, 0) meets top-left corner of (1, 1).
        let snapped = position(&map, 0, 0, 1);
        assert_eq!(snapped, position(&map, 1, 1, 3));
        assert!(snapped.abs_diff_eq(vec3(1.002, -1.002, 0.0), 1e-5));
        assert_eq!(normal(&map, 0, 0, 1), Vec3::Z);
        assert_eq!(normal(&map, 1, 1, 3), Vec3::X);
    }

    #[test]
    fn test_static_and_smooth_buffers_do_not_mix() {
        let mut map = TileMeshMap::new(1, 2);
        map.insert(TileCoord::new(0, 0), tile(Vec3::ZERO, Vec3::Z, false));
        map.insert(TileCoord::new(0, 1), tile(vec3(1.005, 0.0, 0.0), Vec3::Z, true));

        let mut scratch = ClusterScratch::new();
        snap_and_smooth(&mut map, &settings(true, 0.01), &mut scratch);

        assert_eq!(position(&map, 0, 0, 1), vec3(1.0, -1.0, 0.0));
        assert_eq!(position(&map, 0, 1, 0), vec3(1.005, -1.0, 0.0));
    }

    #[test]
    fn test_snapping_is_idempotent() {
        let mut map = smooth_pair();
        let mut scratch = ClusterScratch::new();
        let config = settings(true, 0.01);
        snap_and_smooth(&mut map, &config, &mut scratch);

        let snapshot: Vec<Vec<Vec3>> = (0..2)
            .map(|column| map.get(TileCoord::new(0, column)).unwrap().positions.clone())
            .collect();

        snap_and_smooth(&mut map, &config, &mut scratch);
        for column in 0..2 {
            let positions = &map.get(TileCoord::new(0, column)).unwrap().positions;
            for (after, before) in positions.iter().zip(&snapshot[column]) {
                assert!(after.abs_diff_eq(*before, 1e-6));
            }
        }
    }

    #[test]
    fn test_normals_blend_across_each_shared_edge() {
        // Three smooth tiles in a row; the far edge of the last tile has no
        // neighbor and keeps its normal.
        let mut map = TileMeshMap::new(1, 3);
        map.insert(TileCoord::new(0, 0), tile(Vec3::ZERO, Vec3::Z, true));
        map.insert(TileCoord::new(0, 1), tile(vec3(1.0, 0.0, 0.0), Vec3::X, true));
        map.insert(TileCoord::new(0, 2), tile(vec3(2.0, 0.0, 0.0), Vec3::Z, true));

        let mut scratch = ClusterScratch::new();
        snap_and_smooth(&mut map, &settings(false, 0.001), &mut scratch);

        let expected = (Vec3::Z + Vec3::X).normalize();
        assert!(normal(&map, 0, 0, 1).abs_diff_eq(expected, 1e-6));
        assert!(normal(&map, 0, 1, 0).abs_diff_eq(expected, 1e-6));
        assert!(normal(&map, 0, 1, 1).abs_diff_eq(expected, 1e-6));
        assert!(normal(&map, 0, 2, 0).abs_diff_eq(expected, 1e-6));
        assert_eq!(normal(&map, 0, 2, 1), Vec3::Z);
    }
}
