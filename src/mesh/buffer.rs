//! Per-tile and per-chunk mesh buffers.

use bevy::math::{Mat3, Mat4, Vec2, Vec3, Vec4};

use super::assembler::MeshAssembler;
use super::attributes::VertexAttributes;
use super::output::CombinedMesh;
use super::tangents;
use super::MaterialKey;

/// Triangle list drawn with one material.
#[derive(Clone, Debug, PartialEq)]
pub struct Submesh<M> {
    pub material: M,
    /// Vertex indices, three per triangle.
    pub indices: Vec<u32>,
}

impl<M> Submesh<M> {
    pub fn new(material: M, indices: Vec<u32>) -> Self {
        Self { material, indices }
    }

    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// Geometry of one tile or one combined chunk.
///
/// Optional arrays are either `None` or exactly `positions.len()` long, and
/// every index in `submeshes` is below `positions.len()`. Breaking either rule
/// is a contract violation; see [`MeshBuffer::validate`].
///
/// Submeshes keep the order in which their material was first added.
#[derive(Clone, Debug)]
pub struct MeshBuffer<M> {
    pub positions: Vec<Vec3>,
    pub normals: Option<Vec<Vec3>>,
    pub uv0: Option<Vec<Vec2>>,
    pub uv1: Option<Vec<Vec2>>,
    pub colors: Option<Vec<[f32; 4]>>,
    pub tangents: Option<Vec<Vec4>>,
    pub submeshes: Vec<Submesh<M>>,
    /// Whether normals of this buffer are blended with smooth neighbors.
    pub smooth: bool,
    /// Normals as they were when the tile was extracted.
    ///
    /// Smoothing reads from here so that blending inside one cluster does not
    /// depend on the order in which its members are visited.
    pub original_normals: Option<Vec<Vec3>>,
}

impl<M> Default for MeshBuffer<M> {
    fn default() -> Self {
        Self {
            positions: Vec::new(),
            normals: None,
            uv0: None,
            uv1: None,
            colors: None,
            tangents: None,
            submeshes: Vec::new(),
            smooth: false,
            original_normals: None,
        }
    }
}

impl<M: MaterialKey> MeshBuffer<M> {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.submeshes.iter().map(Submesh::triangle_count).sum()
    }

    /// True when there is nothing to draw: no positions or no submeshes.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty() || self.submeshes.is_empty()
    }

    pub fn attributes(&self) -> VertexAttributes {
        VertexAttributes {
            normals: self.normals.is_some(),
            uv0: self.uv0.is_some(),
            uv1: self.uv1.is_some(),
            colors: self.colors.is_some(),
            tangents: self.tangents.is_some(),
        }
    }

    /// Triangle list for `material`, if the buffer draws with it.
    pub fn submesh(&self, material: &M) -> Option<&[u32]> {
        self.submeshes
            .iter()
            .find(|submesh| submesh.material == *material)
            .map(|submesh| submesh.indices.as_slice())
    }

    /// Iterates materials in first-encountered order.
    pub fn materials(&self) -> impl Iterator<Item = &M> {
        self.submeshes.iter().map(|submesh| &submesh.material)
    }

    /// Copies the current normals into [`original_normals`](Self::original_normals).
    pub fn freeze_normals(&mut self) {
        self.original_normals = self.normals.clone();
    }

    /// Asserts the structural invariants of the buffer.
    ///
    /// # Panics
    /// Panics if an optional array has the wrong length, if a submesh is not
    /// a triangle list, or if an index points past the last vertex.
    pub fn validate(&self) {
        let count = self.positions.len();

        check_len("normals", self.normals.as_deref(), count);
        check_len("uv0", self.uv0.as_deref(), count);
        check_len("uv1", self.uv1.as_deref(), count);
        check_len("colors", self.colors.as_deref(), count);
        check_len("tangents", self.tangents.as_deref(), count);
        check_len("original normals", self.original_normals.as_deref(), count);

        for (i, submesh) in self.submeshes.iter().enumerate() {
            assert!(
                submesh.indices.len() % 3 == 0,
                "Submesh {} has {} indices, which is not a triangle list",
                i,
                submesh.indices.len()
            );
            if let Some(&max) = submesh.indices.iter().max() {
                assert!(
                    (max as usize) < count,
                    "Submesh {} references vertex {} but the buffer has {} vertices",
                    i,
                    max,
                    count
                );
            }
        }
    }

    /// Transforms the buffer by `matrix`.
    ///
    /// Positions are transformed as points. Normals and tangent directions use
    /// the inverse-transpose of the matrix and are renormalized; tangent `w`
    /// is kept. Vertex count and triangle lists are untouched.
    pub fn apply_transform(&mut self, matrix: &Mat4) {
        for position in &mut self.positions {
            *position = matrix.transform_point3(*position);
        }

        let normal_matrix = normal_matrix(matrix);
        if let Some(normals) = &mut self.normals {
            transform_directions(&normal_matrix, normals);
        }
        if let Some(normals) = &mut self.original_normals {
            transform_directions(&normal_matrix, normals);
        }
        if let Some(tangents) = &mut self.tangents {
            for tangent in tangents.iter_mut() {
                let direction = (normal_matrix * tangent.truncate()).normalize_or_zero();
                *tangent = direction.extend(tangent.w);
            }
        }
    }

    /// Regenerates tangents from positions, normals and the first UV channel.
    ///
    /// Does nothing when normals or UVs are missing.
    pub fn compute_tangents(&mut self) {
        let (Some(normals), Some(uvs)) = (&self.normals, &self.uv0) else {
            return;
        };

        self.tangents = Some(tangents::generate(
            &self.positions,
            normals,
            uvs,
            self.submeshes.iter().map(|submesh| submesh.indices.as_slice()),
        ));
    }

    /// Emits one mesh with one submesh per material.
    ///
    /// Materials keep their first-encountered order; materials without any
    /// triangles are dropped.
    pub fn to_single_mesh(&self) -> CombinedMesh<M> {
        CombinedMesh {
            positions: self.positions.clone(),
            normals: self.normals.clone(),
            uv0: self.uv0.clone(),
            uv1: self.uv1.clone(),
            colors: self.colors.clone(),
            tangents: self.tangents.clone(),
            submeshes: self
                .submeshes
                .iter()
                .filter(|submesh| !submesh.indices.is_empty())
                .cloned()
                .collect(),
        }
    }

    /// Emits one compact mesh per material.
    ///
    /// Each mesh only carries the vertices referenced by that material's
    /// triangles, renumbered in first-seen order.
    pub fn to_meshes_per_material(&self, assembler: &mut MeshAssembler<M>) -> Vec<CombinedMesh<M>> {
        let mut meshes = Vec::with_capacity(self.submeshes.len());
        let mut extracted = MeshBuffer::new();

        for index in 0..self.submeshes.len() {
            if self.submeshes[index].indices.is_empty() {
                continue;
            }
            assembler.reset();
            assembler.append_buffer_submesh(self, index);
            assembler.apply(&mut extracted);
            meshes.push(extracted.to_single_mesh());
        }

        meshes
    }
}

fn check_len<T>(name: &str, values: Option<&[T]>, expected: usize) {
    if let Some(values) = values {
        assert_eq!(
            values.len(),
            expected,
            "Attribute {} has {} entries but the buffer has {} vertices",
            name,
            values.len(),
            expected
        );
    }
}

/// Matrix used to transform normals and tangent directions.
///
/// Falls back to the linear part itself for singular matrices.
pub(crate) fn normal_matrix(matrix: &Mat4) -> Mat3 {
    let linear = Mat3::from_mat4(*matrix);
    if linear.determinant().abs() <= f32::EPSILON {
        linear
    } else {
        linear.inverse().transpose()
    }
}

pub(crate) fn transform_directions(normal_matrix: &Mat3, directions: &mut [Vec3]) {
    for direction in directions {
        *direction = (*normal_matrix * *direction).normalize_or_zero();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::math::{Quat, vec2, vec3};

    /// Unit quad in the XY plane facing +Z, drawn with `material`.
    fn quad(material: u32) -> MeshBuffer<u32> {
        MeshBuffer {
            positions: vec![
                vec3(0.0, 0.0, 0.0),
                vec3(1.0, 0.0, 0.0),
                vec3(1.0, 1.0, 0.0),
                vec3(0.0, 1.0, 0.0),
            ],
            normals: Some(vec![Vec3::Z; 4]),
            uv0: Some(vec![
                vec2(0.0, 0.0),
                vec2(1.0, 0.0),
                vec2(1.0, 1.0),
                vec2(0.0, 1.0),
            ]),
            submeshes: vec![Submesh::new(material, vec![0, 1, 2, 0, 2, 3])],
            ..Default::default()
        }
    }

    #[test]
    fn test_is_empty() {
        assert!(MeshBuffer::<u32>::new().is_empty());

        let mut buffer = quad(0);
        assert!(!buffer.is_empty());

        buffer.submeshes.clear();
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_apply_transform_keeps_topology() {
        let mut buffer = quad(0);
        buffer.tangents = Some(vec![Vec4::new(1.0, 0.0, 0.0, -1.0); 4]);
        let before = buffer.submeshes.clone();

        let matrix = Mat4::from_scale_rotation_translation(
            vec3(2.0, 3.0, 1.0),
            Quat::from_rotation_y(std::f32::consts::FRAC_PI_2),
            vec3(5.0, 0.0, 0.0),
        );
        buffer.apply_transform(&matrix);

        assert_eq!(buffer.vertex_count(), 4);
        assert_eq!(buffer.submeshes, before);
        assert_eq!(buffer.normals.as_ref().map(Vec::len), Some(4));

        let normal = buffer.normals.as_ref().unwrap()[0];
        assert!((normal.length() - 1.0).abs() < 1e-5);
        // +Z rotated a quarter turn about Y points along +X.
        assert!(normal.abs_diff_eq(Vec3::X, 1e-5));

        let tangent = buffer.tangents.as_ref().unwrap()[0];
        assert_eq!(tangent.w, -1.0);
        assert!((tangent.truncate().length() - 1.0).abs() < 1e-5);

        assert!(buffer.positions[1].abs_diff_eq(vec3(5.0, 0.0, -2.0), 1e-5));
    }

    #[test]
    fn test_apply_transform_without_optional_arrays() {
        let mut buffer = MeshBuffer::<u32> {
            positions: vec![Vec3::ONE],
            submeshes: vec![Submesh::new(0, vec![0, 0, 0])],
            ..Default::default()
        };
        buffer.apply_transform(&Mat4::from_translation(Vec3::X));

        assert_eq!(buffer.positions, vec![vec3(2.0, 1.0, 1.0)]);
        assert!(buffer.normals.is_none());
        assert!(buffer.tangents.is_none());
    }

    #[test]
    fn test_to_single_mesh_keeps_material_order() {
        let mut buffer = quad(7);
        buffer.submeshes.push(Submesh::new(3, vec![0, 2, 1]));
        buffer.submeshes.push(Submesh::new(9, Vec::new()));

        let mesh = buffer.to_single_mesh();
        let materials: Vec<u32> = mesh.materials().copied().collect();
        assert_eq!(materials, vec![7, 3]);
        assert_eq!(mesh.triangle_count(), 3);
    }

    #[test]
    fn test_meshes_per_material_round_trip() {
        let mut buffer = quad(1);
        buffer.submeshes[0].indices = vec![0, 1, 2];
        buffer.submeshes.push(Submesh::new(2, vec![0, 2, 3]));

        let mut assembler = MeshAssembler::new();
        let meshes = buffer.to_meshes_per_material(&mut assembler);
        assert_eq!(meshes.len(), 2);

        // Each material only carries the vertices it references.
        assert_eq!(meshes[0].vertex_count(), 3);
        assert_eq!(meshes[1].vertex_count(), 3);

        let triangles: usize = meshes.iter().map(CombinedMesh::triangle_count).sum();
        assert_eq!(triangles, buffer.triangle_count());

        // Triangle-referenced positions survive the split.
        let mut original: Vec<[i32; 3]> = buffer
            .submeshes
            .iter()
            .flat_map(|submesh| submesh.indices.iter())
            .map(|&i| buffer.positions[i as usize].as_ivec3().to_array())
            .collect();
        let mut split: Vec<[i32; 3]> = meshes
            .iter()
            .flat_map(|mesh| {
                mesh.submeshes[0]
                    .indices
                    .iter()
                    .map(|&i| mesh.positions[i as usize].as_ivec3().to_array())
            })
            .collect();
        original.sort();
        split.sort();
        assert_eq!(original, split);
    }

    #[test]
    #[should_panic(expected = "Attribute normals has 3 entries")]
    fn test_validate_rejects_short_attribute() {
        let mut buffer = quad(0);
        buffer.normals = Some(vec![Vec3::Z; 3]);
        buffer.validate();
    }

    #[test]
    #[should_panic(expected = "references vertex 9")]
    fn test_validate_rejects_out_of_range_index() {
        let mut buffer = quad(0);
        buffer.submeshes[0].indices = vec![0, 1, 9];
        buffer.validate();
    }
}
