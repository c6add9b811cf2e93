//! Incremental mesh assembly.

use std::collections::HashMap;

use bevy::math::{Mat4, Vec2, Vec3, Vec4};

use super::attributes::{DEFAULT_COLOR, DEFAULT_NORMAL, DEFAULT_TANGENT, DEFAULT_UV};
use super::buffer::{MeshBuffer, Submesh, normal_matrix};
use super::source::SourceMesh;
use super::MaterialKey;

const UNMAPPED: u32 = u32::MAX;

/// Builder that merges meshes into one growing set of attribute lists.
///
/// Meshes are appended with [`append_buffer`](Self::append_buffer) or
/// [`append_mesh_with_materials`](Self::append_mesh_with_materials) and the
/// result is copied out with [`apply`](Self::apply). Each optional list is
/// either empty or exactly as long as the position list: when appended meshes
/// disagree on an attribute, missing spans are filled with the defaults from
/// [`crate::mesh`].
///
/// The assembler is meant to be reused for a whole build. Its lists keep
/// their capacity across `apply` calls and triangle lists are pooled.
///
/// # Example
/// ```ignore
/// let mut assembler = MeshAssembler::new();
/// assembler.mount(&first_tile);
/// assembler.append_buffer(&second_tile);
///
/// let mut chunk = MeshBuffer::new();
/// assembler.apply(&mut chunk);
/// ```
#[derive(Debug)]
pub struct MeshAssembler<M> {
    positions: Vec<Vec3>,
    normals: Vec<Vec3>,
    uv0: Vec<Vec2>,
    uv1: Vec<Vec2>,
    colors: Vec<[f32; 4]>,
    tangents: Vec<Vec4>,
    submeshes: Vec<Submesh<M>>,
    slots: HashMap<M, usize>,
    spare_indices: Vec<Vec<u32>>,
    remap: Vec<u32>,
    transformed: TransformScratch,
}

/// Source attributes transformed into assembly space.
#[derive(Debug, Default)]
struct TransformScratch {
    positions: Vec<Vec3>,
    normals: Vec<Vec3>,
    tangents: Vec<Vec4>,
}

/// Borrowed attribute arrays of one mesh being appended.
struct AttributeSlices<'a> {
    positions: &'a [Vec3],
    normals: Option<&'a [Vec3]>,
    uv0: Option<&'a [Vec2]>,
    uv1: Option<&'a [Vec2]>,
    colors: Option<&'a [[f32; 4]]>,
    tangents: Option<&'a [Vec4]>,
}

impl<'a> AttributeSlices<'a> {
    fn from_buffer<M>(buffer: &'a MeshBuffer<M>) -> Self {
        Self {
            positions: &buffer.positions,
            normals: buffer.normals.as_deref(),
            uv0: buffer.uv0.as_deref(),
            uv1: buffer.uv1.as_deref(),
            colors: buffer.colors.as_deref(),
            tangents: buffer.tangents.as_deref(),
        }
    }
}

impl<M> Default for MeshAssembler<M> {
    fn default() -> Self {
        Self {
            positions: Vec::new(),
            normals: Vec::new(),
            uv0: Vec::new(),
            uv1: Vec::new(),
            colors: Vec::new(),
            tangents: Vec::new(),
            submeshes: Vec::new(),
            slots: HashMap::new(),
            spare_indices: Vec::new(),
            remap: Vec::new(),
            transformed: TransformScratch::default(),
        }
    }
}

impl<M: MaterialKey> MeshAssembler<M> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of vertices assembled so far.
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Number of indices assembled so far, across all materials.
    pub fn index_count(&self) -> usize {
        self.submeshes.iter().map(|submesh| submesh.indices.len()).sum()
    }

    pub fn has_normals(&self) -> bool {
        !self.normals.is_empty()
    }

    pub fn has_uv0(&self) -> bool {
        !self.uv0.is_empty()
    }

    pub fn has_uv1(&self) -> bool {
        !self.uv1.is_empty()
    }

    pub fn has_colors(&self) -> bool {
        !self.colors.is_empty()
    }

    pub fn has_tangents(&self) -> bool {
        !self.tangents.is_empty()
    }

    /// Clears the working lists. Buffers filled by earlier
    /// [`apply`](Self::apply) calls are not affected.
    pub fn reset(&mut self) {
        self.positions.clear();
        self.normals.clear();
        self.uv0.clear();
        self.uv1.clear();
        self.colors.clear();
        self.tangents.clear();
        self.slots.clear();
        for submesh in self.submeshes.drain(..) {
            let mut indices = submesh.indices;
            indices.clear();
            self.spare_indices.push(indices);
        }
    }

    /// Resets and starts from a copy of `buffer`.
    pub fn mount(&mut self, buffer: &MeshBuffer<M>) {
        self.reset();
        self.append_buffer(buffer);
    }

    /// Appends all vertices and triangles of `buffer`.
    ///
    /// Indices are offset by the current vertex count and merged into the
    /// triangle list of the matching material.
    ///
    /// # Panics
    /// Panics if `buffer` breaks the invariants checked by
    /// [`MeshBuffer::validate`].
    pub fn append_buffer(&mut self, buffer: &MeshBuffer<M>) {
        buffer.validate();
        if buffer.positions.is_empty() {
            return;
        }

        let base = self.vertex_count();
        self.extend_vertices(&AttributeSlices::from_buffer(buffer));

        let offset = base as u32;
        for submesh in &buffer.submeshes {
            let indices = self.submesh_indices(&submesh.material);
            indices.extend(submesh.indices.iter().map(|&i| i + offset));
        }
    }

    /// Appends the part of `buffer` drawn by its submesh at `submesh`, keeping
    /// only the vertices that submesh references.
    pub(crate) fn append_buffer_submesh(&mut self, buffer: &MeshBuffer<M>, submesh: usize) {
        buffer.validate();
        let Some(source) = buffer.submeshes.get(submesh) else {
            return;
        };
        self.append_extracted(
            &AttributeSlices::from_buffer(buffer),
            &source.material,
            &source.indices,
        );
    }

    /// Appends a raw source mesh placed by `matrix`.
    ///
    /// Positions are transformed as points; normals and tangents use the
    /// inverse-transpose of `matrix`. Submesh `i` is drawn with `materials[i]`;
    /// submeshes without a material are skipped. Each submesh only brings the
    /// vertices its triangles reference, in first-seen order.
    pub fn append_mesh_with_materials(&mut self, matrix: &Mat4, mesh: &SourceMesh, materials: &[M]) {
        if mesh.positions.is_empty() {
            return;
        }

        let mut scratch = std::mem::take(&mut self.transformed);
        scratch.positions.clear();
        scratch
            .positions
            .extend(mesh.positions.iter().map(|&p| matrix.transform_point3(p)));

        let directions = normal_matrix(matrix);
        scratch.normals.clear();
        if let Some(normals) = &mesh.normals {
            scratch
                .normals
                .extend(normals.iter().map(|&n| (directions * n).normalize_or_zero()));
        }
        scratch.tangents.clear();
        if let Some(tangents) = &mesh.tangents {
            scratch.tangents.extend(
                tangents
                    .iter()
                    .map(|t| (directions * t.truncate()).normalize_or_zero().extend(t.w)),
            );
        }

        let slices = AttributeSlices {
            positions: &scratch.positions,
            normals: mesh.normals.as_ref().map(|_| scratch.normals.as_slice()),
            uv0: mesh.uv0.as_deref(),
            uv1: mesh.uv1.as_deref(),
            colors: mesh.colors.as_deref(),
            tangents: mesh.tangents.as_ref().map(|_| scratch.tangents.as_slice()),
        };

        for (indices, material) in mesh.submeshes.iter().zip(materials) {
            self.append_extracted(&slices, material, indices);
        }

        self.transformed = scratch;
    }

    /// Copies the assembled mesh into `target` and resets.
    ///
    /// Optional attributes that were never supplied become `None`. The
    /// target's `smooth` flag is left as it was; its original normals are
    /// cleared.
    pub fn apply(&mut self, target: &mut MeshBuffer<M>) {
        target.positions.clear();
        target.positions.extend_from_slice(&self.positions);
        target.normals = collapse(&self.normals);
        target.uv0 = collapse(&self.uv0);
        target.uv1 = collapse(&self.uv1);
        target.colors = collapse(&self.colors);
        target.tangents = collapse(&self.tangents);
        target.original_normals = None;
        target.submeshes.clear();
        target.submeshes.extend(self.submeshes.iter().cloned());

        assert!(
            target.submeshes.is_empty() || !target.positions.is_empty(),
            "Assembled mesh has triangles but no vertices"
        );
        target.validate();

        self.reset();
    }

    fn submesh_indices(&mut self, material: &M) -> &mut Vec<u32> {
        let slot = match self.slots.get(material) {
            Some(&slot) => slot,
            None => {
                let slot = self.submeshes.len();
                let indices = self.spare_indices.pop().unwrap_or_default();
                self.submeshes.push(Submesh::new(material.clone(), indices));
                self.slots.insert(material.clone(), slot);
                slot
            }
        };
        &mut self.submeshes[slot].indices
    }

    fn extend_vertices(&mut self, src: &AttributeSlices<'_>) {
        let base = self.positions.len();
        let count = src.positions.len();

        extend_attribute(&mut self.normals, base, src.normals, count, DEFAULT_NORMAL);
        extend_attribute(&mut self.uv0, base, src.uv0, count, DEFAULT_UV);
        extend_attribute(&mut self.uv1, base, src.uv1, count, DEFAULT_UV);
        extend_attribute(&mut self.colors, base, src.colors, count, DEFAULT_COLOR);
        extend_attribute(&mut self.tangents, base, src.tangents, count, DEFAULT_TANGENT);
        self.positions.extend_from_slice(src.positions);
    }

    /// Appends the vertices referenced by `indices` in first-seen order and
    /// the remapped triangles under `material`.
    fn append_extracted(&mut self, src: &AttributeSlices<'_>, material: &M, indices: &[u32]) {
        if indices.is_empty() {
            return;
        }

        self.remap.clear();
        self.remap.resize(src.positions.len(), UNMAPPED);

        let mut remapped = self.spare_indices.pop().unwrap_or_default();
        remapped.clear();
        remapped.reserve(indices.len());

        for &index in indices {
            let source = index as usize;
            if self.remap[source] == UNMAPPED {
                self.remap[source] = self.positions.len() as u32;
                self.push_vertex(src, source);
            }
            remapped.push(self.remap[source]);
        }

        self.submesh_indices(material).extend_from_slice(&remapped);
        remapped.clear();
        self.spare_indices.push(remapped);
    }

    fn push_vertex(&mut self, src: &AttributeSlices<'_>, index: usize) {
        let base = self.positions.len();

        push_attribute(&mut self.normals, base, src.normals, index, DEFAULT_NORMAL);
        push_attribute(&mut self.uv0, base, src.uv0, index, DEFAULT_UV);
        push_attribute(&mut self.uv1, base, src.uv1, index, DEFAULT_UV);
        push_attribute(&mut self.colors, base, src.colors, index, DEFAULT_COLOR);
        push_attribute(&mut self.tangents, base, src.tangents, index, DEFAULT_TANGENT);
        self.positions.push(src.positions[index]);
    }
}

/// Appends `count` values of one attribute.
///
/// `dst` is empty (attribute absent) or `base` long. An absent destination
/// that receives values is back-filled first; a present destination that
/// receives nothing is padded.
fn extend_attribute<T: Copy>(
    dst: &mut Vec<T>,
    base: usize,
    src: Option<&[T]>,
    count: usize,
    default: T,
) {
    match src {
        Some(values) => {
            if dst.len() < base {
                dst.resize(base, default);
            }
            dst.extend_from_slice(values);
        }
        None if !dst.is_empty() => dst.resize(base + count, default),
        None => {}
    }
}

/// Single-vertex version of [`extend_attribute`].
fn push_attribute<T: Copy>(dst: &mut Vec<T>, base: usize, src: Option<&[T]>, index: usize, default: T) {
    match src {
        Some(values) => {
            if dst.len() < base {
                dst.resize(base, default);
            }
            dst.push(values[index]);
        }
        None if !dst.is_empty() => dst.push(default),
        None => {}
    }
}

fn collapse<T: Copy>(values: &[T]) -> Option<Vec<T>> {
    if values.is_empty() {
        None
    } else {
        Some(values.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::math::{vec2, vec3};

    fn triangle(material: u32, normals: bool, uvs: bool) -> MeshBuffer<u32> {
        MeshBuffer {
            positions: vec![Vec3::ZERO, Vec3::X, Vec3::Y],
            normals: normals.then(|| vec![Vec3::Z; 3]),
            uv0: uvs.then(|| vec![vec2(0.0, 0.0), vec2(1.0, 0.0), vec2(0.0, 1.0)]),
            submeshes: vec![Submesh::new(material, vec![0, 1, 2])],
            ..Default::default()
        }
    }

    fn assert_aligned(assembler: &MeshAssembler<u32>) {
        let count = assembler.vertex_count();
        for len in [
            assembler.normals.len(),
            assembler.uv0.len(),
            assembler.uv1.len(),
            assembler.colors.len(),
            assembler.tangents.len(),
        ] {
            assert!(len == 0 || len == count, "attribute length {} vs {} vertices", len, count);
        }
    }

    #[test]
    #[should_panic(expected = "Attribute normals has 1 entries")]
    fn test_mount_rejects_misaligned_buffer() {
        let mut malformed = triangle(0, false, false);
        malformed.normals = Some(vec![Vec3::Z]);

        let mut assembler = MeshAssembler::new();
        assembler.mount(&malformed);
    }

    #[test]
    #[should_panic(expected = "references vertex 3")]
    fn test_append_rejects_out_of_range_index() {
        let mut malformed = triangle(0, true, false);
        malformed.submeshes[0].indices = vec![0, 1, 3];

        let mut assembler = MeshAssembler::new();
        assembler.append_buffer(&triangle(1, true, false));
        assembler.append_buffer(&malformed);
    }

    #[test]
    fn test_mount_equals_append_to_empty() {
        let source = triangle(0, true, true);

        let mut mounted = MeshAssembler::new();
        mounted.append_buffer(&triangle(5, false, false));
        mounted.mount(&source);
        let mut a = MeshBuffer::new();
        mounted.apply(&mut a);

        let mut appended = MeshAssembler::new();
        appended.append_buffer(&source);
        let mut b = MeshBuffer::new();
        appended.apply(&mut b);

        assert_eq!(a.positions, b.positions);
        assert_eq!(a.normals, b.normals);
        assert_eq!(a.uv0, b.uv0);
        assert_eq!(a.submeshes, b.submeshes);
    }

    #[test]
    fn test_append_offsets_indices_by_material() {
        let mut assembler = MeshAssembler::new();
        assembler.append_buffer(&triangle(1, false, false));
        assembler.append_buffer(&triangle(2, false, false));
        assembler.append_buffer(&triangle(1, false, false));

        let mut merged = MeshBuffer::new();
        assembler.apply(&mut merged);

        assert_eq!(merged.vertex_count(), 9);
        assert_eq!(merged.submesh(&1), Some(&[0, 1, 2, 6, 7, 8][..]));
        assert_eq!(merged.submesh(&2), Some(&[3, 4, 5][..]));
        assert_eq!(merged.materials().copied().collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn test_padding_for_missing_normals() {
        let mut assembler = MeshAssembler::new();
        assembler.append_buffer(&triangle(0, true, true));
        assembler.append_buffer(&triangle(0, false, true));

        let mut merged = MeshBuffer::new();
        assembler.apply(&mut merged);

        let normals = merged.normals.expect("normals kept");
        assert_eq!(normals.len(), 6);
        assert_eq!(&normals[..3], &[Vec3::Z; 3]);
        assert_eq!(&normals[3..], &[DEFAULT_NORMAL; 3]);
    }

    #[test]
    fn test_backfill_when_attribute_appears_late() {
        let mut assembler = MeshAssembler::new();
        assembler.append_buffer(&triangle(0, false, false));
        assembler.append_buffer(&triangle(0, false, true));

        let mut merged = MeshBuffer::new();
        assembler.apply(&mut merged);

        let uvs = merged.uv0.expect("uvs back-filled");
        assert_eq!(uvs.len(), 6);
        assert_eq!(&uvs[..3], &[DEFAULT_UV; 3]);
        assert_eq!(uvs[4], vec2(1.0, 0.0));
        assert!(merged.normals.is_none());
    }

    #[test]
    fn test_attributes_stay_aligned() {
        let mut assembler = MeshAssembler::new();
        let mut colored = triangle(3, false, false);
        colored.colors = Some(vec![[1.0, 0.0, 0.0, 1.0]; 3]);

        for buffer in [
            triangle(0, false, false),
            triangle(1, true, false),
            colored,
            triangle(0, false, true),
            triangle(2, true, true),
        ] {
            assembler.append_buffer(&buffer);
            assert_aligned(&assembler);
        }
        assert_eq!(assembler.vertex_count(), 15);
        assert!(assembler.has_normals());
        assert!(assembler.has_uv0());
        assert!(assembler.has_colors());
        assert!(!assembler.has_tangents());
    }

    #[test]
    fn test_apply_resets_and_collapses() {
        let mut assembler = MeshAssembler::new();
        assembler.append_buffer(&triangle(0, false, false));

        let mut merged = MeshBuffer::new();
        merged.normals = Some(vec![Vec3::Y]);
        assembler.apply(&mut merged);

        assert!(merged.normals.is_none());
        assert!(merged.uv0.is_none());
        assert_eq!(assembler.vertex_count(), 0);
        assert_eq!(assembler.index_count(), 0);
    }

    #[test]
    fn test_append_mesh_with_materials_extracts_used_vertices() {
        // Submesh 0 uses vertices 0..3, submesh 1 uses 2..5, vertex 5 is unused.
        let mesh = SourceMesh::new(vec![
            vec3(0.0, 0.0, 0.0),
            vec3(1.0, 0.0, 0.0),
            vec3(1.0, 1.0, 0.0),
            vec3(0.0, 1.0, 0.0),
            vec3(2.0, 1.0, 0.0),
            vec3(9.0, 9.0, 9.0),
        ])
        .with_normals(vec![Vec3::Z; 6])
        .with_submesh(vec![0, 1, 2])
        .with_submesh(vec![2, 3, 4]);

        let mut assembler = MeshAssembler::new();
        assembler.append_mesh_with_materials(&Mat4::from_translation(Vec3::X), &mesh, &[10, 20]);

        let mut merged = MeshBuffer::new();
        assembler.apply(&mut merged);

        // Vertex 2 is shared by both submeshes and therefore appears twice.
        assert_eq!(merged.vertex_count(), 6);
        assert_eq!(merged.submesh(&10), Some(&[0, 1, 2][..]));
        assert_eq!(merged.submesh(&20), Some(&[3, 4, 5][..]));
        assert_eq!(merged.positions[0], vec3(1.0, 0.0, 0.0));
        assert_eq!(merged.positions[3], vec3(2.0, 1.0, 0.0));
        assert!(!merged.positions.contains(&vec3(10.0, 9.0, 9.0)));
    }

    #[test]
    fn test_append_mesh_skips_submeshes_without_material() {
        let mesh = SourceMesh::new(vec![Vec3::ZERO, Vec3::X, Vec3::Y])
            .with_submesh(vec![0, 1, 2])
            .with_submesh(vec![2, 1, 0]);

        let mut assembler = MeshAssembler::new();
        assembler.append_mesh_with_materials(&Mat4::IDENTITY, &mesh, &[4]);

        let mut merged = MeshBuffer::new();
        assembler.apply(&mut merged);
        assert_eq!(merged.submeshes.len(), 1);
        assert_eq!(merged.triangle_count(), 1);
    }

    #[test]
    fn test_append_mesh_transforms_normals() {
        let mesh = SourceMesh::new(vec![Vec3::ZERO, Vec3::X, Vec3::Y])
            .with_normals(vec![Vec3::Z; 3])
            .with_submesh(vec![0, 1, 2]);

        let mut assembler = MeshAssembler::new();
        let matrix = Mat4::from_scale(vec3(1.0, 1.0, 4.0));
        assembler.append_mesh_with_materials(&matrix, &mesh, &[0]);

        let mut merged = MeshBuffer::new();
        assembler.apply(&mut merged);
        for normal in merged.normals.unwrap() {
            assert!(normal.abs_diff_eq(Vec3::Z, 1e-6));
        }
    }
}
