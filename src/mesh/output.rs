//! Meshes emitted by a build.

use bevy::asset::RenderAssetUsages;
use bevy::math::{Vec2, Vec3, Vec4};
use bevy::mesh::{Indices, Mesh, PrimitiveTopology};
use bytemuck::{Pod, Zeroable};

use super::attributes::{DEFAULT_COLOR, DEFAULT_NORMAL, DEFAULT_TANGENT, DEFAULT_UV, VertexAttributes};
use super::buffer::Submesh;

/// A generated mesh asset: shared vertex attributes plus one triangle list
/// per material.
#[derive(Clone, Debug, PartialEq)]
pub struct CombinedMesh<M> {
    pub positions: Vec<Vec3>,
    pub normals: Option<Vec<Vec3>>,
    pub uv0: Option<Vec<Vec2>>,
    pub uv1: Option<Vec<Vec2>>,
    pub colors: Option<Vec<[f32; 4]>>,
    pub tangents: Option<Vec<Vec4>>,
    pub submeshes: Vec<Submesh<M>>,
}

/// Interleaved vertex layout for uploading a [`CombinedMesh`] as raw bytes.
///
/// Missing attributes are written as their padding defaults.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct PackedVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv0: [f32; 2],
    pub uv1: [f32; 2],
    pub color: [f32; 4],
    pub tangent: [f32; 4],
}

impl<M> CombinedMesh<M> {
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.submeshes.iter().map(Submesh::triangle_count).sum()
    }

    /// Materials in submesh order.
    pub fn materials(&self) -> impl Iterator<Item = &M> {
        self.submeshes.iter().map(|submesh| &submesh.material)
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

    /// Builds a Bevy mesh drawing every submesh with one index buffer.
    ///
    /// This is the natural conversion for per-material output, where a mesh
    /// has exactly one submesh.
    pub fn to_mesh(&self) -> Mesh {
        let indices = self
            .submeshes
            .iter()
            .flat_map(|submesh| submesh.indices.iter().copied())
            .collect();
        self.mesh_with_indices(indices)
    }

    /// Builds one Bevy mesh per submesh, each carrying the full vertex
    /// attributes and that submesh's triangles.
    ///
    /// Bevy draws one material per mesh, so this is how a multi-material
    /// chunk is attached to the scene.
    pub fn to_submesh_meshes(&self) -> Vec<(&M, Mesh)> {
        self.submeshes
            .iter()
            .map(|submesh| (&submesh.material, self.mesh_with_indices(submesh.indices.clone())))
            .collect()
    }

    /// Interleaves all attributes into one vertex stream.
    pub fn packed_vertices(&self) -> Vec<PackedVertex> {
        (0..self.positions.len())
            .map(|i| PackedVertex {
                position: self.positions[i].to_array(),
                normal: attribute_or(&self.normals, i, DEFAULT_NORMAL).to_array(),
                uv0: attribute_or(&self.uv0, i, DEFAULT_UV).to_array(),
                uv1: attribute_or(&self.uv1, i, DEFAULT_UV).to_array(),
                color: attribute_or(&self.colors, i, DEFAULT_COLOR),
                tangent: attribute_or(&self.tangents, i, DEFAULT_TANGENT).to_array(),
            })
            .collect()
    }

    fn mesh_with_indices(&self, indices: Vec<u32>) -> Mesh {
        let mut mesh = Mesh::new(
            PrimitiveTopology::TriangleList,
            RenderAssetUsages::RENDER_WORLD | RenderAssetUsages::MAIN_WORLD,
        );

        mesh.insert_attribute(
            Mesh::ATTRIBUTE_POSITION,
            self.positions.iter().map(|p| p.to_array()).collect::<Vec<_>>(),
        );
        if let Some(normals) = &self.normals {
            mesh.insert_attribute(
                Mesh::ATTRIBUTE_NORMAL,
                normals.iter().map(|n| n.to_array()).collect::<Vec<_>>(),
            );
        }
        if let Some(uvs) = &self.uv0 {
            mesh.insert_attribute(
                Mesh::ATTRIBUTE_UV_0,
                uvs.iter().map(|uv| uv.to_array()).collect::<Vec<_>>(),
            );
        }
        if let Some(uvs) = &self.uv1 {
            mesh.insert_attribute(
                Mesh::ATTRIBUTE_UV_1,
                uvs.iter().map(|uv| uv.to_array()).collect::<Vec<_>>(),
            );
        }
        if let Some(colors) = &self.colors {
            mesh.insert_attribute(Mesh::ATTRIBUTE_COLOR, colors.clone());
        }
        if let Some(tangents) = &self.tangents {
            mesh.insert_attribute(
                Mesh::ATTRIBUTE_TANGENT,
                tangents.iter().map(|t| t.to_array()).collect::<Vec<_>>(),
            );
        }
        mesh.insert_indices(Indices::U32(indices));

        mesh
    }
}

fn attribute_or<T: Copy>(values: &Option<Vec<T>>, index: usize, default: T) -> T {
    values.as_ref().map(|v| v[index]).unwrap_or(default)
}

/// Views packed vertices as bytes for upload.
pub fn vertex_bytes(vertices: &[PackedVertex]) -> &[u8] {
    bytemuck::cast_slice(vertices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::math::vec2;

    fn two_material_quad() -> CombinedMesh<u32> {
        CombinedMesh {
            positions: vec![Vec3::ZERO, Vec3::X, Vec3::ONE, Vec3::Y],
            normals: Some(vec![Vec3::Z; 4]),
            uv0: Some(vec![
                vec2(0.0, 0.0),
                vec2(1.0, 0.0),
                vec2(1.0, 1.0),
                vec2(0.0, 1.0),
            ]),
            uv1: None,
            colors: None,
            tangents: None,
            submeshes: vec![
                Submesh::new(1, vec![0, 1, 2]),
                Submesh::new(2, vec![0, 2, 3]),
            ],
        }
    }

    #[test]
    fn test_to_mesh_attributes() {
        let mesh = two_material_quad().to_mesh();

        assert!(mesh.attribute(Mesh::ATTRIBUTE_POSITION).is_some());
        assert!(mesh.attribute(Mesh::ATTRIBUTE_NORMAL).is_some());
        assert!(mesh.attribute(Mesh::ATTRIBUTE_UV_0).is_some());
        assert!(mesh.attribute(Mesh::ATTRIBUTE_COLOR).is_none());
        assert_eq!(mesh.indices().map(|i| i.len()), Some(6));
    }

    #[test]
    fn test_to_submesh_meshes() {
        let combined = two_material_quad();
        let meshes = combined.to_submesh_meshes();

        assert_eq!(meshes.len(), 2);
        assert_eq!(*meshes[0].0, 1);
        assert_eq!(*meshes[1].0, 2);
        assert_eq!(meshes[1].1.indices().map(|i| i.len()), Some(3));
    }

    #[test]
    fn test_packed_vertices_fill_defaults() {
        let combined = two_material_quad();
        let packed = combined.packed_vertices();

        assert_eq!(packed.len(), 4);
        assert_eq!(packed[2].position, [1.0, 1.0, 1.0]);
        assert_eq!(packed[2].uv0, [1.0, 1.0]);
        assert_eq!(packed[2].color, DEFAULT_COLOR);
        assert_eq!(
            vertex_bytes(&packed).len(),
            4 * std::mem::size_of::<PackedVertex>()
        );
    }
}
