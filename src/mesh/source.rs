//! Raw source meshes supplied by the host for each tile.

use bevy::math::{Vec2, Vec3, Vec4};
use bevy::mesh::{Mesh, PrimitiveTopology, VertexAttributeValues};
use thiserror::Error;

/// Errors describing a malformed source mesh.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceMeshError {
    #[error("Mesh has no position attribute")]
    MissingPositions,

    #[error("Mesh topology must be a triangle list, got {found:?}")]
    UnsupportedTopology { found: PrimitiveTopology },

    #[error("Attribute '{attribute}' has an unsupported vertex format")]
    UnsupportedFormat { attribute: &'static str },

    #[error("Attribute '{attribute}' has {found} entries, expected {expected}")]
    AttributeLength {
        attribute: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("Submesh {submesh} has {len} indices, which is not a multiple of 3")]
    NotTriangleList { submesh: usize, len: usize },

    #[error("Submesh {submesh} references vertex {index}, but the mesh has {vertex_count} vertices")]
    IndexOutOfRange {
        submesh: usize,
        index: u32,
        vertex_count: usize,
    },
}

/// Geometry of one rendered part of a tile, in the part's local space.
///
/// Each entry of `submeshes` is a triangle list drawn with the material at
/// the same position in the part's material list.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SourceMesh {
    pub positions: Vec<Vec3>,
    pub normals: Option<Vec<Vec3>>,
    pub uv0: Option<Vec<Vec2>>,
    pub uv1: Option<Vec<Vec2>>,
    pub colors: Option<Vec<[f32; 4]>>,
    pub tangents: Option<Vec<Vec4>>,
    pub submeshes: Vec<Vec<u32>>,
}

impl SourceMesh {
    /// Create a mesh from positions, with no optional attributes or submeshes.
    pub fn new(positions: Vec<Vec3>) -> Self {
        Self {
            positions,
            ..Default::default()
        }
    }

    pub fn with_normals(mut self, normals: Vec<Vec3>) -> Self {
        self.normals = Some(normals);
        self
    }

    pub fn with_uv0(mut self, uvs: Vec<Vec2>) -> Self {
        self.uv0 = Some(uvs);
        self
    }

    pub fn with_uv1(mut self, uvs: Vec<Vec2>) -> Self {
        self.uv1 = Some(uvs);
        self
    }

    pub fn with_colors(mut self, colors: Vec<[f32; 4]>) -> Self {
        self.colors = Some(colors);
        self
    }

    pub fn with_tangents(mut self, tangents: Vec<Vec4>) -> Self {
        self.tangents = Some(tangents);
        self
    }

    /// Append a triangle list as the next submesh.
    pub fn with_submesh(mut self, indices: Vec<u32>) -> Self {
        self.submeshes.push(indices);
        self
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Check attribute lengths and triangle indices.
    pub fn validate(&self) -> Result<(), SourceMeshError> {
        let expected = self.positions.len();

        check_len("normals", self.normals.as_ref().map(Vec::len), expected)?;
        check_len("uv0", self.uv0.as_ref().map(Vec::len), expected)?;
        check_len("uv1", self.uv1.as_ref().map(Vec::len), expected)?;
        check_len("colors", self.colors.as_ref().map(Vec::len), expected)?;
        check_len("tangents", self.tangents.as_ref().map(Vec::len), expected)?;

        for (submesh, indices) in self.submeshes.iter().enumerate() {
            if indices.len() % 3 != 0 {
                return Err(SourceMeshError::NotTriangleList {
                    submesh,
                    len: indices.len(),
                });
            }
            if let Some(&index) = indices.iter().find(|&&i| i as usize >= expected) {
                return Err(SourceMeshError::IndexOutOfRange {
                    submesh,
                    index,
                    vertex_count: expected,
                });
            }
        }

        Ok(())
    }
}

fn check_len(
    attribute: &'static str,
    found: Option<usize>,
    expected: usize,
) -> Result<(), SourceMeshError> {
    match found {
        Some(found) if found != expected => Err(SourceMeshError::AttributeLength {
            attribute,
            expected,
            found,
        }),
        _ => Ok(()),
    }
}

/// Reads a Bevy mesh as a single-submesh source mesh.
///
/// Non-indexed meshes are treated as a plain triangle list over all vertices.
impl TryFrom<&Mesh> for SourceMesh {
    type Error = SourceMeshError;

    fn try_from(mesh: &Mesh) -> Result<Self, Self::Error> {
        let topology = mesh.primitive_topology();
        if topology != PrimitiveTopology::TriangleList {
            return Err(SourceMeshError::UnsupportedTopology { found: topology });
        }

        let positions = match mesh.attribute(Mesh::ATTRIBUTE_POSITION) {
            Some(VertexAttributeValues::Float32x3(values)) => {
                values.iter().map(|&p| Vec3::from_array(p)).collect::<Vec<_>>()
            }
            Some(_) => return Err(SourceMeshError::UnsupportedFormat { attribute: "position" }),
            None => return Err(SourceMeshError::MissingPositions),
        };

        let normals = match mesh.attribute(Mesh::ATTRIBUTE_NORMAL) {
            Some(VertexAttributeValues::Float32x3(values)) => {
                Some(values.iter().map(|&n| Vec3::from_array(n)).collect())
            }
            Some(_) => return Err(SourceMeshError::UnsupportedFormat { attribute: "normal" }),
            None => None,
        };

        let uv0 = read_uvs(mesh.attribute(Mesh::ATTRIBUTE_UV_0), "uv0")?;
        let uv1 = read_uvs(mesh.attribute(Mesh::ATTRIBUTE_UV_1), "uv1")?;

        let colors = match mesh.attribute(Mesh::ATTRIBUTE_COLOR) {
            Some(VertexAttributeValues::Float32x4(values)) => Some(values.clone()),
            Some(_) => return Err(SourceMeshError::UnsupportedFormat { attribute: "color" }),
            None => None,
        };

        let tangents = match mesh.attribute(Mesh::ATTRIBUTE_TANGENT) {
            Some(VertexAttributeValues::Float32x4(values)) => {
                Some(values.iter().map(|&t| Vec4::from_array(t)).collect())
            }
            Some(_) => return Err(SourceMeshError::UnsupportedFormat { attribute: "tangent" }),
            None => None,
        };

        let indices = match mesh.indices() {
            Some(indices) => indices.iter().map(|i| i as u32).collect(),
            None => (0..positions.len() as u32).collect(),
        };

        let source = SourceMesh {
            positions,
            normals,
            uv0,
            uv1,
            colors,
            tangents,
            submeshes: vec![indices],
        };
        source.validate()?;
        Ok(source)
    }
}

fn read_uvs(
    values: Option<&VertexAttributeValues>,
    attribute: &'static str,
) -> Result<Option<Vec<Vec2>>, SourceMeshError> {
    match values {
        Some(VertexAttributeValues::Float32x2(values)) => {
            Ok(Some(values.iter().map(|&uv| Vec2::from_array(uv)).collect()))
        }
        Some(_) => Err(SourceMeshError::UnsupportedFormat { attribute }),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::asset::RenderAssetUsages;
    use bevy::math::vec3;
    use bevy::mesh::Indices;

    fn triangle() -> SourceMesh {
        SourceMesh::new(vec![Vec3::ZERO, Vec3::X, Vec3::Y]).with_submesh(vec![0, 1, 2])
    }

    #[test]
    fn test_validate_ok() {
        assert_eq!(triangle().validate(), Ok(()));
    }

    #[test]
    fn test_validate_attribute_length() {
        let mesh = triangle().with_normals(vec![Vec3::Z; 2]);
        assert_eq!(
            mesh.validate(),
            Err(SourceMeshError::AttributeLength {
                attribute: "normals",
                expected: 3,
                found: 2,
            })
        );
    }

    #[test]
    fn test_validate_indices() {
        let mesh = triangle().with_submesh(vec![0, 1]);
        assert_eq!(
            mesh.validate(),
            Err(SourceMeshError::NotTriangleList { submesh: 1, len: 2 })
        );

        let mesh = triangle().with_submesh(vec![0, 1, 3]);
        assert_eq!(
            mesh.validate(),
            Err(SourceMeshError::IndexOutOfRange {
                submesh: 1,
                index: 3,
                vertex_count: 3,
            })
        );
    }

    #[test]
    fn test_from_bevy_mesh() {
        let mut mesh = Mesh::new(PrimitiveTopology::TriangleList, RenderAssetUsages::default());
        mesh.insert_attribute(
            Mesh::ATTRIBUTE_POSITION,
            vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
        );
        mesh.insert_attribute(Mesh::ATTRIBUTE_NORMAL, vec![[0.0, 0.0, 1.0]; 3]);
        mesh.insert_indices(Indices::U16(vec![0, 1, 2]));

        let source = SourceMesh::try_from(&mesh).expect("valid mesh");
        assert_eq!(source.positions[1], vec3(1.0, 0.0, 0.0));
        assert_eq!(source.normals, Some(vec![Vec3::Z; 3]));
        assert!(source.uv0.is_none());
        assert_eq!(source.submeshes, vec![vec![0, 1, 2]]);
    }

    #[test]
    fn test_from_bevy_mesh_rejects_lines() {
        let mut mesh = Mesh::new(PrimitiveTopology::LineList, RenderAssetUsages::default());
        mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]]);

        assert_eq!(
            SourceMesh::try_from(&mesh),
            Err(SourceMeshError::UnsupportedTopology {
                found: PrimitiveTopology::LineList,
            })
        );
    }
}
