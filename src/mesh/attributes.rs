//! Optional vertex attributes and their padding defaults.

use bevy::math::{Vec2, Vec3, Vec4};

/// Normal written for vertices of a mesh that had no normals.
pub const DEFAULT_NORMAL: Vec3 = Vec3::ZERO;

/// UV written for vertices of a mesh that had no UVs (both channels).
pub const DEFAULT_UV: Vec2 = Vec2::ZERO;

/// Color written for vertices of a mesh that had no vertex colors.
///
/// Opaque white, so padded spans render with their material color untouched.
pub const DEFAULT_COLOR: [f32; 4] = [1.0, 1.0, 1.0, 1.0];

/// Tangent written for vertices of a mesh that had no tangents.
pub const DEFAULT_TANGENT: Vec4 = Vec4::ZERO;

/// Which optional attributes a mesh carries.
///
/// Positions are always present and therefore not tracked.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VertexAttributes {
    pub normals: bool,
    pub uv0: bool,
    pub uv1: bool,
    pub colors: bool,
    pub tangents: bool,
}

impl VertexAttributes {
    /// Positions only.
    pub const NONE: Self = Self {
        normals: false,
        uv0: false,
        uv1: false,
        colors: false,
        tangents: false,
    };

    /// Every optional attribute.
    pub const ALL: Self = Self {
        normals: true,
        uv0: true,
        uv1: true,
        colors: true,
        tangents: true,
    };

    /// Attributes present in either set.
    ///
    /// Merging two meshes yields a mesh with the union of their attributes.
    pub fn union(self, other: Self) -> Self {
        Self {
            normals: self.normals || other.normals,
            uv0: self.uv0 || other.uv0,
            uv1: self.uv1 || other.uv1,
            colors: self.colors || other.colors,
            tangents: self.tangents || other.tangents,
        }
    }

    /// Whether tangents can be generated from these attributes.
    #[inline]
    pub fn supports_tangents(self) -> bool {
        self.normals && self.uv0
    }
}
