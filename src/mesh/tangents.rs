//! Per-vertex tangent generation.

use bevy::math::{Vec2, Vec3, Vec4};

/// Generates tangents for indexed triangle lists.
///
/// Per-triangle tangent and bitangent directions are accumulated per vertex,
/// then each tangent is orthogonalized against the vertex normal. The `w`
/// component holds the handedness of the UV frame (`-1` or `+1`).
///
/// Vertices whose accumulated tangent vanishes (unreferenced vertices, or
/// triangles with degenerate UVs) still receive a unit tangent orthogonal to
/// the normal.
pub(crate) fn generate<'a>(
    positions: &[Vec3],
    normals: &[Vec3],
    uvs: &[Vec2],
    triangle_lists: impl Iterator<Item = &'a [u32]>,
) -> Vec<Vec4> {
    let count = positions.len();
    let mut tan1 = vec![Vec3::ZERO; count];
    let mut tan2 = vec![Vec3::ZERO; count];

    for indices in triangle_lists {
        for triangle in indices.chunks_exact(3) {
            let [i0, i1, i2] = [
                triangle[0] as usize,
                triangle[1] as usize,
                triangle[2] as usize,
            ];

            let edge1 = positions[i1] - positions[i0];
            let edge2 = positions[i2] - positions[i0];
            let duv1 = uvs[i1] - uvs[i0];
            let duv2 = uvs[i2] - uvs[i0];

            let det = duv1.x * duv2.y - duv2.x * duv1.y;
            if det.abs() <= f32::EPSILON * f32::EPSILON {
                continue;
            }
            let r = 1.0 / det;

            let sdir = (edge1 * duv2.y - edge2 * duv1.y) * r;
            let tdir = (edge2 * duv1.x - edge1 * duv2.x) * r;

            for i in [i0, i1, i2] {
                tan1[i] += sdir;
                tan2[i] += tdir;
            }
        }
    }

    (0..count)
        .map(|i| {
            let normal = normals[i].normalize_or_zero();
            let accumulated = tan1[i];

            // Gram-Schmidt
            let mut tangent = (accumulated - normal * normal.dot(accumulated)).normalize_or_zero();
            if tangent == Vec3::ZERO {
                tangent = if normal == Vec3::ZERO {
                    Vec3::X
                } else {
                    normal.any_orthonormal_vector()
                };
            }

            let handedness = if normal.cross(accumulated).dot(tan2[i]) < 0.0 {
                -1.0
            } else {
                1.0
            };

            tangent.extend(handedness)
        })
        .collect()
}
