//! Forward-sweep vertex clustering.

use bevy::math::Vec3;

/// Collects the cluster seeded at `seed` into `members`.
///
/// The seed and every later unconsumed candidate within `threshold` of the
/// seed join the cluster and are marked consumed. Earlier candidates are
/// never revisited, so the partition depends on candidate order: a vertex
/// joins the first seed that reaches it.
///
/// A threshold of `0.0` only groups exactly coincident positions.
pub fn find_snapped_vertices(
    positions: &[Vec3],
    consumed: &mut [bool],
    seed: usize,
    threshold: f32,
    members: &mut Vec<usize>,
) {
    members.clear();
    if consumed[seed] {
        return;
    }

    consumed[seed] = true;
    members.push(seed);

    let origin = positions[seed];
    let threshold_sq = threshold * threshold;
    for candidate in (seed + 1)..positions.len() {
        if !consumed[candidate] && positions[candidate].distance_squared(origin) <= threshold_sq {
            consumed[candidate] = true;
            members.push(candidate);
        }
    }
}

/// Mean position of the cluster members.
pub fn centroid(positions: &[Vec3], members: &[usize]) -> Vec3 {
    let sum: Vec3 = members.iter().map(|&i| positions[i]).sum();
    sum / members.len() as f32
}
