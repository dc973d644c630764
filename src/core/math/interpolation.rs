use nalgebra::{UnitQuaternion, Vector3};

const EPSILON: f32 = 1e-6;

/// Linear interpolation between two vectors.
#[inline(always)]
pub fn lerp(a: &Vector3<f32>, b: &Vector3<f32>, t: f32) -> Vector3<f32> {
    a * (1.0 - t) + b * t
}

/// Spherical interpolation between two rotations.
///
/// Falls back to normalized lerp when the rotations are (nearly) opposite,
/// where slerp has no unique path.
#[inline]
pub fn slerp(a: &UnitQuaternion<f32>, b: &UnitQuaternion<f32>, t: f32) -> UnitQuaternion<f32> {
    a.try_slerp(b, t, EPSILON)
        .unwrap_or_else(|| a.nlerp(b, t))
}

/// Locates `time` inside a sorted list of key times.
///
/// Returns the pair of key indices bracketing `time` and the blend factor
/// between them. Times before the first key or after the last clamp to that
/// key. Returns `None` for an empty list.
pub fn bracket_keys(times: &[f32], time: f32) -> Option<(usize, usize, f32)> {
    let last = times.len().checked_sub(1)?;

    if time <= times[0] {
        return Some((0, 0, 0.0));
    }
    if time >= times[last] {
        return Some((last, last, 0.0));
    }

    // First key strictly after `time`; guaranteed to be in 1..=last here.
    let next = times.partition_point(|&t| t <= time);
    let prev = next - 1;
    let span = times[next] - times[prev];
    let t = if span > EPSILON {
        (time - times[prev]) / span
    } else {
        0.0
    };
    Some((prev, next, t))
}
