// Declared (room markup) axes to host axes.
//
// Room markup is Y-up; the host is Z-up. Positions flip the declared Z so
// handedness is preserved, scales only swap because a scale is never negated.

use glam::Vec3;

/// Swap the Y and Z components of a vector.
#[inline]
pub fn swap_yz(v: Vec3) -> Vec3 {
    Vec3::new(v.x, v.z, v.y)
}

/// Map a declared position `(x, y, z)` to host `(x, -z, y)`.
#[inline]
pub fn position_to_host(v: Vec3) -> Vec3 {
    Vec3::new(v.x, -v.z, v.y)
}

/// Map a declared scale `(x, y, z)` to host `(x, z, y)`.
#[inline]
pub fn scale_to_host(v: Vec3) -> Vec3 {
    swap_yz(v)
}
