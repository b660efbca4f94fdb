// Rotation bases for placements
//
// Extends glam::Mat3 with the row-major construction and XYZ Euler
// extraction the host expects. Euler angles follow the host's XYZ order:
// the rotation matrix is Rz * Ry * Rx.

use glam::{Mat3, Vec3};

use crate::axes::swap_yz;

/// "Up" used when deriving a basis from a forward vector, in declared space.
pub const DECLARED_UP: Vec3 = Vec3::Y;

/// Extension trait for Mat3 to build and decompose placement rotations
pub trait BasisExt {
    /// Build a matrix whose rows are `r0`, `r1`, `r2`.
    fn from_rows(r0: Vec3, r1: Vec3, r2: Vec3) -> Self;

    /// Decompose into XYZ Euler angles (radians), such that the matrix equals
    /// `Rz(z) * Ry(y) * Rx(x)` once its columns are normalized.
    fn to_euler_xyz(&self) -> Vec3;
}

impl BasisExt for Mat3 {
    fn from_rows(r0: Vec3, r1: Vec3, r2: Vec3) -> Self {
        Mat3::from_cols(r0, r1, r2).transpose()
    }

    fn to_euler_xyz(&self) -> Vec3 {
        let m = Mat3::from_cols(
            self.x_axis.normalize_or_zero(),
            self.y_axis.normalize_or_zero(),
            self.z_axis.normalize_or_zero(),
        );

        // m.col(c)[r] is the element at row r, column c
        let r00 = m.x_axis.x;
        let r10 = m.x_axis.y;
        let r20 = m.x_axis.z;
        let r11 = m.y_axis.y;
        let r21 = m.y_axis.z;
        let r12 = m.z_axis.y;
        let r22 = m.z_axis.z;

        let cy = r00.hypot(r10);
        if cy > 16.0 * f32::EPSILON {
            Vec3::new(r21.atan2(r22), (-r20).atan2(cy), r10.atan2(r00))
        } else {
            // Gimbal lock: fold the Z rotation into X
            Vec3::new((-r12).atan2(r11), (-r20).atan2(cy), 0.0)
        }
    }
}

/// Build a rotation basis from explicit declared axes.
///
/// The rows are `xdir`, then `zdir` and `ydir` with their Y/Z components
/// swapped, matching the position convention.
pub fn basis_from_axes(xdir: Vec3, ydir: Vec3, zdir: Vec3) -> Mat3 {
    Mat3::from_rows(xdir, swap_yz(zdir), swap_yz(ydir))
}

/// Build an orthonormal rotation basis from a forward vector.
///
/// The forward vector is used as-is (no axis remapping). A zero forward
/// falls back to `(0, 0, 1)`; a forward parallel to [`DECLARED_UP`] uses the
/// X axis as its right vector.
pub fn basis_from_forward(fwd: Vec3) -> Mat3 {
    let z = match fwd.try_normalize() {
        Some(z) => z,
        None => Vec3::Z,
    };
    let x = DECLARED_UP.cross(z).try_normalize().unwrap_or(Vec3::X);
    let y = z.cross(x).normalize();
    Mat3::from_rows(x, y, z)
}

/// Convert a triple of degrees to radians, component-wise.
#[inline]
pub fn degrees_to_radians(degrees: Vec3) -> Vec3 {
    Vec3::new(
        degrees.x.to_radians(),
        degrees.y.to_radians(),
        degrees.z.to_radians(),
    )
}
