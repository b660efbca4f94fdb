//! Placement transforms in host space.
//!
//! Position maps declared `(x, y, z)` to host `(x, -z, y)` and scale to
//! `(x, z, y)`. Rotation is picked by precedence:
//!
//! 1. explicit axes: a basis of `xdir`, `zdir`, `ydir` (Y/Z swapped per axis)
//! 2. `rotation`: Euler degrees in declared order, no axis remapping
//! 3. `fwd`: a basis derived from the forward vector
//!
//! The asymmetry between (1) and (2) is part of the room format and is kept
//! as-is.

use room_math::{
    basis_from_axes, basis_from_forward, degrees_to_radians, position_to_host, scale_to_host, BasisExt, Vec3,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::assets::AssetError;
use crate::host::{Host, HostResult, ObjectHandle};
use crate::markup::{PlacementDeclaration, RotationSpec};

/// Errors that drop a single placement.
#[derive(Error, Debug)]
pub enum PlacementError {
    #[error("No asset declared for '{0}'")]
    UnknownAsset(String),

    #[error("Asset '{id}' could not be placed: {source}")]
    Asset {
        id: String,
        #[source]
        source: AssetError,
    },
}

/// A transform in host space, Euler angles in radians (XYZ order).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct HostTransform {
    pub position: Vec3,
    pub rotation_euler: Vec3,
    pub scale: Vec3,
}

impl Default for HostTransform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation_euler: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }
}

/// Convert a placement into a host-space transform.
pub fn compute_transform(placement: &PlacementDeclaration) -> HostTransform {
    HostTransform {
        position: position_to_host(placement.position),
        rotation_euler: rotation_euler(&placement.rotation),
        scale: scale_to_host(placement.scale),
    }
}

/// Host XYZ Euler angles (radians) for a placement rotation.
pub fn rotation_euler(rotation: &RotationSpec) -> Vec3 {
    match *rotation {
        RotationSpec::ExplicitAxes { x, y, z } => basis_from_axes(x, y, z).to_euler_xyz(),
        RotationSpec::EulerDegrees(degrees) => degrees_to_radians(degrees),
        RotationSpec::Forward(fwd) => basis_from_forward(fwd).to_euler_xyz(),
    }
}

/// Apply one transform to every handle.
pub fn apply_transform<H: Host + ?Sized>(
    host: &mut H,
    handles: &[ObjectHandle],
    transform: &HostTransform,
) -> HostResult<()> {
    for &handle in handles {
        host.set_transform(handle, transform)?;
    }
    Ok(())
}

/// Duplicate `handles` and apply `transform` to the copies.
pub fn duplicate_and_apply<H: Host + ?Sized>(
    host: &mut H,
    handles: &[ObjectHandle],
    transform: &HostTransform,
) -> HostResult<Vec<ObjectHandle>> {
    let copies = host.duplicate(handles)?;
    apply_transform(host, &copies, transform)?;
    Ok(copies)
}
