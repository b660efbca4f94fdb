// Re-export glam for convenience
pub use glam::*;

// Axis-convention helpers for room placements
mod axes;
mod transform;
pub use axes::{position_to_host, scale_to_host, swap_yz};
pub use transform::{basis_from_axes, basis_from_forward, degrees_to_radians, BasisExt, DECLARED_UP};
