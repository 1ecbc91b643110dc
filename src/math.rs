use nalgebra::{IsometryMatrix3, Matrix4, Rotation3, Vector3};

use crate::cube::Axis;

/// Expresses a world transform relative to a new parent frame.
///
/// The returned local transform composes with `parent_world` back to exactly
/// `child_world`, so the object does not move when it changes parent.
pub fn reparent(
    child_world: &IsometryMatrix3<f32>,
    parent_world: &IsometryMatrix3<f32>,
) -> IsometryMatrix3<f32> {
    parent_world.inverse() * child_world
}

/// Rotation by `angle` radians about one of the coordinate axes.
pub fn axis_rotation(axis: Axis, angle: f32) -> Rotation3<f32> {
    Rotation3::from_axis_angle(&axis.unit(), angle)
}

/// Rounds a near quarter-turn rotation to the exact one.
///
/// Every composition of 90° turns about the coordinate axes is a signed
/// permutation matrix, so rounding each entry recovers it.
pub fn snap_rotation(rotation: &Rotation3<f32>) -> Rotation3<f32> {
    Rotation3::from_matrix_unchecked(rotation.matrix().map(|v| v.round()))
}

/// Moves a coordinate to the nearest lattice value of a cube of edge `size`.
pub fn snap_to_lattice(value: f32, size: usize, spacing: f32) -> f32 {
    let offset = (size as f32 - 1.0) / 2.0;
    let g = (value / spacing + offset).round();
    (g - offset) * spacing
}

/// Homogeneous model matrix of a uniformly scaled isometry.
pub fn model_matrix(transform: &IsometryMatrix3<f32>, scale: f32) -> Matrix4<f32> {
    transform.to_homogeneous() * Matrix4::new_scaling(scale)
}

/// Yaw and pitch (degrees) of a point orbiting the origin, plus its distance.
pub fn orbit_angles(eye: &Vector3<f32>) -> (f32, f32, f32) {
    let distance = eye.norm();
    let yaw = eye.x.atan2(eye.z).to_degrees();
    let pitch = (eye.y / distance).asin().to_degrees();
    (yaw, pitch, distance)
}
