//! 3D transformation matrices
use nalgebra::{Matrix4, Vector3};
use serde::{Deserialize, Serialize};

/// Principal axis used for turntable rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    #[default]
    X,
    Y,
    Z,
}

impl Axis {
    pub fn unit(self) -> Vector3<f32> {
        match self {
            Axis::X => Vector3::x(),
            Axis::Y => Vector3::y(),
            Axis::Z => Vector3::z(),
        }
    }
}

/// Transform builder for 3D transformations
pub struct Transform;

impl Transform {
    /// Rotation about a principal axis through the origin, in degrees.
    ///
    /// The angle is converted once from `f64` so that frame `i` of a
    /// sequence is rotated by exactly `i * step` without accumulated drift.
    pub fn rotation_degrees(axis: Axis, degrees: f64) -> Matrix4<f32> {
        let radians = degrees.to_radians() as f32;
        Matrix4::new_rotation(axis.unit() * radians)
    }

    /// Create a model-view-projection matrix
    pub fn mvp_matrix(
        model: &Matrix4<f32>,
        view: &Matrix4<f32>,
        projection: &Matrix4<f32>,
    ) -> Matrix4<f32> {
        projection * view * model
    }
}
