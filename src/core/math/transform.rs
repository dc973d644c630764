use nalgebra::{Matrix4, Point3, UnitQuaternion, Vector3};

//=================================
// Transform Matrix Factory
//=================================

/// Factory for the bone-space matrices used by the skinning evaluator.
/// All matrices are Right-Handed, column vectors.
pub struct TransformFactory;

#[rustfmt::skip]
impl TransformFactory {
    /// Creates a translation matrix.
    pub fn translation(translation: &Vector3<f32>) -> Matrix4<f32> {
        Matrix4::new(
            1.0, 0.0, 0.0, translation.x,
            0.0, 1.0, 0.0, translation.y,
            0.0, 0.0, 1.0, translation.z,
            0.0, 0.0, 0.0, 1.0,
        )
    }

    /// Rotation from Euler angles in degrees, applied X then Y then Z.
    pub fn rotation_euler_deg(euler_deg: &[f32; 3]) -> UnitQuaternion<f32> {
        UnitQuaternion::from_euler_angles(
            euler_deg[0].to_radians(),
            euler_deg[1].to_radians(),
            euler_deg[2].to_radians(),
        )
    }

    /// Translation * Rotation.
    pub fn translation_rotation(
        translation: &Vector3<f32>,
        rotation: &UnitQuaternion<f32>,
    ) -> Matrix4<f32> {
        Self::translation(translation) * rotation.to_homogeneous()
    }
}

//=================================
// Core Transformation Functions
//=================================

/// Transforms a point by an affine matrix (w = 1).
#[inline]
pub fn transform_point(m: &Matrix4<f32>, p: &Point3<f32>) -> Point3<f32> {
    m.transform_point(p)
}

/// Transforms a direction by an affine matrix (w = 0).
/// Bone matrices carry no scale, so the upper 3x3 is orthonormal.
#[inline]
pub fn transform_direction(m: &Matrix4<f32>, v: &Vector3<f32>) -> Vector3<f32> {
    m.transform_vector(v)
}
