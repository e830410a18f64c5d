//! Math utilities and types
//!
//! Column-major `nalgebra` types in the conventions WebGL expects: right
//! handed, camera looking down -Z, clip-space depth in [-1, 1].

pub use nalgebra::{
    Vector3, Vector4,
    Matrix4,
    Quaternion,
    Unit,
};

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// 3D point type
pub type Point3 = nalgebra::Point3<f32>;

/// Quaternion type for rotations
pub type Quat = Unit<Quaternion<f32>>;

/// Math utility functions
pub mod utils {
    /// Linear interpolation
    pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
        a + (b - a) * t
    }
}

/// Extension trait for Mat4 with the constructors the traversal code needs
pub trait Mat4Ext {
    /// Translation matrix
    fn translation(x: f32, y: f32, z: f32) -> Mat4;

    /// Non-uniform scale matrix
    fn scaling(x: f32, y: f32, z: f32) -> Mat4;

    /// Rotation of `angle` radians around `axis` (normalized internally)
    fn rotation_axis(axis: &Vec3, angle: f32) -> Mat4;

    /// OpenGL-style perspective projection (depth mapped to [-1, 1])
    fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4;

    /// Right-handed look-at view matrix
    fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4;

    /// Transform a position, including translation
    fn transform_vec3(&self, v: &Vec3) -> Vec3;
}

impl Mat4Ext for Mat4 {
    fn translation(x: f32, y: f32, z: f32) -> Mat4 {
        Mat4::new_translation(&Vec3::new(x, y, z))
    }

    fn scaling(x: f32, y: f32, z: f32) -> Mat4 {
        Mat4::new_nonuniform_scaling(&Vec3::new(x, y, z))
    }

    fn rotation_axis(axis: &Vec3, angle: f32) -> Mat4 {
        if axis.norm_squared() == 0.0 {
            return Mat4::identity();
        }
        Mat4::from_axis_angle(&Unit::new_normalize(*axis), angle)
    }

    fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
        nalgebra::Perspective3::new(aspect, fov_y, near, far).to_homogeneous()
    }

    fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4 {
        Mat4::look_at_rh(&Point3::from(eye), &Point3::from(target), &up)
    }

    fn transform_vec3(&self, v: &Vec3) -> Vec3 {
        self.transform_point(&Point3::from(*v)).coords
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_translation_moves_points() {
        let m = Mat4::translation(1.0, 2.0, 3.0);
        assert_relative_eq!(m.transform_vec3(&Vec3::zeros()), Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_zero_axis_rotation_is_identity() {
        assert_eq!(Mat4::rotation_axis(&Vec3::zeros(), 1.0), Mat4::identity());
    }

    #[test]
    fn test_look_at_puts_target_on_negative_z() {
        let view = Mat4::look_at(Vec3::new(0.0, 0.0, 5.0), Vec3::zeros(), Vec3::y());
        let p = view.transform_vec3(&Vec3::zeros());
        assert_relative_eq!(p, Vec3::new(0.0, 0.0, -5.0), epsilon = 1e-5);
    }
}
