//! Math utilities and types
//!
//! Only the operations the render queue depends on: matrix composition,
//! inversion, and building matrices from 2D and 3D transforms.

pub use nalgebra::{
    Vector2, Vector3, Vector4,
    Matrix4,
    Quaternion,
    Unit,
};

/// 2D vector type
pub type Vec2 = Vector2<f32>;

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// Quaternion type for rotations
pub type Quat = Unit<Quaternion<f32>>;

/// Transform representing position, rotation, and scale
#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    /// Position in 3D space
    pub position: Vec3,

    /// Rotation quaternion
    pub rotation: Quat,

    /// Scale factors
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::zeros(),
            rotation: Quat::identity(),
            scale: Vec3::new(1.0, 1.0, 1.0),
        }
    }
}

impl Transform {
    /// Create a new identity transform
    pub fn identity() -> Self {
        Self::default()
    }

    /// Create a transform with only position
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Create a transform with position and rotation
    pub fn from_position_rotation(position: Vec3, rotation: Quat) -> Self {
        Self {
            position,
            rotation,
            ..Default::default()
        }
    }

    /// Convert to a transformation matrix
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::new_translation(&self.position)
            * self.rotation.to_homogeneous()
            * Mat4::new_nonuniform_scaling(&self.scale)
    }
}

/// Planar transform used by 2D scenes and 2D cameras.
///
/// The rotation is about the Z axis. 2D cameras store their field of view in
/// `scale`, which is why the render queue strips it before building the
/// modelview matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform2D {
    /// Translation in the XY plane
    pub position: Vec2,

    /// Rotation about Z, in radians
    pub angle: f32,

    /// Per-axis scale
    pub scale: Vec2,
}

impl Default for Transform2D {
    fn default() -> Self {
        Self {
            position: Vec2::zeros(),
            angle: 0.0,
            scale: Vec2::new(1.0, 1.0),
        }
    }
}

impl Transform2D {
    /// Create a transform with only a translation
    pub fn from_position(position: Vec2) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Replace the scale, keeping translation and rotation
    pub fn with_scale(mut self, scale: Vec2) -> Self {
        self.scale = scale;
        self
    }

    /// Convert to a 4x4 matrix (translation * rotation * scale)
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::new_translation(&Vec3::new(self.position.x, self.position.y, 0.0))
            * Mat4::rotation_z(self.angle)
            * Mat4::new_nonuniform_scaling(&Vec3::new(self.scale.x, self.scale.y, 1.0))
    }
}

/// Math constants
pub mod constants {
    /// Pi constant
    pub const PI: f32 = std::f32::consts::PI;

    /// Degrees to radians conversion factor
    pub const DEG_TO_RAD: f32 = PI / 180.0;
}

/// Math utility functions
pub mod utils {
    use super::constants;

    /// Convert degrees to radians
    pub fn deg_to_rad(degrees: f32) -> f32 {
        degrees * constants::DEG_TO_RAD
    }
}

/// Extension trait for Mat4 with additional convenience methods
pub trait Mat4Ext {
    /// Create a rotation matrix around the Z axis
    fn rotation_z(angle: f32) -> Mat4;

    /// Mirror the X axis, switching between left- and right-handed spaces
    fn mirror_x() -> Mat4;

    /// Read the first three components of a column as a vector
    fn column_xyz(&self, column: usize) -> Vec3;

    /// Overwrite a column with a direction (w = 0)
    fn set_column_direction(&mut self, column: usize, direction: &Vec3);
}

impl Mat4Ext for Mat4 {
    fn rotation_z(angle: f32) -> Mat4 {
        Mat4::from_axis_angle(&Vec3::z_axis(), angle)
    }

    fn mirror_x() -> Mat4 {
        Mat4::new_nonuniform_scaling(&Vec3::new(-1.0, 1.0, 1.0))
    }

    fn column_xyz(&self, column: usize) -> Vec3 {
        Vec3::new(self[(0, column)], self[(1, column)], self[(2, column)])
    }

    fn set_column_direction(&mut self, column: usize, direction: &Vec3) {
        self.set_column(column, &Vec4::new(direction.x, direction.y, direction.z, 0.0));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const EPSILON: f32 = 1e-5;

    #[test]
    fn test_transform_identity_matrix() {
        assert_relative_eq!(Transform::identity().to_matrix(), Mat4::identity(), epsilon = EPSILON);
    }

    #[test]
    fn test_transform_translation_in_last_column() {
        let matrix = Transform::from_position(Vec3::new(1.0, 2.0, 3.0)).to_matrix();
        assert_relative_eq!(matrix.column_xyz(3), Vec3::new(1.0, 2.0, 3.0), epsilon = EPSILON);
    }

    #[test]
    fn test_transform_2d_composition_order() {
        let transform = Transform2D {
            position: Vec2::new(10.0, 0.0),
            angle: utils::deg_to_rad(90.0),
            scale: Vec2::new(2.0, 2.0),
        };

        // Scale first, then rotate, then translate.
        let point = transform.to_matrix() * Vec4::new(1.0, 0.0, 0.0, 1.0);
        assert_relative_eq!(point, Vec4::new(10.0, 2.0, 0.0, 1.0), epsilon = EPSILON);
    }

    #[test]
    fn test_mirror_x_flips_only_x() {
        let point = Mat4::mirror_x() * Vec4::new(1.0, 2.0, 3.0, 1.0);
        assert_relative_eq!(point, Vec4::new(-1.0, 2.0, 3.0, 1.0), epsilon = EPSILON);
    }

    #[test]
    fn test_set_column_direction_zeroes_w() {
        let mut matrix = Mat4::identity();
        matrix.set_column_direction(3, &Vec3::new(4.0, 5.0, 6.0));
        assert_eq!(matrix[(3, 3)], 0.0);
        assert_relative_eq!(matrix.column_xyz(3), Vec3::new(4.0, 5.0, 6.0), epsilon = EPSILON);
    }
}
