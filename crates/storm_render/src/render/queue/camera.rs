//! Scene cameras and display orientation
//!
//! Only what the render queue needs to build the frame's base matrix.
//! Projection lives elsewhere.

use serde::{Deserialize, Serialize};

use crate::foundation::math::{utils, Mat4, Mat4Ext, Quat, Transform, Transform2D, Vec2, Vec3};

/// Physical orientation of the display, named after the clock position of
/// the device's "top" edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Orientation {
    /// Upright
    #[default]
    Normal,
    /// Top edge at three o'clock
    Three,
    /// Upside down
    Six,
    /// Top edge at nine o'clock
    Nine,
}

impl Orientation {
    /// Rotation about Z applied to 3D scenes, in degrees
    pub fn angle_3d(self) -> f32 {
        match self {
            Orientation::Normal => 0.0,
            Orientation::Three => 270.0,
            Orientation::Six => 180.0,
            Orientation::Nine => 90.0,
        }
    }

    /// Rotation about Z applied to 2D scenes, in degrees.
    ///
    /// 2D scenes are mirrored relative to 3D ones, so the quarter turns swap.
    pub fn angle_2d(self) -> f32 {
        match self {
            Orientation::Normal => 0.0,
            Orientation::Three => 90.0,
            Orientation::Six => 180.0,
            Orientation::Nine => 270.0,
        }
    }
}

/// Perspective camera placed in the world
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Camera3D {
    /// World placement; the camera looks down its local +Z with +Y up
    pub transform: Transform,
}

impl Camera3D {
    /// Camera at `position` with `rotation`
    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Self {
            transform: Transform::from_position_rotation(position, rotation),
        }
    }

    /// World position
    pub fn position(&self) -> Vec3 {
        self.transform.position
    }

    /// World-to-view matrix before display orientation
    pub fn view_matrix(&self) -> Mat4 {
        let camera = self.transform.to_matrix();

        let forward = camera.column_xyz(2).normalize();
        let side = forward.cross(&camera.column_xyz(1)).normalize();
        let up = side.cross(&forward);

        let mut basis = Mat4::identity();
        basis.set_column_direction(0, &side);
        basis.set_column_direction(1, &up);
        basis.set_column_direction(2, &-forward);

        let inverse = basis.try_inverse().unwrap_or_else(|| {
            log::error!("Camera3D: degenerate camera basis, using identity view");
            Mat4::identity()
        });

        Mat4::mirror_x() * inverse * Mat4::new_translation(&-self.position())
    }
}

/// Planar camera
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Camera2D {
    /// Placement; `scale` holds the field of view and is ignored here
    pub transform: Transform2D,
}

impl Camera2D {
    /// Camera at `position` seeing `field_of_view` units vertically
    pub fn new(position: Vec2, field_of_view: f32) -> Self {
        Self {
            transform: Transform2D::from_position(position).with_scale(Vec2::new(field_of_view, field_of_view)),
        }
    }

    /// Camera matrix with the field-of-view scale stripped
    pub fn camera_matrix(&self) -> Mat4 {
        self.transform.with_scale(Vec2::new(1.0, 1.0)).to_matrix()
    }
}

/// Camera the scene hands to the render queue each frame
#[derive(Debug, Clone, PartialEq)]
pub enum SceneCamera {
    /// 3D scene
    Perspective(Camera3D),
    /// 2D scene
    Flat(Camera2D),
}

impl SceneCamera {
    /// Matrix for transform stack slot 0
    pub fn base_matrix(&self, orientation: Orientation) -> Mat4 {
        match self {
            SceneCamera::Perspective(camera) => {
                let oriented = Mat4::rotation_z(utils::deg_to_rad(orientation.angle_3d()));
                oriented * camera.view_matrix()
            }
            SceneCamera::Flat(camera) => {
                let oriented = Mat4::rotation_z(utils::deg_to_rad(orientation.angle_2d()));
                camera.camera_matrix() * oriented
            }
        }
    }

    /// Whether this is a 3D scene
    pub fn is_3d(&self) -> bool {
        matches!(self, SceneCamera::Perspective(_))
    }
}
