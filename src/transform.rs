//! Spatial placement of overlay surfaces.
//!
//! - [`Transform`]: position, rotation and scale of a node in the scene
//! - [`Placement`]: what a caller asks for when showing an overlay: a
//!   rectangle size, an anchor position and a planar rotation angle
//!
//! # Example
//!
//! ```
//! use overlayer::{Placement, Vec2, Vec3};
//!
//! let placement = Placement::new(Vec2::new(0.4, 0.3))
//!     .at(Vec3::new(0.0, 1.5, -2.0))
//!     .angle(0.25);
//! let transform = placement.transform();
//! assert_eq!(transform.position, Vec3::new(0.0, 1.5, -2.0));
//! ```

use glam::{Mat4, Quat, Vec2, Vec3};

/// Position, rotation, and scale for placing a surface in 3D space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    /// World-space position (translation).
    pub position: Vec3,
    /// Rotation as a unit quaternion.
    pub rotation: Quat,
    /// Scale factors for each axis.
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    /// Creates a new identity transform (origin, no rotation, unit scale).
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a transform positioned at the given location.
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Sets the position (translation) component.
    pub fn position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    /// Sets the rotation component using a quaternion.
    pub fn rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    /// Sets non-uniform scale factors for each axis.
    pub fn scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    /// Converts this transform to a 4×4 matrix in SRT order.
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }
}

/// Where and how large an overlay should appear.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Placement {
    /// Width and height of the rectangular surface.
    pub size: Vec2,
    /// Anchor position in world space.
    pub position: Vec3,
    /// Rotation within the surface's own plane, in radians.
    pub angle: f32,
}

impl Default for Placement {
    fn default() -> Self {
        Self {
            size: Vec2::ONE,
            position: Vec3::ZERO,
            angle: 0.0,
        }
    }
}

impl Placement {
    pub fn new(size: Vec2) -> Self {
        Self {
            size,
            ..Default::default()
        }
    }

    pub fn at(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    pub fn angle(mut self, radians: f32) -> Self {
        self.angle = radians;
        self
    }

    /// The node transform for this placement. Size stays on the surface
    /// itself, so scale is left at one.
    pub fn transform(&self) -> Transform {
        Transform::from_position(self.position).rotation(Quat::from_rotation_z(self.angle))
    }
}
