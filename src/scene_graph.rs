//! The seam between the overlay engine and whatever renders the scene.
//!
//! The engine never owns geometry or GPU state. It asks a [`SceneGraph`] to
//! insert a [`Surface`], updates that surface's material and opacity while it
//! lives, and detaches it when it is done. Camera pose reads and writes go
//! through the same trait so stereo adjustment works against any renderer.
//!
//! [`WorldScene`](crate::WorldScene) is the in-crate implementation, backed by a
//! `hecs` world.

use std::sync::Arc;

use glam::{Mat4, Vec2};
use image::RgbaImage;

use crate::transform::Transform;
use crate::video::StreamSource;

/// A decoded image shared between the frame sequence and the scene.
pub type FrameImage = Arc<RgbaImage>;

/// Type-safe handle to a surface inserted into a [`SceneGraph`].
///
/// Handles stay valid as values after the surface is detached; every
/// [`SceneGraph`] operation on a detached handle is a no-op that reports
/// `false`/`None`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SurfaceId(u64);

impl SurfaceId {
    /// Wrap a renderer-specific identifier.
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

/// What is painted onto a surface.
#[derive(Clone, Debug, Default)]
pub enum Material {
    /// Nothing bound yet.
    #[default]
    Empty,
    /// A still image or the current frame of an animated sequence.
    Image(FrameImage),
    /// A playing video stream.
    Stream(StreamSource),
    /// Caption text. Layout and glyph rendering belong to the renderer.
    Text(String),
}

impl Material {
    /// Same payload, compared by identity for images.
    pub fn same_as(&self, other: &Material) -> bool {
        match (self, other) {
            (Material::Empty, Material::Empty) => true,
            (Material::Image(a), Material::Image(b)) => Arc::ptr_eq(a, b),
            (Material::Stream(a), Material::Stream(b)) => a == b,
            (Material::Text(a), Material::Text(b)) => a == b,
            _ => false,
        }
    }
}

/// A rectangular, texturable node ready to be inserted.
#[derive(Clone, Debug)]
pub struct Surface {
    /// Width and height of the rectangle.
    pub size: Vec2,
    /// Placement of the rectangle in the scene.
    pub transform: Transform,
    /// Opacity in `[0, 1]`.
    pub opacity: f32,
    /// Initial material.
    pub material: Material,
}

impl Surface {
    /// A fully transparent surface, ready to be faded in.
    pub fn new(size: Vec2, transform: Transform, material: Material) -> Self {
        Self {
            size,
            transform,
            opacity: 0.0,
            material,
        }
    }
}

/// Operations the overlay engine needs from the rendering engine.
pub trait SceneGraph {
    /// Attach a surface to the visible scene.
    fn insert(&mut self, surface: Surface) -> SurfaceId;

    /// Remove a surface. Returns `false` if it was already gone.
    fn detach(&mut self, id: SurfaceId) -> bool;

    /// Whether the surface is still attached.
    fn contains(&self, id: SurfaceId) -> bool;

    /// Replace the surface's material. Returns `false` if it was already gone.
    fn set_material(&mut self, id: SurfaceId, material: Material) -> bool;

    /// Set the surface's opacity. Returns `false` if it was already gone.
    fn set_opacity(&mut self, id: SurfaceId, opacity: f32) -> bool;

    /// Current opacity, if attached.
    fn opacity(&self, id: SurfaceId) -> Option<f32>;

    /// Camera-to-world pose of the render camera.
    fn camera_pose(&self) -> Mat4;

    /// Overwrite the render camera's pose for this tick.
    fn set_camera_pose(&mut self, pose: Mat4);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_surface_starts_transparent() {
        let surface = Surface::new(Vec2::ONE, Transform::new(), Material::Empty);
        assert_eq!(surface.opacity, 0.0);
    }

    #[test]
    fn image_materials_compare_by_identity() {
        let a: FrameImage = Arc::new(RgbaImage::new(1, 1));
        let b: FrameImage = Arc::new(RgbaImage::new(1, 1));
        assert!(Material::Image(a.clone()).same_as(&Material::Image(a.clone())));
        assert!(!Material::Image(a).same_as(&Material::Image(b)));
    }
}
