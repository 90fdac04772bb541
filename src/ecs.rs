//! ECS-backed scene for overlay surfaces.
//!
//! [`WorldScene`] implements [`SceneGraph`] on top of a `hecs` world. Every
//! inserted surface becomes an entity with a [`Transform`](crate::Transform), a [`Quad`], an
//! [`Opacity`] and a [`Material`] component, so a renderer can draw the whole
//! overlay layer with a single query.
//!
//! # Example
//!
//! ```
//! use overlayer::*;
//!
//! let mut scene = WorldScene::new();
//! let id = scene.insert(Surface::new(Vec2::ONE, Transform::new(), Material::Empty));
//! scene.set_opacity(id, 0.5);
//!
//! for (_entity, (quad, opacity)) in scene.world().query::<(&Quad, &Opacity)>().iter() {
//!     assert_eq!(quad.size, Vec2::ONE);
//!     assert_eq!(opacity.0, 0.5);
//! }
//! ```

use glam::{Mat4, Vec2};
use hecs::{Entity, World};

use crate::camera::Camera;
use crate::scene_graph::{Material, SceneGraph, Surface, SurfaceId};

/// Rectangle dimensions of an overlay surface.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Quad {
    pub size: Vec2,
}

/// Surface opacity in `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Opacity(pub f32);

/// A [`SceneGraph`] that stores surfaces as `hecs` entities and owns the
/// render camera.
pub struct WorldScene {
    world: World,
    camera: Camera,
}

impl Default for WorldScene {
    fn default() -> Self {
        Self::new()
    }
}

impl WorldScene {
    pub fn new() -> Self {
        Self::with_camera(Camera::default())
    }

    pub fn with_camera(camera: Camera) -> Self {
        Self {
            world: World::new(),
            camera,
        }
    }

    /// The underlying ECS world, for renderers that query surfaces directly.
    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// Mutable camera access for the engine's own camera-follow update.
    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    /// Number of attached surfaces.
    pub fn surface_count(&self) -> usize {
        self.world.len() as usize
    }

    /// Current material of an attached surface.
    pub fn material(&self, id: SurfaceId) -> Option<Material> {
        let entity = Self::entity(id)?;
        self.world
            .get::<&Material>(entity)
            .ok()
            .map(|m| (*m).clone())
    }

    /// Attached surfaces with non-zero opacity.
    pub fn visible_surfaces(&self) -> Vec<SurfaceId> {
        let mut visible: Vec<SurfaceId> = self
            .world
            .query::<&Opacity>()
            .iter()
            .filter(|(_, opacity)| opacity.0 > 0.0)
            .map(|(entity, _)| SurfaceId::from_raw(entity.to_bits().get()))
            .collect();
        visible.sort_by_key(|id| id.raw());
        visible
    }

    fn entity(id: SurfaceId) -> Option<Entity> {
        Entity::from_bits(id.raw())
    }
}

impl SceneGraph for WorldScene {
    fn insert(&mut self, surface: Surface) -> SurfaceId {
        let entity = self.world.spawn((
            surface.transform,
            Quad { size: surface.size },
            Opacity(surface.opacity.clamp(0.0, 1.0)),
            surface.material,
        ));
        SurfaceId::from_raw(entity.to_bits().get())
    }

    fn detach(&mut self, id: SurfaceId) -> bool {
        match Self::entity(id) {
            Some(entity) => self.world.despawn(entity).is_ok(),
            None => false,
        }
    }

    fn contains(&self, id: SurfaceId) -> bool {
        Self::entity(id).is_some_and(|entity| self.world.contains(entity))
    }

    fn set_material(&mut self, id: SurfaceId, material: Material) -> bool {
        let Some(entity) = Self::entity(id) else {
            return false;
        };
        match self.world.get::<&mut Material>(entity) {
            Ok(mut slot) => {
                *slot = material;
                true
            }
            Err(_) => false,
        }
    }

    fn set_opacity(&mut self, id: SurfaceId, opacity: f32) -> bool {
        let Some(entity) = Self::entity(id) else {
            return false;
        };
        match self.world.get::<&mut Opacity>(entity) {
            Ok(mut slot) => {
                slot.0 = opacity.clamp(0.0, 1.0);
                true
            }
            Err(_) => false,
        }
    }

    fn opacity(&self, id: SurfaceId) -> Option<f32> {
        let entity = Self::entity(id)?;
        self.world.get::<&Opacity>(entity).ok().map(|o| o.0)
    }

    fn camera_pose(&self) -> Mat4 {
        self.camera.pose()
    }

    fn set_camera_pose(&mut self, pose: Mat4) {
        self.camera.set_pose(pose);
    }
}
