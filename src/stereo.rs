//! Per-eye camera offset for stereo rendering.
//!
//! Each render tick the camera is shifted along its own horizontal axis by
//! half the interpupillary distance: left eye to the left, right eye to the
//! right. The adjuster remembers the pose it wrote last, so adjusting again
//! before the next camera-follow update replaces its own offset instead of
//! stacking a second one.

use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

use crate::scene_graph::SceneGraph;

/// Which eye the current frame is rendered for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Eye {
    Left,
    Right,
    /// Mono view, no offset.
    #[default]
    Center,
}

impl Eye {
    /// -1, +1 or 0.
    pub fn sign(self) -> f32 {
        match self {
            Eye::Left => -1.0,
            Eye::Right => 1.0,
            Eye::Center => 0.0,
        }
    }
}

/// Applies the eye offset to the render camera.
#[derive(Clone, Debug, Default)]
pub struct StereoViewAdjuster {
    /// (pose before offset, pose written) from the last adjustment.
    last: Option<(Mat4, Mat4)>,
}

impl StereoViewAdjuster {
    pub fn new() -> Self {
        Self::default()
    }

    /// `pose · translate(±ipd/2, 0, 0)`, or `pose` for [`Eye::Center`].
    pub fn offset_pose(pose: Mat4, eye: Eye, interpupillary_distance: f32) -> Mat4 {
        if eye == Eye::Center {
            return pose;
        }
        let offset = eye.sign() * interpupillary_distance / 2.0;
        pose * Mat4::from_translation(Vec3::new(offset, 0.0, 0.0))
    }

    /// Read the scene camera, offset it for `eye`, and write it back.
    ///
    /// Must run after the camera-follow update and before the frame is
    /// submitted.
    pub fn apply<S: SceneGraph + ?Sized>(
        &mut self,
        scene: &mut S,
        eye: Eye,
        interpupillary_distance: f32,
    ) {
        let current = scene.camera_pose();
        let base = match self.last {
            Some((base, written)) if written == current => base,
            _ => current,
        };

        let adjusted = Self::offset_pose(base, eye, interpupillary_distance);
        if adjusted != current {
            scene.set_camera_pose(adjusted);
        }
        self.last = Some((base, scene.camera_pose()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::Camera;
    use crate::ecs::WorldScene;

    const IPD: f32 = 0.063;

    fn assert_close(a: Vec3, b: Vec3) {
        assert!((a - b).length() < 1e-5, "{a:?} != {b:?}");
    }

    #[test]
    fn left_eye_moves_along_local_horizontal_axis() {
        let camera = Camera::new().at(1.0, 2.0, 3.0).looking_at(1.0, 2.0, 10.0);
        let pose = camera.pose();

        let left = StereoViewAdjuster::offset_pose(pose, Eye::Left, IPD);
        let delta = left.w_axis.truncate() - pose.w_axis.truncate();
        assert_close(delta, camera.right() * (-IPD / 2.0));
    }

    #[test]
    fn right_eye_is_mirror_of_left() {
        let pose = Camera::new().pose();
        let left = StereoViewAdjuster::offset_pose(pose, Eye::Left, IPD).w_axis;
        let right = StereoViewAdjuster::offset_pose(pose, Eye::Right, IPD).w_axis;
        assert_close((right - left).truncate(), Vec3::X * IPD);
    }

    #[test]
    fn center_leaves_pose_untouched() {
        let pose = Camera::new().at(4.0, 0.0, 0.0).pose();
        assert_eq!(StereoViewAdjuster::offset_pose(pose, Eye::Center, IPD), pose);
    }

    #[test]
    fn repeated_apply_does_not_stack_offsets() {
        let mut scene = WorldScene::new();
        let original = scene.camera().position;
        let mut stereo = StereoViewAdjuster::new();

        stereo.apply(&mut scene, Eye::Left, IPD);
        stereo.apply(&mut scene, Eye::Left, IPD);
        assert_close(scene.camera().position, original + Vec3::X * (-IPD / 2.0));

        stereo.apply(&mut scene, Eye::Right, IPD);
        assert_close(scene.camera().position, original + Vec3::X * (IPD / 2.0));

        stereo.apply(&mut scene, Eye::Center, IPD);
        assert_close(scene.camera().position, original);
    }

    #[test]
    fn camera_follow_update_is_respected() {
        let mut scene = WorldScene::new();
        let mut stereo = StereoViewAdjuster::new();
        stereo.apply(&mut scene, Eye::Right, IPD);

        // The render engine moves the camera for the next tick.
        *scene.camera_mut() = Camera::new().at(0.0, 0.0, 9.0);
        stereo.apply(&mut scene, Eye::Right, IPD);
        assert_close(scene.camera().position, Vec3::new(IPD / 2.0, 0.0, 9.0));
    }
}
