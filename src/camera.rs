use glam::{Mat4, Vec3};

/// The render camera.
///
/// Stores position and orientation directly and converts to and from a
/// camera-to-world pose matrix, which is what the stereo adjuster composes
/// eye offsets with.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    pub forward: Vec3,
    pub up: Vec3,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 5.0),
            forward: Vec3::NEG_Z,
            up: Vec3::Y,
        }
    }
}

impl Camera {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn at(mut self, x: f32, y: f32, z: f32) -> Self {
        self.position = Vec3::new(x, y, z);
        self
    }

    pub fn looking_at(mut self, target_x: f32, target_y: f32, target_z: f32) -> Self {
        self.forward = (Vec3::new(target_x, target_y, target_z) - self.position).normalize_or_zero();
        self
    }

    /// Local horizontal axis.
    pub fn right(&self) -> Vec3 {
        self.forward.cross(self.up).normalize_or_zero()
    }

    /// Recompute up to be orthogonal to forward and right.
    pub fn orthogonal_up(&self) -> Vec3 {
        self.right().cross(self.forward).normalize_or_zero()
    }

    /// Camera-to-world matrix. Columns are right, up, back and position, so
    /// local +X is the camera's horizontal axis.
    pub fn pose(&self) -> Mat4 {
        let forward = self.forward.normalize_or_zero();
        Mat4::from_cols(
            self.right().extend(0.0),
            self.orthogonal_up().extend(0.0),
            (-forward).extend(0.0),
            self.position.extend(1.0),
        )
    }

    /// Overwrite position and orientation from a camera-to-world matrix.
    pub fn set_pose(&mut self, pose: Mat4) {
        self.position = pose.w_axis.truncate();
        self.forward = (-pose.z_axis.truncate()).normalize_or_zero();
        self.up = pose.y_axis.truncate().normalize_or_zero();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_camera_right_is_positive_x() {
        let camera = Camera::new();
        assert!((camera.right() - Vec3::X).length() < 1e-6);
    }

    #[test]
    fn pose_round_trips_orientation() {
        let camera = Camera::new().at(1.0, 2.0, 3.0).looking_at(4.0, 2.0, 3.0);
        let mut copy = Camera::new();
        copy.set_pose(camera.pose());
        assert!((copy.position - camera.position).length() < 1e-6);
        assert!((copy.forward - camera.forward).length() < 1e-6);
        assert!((copy.right() - camera.right()).length() < 1e-6);
    }
}
