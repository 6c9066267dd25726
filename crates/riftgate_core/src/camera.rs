use glam::{Mat4, Vec3};

use crate::math::{safe_normalize, Pose};

/// Perspective lens parameters shared by the main camera and every portal
/// virtual camera.
#[derive(Debug, Clone, Copy)]
pub struct Perspective {
    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Perspective {
    fn default() -> Self {
        Self {
            fov: 70.0_f32.to_radians(),
            aspect: 16.0 / 9.0,
            near: 0.1,
            far: 1000.0,
        }
    }
}

impl Perspective {
    pub fn matrix(&self) -> Mat4 {
        Mat4::perspective_rh(
            self.fov,
            self.aspect.max(0.0001),
            self.near.max(0.0001),
            self.far.max(self.near + 0.0001),
        )
    }
}

/// The host's main camera for one render frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderCamera {
    pub pose: Pose,
    pub lens: Perspective,
}

impl RenderCamera {
    pub fn view_projection(&self) -> Mat4 {
        self.lens.matrix() * self.pose.view_matrix()
    }
}

/// Look-controller state a traveller exposes so teleports can hand back a
/// continuous view direction without reaching into the controller.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CameraOrientation {
    pub yaw: f32,
    pub pitch: f32,
}

impl CameraOrientation {
    pub fn from_forward(forward: Vec3) -> Self {
        let direction = safe_normalize(forward, Vec3::NEG_Z);
        Self {
            yaw: direction.z.atan2(direction.x),
            pitch: direction.y.clamp(-1.0, 1.0).asin(),
        }
    }

    pub fn forward(&self) -> Vec3 {
        Vec3::new(
            self.yaw.cos() * self.pitch.cos(),
            self.pitch.sin(),
            self.yaw.sin() * self.pitch.cos(),
        )
        .normalize_or_zero()
    }
}
