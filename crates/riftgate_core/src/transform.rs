use std::f32::consts::PI;

use glam::{Mat3, Mat4, Quat, Vec3};

use crate::camera::CameraOrientation;
use crate::config::PortalConfig;
use crate::math::Pose;
use crate::slot::Placement;

/// The step transform between a linked portal pair: maps any pose expressed
/// relative to the entry portal onto the equivalent pose relative to the
/// exit portal, flipped half a turn so that entering becomes exiting.
#[derive(Debug, Clone, Copy)]
pub struct PortalStep {
    pub entry: Placement,
    pub exit: Placement,
    pub rotation: Quat,
    pub scale_ratio: f32,
}

impl PortalStep {
    pub fn between(entry: &Placement, exit: &Placement) -> Self {
        assert!(
            entry.scale.is_finite() && entry.scale > 0.0,
            "entry portal has degenerate scale {}",
            entry.scale
        );
        assert!(
            exit.scale.is_finite() && exit.scale > 0.0,
            "exit portal has degenerate scale {}",
            exit.scale
        );

        let rotation_mat = exit.basis() * Mat3::from_rotation_y(PI) * entry.basis().transpose();
        Self {
            entry: *entry,
            exit: *exit,
            rotation: Quat::from_mat3(&rotation_mat).normalize(),
            scale_ratio: exit.scale / entry.scale,
        }
    }

    pub fn apply_position(&self, position: Vec3) -> Vec3 {
        self.exit.position + self.rotation * ((position - self.entry.position) * self.scale_ratio)
    }

    pub fn apply_rotation(&self, rotation: Quat) -> Quat {
        self.rotation * rotation
    }

    /// Velocity rotates like an orientation and its magnitude scales with the
    /// portal size ratio. A zero vector passes through untouched.
    pub fn apply_velocity(&self, velocity: Vec3) -> Vec3 {
        self.rotation * (velocity * self.scale_ratio)
    }

    pub fn apply_pose(&self, pose: &Pose) -> Pose {
        Pose {
            position: self.apply_position(pose.position),
            rotation: self.apply_rotation(pose.rotation),
        }
    }

    /// Full affine step as a matrix, for chaining view transforms.
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_translation(self.exit.position)
            * Mat4::from_quat(self.rotation)
            * Mat4::from_scale(Vec3::splat(self.scale_ratio))
            * Mat4::from_translation(-self.entry.position)
    }

    pub fn orientation_after(&self, orientation: CameraOrientation) -> CameraOrientation {
        CameraOrientation::from_forward(self.rotation * orientation.forward())
    }

    /// The teleport proper: step the pose and velocity across, push the
    /// result off the destination surface, and guarantee a minimum exit
    /// speed when a horizontal portal feeds a vertical one (or vice versa).
    pub fn teleport(&self, pose: &Pose, velocity: Vec3, config: &PortalConfig) -> (Pose, Vec3) {
        let mut new_pose = self.apply_pose(pose);
        new_pose.position += self.exit.normal * config.exit_offset;

        let mut new_velocity = self.apply_velocity(velocity);
        let entry_horizontal = self.entry.orientation_class().is_horizontal();
        let exit_horizontal = self.exit.orientation_class().is_horizontal();
        if entry_horizontal != exit_horizontal {
            let normal_speed = new_velocity.dot(self.exit.normal);
            if normal_speed < config.min_exit_speed {
                new_velocity += self.exit.normal * (config.min_exit_speed - normal_speed);
            }
        }

        (new_pose, new_velocity)
    }
}
