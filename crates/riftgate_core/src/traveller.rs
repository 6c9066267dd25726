use glam::Vec3;

use crate::math::Pose;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TravellerId(pub u64);

/// Live physics state of an object that can cross portals. The host pushes
/// this before every tick; the system writes it back on teleport.
#[derive(Debug, Clone, Copy, Default)]
pub struct Traveller {
    pub pose: Pose,
    pub velocity: Vec3,
    pub angular_velocity: Vec3,
    pub held: bool,
}

