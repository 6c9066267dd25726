use glam::{Mat3, Mat4, Vec2, Vec3};

use crate::surface::SurfaceId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotId {
    A,
    B,
}

impl SlotId {
    pub fn index(self) -> usize {
        match self {
            Self::A => 0,
            Self::B => 1,
        }
    }

    pub fn other(self) -> Self {
        match self {
            Self::A => Self::B,
            Self::B => Self::A,
        }
    }
}

/// Whether a portal hangs on a wall or lies flat. Floor/ceiling portals
/// get the minimum-exit-velocity treatment when paired with a wall portal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrientationClass {
    Floor,
    Wall,
    Ceiling,
}

impl OrientationClass {
    pub fn is_horizontal(self) -> bool {
        matches!(self, Self::Floor | Self::Ceiling)
    }
}

/// Where a portal currently sits: the full placement written by the solver.
/// `right`, `up`, `normal` form a right-handed orthonormal basis with the
/// normal facing out of the mounting surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub position: Vec3,
    pub right: Vec3,
    pub up: Vec3,
    pub normal: Vec3,
    pub half_extents: Vec2,
    pub scale: f32,
    pub surface: SurfaceId,
}

impl Placement {
    pub fn basis(&self) -> Mat3 {
        Mat3::from_cols(self.right, self.up, self.normal)
    }

    pub fn signed_distance(&self, point: Vec3) -> f32 {
        (point - self.position).dot(self.normal)
    }

    /// (right, up) coordinates of a world point relative to the portal center.
    pub fn to_local(&self, point: Vec3) -> Vec2 {
        let offset = point - self.position;
        Vec2::new(offset.dot(self.right), offset.dot(self.up))
    }

    pub fn scaled_half_extents(&self) -> Vec2 {
        self.half_extents * self.scale
    }

    pub fn bounding_radius(&self) -> f32 {
        self.scaled_half_extents().length().max(0.5)
    }

    pub fn orientation_class(&self) -> OrientationClass {
        if self.normal.y > 0.5 {
            OrientationClass::Floor
        } else if self.normal.y < -0.5 {
            OrientationClass::Ceiling
        } else {
            OrientationClass::Wall
        }
    }

    /// Model matrix for drawing the portal quad, lifted off its surface far
    /// enough to avoid z-fighting.
    pub fn model_matrix(&self, surface_offset: f32) -> Mat4 {
        let half = self.scaled_half_extents();
        Mat4::from_cols(
            (self.right * half.x.max(0.001)).extend(0.0),
            (self.up * half.y.max(0.001)).extend(0.0),
            self.normal.extend(0.0),
            (self.position + self.normal * surface_offset).extend(1.0),
        )
    }
}

#[derive(Debug, Default)]
pub struct PortalSlot {
    pub placement: Option<Placement>,
}

impl PortalSlot {
    pub fn is_placed(&self) -> bool {
        self.placement.is_some()
    }

    pub fn clear(&mut self) -> bool {
        self.placement.take().is_some()
    }
}
