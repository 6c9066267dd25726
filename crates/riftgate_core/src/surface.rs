use glam::{Vec2, Vec3};
use rustc_hash::FxHashMap;

use crate::math::safe_normalize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceId(pub u32);

/// A bounded rectangle portals can be mounted on: a wall panel, a floor
/// slab, a ceiling tile. `u_axis` spans the first half extent in the plane,
/// `normal x u_axis` the second.
#[derive(Debug, Clone, Copy)]
pub struct Surface {
    pub center: Vec3,
    pub normal: Vec3,
    pub u_axis: Vec3,
    pub half_extents: Vec2,
    pub enabled: bool,
}

impl Surface {
    pub fn new(center: Vec3, normal: Vec3, u_axis: Vec3, half_extents: Vec2) -> Self {
        let normal = safe_normalize(normal, Vec3::Y);
        let u_axis = safe_normalize(u_axis - normal * u_axis.dot(normal), normal.any_orthonormal_vector());
        Self {
            center,
            normal,
            u_axis,
            half_extents,
            enabled: true,
        }
    }

    pub fn v_axis(&self) -> Vec3 {
        self.normal.cross(self.u_axis)
    }

    /// (u, v) coordinates of a world point relative to the surface center.
    pub fn to_local(&self, point: Vec3) -> Vec2 {
        let offset = point - self.center;
        Vec2::new(offset.dot(self.u_axis), offset.dot(self.v_axis()))
    }

    pub fn to_world(&self, local: Vec2) -> Vec3 {
        self.center + self.u_axis * local.x + self.v_axis() * local.y
    }

    pub fn contains_local(&self, local: Vec2) -> bool {
        local.x.abs() <= self.half_extents.x && local.y.abs() <= self.half_extents.y
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

#[derive(Debug, Clone, Copy)]
pub struct RayHit {
    pub surface: SurfaceId,
    pub point: Vec3,
    pub distance: f32,
    pub normal: Vec3,
}

#[derive(Debug, Default)]
pub struct SurfaceSet {
    surfaces: FxHashMap<SurfaceId, Surface>,
    next_id: u32,
}

impl SurfaceSet {
    pub fn insert(&mut self, surface: Surface) -> SurfaceId {
        let id = SurfaceId(self.next_id);
        self.next_id += 1;
        self.surfaces.insert(id, surface);
        id
    }

    pub fn remove(&mut self, id: SurfaceId) -> Option<Surface> {
        self.surfaces.remove(&id)
    }

    pub fn get(&self, id: SurfaceId) -> Option<&Surface> {
        self.surfaces.get(&id)
    }

    pub fn set_enabled(&mut self, id: SurfaceId, enabled: bool) -> bool {
        match self.surfaces.get_mut(&id) {
            Some(surface) => {
                surface.enabled = enabled;
                true
            }
            None => false,
        }
    }

    pub fn is_enabled(&self, id: SurfaceId) -> bool {
        self.surfaces.get(&id).is_some_and(|surface| surface.enabled)
    }

    /// Nearest enabled surface hit by the ray, front faces only.
    pub fn raycast(&self, ray: &Ray, max_distance: f32) -> Option<RayHit> {
        let direction = ray.direction.normalize_or_zero();
        if direction.length_squared() == 0.0 {
            return None;
        }

        let mut best: Option<RayHit> = None;
        for (&id, surface) in &self.surfaces {
            if !surface.enabled {
                continue;
            }

            let facing = direction.dot(surface.normal);
            if facing >= -1.0e-6 {
                continue;
            }

            let distance = (surface.center - ray.origin).dot(surface.normal) / facing;
            if distance < 0.0 || distance > max_distance {
                continue;
            }

            let point = ray.origin + direction * distance;
            if !surface.contains_local(surface.to_local(point)) {
                continue;
            }

            if best.map_or(true, |hit| distance < hit.distance) {
                best = Some(RayHit {
                    surface: id,
                    point,
                    distance,
                    normal: surface.normal,
                });
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use glam::{Vec2, Vec3};

    use super::{Ray, Surface, SurfaceSet};

    fn wall_at_z(z: f32) -> Surface {
        // Wall facing -Z, i.e. toward a viewer standing at negative z.
        Surface::new(
            Vec3::new(0.0, 0.0, z),
            Vec3::NEG_Z,
            Vec3::X,
            Vec2::new(2.0, 2.0),
        )
    }

    #[test]
    fn raycast_returns_nearest_enabled_surface() {
        let mut set = SurfaceSet::default();
        let near = set.insert(wall_at_z(5.0));
        let _far = set.insert(wall_at_z(9.0));

        let ray = Ray {
            origin: Vec3::new(0.0, 0.0, -1.0),
            direction: Vec3::Z,
        };
        let hit = set.raycast(&ray, 100.0).expect("expected a hit");
        assert_eq!(hit.surface, near);
        assert!((hit.point.z - 5.0).abs() < 1.0e-5);

        set.set_enabled(near, false);
        let hit = set.raycast(&ray, 100.0).expect("expected the far wall");
        assert!((hit.point.z - 9.0).abs() < 1.0e-5);
    }

    #[test]
    fn raycast_ignores_back_faces_and_out_of_bounds_hits() {
        let mut set = SurfaceSet::default();
        set.insert(wall_at_z(5.0));

        // From behind the wall.
        let behind = Ray {
            origin: Vec3::new(0.0, 0.0, 8.0),
            direction: Vec3::NEG_Z,
        };
        assert!(set.raycast(&behind, 100.0).is_none());

        // Past the edge of the panel.
        let wide = Ray {
            origin: Vec3::new(5.0, 0.0, -1.0),
            direction: Vec3::Z,
        };
        assert!(set.raycast(&wide, 100.0).is_none());
    }

    #[test]
    fn raycast_respects_max_distance() {
        let mut set = SurfaceSet::default();
        set.insert(wall_at_z(50.0));

        let ray = Ray {
            origin: Vec3::ZERO,
            direction: Vec3::Z,
        };
        assert!(set.raycast(&ray, 10.0).is_none());
        assert!(set.raycast(&ray, 60.0).is_some());
    }

    #[test]
    fn local_coordinates_round_trip() {
        let surface = Surface::new(
            Vec3::new(1.0, 2.0, 3.0),
            Vec3::Y,
            Vec3::Z,
            Vec2::new(4.0, 4.0),
        );
        let local = Vec2::new(0.7, -1.3);
        let recovered = surface.to_local(surface.to_world(local));
        assert!((recovered - local).length() < 1.0e-5);
    }
}
