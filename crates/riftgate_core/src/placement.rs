use std::fmt;

use glam::{Vec2, Vec3};

use crate::config::PortalConfig;
use crate::math::plane_basis;
use crate::slot::Placement;
use crate::surface::{Ray, Surface, SurfaceSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementError {
    /// The aim ray hit nothing placeable within range.
    NoSurface,
    /// The surface cannot contain the portal footprint plus margins.
    SurfaceTooSmall,
    /// No position clear of the sibling portal exists on this surface.
    Overlap,
}

impl fmt::Display for PlacementError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoSurface => write!(f, "no placeable surface in range"),
            Self::SurfaceTooSmall => write!(f, "surface too small for the portal"),
            Self::Overlap => write!(f, "cannot clear the other portal on this surface"),
        }
    }
}

/// Half-width of an elliptical portal footprint along `dir`, all in surface
/// plane coordinates.
fn ellipse_support(right: Vec2, up: Vec2, half: Vec2, dir: Vec2) -> f32 {
    let a = half.x * dir.dot(right);
    let b = half.y * dir.dot(up);
    (a * a + b * b).sqrt()
}

fn axes_in_surface(surface: &Surface, right: Vec3, up: Vec3) -> (Vec2, Vec2) {
    let v_axis = surface.v_axis();
    (
        Vec2::new(right.dot(surface.u_axis), right.dot(v_axis)),
        Vec2::new(up.dot(surface.u_axis), up.dot(v_axis)),
    )
}

/// Solve a valid, bounds-clamped, non-overlapping placement for a portal
/// aimed along `ray`. On success the returned basis is orthonormal and the
/// footprint clears both the surface edges and the sibling portal.
pub fn solve(
    surfaces: &SurfaceSet,
    ray: &Ray,
    view_right: Vec3,
    half_extents: Vec2,
    scale: f32,
    sibling: Option<&Placement>,
    config: &PortalConfig,
) -> Result<Placement, PlacementError> {
    let hit = surfaces
        .raycast(ray, config.max_place_distance)
        .ok_or(PlacementError::NoSurface)?;
    let surface = surfaces.get(hit.surface).ok_or(PlacementError::NoSurface)?;

    let (right, up) = plane_basis(hit.normal, view_right);
    let half = half_extents * scale;
    let (right_2d, up_2d) = axes_in_surface(surface, right, up);

    // Fit: the portal's support along each surface axis, plus skin, must
    // leave room for the center to sit inside the surface rectangle.
    let support = Vec2::new(
        ellipse_support(right_2d, up_2d, half, Vec2::X),
        ellipse_support(right_2d, up_2d, half, Vec2::Y),
    );
    let allowed = surface.half_extents - support - Vec2::splat(config.skin_margin);
    if allowed.x < 0.0 || allowed.y < 0.0 {
        return Err(PlacementError::SurfaceTooSmall);
    }

    let aim_local = surface.to_local(hit.point);
    let mut local = aim_local.clamp(-allowed, allowed);

    if let Some(other) = sibling {
        let coplanar = other.surface == hit.surface && other.normal.dot(hit.normal) > 0.99;
        if coplanar {
            let other_local = surface.to_local(other.position);
            let (other_right_2d, other_up_2d) = axes_in_surface(surface, other.right, other.up);
            let other_half = other.scaled_half_extents();

            let mut delta = local - other_local;
            let mut dir = if delta.length_squared() > 1.0e-8 {
                delta.normalize()
            } else {
                Vec2::X
            };
            let min_separation = ellipse_support(right_2d, up_2d, half, dir)
                + ellipse_support(other_right_2d, other_up_2d, other_half, dir)
                + config.skin_margin;

            if delta.length() < min_separation {
                // Push away from the sibling, then make sure clamping back
                // into the surface did not undo the separation.
                local = (other_local + dir * min_separation).clamp(-allowed, allowed);
                delta = local - other_local;
                dir = if delta.length_squared() > 1.0e-8 {
                    delta.normalize()
                } else {
                    Vec2::X
                };
                let required = ellipse_support(right_2d, up_2d, half, dir)
                    + ellipse_support(other_right_2d, other_up_2d, other_half, dir)
                    + config.skin_margin;
                if delta.length() + 1.0e-4 < required {
                    return Err(PlacementError::Overlap);
                }
            }
        }
    }

    Ok(Placement {
        position: surface.to_world(local),
        right,
        up,
        normal: hit.normal,
        half_extents,
        scale,
        surface: hit.surface,
    })
}

#[cfg(test)]
mod tests {
    use glam::{Vec2, Vec3};

    use super::{solve, PlacementError};
    use crate::config::PortalConfig;
    use crate::surface::{Ray, Surface, SurfaceSet};

    const VIEW_RIGHT: Vec3 = Vec3::new(-1.0, 0.0, 0.0);

    fn wall(half_extents: Vec2) -> (SurfaceSet, Ray) {
        let mut set = SurfaceSet::default();
        // Wall in the XY plane at z = 5, facing the viewer at negative z.
        set.insert(Surface::new(
            Vec3::new(0.0, 0.0, 5.0),
            Vec3::NEG_Z,
            Vec3::X,
            half_extents,
        ));
        let ray = Ray {
            origin: Vec3::new(0.0, 0.0, -5.0),
            direction: Vec3::Z,
        };
        (set, ray)
    }

    #[test]
    fn straight_shot_lands_at_the_aim_point() {
        let config = PortalConfig::default();
        let (surfaces, ray) = wall(Vec2::new(4.0, 4.0));

        let placement = solve(
            &surfaces,
            &ray,
            VIEW_RIGHT,
            config.portal_half_extents,
            1.0,
            None,
            &config,
        )
        .expect("placement should succeed");

        assert!((placement.position - Vec3::new(0.0, 0.0, 5.0)).length() < 1.0e-4);
        assert!((placement.normal - Vec3::NEG_Z).length() < 1.0e-5);
        assert!((placement.right.cross(placement.up) - placement.normal).length() < 1.0e-5);
        assert!(placement.right.dot(placement.up).abs() < 1.0e-5);
    }

    #[test]
    fn off_center_shots_are_clamped_inside_the_surface() {
        let config = PortalConfig::default();
        let (surfaces, _) = wall(Vec2::new(2.0, 2.0));
        let ray = Ray {
            origin: Vec3::new(1.95, 1.9, -5.0),
            direction: Vec3::Z,
        };

        let placement = solve(
            &surfaces,
            &ray,
            VIEW_RIGHT,
            config.portal_half_extents,
            1.0,
            None,
            &config,
        )
        .expect("clamped placement should succeed");

        // Footprint must stay on the 4x4 panel with the skin margin.
        assert!(placement.position.x.abs() + config.portal_half_extents.x <= 2.0 + 1.0e-4);
        assert!(placement.position.y.abs() + config.portal_half_extents.y <= 2.0 + 1.0e-4);
    }

    #[test]
    fn undersized_surfaces_are_rejected() {
        let config = PortalConfig::default();
        let (surfaces, ray) = wall(Vec2::new(0.4, 0.4));

        let result = solve(
            &surfaces,
            &ray,
            VIEW_RIGHT,
            config.portal_half_extents,
            1.0,
            None,
            &config,
        );
        assert_eq!(result, Err(PlacementError::SurfaceTooSmall));
    }

    #[test]
    fn missing_surface_is_reported() {
        let config = PortalConfig::default();
        let surfaces = SurfaceSet::default();
        let ray = Ray {
            origin: Vec3::ZERO,
            direction: Vec3::Z,
        };
        assert_eq!(
            solve(
                &surfaces,
                &ray,
                VIEW_RIGHT,
                config.portal_half_extents,
                1.0,
                None,
                &config,
            ),
            Err(PlacementError::NoSurface)
        );
    }

    #[test]
    fn second_portal_on_the_same_spot_is_pushed_clear() {
        let config = PortalConfig::default();
        let half = Vec2::splat(0.45);
        let (surfaces, ray) = wall(Vec2::new(2.0, 2.0));

        let first = solve(&surfaces, &ray, VIEW_RIGHT, half, 1.0, None, &config)
            .expect("first placement");
        let second = solve(&surfaces, &ray, VIEW_RIGHT, half, 1.0, Some(&first), &config)
            .expect("second placement should relocate");

        let separation = first.position.distance(second.position);
        assert!(
            separation >= 0.9 - config.skin_margin,
            "centers only {separation} apart"
        );
    }

    #[test]
    fn overlap_with_no_room_left_fails() {
        let config = PortalConfig::default();
        let half = Vec2::splat(0.45);
        // Just big enough for one portal.
        let (surfaces, ray) = wall(Vec2::new(0.55, 0.55));

        let first = solve(&surfaces, &ray, VIEW_RIGHT, half, 1.0, None, &config)
            .expect("first placement");
        let result = solve(&surfaces, &ray, VIEW_RIGHT, half, 1.0, Some(&first), &config);
        assert_eq!(result, Err(PlacementError::Overlap));
    }

    #[test]
    fn grazing_view_direction_still_yields_an_orthonormal_basis() {
        let config = PortalConfig::default();
        let (surfaces, ray) = wall(Vec2::new(4.0, 4.0));

        // Viewer right parallel to the surface normal: the solver must fall
        // back to an arbitrary in-plane axis.
        let placement = solve(
            &surfaces,
            &ray,
            Vec3::NEG_Z,
            config.portal_half_extents,
            1.0,
            None,
            &config,
        )
        .expect("placement should succeed");
        assert!((placement.right.cross(placement.up) - placement.normal).length() < 1.0e-5);
    }
}
