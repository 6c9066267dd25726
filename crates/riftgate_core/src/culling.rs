use glam::{Mat4, Vec3, Vec4};

use crate::camera::RenderCamera;
use crate::config::PortalConfig;
use crate::slot::Placement;

pub type FrustumPlanes = [[f32; 4]; 6];

/// Normalized clip planes (left, right, bottom, top, near, far) extracted
/// from a view-projection matrix; ax + by + cz + d >= 0 is inside.
pub fn frustum_planes(view_proj: Mat4) -> FrustumPlanes {
    let m = view_proj;
    let r0 = Vec4::new(m.x_axis.x, m.y_axis.x, m.z_axis.x, m.w_axis.x);
    let r1 = Vec4::new(m.x_axis.y, m.y_axis.y, m.z_axis.y, m.w_axis.y);
    let r2 = Vec4::new(m.x_axis.z, m.y_axis.z, m.z_axis.z, m.w_axis.z);
    let r3 = Vec4::new(m.x_axis.w, m.y_axis.w, m.z_axis.w, m.w_axis.w);

    let mut planes = [r3 + r0, r3 - r0, r3 + r1, r3 - r1, r2, r3 - r2];
    for plane in &mut planes {
        let length = Vec3::new(plane.x, plane.y, plane.z).length().max(1.0e-6);
        *plane /= length;
    }
    planes.map(|plane| [plane.x, plane.y, plane.z, plane.w])
}

pub fn sphere_in_frustum(planes: &FrustumPlanes, center: Vec3, radius: f32) -> bool {
    for plane in planes {
        let distance = plane[0] * center.x + plane[1] * center.y + plane[2] * center.z + plane[3];
        if distance < -radius {
            return false;
        }
    }
    true
}

/// Rough fraction of the screen the portal covers, from its bounding radius
/// and distance. Good enough to skip portals that are a handful of pixels.
pub fn screen_coverage(placement: &Placement, camera: &RenderCamera) -> f32 {
    let distance = camera.pose.position.distance(placement.position).max(1.0e-3);
    let half_view = (camera.lens.fov * 0.5).tan() * distance;
    if half_view <= 0.0 {
        return 1.0;
    }
    let ratio = placement.bounding_radius() / half_view;
    (ratio * ratio).min(1.0)
}

/// Whether a portal's surface is worth rendering at all this frame.
pub fn portal_is_visible(
    placement: &Placement,
    camera: &RenderCamera,
    planes: &FrustumPlanes,
    config: &PortalConfig,
) -> bool {
    // Back side of the surface shows the closed face, never the view.
    if (camera.pose.position - placement.position).dot(placement.normal) <= 0.0 {
        return false;
    }
    let distance = camera.pose.position.distance(placement.position);
    if distance > config.max_render_distance {
        return false;
    }
    if screen_coverage(placement, camera) < config.min_screen_coverage {
        return false;
    }
    sphere_in_frustum(planes, placement.position, placement.bounding_radius())
}

/// How many recursion levels this pair deserves: full budget up close with
/// opposing portals, tapering with distance and with how far the pair is
/// from facing each other. Purely a quality policy; teleport correctness
/// never depends on it.
pub fn recursion_budget(
    camera_position: Vec3,
    entry: &Placement,
    exit: &Placement,
    config: &PortalConfig,
) -> u32 {
    if config.max_recursion == 0 {
        return 0;
    }

    let distance = camera_position.distance(entry.position);
    let distance_factor = if distance <= config.full_recursion_distance {
        1.0
    } else if distance >= config.no_recursion_distance {
        0.0
    } else {
        let span = (config.no_recursion_distance - config.full_recursion_distance).max(1.0e-3);
        1.0 - (distance - config.full_recursion_distance) / span
    };

    let facing = entry.normal.dot(exit.normal);
    let angle_factor = if facing <= config.recursion_full_dot {
        1.0
    } else if facing >= config.recursion_zero_dot {
        0.0
    } else {
        let span = (config.recursion_zero_dot - config.recursion_full_dot).max(1.0e-3);
        (config.recursion_zero_dot - facing) / span
    };

    let scaled = (config.max_recursion as f32 * distance_factor * angle_factor).ceil() as u32;
    scaled.min(config.max_recursion).max(1)
}
