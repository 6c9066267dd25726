use glam::{Mat4, Vec3, Vec4};

use crate::math::safe_normalize;

/// Projection matrix whose near clip plane coincides with an arbitrary world
/// plane, for cameras rendering the view through a portal: nothing between
/// the virtual camera and the destination portal surface may survive
/// clipping, or the recursion would show the back of the portal frame.
///
/// The plane normal must point away from the camera (toward the kept side).
/// Degenerate plane/projection combinations return the base projection
/// unchanged rather than a poisoned matrix.
pub fn oblique_projection(base: Mat4, view: Mat4, plane_point: Vec3, plane_normal: Vec3) -> Mat4 {
    let normal = safe_normalize(plane_normal, Vec3::NEG_Z);
    let plane_world = Vec4::new(normal.x, normal.y, normal.z, -normal.dot(plane_point));
    // Planes transform by the inverse transpose of the point transform.
    let plane_camera = view.inverse().transpose() * plane_world;

    let q = base.inverse()
        * Vec4::new(
            plane_camera.x.signum(),
            plane_camera.y.signum(),
            1.0,
            1.0,
        );
    let denom = plane_camera.dot(q);
    if denom.abs() < 1.0e-5 {
        return base;
    }

    // Rescale the plane so it lands on the z' = 0 near boundary while the
    // far corner q keeps z' = w'.
    let scaled = plane_camera * (base.row(3).dot(q) / denom);
    let mut oblique = base;
    oblique.x_axis.z = scaled.x;
    oblique.y_axis.z = scaled.y;
    oblique.z_axis.z = scaled.z;
    oblique.w_axis.z = scaled.w;
    oblique
}
