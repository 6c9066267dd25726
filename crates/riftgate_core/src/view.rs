use tracing::warn;

use crate::math::Pose;
use crate::slot::Placement;
use crate::transform::PortalStep;

/// Virtual camera poses for rendering `max_levels` of portal-in-portal
/// recursion, ordered deepest level first so each shallower level can sample
/// the deeper level's finished render target.
///
/// Level n is the main camera stepped through the pair n times. A pose that
/// goes non-finite (degenerate placement data) truncates that level and all
/// deeper ones; rendering carries on with the shallow levels.
pub fn build_view_chain(
    main_camera: &Pose,
    entry: &Placement,
    exit: &Placement,
    max_levels: u32,
) -> Vec<Pose> {
    let step = PortalStep::between(entry, exit);

    let mut chain = Vec::with_capacity(max_levels as usize);
    let mut pose = *main_camera;
    for level in 1..=max_levels {
        pose = step.apply_pose(&pose);
        if !pose.is_finite() {
            warn!("portal view chain went non-finite at level {level}, truncating");
            break;
        }
        chain.push(pose);
    }

    chain.reverse();
    chain
}

#[cfg(test)]
mod tests {
    use glam::{Vec2, Vec3};

    use super::build_view_chain;
    use crate::math::Pose;
    use crate::slot::Placement;
    use crate::surface::SurfaceId;

    fn facing_pair() -> (Placement, Placement) {
        let a = Placement {
            position: Vec3::ZERO,
            right: Vec3::X,
            up: Vec3::Y,
            normal: Vec3::Z,
            half_extents: Vec2::new(0.5, 1.0),
            scale: 1.0,
            surface: SurfaceId(0),
        };
        let b = Placement {
            position: Vec3::new(0.0, 0.0, 10.0),
            right: Vec3::NEG_X,
            up: Vec3::Y,
            normal: Vec3::NEG_Z,
            half_extents: Vec2::new(0.5, 1.0),
            scale: 1.0,
            surface: SurfaceId(1),
        };
        (a, b)
    }

    #[test]
    fn chain_has_exactly_the_requested_depth() {
        let (a, b) = facing_pair();
        let camera = Pose::look_to(Vec3::new(0.0, 0.0, 4.0), Vec3::NEG_Z, Vec3::Y);

        for levels in [1, 3, 6] {
            assert_eq!(build_view_chain(&camera, &a, &b, levels).len(), levels as usize);
        }
    }

    #[test]
    fn each_level_steps_the_camera_one_pair_further() {
        let (a, b) = facing_pair();
        let camera = Pose::look_to(Vec3::new(0.0, 0.0, 4.0), Vec3::NEG_Z, Vec3::Y);
        let chain = build_view_chain(&camera, &a, &b, 2);

        // Deepest first: chain[1] is level 1, chain[0] is level 2. Two
        // opposing portals 10 apart shift the view 10 units per level.
        let level1 = chain[1];
        let level2 = chain[0];
        assert!((level1.position - Vec3::new(0.0, 0.0, 14.0)).length() < 1.0e-3);
        assert!((level2.position - Vec3::new(0.0, 0.0, 24.0)).length() < 1.0e-3);
        assert!((level1.forward() - camera.forward()).length() < 1.0e-4);
    }

    #[test]
    fn non_finite_placement_truncates_without_panicking() {
        let (a, mut b) = facing_pair();
        b.position = Vec3::new(f32::NAN, 0.0, 10.0);
        let camera = Pose::look_to(Vec3::new(0.0, 0.0, 4.0), Vec3::NEG_Z, Vec3::Y);

        let chain = build_view_chain(&camera, &a, &b, 4);
        assert!(chain.is_empty());
    }
}
