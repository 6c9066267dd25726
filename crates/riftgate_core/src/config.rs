use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Tuning knobs for the portal subsystem. Distances are world units, speeds
/// world units per second, angles expressed as dot products of unit normals.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PortalConfig {
    /// Half extents of a freshly placed portal at scale 1.
    pub portal_half_extents: Vec2,
    /// Uniform size scale applied by `place_or_update_portal`.
    pub portal_scale: f32,
    /// Maximum aim-ray distance for placement.
    pub max_place_distance: f32,
    /// Clearance kept between a portal and surface edges / the sibling portal.
    pub skin_margin: f32,
    /// Push applied along the exit normal after a teleport so the traveller
    /// does not immediately re-collide with the destination surface.
    pub exit_offset: f32,
    /// Outward offset of the oblique near clip plane from the portal surface.
    pub clip_bias: f32,
    /// Offset used by hosts when drawing the portal quad over its surface.
    pub surface_offset: f32,
    /// Signed-distance threshold for plane-crossing detection.
    pub crossing_epsilon: f32,
    /// Extra tolerance around the opening when deciding whether a plane
    /// crossing passed through the portal rather than the wall beside it.
    pub bounds_margin: f32,
    /// Minimum speed along the exit normal when entry and exit portals have
    /// differing orientation classes (floor/ceiling vs wall).
    pub min_exit_speed: f32,
    /// Re-trigger suppression window after a teleport.
    pub teleport_debounce_secs: f32,
    /// Distance from the destination plane that ends the debounce early.
    pub min_exit_distance: f32,
    /// How close a held traveller must be to a portal before it is shadowed
    /// by a ghost pose.
    pub clone_radius: f32,
    /// Upper bound on portal-in-portal recursion levels.
    pub max_recursion: u32,
    /// Camera distance at which the full recursion budget applies.
    pub full_recursion_distance: f32,
    /// Camera distance beyond which a single level is rendered at most.
    pub no_recursion_distance: f32,
    /// Portals farther than this render no virtual views at all.
    pub max_render_distance: f32,
    /// Minimum estimated screen coverage below which a portal is skipped.
    pub min_screen_coverage: f32,
    /// Pair-angle policy: normals with dot <= this get the full budget.
    pub recursion_full_dot: f32,
    /// Pair-angle policy: normals with dot >= this get zero recursion.
    pub recursion_zero_dot: f32,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            portal_half_extents: Vec2::new(0.5, 1.0),
            portal_scale: 1.0,
            max_place_distance: 64.0,
            skin_margin: 0.05,
            exit_offset: 0.05,
            clip_bias: 0.025,
            surface_offset: 0.01,
            crossing_epsilon: 0.001,
            bounds_margin: 0.3,
            min_exit_speed: 1.0,
            teleport_debounce_secs: 0.15,
            min_exit_distance: 0.25,
            clone_radius: 1.5,
            max_recursion: 4,
            full_recursion_distance: 8.0,
            no_recursion_distance: 40.0,
            max_render_distance: 64.0,
            min_screen_coverage: 0.002,
            recursion_full_dot: -0.5,
            recursion_zero_dot: 0.9,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::PortalConfig;

    #[test]
    fn default_config_is_internally_consistent() {
        let config = PortalConfig::default();

        assert!(config.portal_half_extents.x > 0.0);
        assert!(config.portal_half_extents.y > 0.0);
        assert!(config.portal_scale > 0.0);
        assert!(config.exit_offset > 0.0);
        assert!(config.crossing_epsilon > 0.0);
        assert!(config.full_recursion_distance < config.no_recursion_distance);
        assert!(config.recursion_full_dot < config.recursion_zero_dot);
    }
}
