//! Linked-portal core: placement, recursive view chains, oblique clipping,
//! crossing detection, and momentum-preserving teleportation, driven by a
//! host-owned fixed tick and render callback.

pub mod camera;
pub mod clone;
pub mod config;
pub mod crossing;
pub mod culling;
pub mod math;
pub mod placement;
pub mod projection;
pub mod slot;
pub mod surface;
pub mod system;
pub mod transform;
pub mod traveller;
pub mod view;

pub use camera::{CameraOrientation, Perspective, RenderCamera};
pub use clone::GhostPose;
pub use config::PortalConfig;
pub use math::Pose;
pub use placement::PlacementError;
pub use slot::{OrientationClass, Placement, SlotId};
pub use surface::{Ray, Surface, SurfaceId};
pub use system::{PortalEvent, PortalSystem, PortalViewPass};
pub use transform::PortalStep;
pub use traveller::{Traveller, TravellerId};
