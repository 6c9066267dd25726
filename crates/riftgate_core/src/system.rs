use glam::{Mat4, Vec3};
use rustc_hash::FxHashMap;
use tracing::{debug, info};

use crate::camera::{CameraOrientation, RenderCamera};
use crate::clone::{CloneRefresh, CloneSystem, GhostPose, ReleaseOutcome};
use crate::config::PortalConfig;
use crate::crossing::{CrossingTracker, CrossingUpdate};
use crate::culling::{frustum_planes, portal_is_visible, recursion_budget};
use crate::math::{mat4_is_finite, Pose};
use crate::placement;
use crate::projection::oblique_projection;
use crate::slot::{Placement, PortalSlot, SlotId};
use crate::surface::{Ray, Surface, SurfaceId, SurfaceSet};
use crate::transform::PortalStep;
use crate::traveller::{Traveller, TravellerId};
use crate::view::build_view_chain;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PortalEvent {
    PortalOpened {
        slot: SlotId,
    },
    PortalMoved {
        slot: SlotId,
    },
    PortalClosed {
        slot: SlotId,
    },
    Teleported {
        traveller: TravellerId,
        entry: SlotId,
        exit: SlotId,
        orientation: CameraOrientation,
    },
    CloneSpawned {
        traveller: TravellerId,
        entry: SlotId,
    },
    CloneReleased {
        traveller: TravellerId,
        swapped: bool,
    },
}

/// One virtual-camera render submission: draw the world from `camera` with
/// the oblique `projection`, into the target for `slot` at `level`. Passes
/// arrive deepest level first so each shallower level can sample the deeper
/// one's output.
#[derive(Debug, Clone, Copy)]
pub struct PortalViewPass {
    pub slot: SlotId,
    pub level: u32,
    pub camera: Pose,
    pub view: Mat4,
    pub projection: Mat4,
}

impl PortalViewPass {
    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view
    }
}

/// The portal subsystem. The host loop owns one of these, pushes physics
/// state into it, calls `tick_travellers` once per fixed step and
/// `render_portals` once per frame, in that order, so a teleport is never
/// rendered one frame late.
#[derive(Debug, Default)]
pub struct PortalSystem {
    config: PortalConfig,
    surfaces: SurfaceSet,
    slots: [PortalSlot; 2],
    travellers: FxHashMap<TravellerId, Traveller>,
    crossing: CrossingTracker,
    clones: CloneSystem,
    pending_events: Vec<PortalEvent>,
}

impl PortalSystem {
    pub fn new(config: PortalConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &PortalConfig {
        &self.config
    }

    // --- world registration ---------------------------------------------

    pub fn add_surface(&mut self, surface: Surface) -> SurfaceId {
        self.surfaces.insert(surface)
    }

    pub fn remove_surface(&mut self, id: SurfaceId) {
        if self.surfaces.remove(id).is_some() {
            self.close_portals_on_surface(id);
        }
    }

    pub fn set_surface_enabled(&mut self, id: SurfaceId, enabled: bool) {
        if self.surfaces.set_enabled(id, enabled) && !enabled {
            self.close_portals_on_surface(id);
        }
    }

    fn close_portals_on_surface(&mut self, id: SurfaceId) {
        for slot in [SlotId::A, SlotId::B] {
            let mounted = self.slots[slot.index()]
                .placement
                .is_some_and(|placement| placement.surface == id);
            if mounted {
                self.remove_portal(slot);
            }
        }
    }

    // --- placement -------------------------------------------------------

    pub fn place_or_update_portal(&mut self, slot: SlotId, ray: &Ray, view_right: Vec3) -> bool {
        self.place_portal_scaled(slot, ray, view_right, self.config.portal_scale)
    }

    pub fn place_portal_scaled(
        &mut self,
        slot: SlotId,
        ray: &Ray,
        view_right: Vec3,
        scale: f32,
    ) -> bool {
        if !(scale.is_finite() && scale > 0.0) {
            debug!("portal {slot:?} placement rejected: scale {scale} is degenerate");
            return false;
        }

        let sibling = self.slots[slot.other().index()].placement;
        let solved = placement::solve(
            &self.surfaces,
            ray,
            view_right,
            self.config.portal_half_extents,
            scale,
            sibling.as_ref(),
            &self.config,
        );

        match solved {
            Ok(placement) => {
                let moved = self.slots[slot.index()].is_placed();
                // The old placement's crossing and clone state must not
                // outlive it, even within this tick.
                self.crossing.clear_slot(slot);
                self.clones.invalidate();
                self.slots[slot.index()].placement = Some(placement);
                info!("portal {slot:?} placed at {}", placement.position);
                self.pending_events.push(if moved {
                    PortalEvent::PortalMoved { slot }
                } else {
                    PortalEvent::PortalOpened { slot }
                });
                true
            }
            Err(err) => {
                debug!("portal {slot:?} placement rejected: {err}");
                false
            }
        }
    }

    pub fn remove_portal(&mut self, slot: SlotId) {
        if self.slots[slot.index()].clear() {
            info!("portal {slot:?} removed");
            self.crossing.clear_slot(slot);
            self.clones.invalidate();
            self.pending_events.push(PortalEvent::PortalClosed { slot });
        }
    }

    // --- queries ---------------------------------------------------------

    pub fn portal_state(&self, slot: SlotId) -> Option<&Placement> {
        self.slots[slot.index()].placement.as_ref()
    }

    /// Both portals placed and linked: safe to render through and to
    /// teleport. Open/close animation is the host's affair, driven by the
    /// placement events.
    pub fn is_fully_open(&self, slot: SlotId) -> bool {
        self.slots[slot.index()].is_placed() && self.slots[slot.other().index()].is_placed()
    }

    pub fn traveller(&self, id: TravellerId) -> Option<&Traveller> {
        self.travellers.get(&id)
    }

    pub fn ghost_pose(&self, id: TravellerId) -> Option<GhostPose> {
        self.clones.ghost(id).copied()
    }

    fn linked_pair(&self) -> Option<(&Placement, &Placement)> {
        let a = self.slots[SlotId::A.index()].placement.as_ref()?;
        let b = self.slots[SlotId::B.index()].placement.as_ref()?;
        Some((a, b))
    }

    // --- travellers ------------------------------------------------------

    pub fn update_traveller(
        &mut self,
        id: TravellerId,
        pose: Pose,
        velocity: Vec3,
        angular_velocity: Vec3,
    ) {
        let traveller = self.travellers.entry(id).or_default();
        traveller.pose = pose;
        traveller.velocity = velocity;
        traveller.angular_velocity = angular_velocity;
    }

    pub fn set_traveller_held(&mut self, id: TravellerId, held: bool) {
        let Some(traveller) = self.travellers.get_mut(&id) else {
            return;
        };
        let was_held = traveller.held;
        traveller.held = held;
        if was_held && !held {
            self.release_held(id);
        }
    }

    pub fn notify_traveller_entered_volume(&mut self, id: TravellerId, slot: SlotId) {
        let traveller = *self.travellers.entry(id).or_default();
        if let Some(placement) = self.slots[slot.index()].placement {
            self.crossing
                .begin_tracking(id, slot, &placement, traveller.pose.position);
        }
    }

    pub fn notify_traveller_exited_volume(&mut self, id: TravellerId, slot: SlotId) {
        self.crossing.stop_tracking(id, slot);
    }

    /// Drop every trace of a traveller (despawned by the host).
    pub fn forget_traveller(&mut self, id: TravellerId) {
        self.travellers.remove(&id);
        self.crossing.clear_traveller(id);
        self.clones.clear_traveller(id);
    }

    // --- fixed tick ------------------------------------------------------

    /// Advance crossing detection and clone shadowing by one physics step.
    /// Teleports mutate the stored traveller state; the host reads it back
    /// (or reacts to the returned events) before rendering.
    pub fn tick_travellers(&mut self, dt: f32) -> Vec<PortalEvent> {
        let mut events = std::mem::take(&mut self.pending_events);
        let dt = dt.max(0.0);
        if dt <= 0.0 {
            return events;
        }

        let mut ids: Vec<TravellerId> = self.travellers.keys().copied().collect();
        ids.sort_unstable();

        for id in ids {
            self.tick_one_traveller(id, dt, &mut events);
        }
        events
    }

    fn tick_one_traveller(&mut self, id: TravellerId, dt: f32, events: &mut Vec<PortalEvent>) {
        let Some(traveller) = self.travellers.get(&id).copied() else {
            return;
        };

        let exit_placement = self
            .crossing
            .debounce_slot(id)
            .and_then(|slot| self.slots[slot.index()].placement);
        self.crossing
            .update_debounce(id, dt, exit_placement.as_ref(), traveller.pose.position);

        let shadowed = traveller.held && self.clones.shadowed_slot(id).is_some();
        if !self.crossing.debounce_active(id) && !shadowed {
            self.detect_crossing(id, &traveller, events);
        }

        self.refresh_clone(id, events);
    }

    fn detect_crossing(&mut self, id: TravellerId, traveller: &Traveller, events: &mut Vec<PortalEvent>) {
        for entry_slot in [SlotId::A, SlotId::B] {
            let exit_slot = entry_slot.other();
            let (Some(entry), Some(exit)) = (
                self.slots[entry_slot.index()].placement,
                self.slots[exit_slot.index()].placement,
            ) else {
                continue;
            };

            let update = self.crossing.advance(
                id,
                entry_slot,
                &entry,
                traveller.pose.position,
                self.config.crossing_epsilon,
                self.config.bounds_margin,
            );
            if update != CrossingUpdate::Crossed {
                continue;
            }

            self.teleport(id, traveller, entry_slot, &entry, exit_slot, &exit, events);
            return;
        }
    }

    fn teleport(
        &mut self,
        id: TravellerId,
        traveller: &Traveller,
        entry_slot: SlotId,
        entry: &Placement,
        exit_slot: SlotId,
        exit: &Placement,
        events: &mut Vec<PortalEvent>,
    ) {
        let step = PortalStep::between(entry, exit);
        let (new_pose, new_velocity) = step.teleport(&traveller.pose, traveller.velocity, &self.config);
        let orientation =
            step.orientation_after(CameraOrientation::from_forward(traveller.pose.forward()));

        if let Some(stored) = self.travellers.get_mut(&id) {
            stored.pose = new_pose;
            stored.velocity = new_velocity;
            stored.angular_velocity = step.rotation * traveller.angular_velocity;
        }

        info!("teleporting traveller {id:?} from portal {entry_slot:?} to {exit_slot:?}");
        self.crossing.stop_tracking(id, entry_slot);
        self.crossing.stop_tracking(id, exit_slot);
        self.crossing.set_debounce(
            id,
            exit_slot,
            self.config.teleport_debounce_secs,
            self.config.min_exit_distance,
        );

        events.push(PortalEvent::Teleported {
            traveller: id,
            entry: entry_slot,
            exit: exit_slot,
            orientation,
        });
    }

    fn refresh_clone(&mut self, id: TravellerId, events: &mut Vec<PortalEvent>) {
        let Some(traveller) = self.travellers.get(&id).copied() else {
            return;
        };
        let placements = [
            self.slots[SlotId::A.index()].placement,
            self.slots[SlotId::B.index()].placement,
        ];
        let refresh = self.clones.refresh(
            id,
            &traveller,
            [placements[0].as_ref(), placements[1].as_ref()],
            &self.config,
        );
        match refresh {
            CloneRefresh::Unchanged => {}
            CloneRefresh::Spawned { entry } => {
                events.push(PortalEvent::CloneSpawned { traveller: id, entry });
            }
            CloneRefresh::Switched { to, .. } => {
                events.push(PortalEvent::CloneReleased {
                    traveller: id,
                    swapped: false,
                });
                events.push(PortalEvent::CloneSpawned { traveller: id, entry: to });
            }
            CloneRefresh::Dropped => {
                events.push(PortalEvent::CloneReleased {
                    traveller: id,
                    swapped: false,
                });
            }
        }
    }

    fn release_held(&mut self, id: TravellerId) {
        let Some(traveller) = self.travellers.get(&id).copied() else {
            return;
        };
        let entry_slot = self.clones.shadowed_slot(id);
        let entry_placement =
            entry_slot.and_then(|slot| self.slots[slot.index()].placement);

        let outcome = self.clones.release(
            id,
            &traveller,
            entry_placement.as_ref(),
            self.config.crossing_epsilon,
        );
        match outcome {
            ReleaseOutcome::NotShadowing => {}
            ReleaseOutcome::Dropped { .. } => {
                self.pending_events.push(PortalEvent::CloneReleased {
                    traveller: id,
                    swapped: false,
                });
            }
            ReleaseOutcome::Swap { entry } => {
                let exit_slot = entry.other();
                let (Some(entry_placement), Some(exit_placement)) = (
                    self.slots[entry.index()].placement,
                    self.slots[exit_slot.index()].placement,
                ) else {
                    return;
                };
                let mut events = Vec::new();
                self.teleport(
                    id,
                    &traveller,
                    entry,
                    &entry_placement,
                    exit_slot,
                    &exit_placement,
                    &mut events,
                );
                self.pending_events.push(PortalEvent::CloneReleased {
                    traveller: id,
                    swapped: true,
                });
                self.pending_events.append(&mut events);
            }
        }
    }

    // --- per-frame rendering --------------------------------------------

    /// Build every virtual-camera submission needed this frame: for each
    /// visible portal of a linked pair, one pass per surviving recursion
    /// level, deepest first, each with an oblique projection clipped at the
    /// destination portal's surface.
    pub fn render_portals(&self, camera: &RenderCamera) -> Vec<PortalViewPass> {
        if self.linked_pair().is_none() {
            return Vec::new();
        }

        let planes = frustum_planes(camera.view_projection());
        let base_projection = camera.lens.matrix();
        let mut passes = Vec::new();

        for entry_slot in [SlotId::A, SlotId::B] {
            let exit_slot = entry_slot.other();
            let (Some(entry), Some(exit)) = (
                self.slots[entry_slot.index()].placement,
                self.slots[exit_slot.index()].placement,
            ) else {
                continue;
            };

            if !portal_is_visible(&entry, camera, &planes, &self.config) {
                continue;
            }

            let budget = recursion_budget(camera.pose.position, &entry, &exit, &self.config);
            let chain = build_view_chain(&camera.pose, &entry, &exit, budget);
            let depth = chain.len() as u32;

            for (i, pose) in chain.into_iter().enumerate() {
                let view = pose.view_matrix();
                // Clip at the exit portal, biased off the surface, with the
                // kept side facing away from the virtual camera.
                let clip_normal =
                    if (pose.position - exit.position).dot(exit.normal) >= 0.0 {
                        -exit.normal
                    } else {
                        exit.normal
                    };
                let clip_point = exit.position + clip_normal * self.config.clip_bias;
                let projection =
                    oblique_projection(base_projection, view, clip_point, clip_normal);
                if !mat4_is_finite(&projection) {
                    continue;
                }

                passes.push(PortalViewPass {
                    slot: entry_slot,
                    level: depth - i as u32,
                    camera: pose,
                    view,
                    projection,
                });
            }
        }
        passes
    }
}
