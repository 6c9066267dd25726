use glam::{Quat, Vec3};
use rustc_hash::FxHashMap;

use crate::config::PortalConfig;
use crate::slot::{Placement, SlotId};
use crate::transform::PortalStep;
use crate::traveller::{Traveller, TravellerId};

/// Visual-only stand-in for a held traveller mid-crossing: the pose the
/// object would have if it had already stepped through. Never collides,
/// never simulated; the renderer draws it and nothing else touches it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GhostPose {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: f32,
}

#[derive(Debug, Clone, Copy)]
struct ShadowEntry {
    entry_slot: SlotId,
    ghost: GhostPose,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloneRefresh {
    Unchanged,
    Spawned { entry: SlotId },
    Switched { from: SlotId, to: SlotId },
    Dropped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseOutcome {
    NotShadowing,
    Dropped { entry: SlotId },
    Swap { entry: SlotId },
}

/// Tracks one ghost pose per held traveller near a linked portal pair.
#[derive(Debug, Default)]
pub struct CloneSystem {
    shadowing: FxHashMap<TravellerId, ShadowEntry>,
}

impl CloneSystem {
    pub fn ghost(&self, traveller: TravellerId) -> Option<&GhostPose> {
        self.shadowing.get(&traveller).map(|entry| &entry.ghost)
    }

    pub fn shadowed_slot(&self, traveller: TravellerId) -> Option<SlotId> {
        self.shadowing.get(&traveller).map(|entry| entry.entry_slot)
    }

    pub fn clear_traveller(&mut self, traveller: TravellerId) {
        self.shadowing.remove(&traveller);
    }

    /// Any placement change reshapes the step transform for every ghost, so
    /// all of them are dropped in the same tick.
    pub fn invalidate(&mut self) {
        self.shadowing.clear();
    }

    /// Per-tick update for a held traveller. Creates, follows, moves, or
    /// drops the ghost depending on proximity to the linked pair.
    pub fn refresh(
        &mut self,
        traveller_id: TravellerId,
        traveller: &Traveller,
        placements: [Option<&Placement>; 2],
        config: &PortalConfig,
    ) -> CloneRefresh {
        let previous = self.shadowing.get(&traveller_id).map(|entry| entry.entry_slot);

        let pair = match (placements[0], placements[1]) {
            (Some(a), Some(b)) if traveller.held => Some((a, b)),
            _ => None,
        };
        let Some((a, b)) = pair else {
            return self.drop_if_shadowing(traveller_id);
        };

        let position = traveller.pose.position;
        let near_a = position.distance(a.position) <= config.clone_radius;
        let near_b = position.distance(b.position) <= config.clone_radius;
        let entry_slot = match (near_a, near_b) {
            (true, true) => {
                if position.distance(a.position) <= position.distance(b.position) {
                    SlotId::A
                } else {
                    SlotId::B
                }
            }
            (true, false) => SlotId::A,
            (false, true) => SlotId::B,
            (false, false) => return self.drop_if_shadowing(traveller_id),
        };

        let (entry, exit) = if entry_slot == SlotId::A { (a, b) } else { (b, a) };
        let step = PortalStep::between(entry, exit);
        let mirrored = step.apply_pose(&traveller.pose);
        let ghost = GhostPose {
            position: mirrored.position,
            rotation: mirrored.rotation,
            scale: step.scale_ratio,
        };
        self.shadowing.insert(
            traveller_id,
            ShadowEntry { entry_slot, ghost },
        );

        match previous {
            None => CloneRefresh::Spawned { entry: entry_slot },
            Some(slot) if slot != entry_slot => CloneRefresh::Switched {
                from: slot,
                to: entry_slot,
            },
            Some(_) => CloneRefresh::Unchanged,
        }
    }

    /// The traveller was let go. On the exit side of the entry plane the
    /// real object swaps into the ghost's place; on the entry side the ghost
    /// simply disappears.
    pub fn release(
        &mut self,
        traveller_id: TravellerId,
        traveller: &Traveller,
        entry_placement: Option<&Placement>,
        epsilon: f32,
    ) -> ReleaseOutcome {
        let Some(entry) = self.shadowing.remove(&traveller_id) else {
            return ReleaseOutcome::NotShadowing;
        };

        let Some(placement) = entry_placement else {
            return ReleaseOutcome::Dropped {
                entry: entry.entry_slot,
            };
        };

        if placement.signed_distance(traveller.pose.position) <= epsilon {
            ReleaseOutcome::Swap {
                entry: entry.entry_slot,
            }
        } else {
            ReleaseOutcome::Dropped {
                entry: entry.entry_slot,
            }
        }
    }

    fn drop_if_shadowing(&mut self, traveller: TravellerId) -> CloneRefresh {
        if self.shadowing.remove(&traveller).is_some() {
            CloneRefresh::Dropped
        } else {
            CloneRefresh::Unchanged
        }
    }
}
