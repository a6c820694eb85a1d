// src/orchard/scheduler.rs
//! Proximity scheduler: decides which slots switch on or off around the player.
//!
//! A plain linear scan over every placement. It only runs once the player has
//! moved more than `refresh_distance` since the last scan, so trees may stay
//! active a little past `radius` until the next one.

use bevy::prelude::*;

use super::core::{PlacementRecord, Slot};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProximityAction {
    Activate,
    Deactivate,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScheduledAction {
    pub slot: Slot,
    pub action: ProximityAction,
}

impl ScheduledAction {
    pub const fn activate(slot: Slot) -> Self {
        Self { slot, action: ProximityAction::Activate }
    }
    pub const fn deactivate(slot: Slot) -> Self {
        Self { slot, action: ProximityAction::Deactivate }
    }
}

/// Strictly inside the radius.
#[inline]
pub fn in_range(player: Vec3, placement: &PlacementRecord, radius: f32) -> bool {
    player.distance(placement.world_position) < radius
}

/// One scan. Deactivations come first in `out`, then activations.
/// `out` is cleared; `scratch` only holds activations while scanning.
pub fn refresh_into(
    player: Vec3,
    placements: &[PlacementRecord],
    radius: f32,
    active_flags: &[bool],
    out: &mut Vec<ScheduledAction>,
    scratch: &mut Vec<ScheduledAction>,
) {
    out.clear();
    scratch.clear();
    for (slot, placement) in placements.iter().enumerate() {
        let active = active_flags.get(slot).copied().unwrap_or(false);
        let near = in_range(player, placement, radius);
        if active && !near {
            out.push(ScheduledAction::deactivate(slot));
        } else if near && !active {
            scratch.push(ScheduledAction::activate(slot));
        }
    }
    out.append(scratch);
}

/// Allocating convenience over [`refresh_into`].
pub fn refresh(
    player: Vec3,
    placements: &[PlacementRecord],
    radius: f32,
    active_flags: &[bool],
) -> Vec<ScheduledAction> {
    let mut out = Vec::new();
    let mut scratch = Vec::new();
    refresh_into(player, placements, radius, active_flags, &mut out, &mut scratch);
    out
}

/// Refresh trigger + reusable buffers.
#[derive(Clone, Debug)]
pub struct ProximityScheduler {
    pub radius: f32,
    pub refresh_distance: f32,
    last_refresh: Option<Vec3>,
    pending: Vec<ScheduledAction>,
    scratch: Vec<ScheduledAction>,
}

impl ProximityScheduler {
    pub fn new(radius: f32, refresh_distance: f32) -> Self {
        Self {
            radius,
            refresh_distance,
            last_refresh: None,
            pending: Vec::new(),
            scratch: Vec::new(),
        }
    }

    /// Where the last scan happened, if any.
    pub fn last_refresh_position(&self) -> Option<Vec3> {
        self.last_refresh
    }

    /// True when no scan has happened yet, or the player moved strictly more than `refresh_distance`.
    pub fn should_refresh(&self, player: Vec3) -> bool {
        match self.last_refresh {
            None => true,
            Some(last) => player.distance(last) > self.refresh_distance,
        }
    }

    /// Forget the last scan position so the next tick rescans.
    pub fn invalidate(&mut self) {
        self.last_refresh = None;
    }

    /// Scan and remember `player` as the refresh position. Returns the planned actions.
    pub fn plan(&mut self, player: Vec3, placements: &[PlacementRecord], active_flags: &[bool]) -> &[ScheduledAction] {
        refresh_into(player, placements, self.radius, active_flags, &mut self.pending, &mut self.scratch);
        self.last_refresh = Some(player);
        &self.pending
    }
}
