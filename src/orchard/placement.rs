// src/orchard/placement.rs
//! Placement store: the per-prototype tree transforms, derived once from terrain data.

use bevy::prelude::*;

use super::core::{PlacementRecord, RawTreeInstance, Slot, TerrainView};

/// Immutable list of placements for one prototype. Slot `i` is the `i`th match
/// in terrain enumeration order.
#[derive(Clone, Debug, Default)]
pub struct PlacementStore {
    records: Vec<PlacementRecord>,
}

impl PlacementStore {
    /// Filter `terrain.instances` to `prototype_index` and resolve each match.
    /// No matches (or no instances at all) yields an empty store.
    pub fn build(terrain: &TerrainView<'_>, prototype_index: usize) -> Self {
        let records = terrain
            .instances
            .iter()
            .enumerate()
            .filter(|(_, inst)| inst.prototype_index == prototype_index)
            .map(|(i, inst)| placement_from_instance(i as u32, inst, terrain))
            .collect();
        Self { records }
    }

    pub fn from_records(records: Vec<PlacementRecord>) -> Self {
        Self { records }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[inline]
    pub fn get(&self, slot: Slot) -> Option<&PlacementRecord> {
        self.records.get(slot)
    }

    #[inline]
    pub fn records(&self) -> &[PlacementRecord] {
        &self.records
    }
}

/// Normalized terrain instance -> placement (world units, degrees, XZ-shared width scale).
pub fn placement_from_instance(
    instance_id: u32,
    inst: &RawTreeInstance,
    terrain: &TerrainView<'_>,
) -> PlacementRecord {
    let local_position = inst.position * terrain.size;
    PlacementRecord {
        instance_id,
        local_position,
        world_position: terrain.transform.transform_point3(local_position),
        rotation_deg: Vec3::new(0.0, inst.rotation.to_degrees(), 0.0),
        scale: Vec3::new(inst.width_scale, inst.height_scale, inst.width_scale),
    }
}
