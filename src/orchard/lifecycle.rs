// src/orchard/lifecycle.rs
//! Instance lifecycle: owns the active set and the fruit spawned for each active tree.

use std::collections::HashMap;

use bevy::math::Affine3A;
use bevy::prelude::*;

use super::bindings::VertexBindingTable;
use super::core::Slot;
use super::placement::PlacementStore;

/// Scene capability the host provides. Fruit are parented under the host's own
/// root; the host converts world positions into that root's space.
pub trait FruitHost {
    type Handle;

    fn spawn(&mut self, slot: Slot, binding: usize, world: Vec3) -> Self::Handle;
    fn destroy(&mut self, handle: Self::Handle);
    fn set_world_position(&mut self, handle: &Self::Handle, world: Vec3);
}

/// One tree currently in range, plus the fruit it owns.
#[derive(Debug)]
pub struct ActiveTreeInstance<H> {
    pub slot: Slot,
    pub instance_id: u32,
    /// Tree-local to terrain-local, captured at activation.
    pub tree_matrix: Affine3A,
    /// `fruit[i]` sits on binding `i`.
    pub fruit: Vec<H>,
}

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("tree slot {0} is already active")]
    AlreadyActive(Slot),
    #[error("tree slot {0} is not active")]
    NotActive(Slot),
    #[error("tree slot {slot} does not exist ({len} placements)")]
    UnknownSlot { slot: Slot, len: usize },
}

/// `active_flags[i] == active.contains_key(&i)` for every slot, always.
#[derive(Debug)]
pub struct LifecycleManager<H> {
    active_flags: Vec<bool>,
    active: HashMap<Slot, ActiveTreeInstance<H>>,
}

impl<H> LifecycleManager<H> {
    pub fn new(slots: usize) -> Self {
        Self {
            active_flags: vec![false; slots],
            active: HashMap::new(),
        }
    }

    #[inline]
    pub fn active_flags(&self) -> &[bool] {
        &self.active_flags
    }

    #[inline]
    pub fn is_active(&self, slot: Slot) -> bool {
        self.active.contains_key(&slot)
    }

    #[inline]
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn get(&self, slot: Slot) -> Option<&ActiveTreeInstance<H>> {
        self.active.get(&slot)
    }

    pub fn active_slots(&self) -> impl Iterator<Item = Slot> + '_ {
        self.active.keys().copied()
    }

    /// Total fruit handles currently held.
    pub fn fruit_count(&self) -> usize {
        self.active.values().map(|t| t.fruit.len()).sum()
    }

    pub fn is_consistent(&self) -> bool {
        self.active_flags
            .iter()
            .enumerate()
            .all(|(slot, &flag)| flag == self.active.contains_key(&slot))
            && self.active.keys().all(|&slot| slot < self.active_flags.len())
    }

    /// Spawn one fruit per binding for `slot` and place them. Returns the fruit count.
    pub fn activate<Host>(
        &mut self,
        host: &mut Host,
        slot: Slot,
        placements: &PlacementStore,
        bindings: &VertexBindingTable,
        terrain: &Affine3A,
    ) -> Result<usize, LifecycleError>
    where
        Host: FruitHost<Handle = H>,
    {
        let placement = placements
            .get(slot)
            .ok_or(LifecycleError::UnknownSlot { slot, len: placements.len() })?;
        match self.active_flags.get(slot) {
            None => return Err(LifecycleError::UnknownSlot { slot, len: self.active_flags.len() }),
            Some(true) => return Err(LifecycleError::AlreadyActive(slot)),
            Some(false) => {}
        }

        let tree_matrix = placement.tree_matrix();
        let to_world = *terrain * tree_matrix;
        let fruit: Vec<H> = bindings
            .iter()
            .enumerate()
            .map(|(i, binding)| host.spawn(slot, i, to_world.transform_point3(binding.local_offset)))
            .collect();

        let spawned = fruit.len();
        self.active.insert(
            slot,
            ActiveTreeInstance { slot, instance_id: placement.instance_id, tree_matrix, fruit },
        );
        self.active_flags[slot] = true;
        Ok(spawned)
    }

    /// Release every fruit handle owned by `slot`. Returns how many were released.
    pub fn deactivate<Host>(&mut self, host: &mut Host, slot: Slot) -> Result<usize, LifecycleError>
    where
        Host: FruitHost<Handle = H>,
    {
        if slot >= self.active_flags.len() {
            return Err(LifecycleError::UnknownSlot { slot, len: self.active_flags.len() });
        }
        let Some(tree) = self.active.remove(&slot) else {
            return Err(LifecycleError::NotActive(slot));
        };
        self.active_flags[slot] = false;

        let released = tree.fruit.len();
        for handle in tree.fruit {
            host.destroy(handle);
        }
        Ok(released)
    }

    /// Push every active fruit to its current world position. Returns fruit touched.
    pub fn update_all<Host>(&self, host: &mut Host, bindings: &VertexBindingTable, terrain: &Affine3A) -> usize
    where
        Host: FruitHost<Handle = H>,
    {
        let mut touched = 0;
        for tree in self.active.values() {
            let to_world = *terrain * tree.tree_matrix;
            for (handle, binding) in tree.fruit.iter().zip(bindings.iter()) {
                host.set_world_position(handle, to_world.transform_point3(binding.local_offset));
                touched += 1;
            }
        }
        touched
    }

    /// Deactivate everything. Returns handles released.
    pub fn release_all<Host>(&mut self, host: &mut Host) -> usize
    where
        Host: FruitHost<Handle = H>,
    {
        let mut released = 0;
        for (_, tree) in self.active.drain() {
            released += tree.fruit.len();
            for handle in tree.fruit {
                host.destroy(handle);
            }
        }
        self.active_flags.iter_mut().for_each(|f| *f = false);
        released
    }

    #[cfg(test)]
    pub(crate) fn force_flag(&mut self, slot: Slot, value: bool) {
        self.active_flags[slot] = value;
    }
}
