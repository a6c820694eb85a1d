// src/orchard/components.rs
use bevy::prelude::*;

use super::bindings::{FruitBindings, VertexBindingTable};
use super::core::{RawTreeInstance, Slot, TerrainView};
use super::manager::ManagerConfig;

/// Marks the entity whose position drives proximity. Exactly one is expected.
#[derive(Component, Debug, Default, Clone, Copy)]
pub struct OrchardPlayer;

/// Where a prototype's fruit attachment points come from.
#[derive(Clone, Debug, Default)]
pub enum FruitSource {
    /// Tree type carries no fruit.
    #[default]
    None,
    Inline(VertexBindingTable),
    /// Authored `.fruit.ron` file; the manager waits until it has loaded.
    Asset(Handle<FruitBindings>),
}

/// One tree type the terrain can scatter.
#[derive(Clone, Debug)]
pub struct TreePrototype {
    pub name: String,
    pub fruit: FruitSource,
}

/// Terrain tree data. Instance positions are normalized; `size` maps them to
/// world units and the entity's transform places the whole terrain.
#[derive(Component, Clone, Debug, Default)]
#[require(Transform, Visibility)]
pub struct TerrainTrees {
    pub size: Vec3,
    pub prototypes: Vec<TreePrototype>,
    pub instances: Vec<RawTreeInstance>,
}

impl TerrainTrees {
    pub fn view(&self, transform: &GlobalTransform) -> TerrainView<'_> {
        TerrainView {
            instances: &self.instances,
            size: self.size,
            transform: transform.affine(),
        }
    }
}

/// Visual spawned for every fruit.
#[derive(Clone, Debug)]
pub enum FruitPrefab {
    Mesh {
        mesh: Handle<Mesh>,
        material: Handle<StandardMaterial>,
    },
    Scene(Handle<Scene>),
}

/// Put this on an entity to manage one prototype's fruit. Spawned fruit become its children.
#[derive(Component, Clone, Debug)]
#[require(Transform, Visibility)]
pub struct OrchardManager {
    /// Terrain entity (must carry [`TerrainTrees`]).
    pub terrain: Option<Entity>,
    /// Render fruit within this distance of the player.
    pub radius: f32,
    /// Distance the player needs to move before refreshing.
    pub refresh_distance: f32,
    /// The tree prototype index.
    pub prototype_index: usize,
    pub fruit: Option<FruitPrefab>,
}

impl OrchardManager {
    pub fn config(&self) -> ManagerConfig {
        ManagerConfig {
            radius: self.radius,
            refresh_distance: self.refresh_distance,
            prototype_index: self.prototype_index,
        }
    }
}

/// Tag on every spawned fruit.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fruit {
    /// Placement slot of the owning tree.
    pub slot: Slot,
    /// Index into the prototype's binding table.
    pub binding: usize,
}
