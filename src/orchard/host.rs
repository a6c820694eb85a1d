// src/orchard/host.rs
//! `FruitHost` over a Bevy `World`: fruit are plain entities parented to the manager root.

use bevy::math::Affine3A;
use bevy::prelude::*;

use super::components::{Fruit, FruitPrefab};
use super::core::Slot;
use super::lifecycle::FruitHost;

pub struct WorldFruitHost<'w, 'p> {
    world: &'w mut World,
    root: Entity,
    /// World -> root-local.
    root_inverse: Affine3A,
    prefab: &'p FruitPrefab,
}

impl<'w, 'p> WorldFruitHost<'w, 'p> {
    /// `root_global` must be the root's transform for the current frame.
    pub fn new(world: &'w mut World, root: Entity, root_global: &Affine3A, prefab: &'p FruitPrefab) -> Self {
        Self { world, root, root_inverse: root_global.inverse(), prefab }
    }
}

impl FruitHost for WorldFruitHost<'_, '_> {
    type Handle = Entity;

    fn spawn(&mut self, slot: Slot, binding: usize, world: Vec3) -> Entity {
        let local = Transform::from_translation(self.root_inverse.transform_point3(world));
        let mut e = self.world.spawn((
            Fruit { slot, binding },
            local,
            Visibility::Inherited,
            ChildOf(self.root),
        ));
        match self.prefab {
            FruitPrefab::Mesh { mesh, material } => {
                e.insert((Mesh3d(mesh.clone()), MeshMaterial3d(material.clone())));
            }
            FruitPrefab::Scene(scene) => {
                e.insert(SceneRoot(scene.clone()));
            }
        }
        e.id()
    }

    fn destroy(&mut self, handle: Entity) {
        // Already gone if the root was despawned with its children.
        if let Ok(e) = self.world.get_entity_mut(handle) {
            e.despawn();
        }
    }

    fn set_world_position(&mut self, handle: &Entity, world: Vec3) {
        let local = self.root_inverse.transform_point3(world);
        if let Some(mut tf) = self.world.get_mut::<Transform>(*handle) {
            // Avoid flagging static fruit as changed every frame.
            if tf.translation != local {
                tf.translation = local;
            }
        }
    }
}
