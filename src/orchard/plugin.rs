//! Orchard plugin wiring (glue).
//! - Fruit bindings asset/loader
//! - Manager build once terrain + bindings are ready
//! - Per-frame tick (proximity refresh, then fruit transforms)
//! - Cleanup when a manager entity goes away or is edited

use std::collections::HashMap;

use bevy::asset::LoadState;
use bevy::ecs::component::Tick;
use bevy::ecs::system::{SystemChangeTick, SystemState};
use bevy::math::Affine3A;
use bevy::prelude::*;
use bevy::transform::helper::TransformHelper;
use bevy::transform::TransformSystem;

use super::bindings::{FruitBindings, FruitBindingsAssetPlugin, VertexBindingTable};
use super::components::{FruitPrefab, FruitSource, OrchardManager, OrchardPlayer, TerrainTrees};
use super::host::WorldFruitHost;
use super::manager::{ConfigError, TickReport, TreeManager};

#[derive(SystemSet, Debug, Hash, PartialEq, Eq, Clone)]
pub enum OrchardSystems {
    /// PostUpdate, before transform propagation: forget edited/removed managers, then tick the rest.
    Tick,
    /// PostUpdate, after transform propagation: build managers that became ready.
    Build,
}

/// A manager that passed configuration and is ticking.
pub struct RunningOrchard {
    pub terrain: Entity,
    pub prefab: FruitPrefab,
    pub manager: TreeManager<Entity>,
    pub last_report: TickReport,
}

/// Every manager entity the plugin knows about, keyed by its root entity.
#[derive(Resource, Default)]
pub struct Orchards {
    running: HashMap<Entity, RunningOrchard>,
    idle: HashMap<Entity, ConfigError>,
    /// Change tick each known manager was built (or went idle) at.
    built_at: HashMap<Entity, Tick>,
    stale: Vec<Entity>,
}

impl Orchards {
    pub fn get(&self, root: Entity) -> Option<&RunningOrchard> {
        self.running.get(&root)
    }

    /// Why a manager went idle, if it did.
    pub fn idle_reason(&self, root: Entity) -> Option<&ConfigError> {
        self.idle.get(&root)
    }

    pub fn is_known(&self, root: Entity) -> bool {
        self.running.contains_key(&root) || self.idle.contains_key(&root)
    }

    /// Force every running manager to rescan on its next tick.
    pub fn request_refresh_all(&mut self) {
        for r in self.running.values_mut() {
            r.manager.request_refresh();
        }
    }

    pub fn active_trees(&self) -> usize {
        self.running.values().map(|r| r.manager.lifecycle().active_count()).sum()
    }

    pub fn active_fruit(&self) -> usize {
        self.running.values().map(|r| r.manager.lifecycle().fruit_count()).sum()
    }

    fn forget(&mut self, root: Entity) -> Option<RunningOrchard> {
        self.idle.remove(&root);
        self.built_at.remove(&root);
        self.running.remove(&root)
    }
}

pub struct OrchardPlugin;
impl Plugin for OrchardPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(FruitBindingsAssetPlugin)
            .init_resource::<Orchards>()
            .configure_sets(
                PostUpdate,
                (
                    OrchardSystems::Tick.before(TransformSystem::TransformPropagate),
                    OrchardSystems::Build.after(TransformSystem::TransformPropagate),
                ),
            )
            .add_systems(
                PostUpdate,
                (mark_edited_managers, release_stale_managers, tick_orchards)
                    .chain()
                    .in_set(OrchardSystems::Tick),
            )
            .add_systems(PostUpdate, build_pending_managers.in_set(OrchardSystems::Build));
    }
}

/// Turn configured `OrchardManager`s into running managers (or idle ones).
pub fn build_pending_managers(
    mut orchards: ResMut<Orchards>,
    ticks: SystemChangeTick,
    q_managers: Query<(Entity, &OrchardManager)>,
    q_terrain: Query<(&TerrainTrees, &GlobalTransform)>,
    bindings: Option<Res<Assets<FruitBindings>>>,
    server: Option<Res<AssetServer>>,
) {
    for (root, cfg) in &q_managers {
        if orchards.is_known(root) {
            continue;
        }
        match try_build(root, cfg, &q_terrain, bindings.as_deref(), server.as_deref()) {
            Ok(Some(running)) => {
                orchards.running.insert(root, running);
            }
            Ok(None) => continue, // bindings still loading
            Err(err) => {
                warn!("Orchard: manager {} idle: {}", root, err);
                orchards.idle.insert(root, err);
            }
        }
        orchards.built_at.insert(root, ticks.this_run());
    }
}

fn try_build(
    root: Entity,
    cfg: &OrchardManager,
    q_terrain: &Query<(&TerrainTrees, &GlobalTransform)>,
    bindings: Option<&Assets<FruitBindings>>,
    server: Option<&AssetServer>,
) -> Result<Option<RunningOrchard>, ConfigError> {
    let terrain_e = cfg.terrain.ok_or(ConfigError::NoTerrain)?;
    let (terrain, terrain_tf) = q_terrain.get(terrain_e).map_err(|_| ConfigError::NoTerrain)?;
    let prefab = cfg.fruit.clone().ok_or(ConfigError::NoFruitPrefab)?;
    let config = cfg.config();
    config.validate(terrain.prototypes.len())?;

    let prototype = &terrain.prototypes[config.prototype_index];
    let table = match &prototype.fruit {
        FruitSource::None => VertexBindingTable::empty(),
        FruitSource::Inline(table) => table.clone(),
        FruitSource::Asset(handle) => {
            if let Some(loaded) = bindings.and_then(|a| a.get(handle)) {
                loaded.table.clone()
            } else if server.is_some_and(|s| matches!(s.load_state(handle.id()), LoadState::Failed(_))) {
                return Err(ConfigError::BindingsUnavailable(config.prototype_index));
            } else {
                return Ok(None);
            }
        }
    };

    let manager = TreeManager::build(config, &terrain.view(terrain_tf), terrain.prototypes.len(), table)?;
    info!(
        "Orchard: manager {} ready: '{}' (prototype {}) has {} trees, {} fruit per tree",
        root,
        prototype.name,
        config.prototype_index,
        manager.placements().len(),
        manager.bindings().len()
    );
    Ok(Some(RunningOrchard {
        terrain: terrain_e,
        prefab,
        manager,
        last_report: TickReport::default(),
    }))
}

/// Managers whose component changed after they were built get rebuilt from scratch.
pub fn mark_edited_managers(
    mut orchards: ResMut<Orchards>,
    ticks: SystemChangeTick,
    q_changed: Query<(Entity, Ref<OrchardManager>), Changed<OrchardManager>>,
) {
    for (root, cfg) in &q_changed {
        let Some(&built) = orchards.built_at.get(&root) else { continue };
        if cfg.last_changed().is_newer_than(built, ticks.this_run()) {
            orchards.stale.push(root);
        }
    }
}

/// Release fruit of managers that were removed or edited.
pub fn release_stale_managers(world: &mut World) {
    world.resource_scope(|world, mut orchards: Mut<Orchards>| {
        let mut stale = std::mem::take(&mut orchards.stale);
        stale.extend(
            orchards
                .running
                .keys()
                .chain(orchards.idle.keys())
                .copied()
                .filter(|&root| world.get::<OrchardManager>(root).is_none()),
        );

        for root in stale {
            let Some(mut running) = orchards.forget(root) else { continue };
            // Only destroys; the root's frame is irrelevant.
            let mut host = WorldFruitHost::new(world, root, &Affine3A::IDENTITY, &running.prefab);
            let released = running.manager.release_all(&mut host);
            debug!("Orchard: manager {} released {} fruit", root, released);
        }
    });
}

/// One tick per running manager. Skipped entirely without a player.
///
/// Runs before propagation, so `GlobalTransform` still holds last frame's values;
/// player, terrain and root frames are recomputed from the hierarchy instead.
pub fn tick_orchards(world: &mut World, transforms: &mut SystemState<TransformHelper<'static, 'static>>) {
    let mut q_player = world.query_filtered::<Entity, With<OrchardPlayer>>();
    let Ok(player_e) = q_player.single(world) else {
        return;
    };

    let (player, frames) = {
        let helper = transforms.get(world);
        let Ok(player) = helper.compute_global_transform(player_e) else {
            return;
        };
        let frames: Vec<(Entity, Affine3A, Affine3A)> = world
            .resource::<Orchards>()
            .running
            .iter()
            .filter_map(|(&root, running)| {
                let terrain = helper.compute_global_transform(running.terrain).ok()?;
                let root_tf = helper.compute_global_transform(root).ok()?;
                Some((root, terrain.affine(), root_tf.affine()))
            })
            .collect();
        (player.translation(), frames)
    };

    world.resource_scope(|world, mut orchards: Mut<Orchards>| {
        for (root, terrain, root_global) in frames {
            let Some(running) = orchards.running.get_mut(&root) else { continue };
            let RunningOrchard { prefab, manager, last_report, .. } = running;
            let mut host = WorldFruitHost::new(world, root, &root_global, prefab);
            *last_report = manager.tick(&mut host, player, &terrain);
        }
    });
}
