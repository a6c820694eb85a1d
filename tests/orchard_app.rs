use bevy::asset::AssetPlugin;
use bevy::math::Affine3A;
use bevy::prelude::*;
use bevy::transform::TransformPlugin;

use tree_fruit::orchard::bindings::{FruitBindings, VertexBindingTable};
use tree_fruit::orchard::core::{compute_world_position, RawTreeInstance};
use tree_fruit::orchard::{
    ConfigError, Fruit, FruitPrefab, FruitSource, OrchardManager, OrchardPlayer, OrchardPlugin, OrchardSystems,
    Orchards, TerrainTrees, TreePrototype,
};

// Minimal headless app: no renderer, no transform propagation. The tick walks local
// transforms itself; build-time GlobalTransforms stay at their spawned values.
fn build_app() -> App {
    let mut app = App::new();
    app.add_plugins((MinimalPlugins, AssetPlugin::default()))
        .add_plugins(OrchardPlugin);
    app
}

// Same, plus real transform propagation.
fn build_app_with_transforms() -> App {
    let mut app = build_app();
    app.add_plugins(TransformPlugin);
    app
}

fn three_bindings() -> VertexBindingTable {
    VertexBindingTable::from_parallel(
        &[1, 2, 3],
        &[Vec3::new(0.0, 2.0, 0.0), Vec3::new(0.5, 1.5, 0.0), Vec3::new(0.0, 1.0, -0.5)],
    )
    .unwrap()
}

fn tree(x: f32, z: f32, prototype_index: usize) -> RawTreeInstance {
    RawTreeInstance {
        position: Vec3::new(x, 0.0, z),
        rotation: 0.5,
        width_scale: 1.2,
        height_scale: 1.5,
        prototype_index,
    }
}

fn prefab() -> FruitPrefab {
    FruitPrefab::Mesh { mesh: Handle::default(), material: Handle::default() }
}

fn spawn_terrain(app: &mut App, fruit: FruitSource) -> Entity {
    app.world_mut()
        .spawn(TerrainTrees {
            // normalized 0.5 -> 50 world units
            size: Vec3::new(100.0, 10.0, 100.0),
            prototypes: vec![
                TreePrototype { name: "apple".into(), fruit },
                TreePrototype { name: "birch".into(), fruit: FruitSource::None },
            ],
            instances: vec![tree(0.5, 0.5, 0), tree(0.6, 0.5, 1), tree(0.9, 0.9, 0)],
        })
        .id()
}

fn spawn_player(app: &mut App, at: Vec3) -> Entity {
    app.world_mut()
        .spawn((OrchardPlayer, Transform::from_translation(at), GlobalTransform::from_translation(at)))
        .id()
}

fn move_player(app: &mut App, player: Entity, to: Vec3) {
    let mut e = app.world_mut().entity_mut(player);
    e.insert((Transform::from_translation(to), GlobalTransform::from_translation(to)));
}

fn spawn_manager(app: &mut App, terrain: Option<Entity>, fruit: Option<FruitPrefab>) -> Entity {
    app.world_mut()
        .spawn(OrchardManager { terrain, radius: 10.0, refresh_distance: 1.0, prototype_index: 0, fruit })
        .id()
}

fn fruit_count(app: &mut App) -> usize {
    let world = app.world_mut();
    let mut q = world.query::<&Fruit>();
    q.iter(world).count()
}

#[test]
fn fruit_spawn_near_player_and_vanish_when_leaving() {
    let mut app = build_app();
    let terrain = spawn_terrain(&mut app, FruitSource::Inline(three_bindings()));
    let player = spawn_player(&mut app, Vec3::new(50.0, 0.0, 45.0));
    let manager = spawn_manager(&mut app, Some(terrain), Some(prefab()));

    app.update(); // PostUpdate builds the manager
    assert_eq!(fruit_count(&mut app), 0);
    app.update(); // first tick refreshes

    assert_eq!(fruit_count(&mut app), 3, "one tree in range, three bindings");
    {
        let orchards = app.world().resource::<Orchards>();
        let running = orchards.get(manager).expect("manager should be running");
        assert_eq!(running.manager.placements().len(), 2);
        assert_eq!(running.last_report.activated, 1);
        assert!(running.manager.is_consistent());
    }

    // Fruit are children of the manager, placed on the composed tree transform.
    let (placement, bindings) = {
        let orchards = app.world().resource::<Orchards>();
        let m = &orchards.get(manager).unwrap().manager;
        (*m.placements().get(0).unwrap(), m.bindings().clone())
    };
    let world = app.world_mut();
    let mut q = world.query::<(&Fruit, &Transform, &ChildOf)>();
    for (fruit, tf, parent) in q.iter(world) {
        assert_eq!(parent.parent(), manager);
        assert_eq!(fruit.slot, 0);
        let offset = bindings.get(fruit.binding).unwrap().local_offset;
        let want = compute_world_position(&placement, offset, &Affine3A::IDENTITY);
        assert!((tf.translation - want).length() < 1e-4, "{:?} vs {want:?}", tf.translation);
    }

    // 15 units away from the only nearby tree.
    move_player(&mut app, player, Vec3::new(50.0, 0.0, 65.0));
    app.update();
    assert_eq!(fruit_count(&mut app), 0);
    let orchards = app.world().resource::<Orchards>();
    let running = orchards.get(manager).unwrap();
    assert_eq!(running.last_report.deactivated, 1);
    assert_eq!(running.manager.lifecycle().active_count(), 0);
}

#[test]
fn missing_prefab_leaves_manager_idle() {
    let mut app = build_app();
    let terrain = spawn_terrain(&mut app, FruitSource::Inline(three_bindings()));
    spawn_player(&mut app, Vec3::new(50.0, 0.0, 50.0));
    let manager = spawn_manager(&mut app, Some(terrain), None);

    for _ in 0..3 {
        app.update();
    }
    let orchards = app.world().resource::<Orchards>();
    assert_eq!(orchards.idle_reason(manager), Some(&ConfigError::NoFruitPrefab));
    assert!(orchards.get(manager).is_none());
    assert_eq!(fruit_count(&mut app), 0);
}

#[test]
fn missing_terrain_leaves_manager_idle() {
    let mut app = build_app();
    spawn_player(&mut app, Vec3::ZERO);
    let manager = spawn_manager(&mut app, None, Some(prefab()));
    app.update();
    let orchards = app.world().resource::<Orchards>();
    assert_eq!(orchards.idle_reason(manager), Some(&ConfigError::NoTerrain));
}

#[test]
fn nothing_happens_without_a_player() {
    let mut app = build_app();
    let terrain = spawn_terrain(&mut app, FruitSource::Inline(three_bindings()));
    let manager = spawn_manager(&mut app, Some(terrain), Some(prefab()));
    for _ in 0..3 {
        app.update();
    }
    assert_eq!(fruit_count(&mut app), 0);
    let orchards = app.world().resource::<Orchards>();
    assert_eq!(orchards.get(manager).unwrap().last_report, Default::default());
}

#[test]
fn bindings_from_loaded_asset() {
    let mut app = build_app();
    let handle = app
        .world_mut()
        .resource_mut::<Assets<FruitBindings>>()
        .add(FruitBindings { table: three_bindings() });
    let terrain = spawn_terrain(&mut app, FruitSource::Asset(handle));
    spawn_player(&mut app, Vec3::new(90.0, 0.0, 90.0));
    spawn_manager(&mut app, Some(terrain), Some(prefab()));

    app.update();
    app.update();
    assert_eq!(fruit_count(&mut app), 3);
}

#[test]
fn fruitless_prototype_activates_without_fruit() {
    let mut app = build_app();
    let terrain = spawn_terrain(&mut app, FruitSource::None);
    spawn_player(&mut app, Vec3::new(50.0, 0.0, 50.0));
    let manager = spawn_manager(&mut app, Some(terrain), Some(prefab()));

    app.update();
    app.update();
    assert_eq!(fruit_count(&mut app), 0);
    let orchards = app.world().resource::<Orchards>();
    assert_eq!(orchards.get(manager).unwrap().manager.lifecycle().active_count(), 1);
}

#[test]
fn despawning_manager_releases_its_fruit() {
    let mut app = build_app();
    let terrain = spawn_terrain(&mut app, FruitSource::Inline(three_bindings()));
    spawn_player(&mut app, Vec3::new(50.0, 0.0, 50.0));
    let manager = spawn_manager(&mut app, Some(terrain), Some(prefab()));
    app.update();
    app.update();
    assert_eq!(fruit_count(&mut app), 3);

    app.world_mut().entity_mut(manager).despawn();
    app.update();
    assert_eq!(fruit_count(&mut app), 0);
    assert!(!app.world().resource::<Orchards>().is_known(manager));
}

#[test]
fn editing_manager_rebuilds_it() {
    let mut app = build_app();
    let terrain = spawn_terrain(&mut app, FruitSource::Inline(three_bindings()));
    spawn_player(&mut app, Vec3::new(50.0, 0.0, 45.0));
    let manager = spawn_manager(&mut app, Some(terrain), Some(prefab()));
    app.update();
    app.update();
    assert_eq!(fruit_count(&mut app), 3);

    // Shrink the radius below the tree's distance (5).
    app.world_mut().get_mut::<OrchardManager>(manager).unwrap().radius = 3.0;
    app.update(); // released + rebuilt
    assert_eq!(fruit_count(&mut app), 0);
    app.update(); // ticks with the new radius
    assert_eq!(fruit_count(&mut app), 0);
    let orchards = app.world().resource::<Orchards>();
    assert_eq!(orchards.get(manager).unwrap().manager.config().radius, 3.0);
}

fn assert_fruit_match_terrain(app: &mut App, manager: Entity, terrain: Entity) {
    let terrain_affine = app.world().get::<GlobalTransform>(terrain).unwrap().affine();
    let (placement, bindings) = {
        let orchards = app.world().resource::<Orchards>();
        let m = &orchards.get(manager).unwrap().manager;
        (*m.placements().get(0).unwrap(), m.bindings().clone())
    };
    let world = app.world_mut();
    let mut q = world.query::<(&Fruit, &GlobalTransform)>();
    let mut seen = 0;
    for (fruit, gt) in q.iter(world) {
        let offset = bindings.get(fruit.binding).unwrap().local_offset;
        let want = compute_world_position(&placement, offset, &terrain_affine);
        assert!((gt.translation() - want).length() < 1e-3, "{:?} vs {want:?}", gt.translation());
        seen += 1;
    }
    assert_eq!(seen, 3);
}

#[test]
fn fruit_land_in_world_space_under_transformed_parents() {
    let mut app = build_app_with_transforms();
    let terrain = spawn_terrain(&mut app, FruitSource::Inline(three_bindings()));
    app.world_mut().entity_mut(terrain).insert(Transform::from_xyz(100.0, 0.0, 0.0));
    spawn_player(&mut app, Vec3::new(150.0, 0.0, 45.0));
    let manager = app
        .world_mut()
        .spawn((
            OrchardManager {
                terrain: Some(terrain),
                radius: 10.0,
                refresh_distance: 1.0,
                prototype_index: 0,
                fruit: Some(prefab()),
            },
            Transform {
                translation: Vec3::new(5.0, 1.0, -3.0),
                rotation: Quat::from_rotation_y(0.7),
                scale: Vec3::splat(2.0),
            },
        ))
        .id();

    app.update();
    app.update();

    {
        let orchards = app.world().resource::<Orchards>();
        let placement = *orchards.get(manager).unwrap().manager.placements().get(0).unwrap();
        assert!((placement.world_position - Vec3::new(150.0, 0.0, 50.0)).length() < 1e-4);
    }
    assert_fruit_match_terrain(&mut app, manager, terrain);
}

#[derive(Resource)]
struct DriftingTerrain(Entity);

fn drift_terrain(drifting: Res<DriftingTerrain>, mut q: Query<&mut Transform>) {
    if let Ok(mut tf) = q.get_mut(drifting.0) {
        tf.translation.x += 10.0;
    }
}

#[test]
fn fruit_follow_terrain_moved_this_frame() {
    let mut app = build_app_with_transforms();
    let terrain = spawn_terrain(&mut app, FruitSource::Inline(three_bindings()));
    app.insert_resource(DriftingTerrain(terrain))
        .add_systems(Update, drift_terrain);
    // Placements are cached at build (terrain at x = 10), so the tree sits at (60, 0, 50).
    spawn_player(&mut app, Vec3::new(60.0, 0.0, 45.0));
    let manager = spawn_manager(&mut app, Some(terrain), Some(prefab()));

    for _ in 0..4 {
        app.update();
    }
    let terrain_now = app.world().get::<GlobalTransform>(terrain).unwrap().translation();
    assert_eq!(terrain_now, Vec3::new(40.0, 0.0, 0.0));
    assert_fruit_match_terrain(&mut app, manager, terrain);
}

#[derive(Resource)]
struct LateManager {
    terrain: Entity,
    spawned: bool,
}

fn spawn_manager_late(mut commands: Commands, mut late: ResMut<LateManager>) {
    if late.spawned {
        return;
    }
    late.spawned = true;
    commands.spawn(OrchardManager {
        terrain: Some(late.terrain),
        radius: 10.0,
        refresh_distance: 1.0,
        prototype_index: 0,
        fruit: Some(prefab()),
    });
}

#[test]
fn manager_spawned_after_tick_is_not_rebuilt() {
    let mut app = build_app();
    let terrain = spawn_terrain(&mut app, FruitSource::Inline(three_bindings()));
    spawn_player(&mut app, Vec3::new(50.0, 0.0, 45.0));
    app.insert_resource(LateManager { terrain, spawned: false }).add_systems(
        PostUpdate,
        spawn_manager_late
            .after(OrchardSystems::Tick)
            .before(OrchardSystems::Build),
    );

    app.update(); // spawned and built in the same PostUpdate
    app.update(); // first tick
    assert_eq!(fruit_count(&mut app), 3);

    let manager = {
        let world = app.world_mut();
        let mut q = world.query_filtered::<Entity, With<OrchardManager>>();
        q.single(world).unwrap()
    };
    let orchards = app.world().resource::<Orchards>();
    let report = orchards.get(manager).unwrap().last_report;
    assert!(report.refreshed);
    assert_eq!(report.activated, 1);
}
