use bevy::prelude::*;

use crate::orchard::bindings::FruitBindings;
use crate::orchard::{
    FruitPrefab, FruitSource, OrchardManager, OrchardPlayer, OrchardSettings, TerrainTrees, TreePrototype,
};

use super::input::CameraOrbit;
use super::scatter::{scatter_trees, WorldSeed};

const PROTOTYPE_NAMES: [&str; 2] = ["apple", "birch"];

#[derive(Component)]
pub struct MainCamera;

pub fn setup(
    mut commands: Commands,
    settings: Res<OrchardSettings>,
    assets: Res<AssetServer>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let size = settings.terrain_size();
    // Center the terrain so (0,0) is in the middle.
    let terrain_origin = Vec3::new(-size.x * 0.5, 0.0, -size.z * 0.5);

    // 1) Light
    commands.spawn((
        DirectionalLight { shadows_enabled: true, illuminance: 9_000.0, ..default() },
        Transform::from_xyz(40.0, 80.0, 20.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));

    // 2) Ground
    commands.spawn((
        Mesh3d(meshes.add(Plane3d::default().mesh().size(size.x, size.z))),
        MeshMaterial3d(materials.add(StandardMaterial {
            base_color: Color::srgb(0.32, 0.45, 0.22),
            perceptual_roughness: 1.0,
            ..default()
        })),
        Transform::default(),
        Name::new("Ground"),
    ));

    // 3) Player + camera
    commands.spawn((
        Mesh3d(meshes.add(Sphere::new(0.6))),
        MeshMaterial3d(materials.add(StandardMaterial {
            base_color: Color::srgb_u8(124, 144, 255),
            ..default()
        })),
        Transform::from_xyz(0.0, 0.6, 0.0),
        OrchardPlayer,
        Name::new("Player"),
    ));
    commands.spawn((
        Camera3d::default(),
        Transform::from_xyz(-12.0, 10.0, 0.0).looking_at(Vec3::ZERO, Vec3::Y),
        MainCamera,
        CameraOrbit { radius: 25.0, yaw: 0.0, pitch: 0.6 },
    ));

    // 4) Terrain trees: only the configured prototype bears fruit.
    let bindings: Handle<FruitBindings> = assets.load(settings.bindings_path.as_str());
    let instances = scatter_trees(WorldSeed(settings.world_seed), settings.tree_count, PROTOTYPE_NAMES.len());
    let prototypes: Vec<TreePrototype> = PROTOTYPE_NAMES
        .iter()
        .enumerate()
        .map(|(i, name)| TreePrototype {
            name: (*name).to_string(),
            fruit: if i == settings.prototype_index {
                FruitSource::Asset(bindings.clone())
            } else {
                FruitSource::None
            },
        })
        .collect();

    let trunk = meshes.add(Cylinder::new(0.25, 3.0));
    let canopy = meshes.add(Sphere::new(1.6));
    let bark = materials.add(StandardMaterial { base_color: Color::srgb(0.36, 0.24, 0.14), ..default() });
    let leaves = [
        materials.add(StandardMaterial { base_color: Color::srgb(0.16, 0.42, 0.12), ..default() }),
        materials.add(StandardMaterial { base_color: Color::srgb(0.45, 0.58, 0.2), ..default() }),
    ];

    let terrain = commands
        .spawn((Transform::from_translation(terrain_origin), Name::new("Terrain")))
        .id();
    for inst in &instances {
        let scale = Vec3::new(inst.width_scale, inst.height_scale, inst.width_scale);
        let tree_tf = Transform {
            translation: inst.position * size,
            rotation: Quat::from_rotation_y(inst.rotation),
            scale,
        };
        commands
            .spawn((tree_tf, Visibility::default(), ChildOf(terrain)))
            .with_children(|tree| {
                tree.spawn((Mesh3d(trunk.clone()), MeshMaterial3d(bark.clone()), Transform::from_xyz(0.0, 1.5, 0.0)));
                tree.spawn((
                    Mesh3d(canopy.clone()),
                    MeshMaterial3d(leaves[inst.prototype_index % leaves.len()].clone()),
                    Transform::from_xyz(0.0, 3.6, 0.0),
                ));
            });
    }
    info!("Demo: scattered {} trees over {} prototypes", instances.len(), prototypes.len());
    commands.entity(terrain).insert(TerrainTrees { size, prototypes, instances });

    // 5) One manager per prototype.
    let fruit = FruitPrefab::Mesh {
        mesh: meshes.add(Sphere::new(settings.fruit_radius)),
        material: materials.add(StandardMaterial {
            base_color: Color::srgb(settings.fruit_color[0], settings.fruit_color[1], settings.fruit_color[2]),
            ..default()
        }),
    };
    let base = settings.manager_config();
    for prototype_index in 0..PROTOTYPE_NAMES.len() {
        commands.spawn((
            OrchardManager {
                terrain: Some(terrain),
                radius: base.radius,
                refresh_distance: base.refresh_distance,
                prototype_index,
                fruit: Some(fruit.clone()),
            },
            Name::new(format!("Orchard {prototype_index}")),
        ));
    }
}
