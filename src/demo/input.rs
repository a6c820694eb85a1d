use std::collections::HashMap;

use bevy::input::mouse::{MouseMotion, MouseScrollUnit, MouseWheel};
use bevy::prelude::*;

use crate::orchard::{OrchardPlayer, Orchards};

use super::setup::MainCamera;

pub const MOVE_SPEED: f32 = 18.0;
pub const SPRINT_FACTOR: f32 = 4.0;
pub const ROTATE_SPEED: f32 = 0.2;
pub const MAX_CAMERA_DT: f32 = 0.05; // never use a dt larger than 50ms

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlayerAction {
    MoveForward,
    MoveBackward,
    MoveLeft,
    MoveRight,
    Sprint,
    RefreshTrees,
}

#[derive(Default, Resource)]
pub struct ActionState {
    pressed: HashMap<PlayerAction, bool>,
}

impl ActionState {
    pub fn set(&mut self, action: PlayerAction, is_pressed: bool) {
        self.pressed.insert(action, is_pressed);
    }

    pub fn pressed(&self, action: PlayerAction) -> bool {
        self.pressed.get(&action).copied().unwrap_or(false)
    }
}

/// Orbit camera around the player.
#[derive(Component)]
pub struct CameraOrbit {
    pub radius: f32,
    pub yaw: f32,
    pub pitch: f32,
}

pub fn input_mapping_system(
    keys: Res<ButtonInput<KeyCode>>,
    mut action_state: ResMut<ActionState>,
) {
    action_state.set(PlayerAction::MoveForward, keys.pressed(KeyCode::KeyW));
    action_state.set(PlayerAction::MoveBackward, keys.pressed(KeyCode::KeyS));
    action_state.set(PlayerAction::MoveLeft, keys.pressed(KeyCode::KeyA));
    action_state.set(PlayerAction::MoveRight, keys.pressed(KeyCode::KeyD));
    action_state.set(PlayerAction::Sprint, keys.pressed(KeyCode::ShiftLeft));
    action_state.set(PlayerAction::RefreshTrees, keys.just_pressed(KeyCode::F5));
}

/// F5: rescan every manager on its next tick.
pub fn refresh_trees_system(action_state: Res<ActionState>, mut orchards: ResMut<Orchards>) {
    if action_state.pressed(PlayerAction::RefreshTrees) {
        orchards.request_refresh_all();
        info!("Orchard: manual refresh requested");
    }
}

/// Camera-relative walking on the XZ plane.
pub fn player_movement(
    time: Res<Time>,
    action_state: Res<ActionState>,
    cam_q: Query<&CameraOrbit, With<MainCamera>>,
    mut player_q: Query<&mut Transform, With<OrchardPlayer>>,
) {
    let dt = time.delta_secs().min(MAX_CAMERA_DT);
    let (Ok(orbit), Ok(mut tf)) = (cam_q.single(), player_q.single_mut()) else { return; };

    let forward = Vec2::new(-orbit.yaw.cos(), -orbit.yaw.sin());
    let right = Vec2::new(-forward.y, forward.x);

    let mut dir = Vec2::ZERO;
    if action_state.pressed(PlayerAction::MoveForward) { dir += forward; }
    if action_state.pressed(PlayerAction::MoveBackward) { dir -= forward; }
    if action_state.pressed(PlayerAction::MoveLeft) { dir -= right; }
    if action_state.pressed(PlayerAction::MoveRight) { dir += right; }

    if dir != Vec2::ZERO {
        let speed = if action_state.pressed(PlayerAction::Sprint) { MOVE_SPEED * SPRINT_FACTOR } else { MOVE_SPEED };
        let delta = dir.normalize() * speed * dt;
        tf.translation.x += delta.x;
        tf.translation.z += delta.y;
    }
}

pub fn camera_controller(
    time: Res<Time>,
    mouse_buttons: Res<ButtonInput<MouseButton>>,
    mut motion_evr: EventReader<MouseMotion>,
    mut scroll_evr: EventReader<MouseWheel>,
    player_q: Query<&Transform, (With<OrchardPlayer>, Without<CameraOrbit>)>,
    mut cam_q: Query<(&mut Transform, &mut CameraOrbit), With<MainCamera>>,
) {
    let dt = time.delta_secs().min(MAX_CAMERA_DT);
    let (Ok(player), Ok((mut tf, mut orbit))) = (player_q.single(), cam_q.single_mut()) else { return; };
    let focus = player.translation;

    for ev in scroll_evr.read() {
        let amount = match ev.unit {
            MouseScrollUnit::Line => ev.y * 1.0,
            MouseScrollUnit::Pixel => ev.y * 0.02,
        };
        orbit.radius = (orbit.radius - amount).clamp(2.0, 400.0);
    }

    if mouse_buttons.pressed(MouseButton::Middle) {
        for ev in motion_evr.read() {
            orbit.yaw += ev.delta.x * ROTATE_SPEED * dt;
            orbit.pitch += ev.delta.y * ROTATE_SPEED * dt;
        }
    } else {
        motion_evr.clear();
    }

    orbit.pitch = orbit.pitch.clamp(0.05, std::f32::consts::FRAC_PI_2 - 0.01);

    let xz_radius = orbit.radius * orbit.pitch.cos();
    let offset = Vec3::new(
        xz_radius * orbit.yaw.cos(),
        orbit.radius * orbit.pitch.sin(),
        xz_radius * orbit.yaw.sin(),
    );
    tf.translation = focus + offset;
    tf.look_at(focus, Vec3::Y);
}
