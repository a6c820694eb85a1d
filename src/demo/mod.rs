// src/demo/mod.rs
//! Walkable demo world: scattered trees, a player sphere and an orbit camera.

use bevy::prelude::*;

use crate::orchard::{OrchardSystems, Orchards};

pub mod input;
pub mod scatter;
pub mod setup;

use input::{camera_controller, input_mapping_system, player_movement, refresh_trees_system, ActionState};

pub struct DemoPlugin;
impl Plugin for DemoPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<ActionState>()
            .add_systems(Startup, setup::setup)
            .add_systems(
                Update,
                (input_mapping_system, refresh_trees_system, player_movement, camera_controller).chain(),
            )
            .add_systems(PostUpdate, log_orchard_stats.after(OrchardSystems::Tick));
    }
}

/// Log whenever the number of active trees changes.
fn log_orchard_stats(orchards: Res<Orchards>, mut last: Local<Option<(usize, usize)>>) {
    let now = (orchards.active_trees(), orchards.active_fruit());
    if *last != Some(now) {
        *last = Some(now);
        info!("Orchard: {} trees active, {} fruit", now.0, now.1);
    }
}
