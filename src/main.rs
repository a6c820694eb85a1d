use bevy::prelude::*;

use tree_fruit::demo::DemoPlugin;
use tree_fruit::orchard::{OrchardPlugin, OrchardSettings};

const SETTINGS_PATH: &str = "assets/orchard/settings.ron";

fn main() {
    App::new()
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window { title: "Orchard".into(), ..default() }),
            ..default()
        }))
        .insert_resource(ClearColor(Color::srgb(0.55, 0.75, 0.92)))
        // settings first so both plugins see them at Startup
        .insert_resource(OrchardSettings::load_or_default(SETTINGS_PATH))
        .add_plugins(OrchardPlugin)   // bindings asset + managers + per-frame tick
        .add_plugins(DemoPlugin)      // terrain scatter, player, camera
        .run();
}
