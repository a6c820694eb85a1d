// src/orchard/settings.rs
use std::path::Path;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use super::manager::ManagerConfig;

/// Runtime tuning + demo world parameters, read from `assets/orchard/settings.ron`.
#[derive(Resource, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchardSettings {
    pub radius: f32,
    pub refresh_distance: f32,
    /// Prototype that carries fruit in the demo world.
    pub prototype_index: usize,
    /// Asset path of the authored `.fruit.ron` bindings.
    pub bindings_path: String,
    pub fruit_radius: f32,
    pub fruit_color: [f32; 3],
    pub world_seed: u64,
    pub tree_count: usize,
    /// Terrain extent in world units (X, Y, Z).
    pub terrain_size: [f32; 3],
}

impl Default for OrchardSettings {
    fn default() -> Self {
        Self {
            radius: 60.0,
            refresh_distance: 4.0,
            prototype_index: 0,
            bindings_path: "orchard/apple_tree.fruit.ron".to_string(),
            fruit_radius: 0.18,
            fruit_color: [0.85, 0.1, 0.08],
            world_seed: 1337,
            tree_count: 2_000,
            terrain_size: [1_000.0, 40.0, 1_000.0],
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum SettingsError {
    #[error("I/O while reading settings: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON parse error: {0}")]
    Ron(String),
}

impl OrchardSettings {
    pub fn from_ron_str(src: &str) -> Result<Self, SettingsError> {
        ron::from_str(src).map_err(|e| SettingsError::Ron(e.to_string()))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let src = std::fs::read_to_string(path)?;
        Self::from_ron_str(&src)
    }

    /// Missing or broken files fall back to defaults with a warning.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::load(path) {
            Ok(s) => {
                info!("Orchard: settings loaded from '{}'", path.display());
                s
            }
            Err(e) => {
                warn!("Orchard: using default settings ({}): {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn manager_config(&self) -> ManagerConfig {
        ManagerConfig {
            radius: self.radius,
            refresh_distance: self.refresh_distance,
            prototype_index: self.prototype_index,
        }
    }

    pub fn terrain_size(&self) -> Vec3 {
        Vec3::from_array(self.terrain_size)
    }
}
