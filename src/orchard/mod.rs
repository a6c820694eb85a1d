//! Proximity-streamed fruit for terrain trees.
//!
//! `core`, `bindings`, `placement`, `scheduler`, `lifecycle` and `manager` know
//! nothing about the ECS; `host`, `components` and `plugin` wire them into Bevy.

pub mod core;
pub mod bindings;
pub mod placement;
pub mod scheduler;
pub mod lifecycle;
pub mod manager;
pub mod components;
pub mod host;
pub mod settings;
pub mod plugin;

pub use components::{Fruit, FruitPrefab, FruitSource, OrchardManager, OrchardPlayer, TerrainTrees, TreePrototype};
pub use manager::{ConfigError, ManagerConfig, TickReport, TreeManager};
pub use plugin::{OrchardPlugin, OrchardSystems, Orchards};
pub use settings::OrchardSettings;
