// src/orchard/manager.rs
//! One manager per tree prototype: placements + bindings + scheduler + lifecycle,
//! stepped once per frame by an outside driver.

use bevy::math::Affine3A;
use bevy::prelude::*;

use super::bindings::VertexBindingTable;
use super::core::TerrainView;
use super::lifecycle::{FruitHost, LifecycleManager};
use super::placement::PlacementStore;
use super::scheduler::{ProximityAction, ProximityScheduler};

/// Tuning for one manager.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ManagerConfig {
    /// Trees strictly closer than this to the player carry fruit.
    pub radius: f32,
    /// Distance the player must move before the next proximity scan.
    pub refresh_distance: f32,
    /// Terrain tree prototype to manage.
    pub prototype_index: usize,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self { radius: 60.0, refresh_distance: 4.0, prototype_index: 0 }
    }
}

/// Reasons a manager never starts. All of them leave the component idle.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("no terrain assigned")]
    NoTerrain,
    #[error("no fruit prefab assigned")]
    NoFruitPrefab,
    #[error("terrain has no tree prototype {index} ({available} available)")]
    UnknownPrototype { index: usize, available: usize },
    #[error("fruit bindings for prototype {0} failed to load")]
    BindingsUnavailable(usize),
    #[error("radius must be > 0 (got {0})")]
    InvalidRadius(f32),
    #[error("refresh distance must be >= 0 (got {0})")]
    InvalidRefreshDistance(f32),
}

impl ManagerConfig {
    pub fn validate(&self, prototype_count: usize) -> Result<(), ConfigError> {
        if !(self.radius > 0.0) {
            return Err(ConfigError::InvalidRadius(self.radius));
        }
        if !(self.refresh_distance >= 0.0) {
            return Err(ConfigError::InvalidRefreshDistance(self.refresh_distance));
        }
        if self.prototype_index >= prototype_count {
            return Err(ConfigError::UnknownPrototype {
                index: self.prototype_index,
                available: prototype_count,
            });
        }
        Ok(())
    }
}

/// What one tick did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    pub refreshed: bool,
    pub activated: usize,
    pub deactivated: usize,
    pub fruit_spawned: usize,
    pub fruit_released: usize,
    pub fruit_updated: usize,
    /// Scheduled actions the lifecycle refused.
    pub rejected: usize,
}

#[derive(Debug)]
pub struct TreeManager<H> {
    config: ManagerConfig,
    placements: PlacementStore,
    bindings: VertexBindingTable,
    scheduler: ProximityScheduler,
    lifecycle: LifecycleManager<H>,
}

impl<H> TreeManager<H> {
    /// Validate `config` against the terrain and derive placements.
    pub fn build(
        config: ManagerConfig,
        terrain: &TerrainView<'_>,
        prototype_count: usize,
        bindings: VertexBindingTable,
    ) -> Result<Self, ConfigError> {
        config.validate(prototype_count)?;
        let placements = PlacementStore::build(terrain, config.prototype_index);
        Ok(Self::from_parts(config, placements, bindings))
    }

    pub fn from_parts(config: ManagerConfig, placements: PlacementStore, bindings: VertexBindingTable) -> Self {
        let lifecycle = LifecycleManager::new(placements.len());
        Self {
            scheduler: ProximityScheduler::new(config.radius, config.refresh_distance),
            config,
            placements,
            bindings,
            lifecycle,
        }
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    pub fn placements(&self) -> &PlacementStore {
        &self.placements
    }

    pub fn bindings(&self) -> &VertexBindingTable {
        &self.bindings
    }

    pub fn lifecycle(&self) -> &LifecycleManager<H> {
        &self.lifecycle
    }

    pub fn last_refresh_position(&self) -> Option<Vec3> {
        self.scheduler.last_refresh_position()
    }

    pub fn is_consistent(&self) -> bool {
        self.lifecycle.is_consistent()
    }

    /// Make the next tick rescan regardless of player movement.
    pub fn request_refresh(&mut self) {
        self.scheduler.invalidate();
    }

    /// One frame: (1) proximity scan if the player moved far enough, (2) move all active fruit.
    pub fn tick<Host>(&mut self, host: &mut Host, player: Vec3, terrain: &Affine3A) -> TickReport
    where
        Host: FruitHost<Handle = H>,
    {
        let mut report = TickReport::default();

        if self.scheduler.should_refresh(player) {
            report.refreshed = true;
            let actions = self.scheduler.plan(player, self.placements.records(), self.lifecycle.active_flags());
            for a in actions {
                let res = match a.action {
                    ProximityAction::Deactivate => self.lifecycle.deactivate(host, a.slot).map(|n| {
                        report.deactivated += 1;
                        report.fruit_released += n;
                    }),
                    ProximityAction::Activate => self
                        .lifecycle
                        .activate(host, a.slot, &self.placements, &self.bindings, terrain)
                        .map(|n| {
                            report.activated += 1;
                            report.fruit_spawned += n;
                        }),
                };
                if let Err(e) = res {
                    warn!("Orchard: ignoring {:?} for slot {}: {}", a.action, a.slot, e);
                    report.rejected += 1;
                }
            }

            if !self.lifecycle.is_consistent() {
                error!("Orchard: active flags and active set disagree after refresh");
            }

            if report.activated + report.deactivated > 0 {
                debug!(
                    "Orchard: refresh at ({:.1}, {:.1}, {:.1}) proto={} +{} -{} active={}",
                    player.x,
                    player.y,
                    player.z,
                    self.config.prototype_index,
                    report.activated,
                    report.deactivated,
                    self.lifecycle.active_count()
                );
            }
        }

        report.fruit_updated = self.lifecycle.update_all(host, &self.bindings, terrain);
        report
    }

    /// Drop every active tree and its fruit. The next tick rescans.
    pub fn release_all<Host>(&mut self, host: &mut Host) -> usize
    where
        Host: FruitHost<Handle = H>,
    {
        self.scheduler.invalidate();
        self.lifecycle.release_all(host)
    }
}
