// src/demo/scatter.rs
//! Deterministic tree scatter standing in for painted terrain data.

use bevy::prelude::*;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::orchard::core::RawTreeInstance;

/// Global world seed; changing this reshuffles every tree.
#[derive(Resource, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WorldSeed(pub u64);

/// `count` instances spread over `prototypes` tree types, normalized to `[0, 1]`.
/// Same seed, same output.
pub fn scatter_trees(seed: WorldSeed, count: usize, prototypes: usize) -> Vec<RawTreeInstance> {
    if prototypes == 0 {
        return Vec::new();
    }
    let mut rng = ChaCha8Rng::seed_from_u64(seed.0);
    (0..count)
        .map(|_| {
            let width = rng.random_range(0.8..1.3);
            RawTreeInstance {
                position: Vec3::new(rng.random_range(0.02..0.98), 0.0, rng.random_range(0.02..0.98)),
                rotation: rng.random_range(0.0..std::f32::consts::TAU),
                width_scale: width,
                height_scale: width * rng.random_range(0.9..1.2),
                prototype_index: rng.random_range(0..prototypes),
            }
        })
        .collect()
}
