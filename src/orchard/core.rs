// src/orchard/core.rs
//! Core types for proximity-streamed tree fruit.
//! Keep this file dependency-light; everything else in `orchard` builds on it.

use bevy::math::{Affine3A, EulerRot, Quat, Vec3};

// ---------- Terrain input ----------

/// One tree as the terrain stores it. Position is normalized to `[0, 1]` on every axis.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RawTreeInstance {
    pub position: Vec3,
    /// Yaw in radians around +Y.
    pub rotation: f32,
    pub width_scale: f32,
    pub height_scale: f32,
    /// Which terrain tree prototype this instance uses.
    pub prototype_index: usize,
}

/// Read-only slice of terrain data needed to build placements.
#[derive(Clone, Copy, Debug)]
pub struct TerrainView<'a> {
    pub instances: &'a [RawTreeInstance],
    /// World units per normalized unit on each axis.
    pub size: Vec3,
    pub transform: Affine3A,
}

// ---------- Placements ----------

/// Index of a placement inside its store. Flags and the active map are keyed by this.
pub type Slot = usize;

/// Finalized placement for one tree of the managed prototype.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlacementRecord {
    /// Index of the source instance in the terrain's full instance list (not compacted).
    pub instance_id: u32,
    /// Terrain-local, size-scaled position.
    pub local_position: Vec3,
    /// `local_position` pushed through the terrain transform at build time.
    pub world_position: Vec3,
    /// Euler angles in degrees; only Y is ever set from terrain data.
    pub rotation_deg: Vec3,
    pub scale: Vec3,
}

impl PlacementRecord {
    #[inline]
    pub fn rotation(&self) -> Quat {
        quat_from_degrees(self.rotation_deg)
    }

    /// Tree-local to terrain-local matrix (scale, then rotate, then translate).
    #[inline]
    pub fn tree_matrix(&self) -> Affine3A {
        Affine3A::from_scale_rotation_translation(self.scale, self.rotation(), self.local_position)
    }
}

// ---------- Vertex bindings ----------

/// A point on the tree mesh that carries one fruit.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VertexBinding {
    pub vertex_index: u32,
    /// Vertex position in the tree mesh's local space.
    pub local_offset: Vec3,
}

// ---------- Transforms ----------

/// Degrees to rotation, applying Y, then X, then Z.
#[inline]
pub fn quat_from_degrees(deg: Vec3) -> Quat {
    Quat::from_euler(
        EulerRot::YXZ,
        deg.y.to_radians(),
        deg.x.to_radians(),
        deg.z.to_radians(),
    )
}

/// World position of a fruit bound at `offset` on the tree described by `placement`:
/// `terrain * (local_position + R * (S * offset))`.
#[inline]
pub fn compute_world_position(placement: &PlacementRecord, offset: Vec3, terrain: &Affine3A) -> Vec3 {
    let tree_space = Affine3A::from_scale_rotation_translation(placement.scale, placement.rotation(), Vec3::ZERO)
        .transform_point3(offset);
    terrain.transform_point3(placement.local_position + tree_space)
}
