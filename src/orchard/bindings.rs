// src/orchard/bindings.rs
//! Authored fruit attachment points + loader.
//!
//! Files are produced offline by the capture tool as two parallel arrays:
//! ```ron
//! (
//!     vertex_indices: [112, 418, 903],
//!     local_offsets: [(0.4, 2.1, 0.2), (-0.6, 2.4, 0.1), (0.1, 2.8, -0.5)],
//! )
//! ```

use bevy::asset::{io::Reader, AssetLoader, LoadContext};
use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use super::core::VertexBinding;

// ---------- Public plugin to register asset+loader ----------

pub struct FruitBindingsAssetPlugin;

impl Plugin for FruitBindingsAssetPlugin {
    fn build(&self, app: &mut App) {
        app.init_asset::<FruitBindings>()
            .register_asset_loader(FruitBindingsLoader);
    }
}

// ---------- Data form ----------

/// On-disk layout. Index `i` of both arrays describes the same fruit.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FruitBindingsDef {
    #[serde(default)]
    pub vertex_indices: Vec<u32>,
    #[serde(default)]
    pub local_offsets: Vec<(f32, f32, f32)>,
}

// ---------- Runtime table ----------

/// Ordered list of fruit attachment points for one tree mesh. Immutable once built.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VertexBindingTable {
    bindings: Vec<VertexBinding>,
}

impl VertexBindingTable {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Zip two parallel arrays; they must line up one to one.
    pub fn from_parallel(indices: &[u32], offsets: &[Vec3]) -> Result<Self, BindingError> {
        if indices.len() != offsets.len() {
            return Err(BindingError::LengthMismatch {
                indices: indices.len(),
                offsets: offsets.len(),
            });
        }
        let bindings = indices
            .iter()
            .zip(offsets)
            .map(|(&vertex_index, &local_offset)| VertexBinding { vertex_index, local_offset })
            .collect();
        Ok(Self { bindings })
    }

    pub fn from_def(def: &FruitBindingsDef) -> Result<Self, BindingError> {
        let offsets: Vec<Vec3> = def
            .local_offsets
            .iter()
            .map(|&(x, y, z)| Vec3::new(x, y, z))
            .collect();
        Self::from_parallel(&def.vertex_indices, &offsets)
    }

    pub fn from_ron_bytes(bytes: &[u8]) -> Result<Self, BindingError> {
        let def: FruitBindingsDef =
            ron::de::from_bytes(bytes).map_err(|e| BindingError::Ron(e.to_string()))?;
        Self::from_def(&def)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    #[inline]
    pub fn get(&self, ix: usize) -> Option<&VertexBinding> {
        self.bindings.get(ix)
    }

    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, VertexBinding> {
        self.bindings.iter()
    }
}

// ---------- Asset ----------

#[derive(Asset, TypePath, Clone, Debug)]
pub struct FruitBindings {
    pub table: VertexBindingTable,
}

// ---------- Asset loader for `.fruit.ron` ----------

#[derive(Default)]
pub struct FruitBindingsLoader;

impl AssetLoader for FruitBindingsLoader {
    type Asset = FruitBindings;
    type Settings = ();
    type Error = BindingError;

    fn extensions(&self) -> &[&str] {
        &["fruit.ron"]
    }

    async fn load(
        &self,
        reader: &mut dyn Reader,
        _settings: &Self::Settings,
        load_context: &mut LoadContext<'_>,
    ) -> Result<Self::Asset, Self::Error> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes).await?;
        let table = VertexBindingTable::from_ron_bytes(&bytes)?;
        debug!(
            "Orchard: loaded {} fruit bindings from '{}'",
            table.len(),
            load_context.path().display()
        );
        Ok(FruitBindings { table })
    }
}

// ---------- Errors ----------

#[derive(thiserror::Error, Debug)]
pub enum BindingError {
    #[error("I/O while reading fruit bindings: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON parse error: {0}")]
    Ron(String),
    #[error("vertex index / offset arrays differ in length ({indices} indices, {offsets} offsets)")]
    LengthMismatch { indices: usize, offsets: usize },
}
