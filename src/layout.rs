//! JSON export of built pools, so an ensemble can be rebuilt exactly.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, LayoutError};
use crate::pool::Pool;
use crate::store::SampleStore;

/// Current layout format version.
pub const LAYOUT_VERSION: u32 = 1;

/// Snapshot of every pool's index sets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolLayout {
    /// Layout format version.
    pub version: u32,
    /// Input length of the store the pools were built for.
    pub input_len: usize,
    /// Sample count of that store.
    pub sample_count: usize,
    /// Seed the pools were drawn with, when known.
    #[serde(default)]
    pub seed: Option<u64>,
    /// Pools in canonical order.
    pub pools: Vec<Pool>,
}

impl PoolLayout {
    pub fn new(store: &SampleStore, seed: Option<u64>, pools: Vec<Pool>) -> Self {
        Self {
            version: LAYOUT_VERSION,
            input_len: store.input_len(),
            sample_count: store.len(),
            seed,
            pools,
        }
    }

    /// Check that every index fits `store` and each set is strictly increasing.
    pub fn validate(&self, store: &SampleStore) -> Result<(), ConfigError> {
        if self.pools.is_empty() {
            return Err(ConfigError::ZeroPools);
        }
        if self.input_len != store.input_len() {
            return Err(ConfigError::LayoutMismatch(format!(
                "layout input length {} vs store {}",
                self.input_len,
                store.input_len()
            )));
        }
        if self.sample_count != store.len() {
            return Err(ConfigError::LayoutMismatch(format!(
                "layout sample count {} vs store {}",
                self.sample_count,
                store.len()
            )));
        }
        for (pool_idx, pool) in self.pools.iter().enumerate() {
            check_index_set(pool_idx, "dimension", pool.dimensions(), store.input_len())?;
            check_index_set(pool_idx, "reference", pool.references(), store.len())?;
        }
        Ok(())
    }

    /// Dimension and reference counts shared by every pool, or `None` when
    /// the pools differ in shape.
    pub fn pool_shape(&self) -> Option<(usize, usize)> {
        let first = self.pools.first()?;
        let shape = (first.dimensions().len(), first.references().len());
        self.pools
            .iter()
            .all(|pool| (pool.dimensions().len(), pool.references().len()) == shape)
            .then_some(shape)
    }

    pub fn to_json(&self) -> Result<String, LayoutError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(text: &str) -> Result<Self, LayoutError> {
        let layout: Self = serde_json::from_str(text)?;
        if layout.version != LAYOUT_VERSION {
            return Err(LayoutError::Version {
                found: layout.version,
                expected: LAYOUT_VERSION,
            });
        }
        Ok(layout)
    }

    pub fn save_json(&self, path: &Path) -> Result<(), LayoutError> {
        let text = self.to_json()?;
        std::fs::write(path, text).map_err(|source| LayoutError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn load_json(path: &Path) -> Result<Self, LayoutError> {
        let text = std::fs::read_to_string(path).map_err(|source| LayoutError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }
}

fn check_index_set(
    pool_idx: usize,
    what: &str,
    indices: &[usize],
    bound: usize,
) -> Result<(), ConfigError> {
    if indices.is_empty() {
        return Err(ConfigError::LayoutMismatch(format!(
            "pool {pool_idx} has no {what} indices"
        )));
    }
    if indices.windows(2).any(|pair| pair[0] >= pair[1]) {
        return Err(ConfigError::LayoutMismatch(format!(
            "pool {pool_idx} {what} indices are not strictly increasing"
        )));
    }
    if let Some(&last) = indices.last() {
        if last >= bound {
            return Err(ConfigError::LayoutMismatch(format!(
                "pool {pool_idx} {what} index {last} out of range (< {bound})"
            )));
        }
    }
    Ok(())
}
