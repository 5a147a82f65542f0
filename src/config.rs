//! Ensemble configuration: selection strategy, aggregation mode and execution model.
//!
//! Configs are plain serde structs so they can live in a TOML file next to the
//! data they are tuned for. `validate` runs every construction check up front.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigFileError};
use crate::pool::PoolBuilder;
use crate::store::SampleStore;

/// Environment variable overriding the default worker count.
pub const WORKERS_ENV: &str = "KPOOLS_WORKERS";

/// How each pool picks its reference samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SelectionStrategy {
    /// `references` distinct samples drawn uniformly from the whole store.
    Uniform { references: usize },
    /// `per_class` distinct samples drawn from every class.
    Stratified { per_class: usize },
}

/// How pool outputs are combined into one prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    /// One vote per pool; most votes wins, ties go to the smallest class id.
    #[default]
    MajorityVote,
    /// Elementwise mean of per-pool score vectors; label is the argmax.
    SoftAverage,
}

/// Where pool evaluation runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Execution {
    /// Evaluate every pool on the calling thread.
    Inline,
    /// Fixed worker threads, spawned once. `None` resolves via [`default_worker_count`].
    Threaded {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        workers: Option<usize>,
    },
}

impl Default for Execution {
    fn default() -> Self {
        Execution::Threaded { workers: None }
    }
}

/// Construction parameters for an [`Ensemble`](crate::Ensemble).
///
/// Config keys: `pool_count`, `dimensions_per_pool`, `neighbors`,
/// `aggregation`, `seed`, `[selection]`, `[execution]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnsembleConfig {
    pub pool_count: usize,
    pub dimensions_per_pool: usize,
    #[serde(default = "default_neighbors")]
    pub neighbors: usize,
    #[serde(default)]
    pub aggregation: Aggregation,
    /// Seed for pool construction; a random seed is drawn when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    pub selection: SelectionStrategy,
    #[serde(default)]
    pub execution: Execution,
}

fn default_neighbors() -> usize {
    1
}

impl EnsembleConfig {
    /// Config with k=1, majority voting and the default threaded engine.
    pub fn new(pool_count: usize, dimensions_per_pool: usize, selection: SelectionStrategy) -> Self {
        Self {
            pool_count,
            dimensions_per_pool,
            neighbors: default_neighbors(),
            aggregation: Aggregation::default(),
            seed: None,
            selection,
            execution: Execution::default(),
        }
    }

    pub fn with_neighbors(mut self, neighbors: usize) -> Self {
        self.neighbors = neighbors;
        self
    }

    pub fn with_aggregation(mut self, aggregation: Aggregation) -> Self {
        self.aggregation = aggregation;
        self
    }

    pub fn with_execution(mut self, execution: Execution) -> Self {
        self.execution = execution;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Parse a config from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Serialize the config as TOML text.
    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string(self)
    }

    /// References each pool will hold for `store`.
    pub fn references_per_pool(&self, store: &SampleStore) -> usize {
        match self.selection {
            SelectionStrategy::Uniform { references } => references,
            SelectionStrategy::Stratified { per_class } => {
                per_class.saturating_mul(store.class_buckets().len())
            }
        }
    }

    /// Check every construction constraint against `store`.
    pub fn validate(&self, store: &SampleStore) -> Result<(), ConfigError> {
        PoolBuilder::from_config(store, self).check()?;
        self.check_runtime(store, self.references_per_pool(store))
    }

    /// Checks that do not depend on how pools are drawn: worker count, label
    /// kind, and neighbor count against the smallest pool.
    pub(crate) fn check_runtime(
        &self,
        store: &SampleStore,
        references: usize,
    ) -> Result<(), ConfigError> {
        if let Execution::Threaded { workers: Some(0) } = self.execution {
            return Err(ConfigError::ZeroWorkers);
        }
        if self.aggregation == Aggregation::MajorityVote && !store.has_class_labels() {
            return Err(ConfigError::RequiresClassLabels {
                feature: "Majority-vote aggregation",
            });
        }
        if self.neighbors == 0 {
            return Err(ConfigError::ZeroNeighbors);
        }
        if self.neighbors > references {
            return Err(ConfigError::TooManyNeighbors {
                neighbors: self.neighbors,
                references,
            });
        }
        Ok(())
    }
}

/// Worker count used when a threaded config leaves it unset.
///
/// Reads [`WORKERS_ENV`] first, then falls back to the available parallelism.
pub fn default_worker_count() -> usize {
    if let Ok(value) = std::env::var(WORKERS_ENV) {
        if let Ok(parsed) = value.trim().parse::<usize>() {
            if parsed >= 1 {
                return parsed;
            }
        }
    }
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Load a config from a TOML file.
pub fn load_config(path: &Path) -> Result<EnsembleConfig, ConfigFileError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigFileError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    EnsembleConfig::from_toml_str(&text).map_err(|source| ConfigFileError::ParseToml {
        path: path.to_path_buf(),
        source,
    })
}

/// Write a config to a TOML file.
pub fn save_config(config: &EnsembleConfig, path: &Path) -> Result<(), ConfigFileError> {
    let text = config.to_toml_string()?;
    std::fs::write(path, text).map_err(|source| ConfigFileError::Write {
        path: path.to_path_buf(),
        source,
    })
}
