use rand::Rng;
use rand::seq::SliceRandom;

use super::Pool;
use crate::config::{EnsembleConfig, SelectionStrategy};
use crate::error::ConfigError;
use crate::store::SampleStore;

/// Draws the dimension and reference subsets for every pool.
#[derive(Debug, Clone)]
pub struct PoolBuilder<'a> {
    store: &'a SampleStore,
    pool_count: usize,
    dimensions_per_pool: usize,
    selection: SelectionStrategy,
}

impl<'a> PoolBuilder<'a> {
    pub fn new(
        store: &'a SampleStore,
        pool_count: usize,
        dimensions_per_pool: usize,
        selection: SelectionStrategy,
    ) -> Self {
        Self {
            store,
            pool_count,
            dimensions_per_pool,
            selection,
        }
    }

    pub fn from_config(store: &'a SampleStore, config: &EnsembleConfig) -> Self {
        Self::new(
            store,
            config.pool_count,
            config.dimensions_per_pool,
            config.selection,
        )
    }

    /// Validate pool shape against the store without drawing anything.
    pub fn check(&self) -> Result<(), ConfigError> {
        if self.pool_count == 0 {
            return Err(ConfigError::ZeroPools);
        }
        if self.dimensions_per_pool == 0 {
            return Err(ConfigError::ZeroDimensions);
        }
        if self.dimensions_per_pool > self.store.input_len() {
            return Err(ConfigError::TooManyDimensions {
                requested: self.dimensions_per_pool,
                available: self.store.input_len(),
            });
        }
        match self.selection {
            SelectionStrategy::Uniform { references } => {
                if references == 0 {
                    return Err(ConfigError::ZeroReferences);
                }
                if references > self.store.len() {
                    return Err(ConfigError::TooManyReferences {
                        requested: references,
                        available: self.store.len(),
                    });
                }
            }
            SelectionStrategy::Stratified { per_class } => {
                if !self.store.has_class_labels() {
                    return Err(ConfigError::RequiresClassLabels {
                        feature: "Stratified selection",
                    });
                }
                if per_class == 0 {
                    return Err(ConfigError::ZeroReferences);
                }
                if let Some((class, min_class_size)) = self.store.min_class_size() {
                    if per_class > min_class_size {
                        return Err(ConfigError::ClassTooSmall {
                            per_class,
                            min_class_size,
                            class,
                        });
                    }
                }
            }
        }
        Ok(())
    }

    /// Build every pool. Fails before drawing if the shape is invalid.
    ///
    /// Each pool draws its subsets independently, without replacement inside
    /// the pool; different pools may share dimensions and samples.
    pub fn build<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Vec<Pool>, ConfigError> {
        self.check()?;
        let mut all_dimensions: Vec<usize> = (0..self.store.input_len()).collect();
        let mut pools = Vec::with_capacity(self.pool_count);
        match self.selection {
            SelectionStrategy::Uniform { references } => {
                let mut all_samples: Vec<usize> = (0..self.store.len()).collect();
                for _ in 0..self.pool_count {
                    let dimensions =
                        choose_distinct(rng, &mut all_dimensions, self.dimensions_per_pool);
                    let chosen = choose_distinct(rng, &mut all_samples, references);
                    pools.push(Pool::new(dimensions, chosen));
                }
            }
            SelectionStrategy::Stratified { per_class } => {
                let mut buckets: Vec<Vec<usize>> =
                    self.store.class_buckets().into_values().collect();
                for _ in 0..self.pool_count {
                    let dimensions =
                        choose_distinct(rng, &mut all_dimensions, self.dimensions_per_pool);
                    let mut chosen = Vec::with_capacity(per_class * buckets.len());
                    for bucket in &mut buckets {
                        let (picked, _) = bucket.partial_shuffle(rng, per_class);
                        chosen.extend_from_slice(picked);
                    }
                    pools.push(Pool::new(dimensions, chosen));
                }
            }
        }
        tracing::debug!(
            "Built {} pools ({} dims, {:?}) over {} samples",
            pools.len(),
            self.dimensions_per_pool,
            self.selection,
            self.store.len()
        );
        Ok(pools)
    }
}

/// Pick `amount` distinct entries of `candidates` with a partial Fisher-Yates pass.
///
/// `candidates` is left permuted; any permutation is a valid starting point
/// for the next draw, so callers reuse one buffer across pools.
fn choose_distinct<R: Rng + ?Sized>(
    rng: &mut R,
    candidates: &mut [usize],
    amount: usize,
) -> Vec<usize> {
    let (picked, _) = candidates.partial_shuffle(rng, amount);
    picked.to_vec()
}
