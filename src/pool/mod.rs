//! Random-subspace nearest-neighbor pools.
//!
//! A pool is a weak learner that only sees a subset of input dimensions and a
//! subset of training samples. Pools hold indices into the shared
//! [`SampleStore`](crate::store::SampleStore), never copies of its vectors.

mod builder;
mod evaluate;

pub use builder::PoolBuilder;
pub use evaluate::{Neighbor, PoolEvaluator, squared_distance};
pub(crate) use evaluate::most_votes;

use serde::{Deserialize, Serialize};

/// Dimension and reference index sets for one pool.
///
/// Both sets are kept sorted ascending, so scanning references in order visits
/// the lowest sample index first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pool {
    dimensions: Vec<usize>,
    references: Vec<usize>,
}

impl Pool {
    /// Create a pool from already-distinct index sets.
    pub fn new(mut dimensions: Vec<usize>, mut references: Vec<usize>) -> Self {
        dimensions.sort_unstable();
        references.sort_unstable();
        Self {
            dimensions,
            references,
        }
    }

    pub fn dimensions(&self) -> &[usize] {
        &self.dimensions
    }

    pub fn references(&self) -> &[usize] {
        &self.references
    }
}

/// What a single pool contributes to the ensemble for one query.
#[derive(Debug, Clone, PartialEq)]
pub enum PoolOutput {
    /// Class id voted for by the pool.
    Vote(usize),
    /// Mean target row of the pool's nearest neighbors.
    Scores(Vec<f32>),
}
