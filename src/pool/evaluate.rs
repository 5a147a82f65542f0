use std::cmp::Ordering;
use std::sync::Arc;

use super::{Pool, PoolOutput};
use crate::config::Aggregation;
use crate::store::SampleStore;

/// Squared Euclidean distance restricted to `dimensions`.
pub fn squared_distance(query: &[f32], sample: &[f32], dimensions: &[usize]) -> f32 {
    let mut sum = 0.0f32;
    for &d in dimensions {
        let diff = query[d] - sample[d];
        sum += diff * diff;
    }
    sum
}

/// Candidate reference with its distance to the query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub distance: f32,
    pub index: usize,
}

impl Neighbor {
    /// Ascending by distance, then by sample index.
    fn order(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then(self.index.cmp(&other.index))
    }
}

/// Evaluates pools against the shared store.
///
/// Holds a scratch buffer for k>1 searches, so each worker keeps its own.
#[derive(Debug, Clone)]
pub struct PoolEvaluator {
    store: Arc<SampleStore>,
    neighbors: usize,
    aggregation: Aggregation,
    scratch: Vec<Neighbor>,
}

impl PoolEvaluator {
    pub fn new(store: Arc<SampleStore>, neighbors: usize, aggregation: Aggregation) -> Self {
        Self {
            store,
            neighbors: neighbors.max(1),
            aggregation,
            scratch: Vec::new(),
        }
    }

    pub fn store(&self) -> &SampleStore {
        &self.store
    }

    /// Sample index of the closest reference; ties go to the lowest index.
    pub fn nearest(&self, pool: &Pool, query: &[f32]) -> Option<Neighbor> {
        let mut best: Option<Neighbor> = None;
        for &index in pool.references() {
            let distance = squared_distance(query, self.store.input(index), pool.dimensions());
            let candidate = Neighbor { distance, index };
            if best.is_none_or(|current| candidate.order(&current).is_lt()) {
                best = Some(candidate);
            }
        }
        best
    }

    /// The `k` closest references, ascending by distance then index.
    pub fn k_nearest(&mut self, pool: &Pool, query: &[f32], k: usize) -> &[Neighbor] {
        self.scratch.clear();
        for &index in pool.references() {
            let distance = squared_distance(query, self.store.input(index), pool.dimensions());
            self.scratch.push(Neighbor { distance, index });
        }
        let k = k.min(self.scratch.len());
        if k == 0 {
            return &[];
        }
        if k < self.scratch.len() {
            self.scratch.select_nth_unstable_by(k - 1, Neighbor::order);
            self.scratch.truncate(k);
        }
        self.scratch.sort_unstable_by(Neighbor::order);
        &self.scratch
    }

    /// Evaluate one pool for `query`.
    pub fn evaluate(&mut self, pool: &Pool, query: &[f32]) -> PoolOutput {
        let score_len = self.store.score_len();
        if self.neighbors == 1 {
            let Some(nearest) = self.nearest(pool, query) else {
                return self.empty_output(score_len);
            };
            return match self.aggregation {
                Aggregation::MajorityVote => {
                    PoolOutput::Vote(self.store.sample(nearest.index).label.class_index())
                }
                Aggregation::SoftAverage => {
                    let mut scores = vec![0.0f32; score_len];
                    self.store.accumulate_target(nearest.index, 1.0, &mut scores);
                    PoolOutput::Scores(scores)
                }
            };
        }

        if pool.references().is_empty() {
            return self.empty_output(score_len);
        }
        let neighbors = self.neighbors;
        let aggregation = self.aggregation;
        let store = Arc::clone(&self.store);
        let nearest = self.k_nearest(pool, query, neighbors);
        match aggregation {
            Aggregation::MajorityVote => {
                let mut counts = vec![0usize; score_len];
                for neighbor in nearest {
                    let class = store.sample(neighbor.index).label.class_index();
                    if let Some(count) = counts.get_mut(class) {
                        *count += 1;
                    }
                }
                PoolOutput::Vote(most_votes(&counts))
            }
            Aggregation::SoftAverage => {
                let weight = 1.0 / nearest.len() as f32;
                let mut scores = vec![0.0f32; score_len];
                for neighbor in nearest {
                    store.accumulate_target(neighbor.index, weight, &mut scores);
                }
                PoolOutput::Scores(scores)
            }
        }
    }

    fn empty_output(&self, score_len: usize) -> PoolOutput {
        match self.aggregation {
            Aggregation::MajorityVote => PoolOutput::Vote(0),
            Aggregation::SoftAverage => PoolOutput::Scores(vec![0.0; score_len]),
        }
    }
}

/// Class with the highest count; ties go to the smallest class id.
pub(crate) fn most_votes(counts: &[usize]) -> usize {
    let mut best = 0usize;
    let mut best_count = 0usize;
    for (class, &count) in counts.iter().enumerate() {
        if count > best_count {
            best = class;
            best_count = count;
        }
    }
    best
}
