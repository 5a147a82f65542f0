//! Combines per-pool outputs into one prediction.
//!
//! Outputs are always consumed in canonical pool order, whatever order the
//! workers finished in, so ties resolve the same way for any worker count.

use crate::config::Aggregation;
use crate::pool::PoolOutput;
use crate::store::argmax;

/// Final answer for one query.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    /// Winning class id (argmax of `scores`).
    pub label: usize,
    /// Vote fractions for majority voting, averaged scores for soft averaging.
    pub scores: Vec<f32>,
}

/// Aggregation rule plus the score width it produces.
#[derive(Debug, Clone, Copy)]
pub struct Aggregator {
    mode: Aggregation,
    score_len: usize,
}

impl Aggregator {
    pub fn new(mode: Aggregation, score_len: usize) -> Self {
        Self { mode, score_len }
    }

    pub fn mode(&self) -> Aggregation {
        self.mode
    }

    /// Per-class vote counts over `outputs`, in canonical order.
    ///
    /// A pool that produced scores votes for their argmax.
    pub fn vote_counts(&self, outputs: &[PoolOutput]) -> Vec<usize> {
        let mut counts = vec![0usize; self.score_len];
        for output in outputs {
            let class = match output {
                PoolOutput::Vote(class) => *class,
                PoolOutput::Scores(scores) => argmax(scores),
            };
            if class >= counts.len() {
                counts.resize(class + 1, 0);
            }
            counts[class] += 1;
        }
        counts
    }

    /// Reduce pool outputs to a prediction.
    pub fn aggregate(&self, outputs: &[PoolOutput]) -> Prediction {
        match self.mode {
            Aggregation::MajorityVote => {
                let counts = self.vote_counts(outputs);
                let label = crate::pool::most_votes(&counts);
                let total = outputs.len().max(1) as f32;
                Prediction {
                    label,
                    scores: counts.iter().map(|&c| c as f32 / total).collect(),
                }
            }
            Aggregation::SoftAverage => {
                let mut scores = vec![0.0f32; self.score_len];
                let mut pools = 0usize;
                for output in outputs {
                    if let PoolOutput::Scores(values) = output {
                        for (slot, value) in scores.iter_mut().zip(values) {
                            *slot += value;
                        }
                        pools += 1;
                    }
                }
                if pools > 0 {
                    let inv = 1.0 / pools as f32;
                    for slot in &mut scores {
                        *slot *= inv;
                    }
                }
                Prediction {
                    label: argmax(&scores),
                    scores,
                }
            }
        }
    }
}
