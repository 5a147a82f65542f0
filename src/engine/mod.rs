//! Execution engines that evaluate every pool for one query.
//!
//! An engine is `Idle` until released, and `Released` is terminal. A request
//! runs entirely inside `evaluate`, which takes `&mut self`, so no second
//! request can start while one is running and no caller can observe the
//! engine mid-request.

mod partition;
mod worker_pool;

pub use partition::partition;
pub use worker_pool::WorkerPool;

use std::sync::Arc;

use crate::error::{KPoolsError, LifecycleError};
use crate::pool::{Pool, PoolEvaluator, PoolOutput};

/// Lifecycle state of an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Released,
}

enum Backend {
    Inline {
        pools: Arc<[Pool]>,
        evaluator: PoolEvaluator,
    },
    Threaded(WorkerPool),
}

/// Owns the pools' execution resources for the ensemble's lifetime.
pub struct Engine {
    backend: Backend,
    state: EngineState,
}

impl Engine {
    /// Evaluate pools on the calling thread.
    pub fn inline(pools: Arc<[Pool]>, evaluator: PoolEvaluator) -> Self {
        Self {
            backend: Backend::Inline { pools, evaluator },
            state: EngineState::Idle,
        }
    }

    /// Spawn `workers` threads over `pools`. `workers` must be in `1..=pools.len()`.
    pub fn threaded(pools: Arc<[Pool]>, evaluator: &PoolEvaluator, workers: usize) -> Self {
        Self {
            backend: Backend::Threaded(WorkerPool::spawn(pools, evaluator, workers)),
            state: EngineState::Idle,
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Worker threads owned by the engine; zero when inline.
    pub fn worker_count(&self) -> usize {
        match &self.backend {
            Backend::Inline { .. } => 0,
            Backend::Threaded(workers) => workers.worker_count(),
        }
    }

    /// Evaluate every pool for `query`; outputs are in pool order.
    pub fn evaluate(&mut self, query: &[f32]) -> Result<Vec<PoolOutput>, KPoolsError> {
        if self.state == EngineState::Released {
            return Err(LifecycleError::Released.into());
        }
        match &mut self.backend {
            Backend::Inline { pools, evaluator } => Ok(pools
                .iter()
                .map(|pool| evaluator.evaluate(pool, query))
                .collect()),
            Backend::Threaded(workers) => workers.run(Arc::from(query)).map_err(KPoolsError::from),
        }
    }

    /// Stop all workers. Returns `false` if the engine was already released.
    pub fn shutdown(&mut self) -> bool {
        if self.state == EngineState::Released {
            return false;
        }
        if let Backend::Threaded(workers) = &mut self.backend {
            workers.shutdown();
        }
        self.state = EngineState::Released;
        true
    }
}
