//! The ensemble: pools, aggregation rule and execution engine behind one handle.

use std::sync::Arc;

use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::aggregate::{Aggregator, Prediction};
use crate::config::{EnsembleConfig, Execution, SelectionStrategy, default_worker_count};
use crate::engine::{Engine, EngineState};
use crate::error::{ConfigError, KPoolsError, LifecycleError};
use crate::layout::PoolLayout;
use crate::metrics::{ConfusionMatrix, Evaluation};
use crate::pool::{Pool, PoolBuilder, PoolEvaluator, PoolOutput};
use crate::store::{Sample, SampleSource, SampleStore};

/// Random-subspace nearest-neighbor ensemble.
///
/// Built once from an immutable [`SampleStore`]. Worker threads (if any) are
/// spawned at construction and live until [`release`](Self::release) or drop.
pub struct Ensemble {
    store: Arc<SampleStore>,
    config: EnsembleConfig,
    seed: Option<u64>,
    pools: Arc<[Pool]>,
    aggregator: Aggregator,
    engine: Engine,
}

impl Ensemble {
    /// Validate `config`, draw the pools and start the engine.
    pub fn new(store: Arc<SampleStore>, config: EnsembleConfig) -> Result<Self, KPoolsError> {
        config.validate(&store)?;
        let seed = config.seed.unwrap_or_else(rand::random);
        let mut rng = StdRng::seed_from_u64(seed);
        let pools = PoolBuilder::from_config(&store, &config).build(&mut rng)?;
        Ok(Self::assemble(store, config, Some(seed), pools))
    }

    /// Build a store from `source` and construct over it.
    pub fn from_samples(
        source: impl SampleSource,
        config: EnsembleConfig,
    ) -> Result<Self, KPoolsError> {
        let store = SampleStore::from_source(source)?;
        Self::new(Arc::new(store), config)
    }

    /// Rebuild an ensemble with exactly the pools in `layout`.
    ///
    /// Pool count, dimensions per pool and seed come from the layout, whose
    /// pools must all share one shape. `config` supplies the neighbor count,
    /// aggregation mode and execution model. Its selection is kept when it
    /// yields the layout's reference count, otherwise it is replaced by the
    /// equivalent uniform selection.
    pub fn from_layout(
        store: Arc<SampleStore>,
        layout: PoolLayout,
        mut config: EnsembleConfig,
    ) -> Result<Self, KPoolsError> {
        layout.validate(&store)?;
        let (dimensions, references) = layout.pool_shape().ok_or_else(|| {
            ConfigError::LayoutMismatch(
                "pools differ in dimension or reference count".to_string(),
            )
        })?;
        config.check_runtime(&store, references)?;
        config.pool_count = layout.pools.len();
        config.dimensions_per_pool = dimensions;
        if config.references_per_pool(&store) != references {
            config.selection = SelectionStrategy::Uniform { references };
        }
        config.seed = layout.seed;
        Ok(Self::assemble(store, config, layout.seed, layout.pools))
    }

    fn assemble(
        store: Arc<SampleStore>,
        config: EnsembleConfig,
        seed: Option<u64>,
        pools: Vec<Pool>,
    ) -> Self {
        let pools: Arc<[Pool]> = pools.into();
        let evaluator = PoolEvaluator::new(Arc::clone(&store), config.neighbors, config.aggregation);
        let engine = match config.execution {
            Execution::Inline => Engine::inline(Arc::clone(&pools), evaluator),
            Execution::Threaded { workers } => {
                let requested = workers.unwrap_or_else(default_worker_count);
                let workers = requested.min(pools.len()).max(1);
                if workers < requested {
                    tracing::warn!(
                        "Requested {requested} workers for {} pools; using {workers}",
                        pools.len()
                    );
                }
                Engine::threaded(Arc::clone(&pools), &evaluator, workers)
            }
        };
        tracing::debug!(
            "Ensemble ready: {} pools, k={}, {:?}, {} workers, seed {:?}",
            pools.len(),
            config.neighbors,
            config.aggregation,
            engine.worker_count(),
            seed
        );
        Self {
            aggregator: Aggregator::new(config.aggregation, store.score_len()),
            store,
            config,
            seed,
            pools,
            engine,
        }
    }

    pub fn config(&self) -> &EnsembleConfig {
        &self.config
    }

    pub fn store(&self) -> &SampleStore {
        &self.store
    }

    pub fn pools(&self) -> &[Pool] {
        &self.pools
    }

    /// Seed the pools were drawn with, when known.
    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// Worker threads serving predictions; zero for inline execution.
    pub fn worker_count(&self) -> usize {
        self.engine.worker_count()
    }

    pub fn is_released(&self) -> bool {
        self.engine.state() == EngineState::Released
    }

    /// Snapshot of the pool index sets for export.
    pub fn layout(&self) -> PoolLayout {
        PoolLayout::new(&self.store, self.seed, self.pools.to_vec())
    }

    /// Predict `query`. Blocks until every pool has been evaluated.
    pub fn predict(&mut self, query: &[f32]) -> Result<Prediction, KPoolsError> {
        let outputs = self.evaluate_pools(query)?;
        let prediction = self.aggregator.aggregate(&outputs);
        tracing::trace!("Predicted label {}", prediction.label);
        Ok(prediction)
    }

    /// Predicted class id for `query`.
    pub fn predict_label(&mut self, query: &[f32]) -> Result<usize, KPoolsError> {
        self.predict(query).map(|prediction| prediction.label)
    }

    /// Per-class vote counts for `query`.
    ///
    /// In soft-average mode each pool votes for the argmax of its scores.
    pub fn vote_counts(&mut self, query: &[f32]) -> Result<Vec<usize>, KPoolsError> {
        let outputs = self.evaluate_pools(query)?;
        Ok(self.aggregator.vote_counts(&outputs))
    }

    fn evaluate_pools(&mut self, query: &[f32]) -> Result<Vec<PoolOutput>, KPoolsError> {
        if self.is_released() {
            return Err(LifecycleError::Released.into());
        }
        if query.len() != self.store.input_len() {
            return Err(KPoolsError::QueryDimension {
                expected: self.store.input_len(),
                actual: query.len(),
            });
        }
        self.engine.evaluate(query)
    }

    /// Fraction of `test` samples whose label is predicted exactly.
    ///
    /// Value-labeled samples compare against the argmax of their target.
    pub fn fitness(&mut self, test: &[Sample]) -> Result<f32, KPoolsError> {
        if test.is_empty() {
            return Ok(0.0);
        }
        let mut correct = 0usize;
        for sample in test {
            if self.predict_label(&sample.input)? == sample.label.class_index() {
                correct += 1;
            }
        }
        Ok(correct as f32 / test.len() as f32)
    }

    /// Confusion matrix, accuracy and per-class precision/recall over `test`.
    pub fn evaluate(&mut self, test: &[Sample]) -> Result<Evaluation, KPoolsError> {
        let mut confusion = ConfusionMatrix::new(self.store.score_len());
        for sample in test {
            let predicted = self.predict_label(&sample.input)?;
            confusion.add(sample.label.class_index(), predicted);
        }
        Ok(Evaluation::from_confusion(confusion))
    }

    /// Stop the workers. Later predictions fail with [`LifecycleError::Released`].
    ///
    /// Returns [`LifecycleError::AlreadyReleased`] on a second call without
    /// touching the engine again.
    pub fn release(&mut self) -> Result<(), LifecycleError> {
        if !self.engine.shutdown() {
            return Err(LifecycleError::AlreadyReleased);
        }
        tracing::info!("Released ensemble with {} pools", self.pools.len());
        Ok(())
    }
}

impl Drop for Ensemble {
    fn drop(&mut self) {
        self.engine.shutdown();
    }
}
