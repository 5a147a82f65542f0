//! Random-subspace nearest-neighbor ensembles ("k-pools").
//!
//! Many independent pools each see a random subset of input dimensions and a
//! random (optionally class-stratified) subset of training samples. Each pool
//! answers a query by nearest-neighbor lookup, and the ensemble combines the
//! pool answers by majority vote or by averaging soft scores. Pool evaluation
//! can run on a fixed set of worker threads spawned once per ensemble.
//!
//! ```no_run
//! use kpools::{Ensemble, EnsembleConfig, Sample, SelectionStrategy};
//!
//! let train = vec![
//!     Sample::class(vec![0.0, 0.0], 0),
//!     Sample::class(vec![1.0, 1.0], 1),
//! ];
//! let config = EnsembleConfig::new(8, 1, SelectionStrategy::Stratified { per_class: 1 })
//!     .with_seed(7);
//! let mut ensemble = Ensemble::from_samples(train, config)?;
//! let label = ensemble.predict_label(&[0.9, 0.8])?;
//! ensemble.release()?;
//! # let _ = label;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

/// Combining pool outputs into a prediction.
pub mod aggregate;
/// Ensemble configuration and TOML persistence.
pub mod config;
/// Inline and threaded pool execution.
pub mod engine;
/// Ensemble construction and prediction.
pub mod ensemble;
/// Error types.
pub mod error;
/// Pool layout JSON export.
pub mod layout;
/// Tracing subscriber setup.
pub mod logging;
/// Classification metrics.
pub mod metrics;
/// Pools, pool construction and evaluation.
pub mod pool;
/// Training sample storage.
pub mod store;

pub use aggregate::Prediction;
pub use config::{Aggregation, EnsembleConfig, Execution, SelectionStrategy};
pub use ensemble::Ensemble;
pub use error::{ConfigError, KPoolsError, LifecycleError, StateError};
pub use layout::PoolLayout;
pub use store::{Label, Sample, SampleSource, SampleStore};
