//! Error types for ensemble construction, prediction and persistence.

use std::path::PathBuf;

/// Invalid construction parameters or training data.
///
/// Raised synchronously before any pool or worker exists, so a failed
/// construction never leaves a partially built ensemble behind.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// The training store has no samples.
    #[error("Sample store is empty")]
    EmptyStore,
    /// Samples carry zero-length input vectors.
    #[error("Samples must have at least one input dimension")]
    EmptyInput,
    /// A sample's input length differs from the first sample's.
    #[error("Sample {index} has {actual} input dimensions, expected {expected}")]
    InconsistentInput {
        /// Offending sample index.
        index: usize,
        /// Input length of the first sample.
        expected: usize,
        /// Input length of the offending sample.
        actual: usize,
    },
    /// Class labels and value labels were mixed in one store.
    #[error("Sample {index} mixes class and value labels")]
    MixedLabels {
        /// Offending sample index.
        index: usize,
    },
    /// A value label's length differs from the first sample's.
    #[error("Sample {index} has a target of length {actual}, expected {expected}")]
    InconsistentTarget {
        /// Offending sample index.
        index: usize,
        /// Target length of the first sample.
        expected: usize,
        /// Target length of the offending sample.
        actual: usize,
    },
    /// `pool_count` was zero.
    #[error("Pool count must be at least 1")]
    ZeroPools,
    /// A threaded engine was requested with zero workers.
    #[error("Worker count must be at least 1")]
    ZeroWorkers,
    /// `dimensions_per_pool` was zero.
    #[error("Dimensions per pool must be at least 1")]
    ZeroDimensions,
    /// `dimensions_per_pool` exceeds the input length.
    #[error("Dimensions per pool ({requested}) exceeds input dimensions ({available})")]
    TooManyDimensions {
        /// Requested dimensions per pool.
        requested: usize,
        /// Input length of the store.
        available: usize,
    },
    /// The selection strategy yields zero references per pool.
    #[error("Pools must reference at least one sample")]
    ZeroReferences,
    /// Uniform selection asked for more references than there are samples.
    #[error("References per pool ({requested}) exceeds sample count ({available})")]
    TooManyReferences {
        /// Requested references per pool.
        requested: usize,
        /// Samples in the store.
        available: usize,
    },
    /// Stratified selection asked for more samples than the smallest class has.
    #[error(
        "Per-class count ({per_class}) exceeds the smallest class size ({min_class_size}, class {class})"
    )]
    ClassTooSmall {
        /// Requested samples per class.
        per_class: usize,
        /// Size of the smallest class.
        min_class_size: usize,
        /// Class id of the smallest class.
        class: usize,
    },
    /// `neighbors` was zero.
    #[error("Neighbor count must be at least 1")]
    ZeroNeighbors,
    /// `neighbors` exceeds the references held by each pool.
    #[error("Neighbor count ({neighbors}) exceeds references per pool ({references})")]
    TooManyNeighbors {
        /// Requested neighbor count.
        neighbors: usize,
        /// References per pool.
        references: usize,
    },
    /// The requested feature needs class labels but the store holds value labels.
    #[error("{feature} requires class labels")]
    RequiresClassLabels {
        /// Feature that needs class labels.
        feature: &'static str,
    },
    /// A restored layout does not fit the store it is applied to.
    #[error("Pool layout does not match the sample store: {0}")]
    LayoutMismatch(String),
}

/// Lifecycle misuse of an ensemble.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum LifecycleError {
    /// `predict` was called after `release`.
    #[error("Ensemble has been released")]
    Released,
    /// `release` was called a second time.
    #[error("Ensemble was already released")]
    AlreadyReleased,
}

/// Internal synchronization invariant violated. Never retried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateError {
    /// A worker's job channel closed before the request was delivered.
    #[error("Worker {worker} is no longer accepting requests")]
    WorkerUnavailable {
        /// Worker index.
        worker: usize,
    },
    /// Workers disconnected before every reply arrived.
    #[error("Only {received} of {expected} workers replied")]
    WorkerDisconnected {
        /// Replies received.
        received: usize,
        /// Replies expected.
        expected: usize,
    },
    /// A reply's range does not match the worker's assigned partition.
    #[error("Worker {worker} replied for an unexpected pool range")]
    RangeMismatch {
        /// Worker index.
        worker: usize,
    },
    /// A results slot was never written.
    #[error("No result was produced for pool {pool}")]
    MissingResult {
        /// Pool index.
        pool: usize,
    },
}

/// Top-level error returned by ensemble operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum KPoolsError {
    /// Invalid construction parameters.
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
    /// Lifecycle misuse.
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
    /// Internal synchronization failure.
    #[error("Engine state error: {0}")]
    State(#[from] StateError),
    /// The query vector has the wrong length.
    #[error("Query has {actual} dimensions, expected {expected}")]
    QueryDimension {
        /// Input length of the store.
        expected: usize,
        /// Query length.
        actual: usize,
    },
}

/// Errors reading or writing a TOML config file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigFileError {
    /// Failed to read a config file.
    #[error("Failed to read {path}: {source}")]
    Read {
        /// Path that failed to read.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },
    /// Failed to write a config file.
    #[error("Failed to write {path}: {source}")]
    Write {
        /// Path that failed to write.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },
    /// Failed to parse TOML config.
    #[error("Invalid config at {path}: {source}")]
    ParseToml {
        /// TOML file path.
        path: PathBuf,
        /// TOML parse error.
        source: toml::de::Error,
    },
    /// Failed to serialize config.
    #[error("Failed to serialize config: {0}")]
    SerializeToml(#[from] toml::ser::Error),
}

/// Errors reading or writing a JSON pool layout.
#[derive(Debug, thiserror::Error)]
pub enum LayoutError {
    /// Failed to read a layout file.
    #[error("Failed to read {path}: {source}")]
    Read {
        /// Path that failed to read.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },
    /// Failed to write a layout file.
    #[error("Failed to write {path}: {source}")]
    Write {
        /// Path that failed to write.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },
    /// Failed to parse or encode layout JSON.
    #[error("Invalid layout JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// The layout was written by an unsupported format version.
    #[error("Unsupported layout version {found} (expected {expected})")]
    Version {
        /// Version in the file.
        found: u32,
        /// Supported version.
        expected: u32,
    },
}
