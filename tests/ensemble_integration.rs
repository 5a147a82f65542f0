mod support;

use std::collections::HashSet;
use std::sync::Arc;

use kpools::config::load_config;
use kpools::pool::Pool;
use kpools::{
    Aggregation, ConfigError, Ensemble, EnsembleConfig, Execution, KPoolsError, LifecycleError,
    PoolLayout, Sample, SampleStore, SelectionStrategy,
};
use support::data::{brute_force_1nn, clusters, one_hot, two_blobs};
use support::env::WorkersEnvGuard;

fn store_of(samples: &[Sample]) -> Arc<SampleStore> {
    Arc::new(SampleStore::new(samples.to_vec()).expect("valid store"))
}

fn predictions(ensemble: &mut Ensemble, test: &[Sample]) -> Vec<kpools::Prediction> {
    test.iter()
        .map(|sample| ensemble.predict(&sample.input).expect("predict"))
        .collect()
}

#[test]
fn worker_count_does_not_change_predictions() {
    let train = clusters(3, 6, 20, 1);
    let test = clusters(3, 6, 5, 2);
    let store = store_of(&train);
    let modes = [
        (Aggregation::MajorityVote, 1),
        (Aggregation::MajorityVote, 4),
        (Aggregation::SoftAverage, 3),
    ];
    for (aggregation, neighbors) in modes {
        let base = EnsembleConfig::new(23, 2, SelectionStrategy::Stratified { per_class: 6 })
            .with_neighbors(neighbors)
            .with_aggregation(aggregation)
            .with_seed(99);
        let mut inline =
            Ensemble::new(Arc::clone(&store), base.clone().with_execution(Execution::Inline))
                .unwrap();
        let expected = predictions(&mut inline, &test);
        for workers in [1, 2, 5, 23] {
            let config = base
                .clone()
                .with_execution(Execution::Threaded { workers: Some(workers) });
            let mut threaded = Ensemble::new(Arc::clone(&store), config).unwrap();
            assert_eq!(threaded.pools(), inline.pools());
            assert_eq!(threaded.worker_count(), workers);
            assert_eq!(
                predictions(&mut threaded, &test),
                expected,
                "{aggregation:?} k={neighbors} workers={workers}"
            );
            threaded.release().unwrap();
        }
    }
}

#[test]
fn stratified_overdraw_is_a_config_error() {
    let train = clusters(3, 4, 10, 3);
    let config = EnsembleConfig::new(4, 2, SelectionStrategy::Stratified { per_class: 11 })
        .with_execution(Execution::Threaded { workers: Some(2) });
    let err = Ensemble::new(store_of(&train), config).err().expect("must fail");
    assert_eq!(
        err,
        KPoolsError::Config(ConfigError::ClassTooSmall {
            per_class: 11,
            min_class_size: 10,
            class: 0
        })
    );
}

#[test]
fn built_pools_hold_distinct_in_range_indices() {
    let train = clusters(2, 9, 15, 4);
    let config = EnsembleConfig::new(40, 4, SelectionStrategy::Uniform { references: 12 })
        .with_execution(Execution::Inline)
        .with_seed(4);
    let ensemble = Ensemble::new(store_of(&train), config).unwrap();
    assert_eq!(ensemble.pools().len(), 40);
    for pool in ensemble.pools() {
        let dims: HashSet<_> = pool.dimensions().iter().collect();
        let refs: HashSet<_> = pool.references().iter().collect();
        assert_eq!(dims.len(), 4);
        assert_eq!(refs.len(), 12);
        assert!(pool.dimensions().iter().all(|&d| d < 9));
        assert!(pool.references().iter().all(|&r| r < train.len()));
    }
}

#[test]
fn pool_order_does_not_change_votes() {
    let train = clusters(3, 5, 8, 5);
    let test = clusters(3, 5, 3, 6);
    let store = store_of(&train);
    let config = EnsembleConfig::new(15, 2, SelectionStrategy::Uniform { references: 10 })
        .with_execution(Execution::Inline)
        .with_seed(5);
    let mut built = Ensemble::new(Arc::clone(&store), config.clone()).unwrap();
    let mut layout = built.layout();
    layout.pools.reverse();
    let mut permuted = Ensemble::from_layout(Arc::clone(&store), layout, config).unwrap();
    for sample in &test {
        assert_eq!(
            built.vote_counts(&sample.input).unwrap(),
            permuted.vote_counts(&sample.input).unwrap()
        );
        assert_eq!(
            built.predict(&sample.input).unwrap(),
            permuted.predict(&sample.input).unwrap()
        );
    }
}

#[test]
fn exact_vote_tie_picks_lowest_label() {
    let train = vec![
        Sample::class(vec![0.0], 2),
        Sample::class(vec![10.0], 0),
        Sample::class(vec![20.0], 1),
    ];
    let store = store_of(&train);
    let pools = vec![
        Pool::new(vec![0], vec![0]),
        Pool::new(vec![0], vec![1]),
        Pool::new(vec![0], vec![0]),
        Pool::new(vec![0], vec![1]),
    ];
    let config = EnsembleConfig::new(4, 1, SelectionStrategy::Uniform { references: 1 })
        .with_execution(Execution::Threaded { workers: Some(3) });
    for order in [pools.clone(), pools.iter().rev().cloned().collect()] {
        let layout = PoolLayout::new(&store, None, order);
        let mut ensemble = Ensemble::from_layout(Arc::clone(&store), layout, config.clone()).unwrap();
        assert_eq!(ensemble.vote_counts(&[5.0]).unwrap(), vec![2, 0, 2]);
        assert_eq!(ensemble.predict_label(&[5.0]).unwrap(), 0);
    }
}

#[test]
fn pool_distance_uses_squared_euclidean() {
    let train = vec![
        Sample::class(vec![0.0, 0.0], 0),
        Sample::class(vec![3.0, 4.0], 1),
    ];
    let store = store_of(&train);
    let layout = PoolLayout::new(&store, None, vec![Pool::new(vec![0, 1], vec![0, 1])]);
    let config = EnsembleConfig::new(1, 2, SelectionStrategy::Uniform { references: 2 })
        .with_execution(Execution::Inline);
    let mut ensemble = Ensemble::from_layout(store, layout, config).unwrap();
    assert_eq!(ensemble.predict_label(&[1.0, 1.0]).unwrap(), 0);
}

#[test]
fn single_full_pool_matches_brute_force_1nn() {
    let train = two_blobs(40, 11);
    let test = two_blobs(40, 12);
    let baseline: Vec<usize> = test
        .iter()
        .map(|sample| brute_force_1nn(&train, &sample.input))
        .collect();
    let baseline_correct = baseline
        .iter()
        .zip(&test)
        .filter(|(predicted, sample)| **predicted == sample.label.class_index())
        .count();
    let baseline_fitness = baseline_correct as f32 / test.len() as f32;

    for execution in [Execution::Inline, Execution::Threaded { workers: Some(1) }] {
        let config = EnsembleConfig::new(1, 2, SelectionStrategy::Uniform { references: train.len() })
            .with_execution(execution)
            .with_seed(1);
        let mut ensemble = Ensemble::new(store_of(&train), config).unwrap();
        let labels: Vec<usize> = test
            .iter()
            .map(|sample| ensemble.predict_label(&sample.input).unwrap())
            .collect();
        assert_eq!(labels, baseline);
        assert_eq!(ensemble.fitness(&test).unwrap(), baseline_fitness);
    }
}

#[test]
fn release_makes_predict_fail_instead_of_hanging() {
    let train = clusters(2, 4, 10, 7);
    let config = EnsembleConfig::new(8, 2, SelectionStrategy::Stratified { per_class: 3 })
        .with_execution(Execution::Threaded { workers: Some(4) })
        .with_seed(7);
    let mut ensemble = Ensemble::new(store_of(&train), config).unwrap();
    ensemble.predict(&train[0].input).unwrap();
    ensemble.release().unwrap();
    assert_eq!(
        ensemble.predict(&train[0].input).unwrap_err(),
        KPoolsError::Lifecycle(LifecycleError::Released)
    );
    assert_eq!(ensemble.release(), Err(LifecycleError::AlreadyReleased));
}

#[test]
fn separable_clusters_are_learned() {
    let train = clusters(3, 6, 20, 8);
    let test = clusters(3, 6, 10, 9);
    let config = EnsembleConfig::new(32, 3, SelectionStrategy::Stratified { per_class: 8 })
        .with_execution(Execution::Threaded { workers: Some(4) })
        .with_seed(8);
    let mut ensemble = Ensemble::new(store_of(&train), config).unwrap();
    let evaluation = ensemble.evaluate(&test).unwrap();
    assert!(evaluation.accuracy >= 0.9, "accuracy {}", evaluation.accuracy);
    assert_eq!(evaluation.confusion.total(), test.len() as u64);
    assert_eq!(evaluation.per_class.len(), 3);
    assert_eq!(ensemble.fitness(&test).unwrap(), evaluation.accuracy);
}

#[test]
fn soft_average_over_one_hot_targets() {
    let train = one_hot(&clusters(3, 6, 20, 10), 3);
    let test = one_hot(&clusters(3, 6, 10, 11), 3);
    let config = EnsembleConfig::new(32, 3, SelectionStrategy::Uniform { references: 30 })
        .with_neighbors(3)
        .with_aggregation(Aggregation::SoftAverage)
        .with_execution(Execution::Threaded { workers: Some(3) })
        .with_seed(10);
    let mut ensemble = Ensemble::new(store_of(&train), config).unwrap();
    let prediction = ensemble.predict(&test[0].input).unwrap();
    let total: f32 = prediction.scores.iter().sum();
    assert!((total - 1.0).abs() < 1e-4);
    assert!(ensemble.fitness(&test).unwrap() >= 0.9);
}

#[test]
fn unset_worker_count_reads_environment() {
    let _env = WorkersEnvGuard::set("2");
    let train = clusters(2, 3, 6, 12);
    let config = EnsembleConfig::new(8, 2, SelectionStrategy::Uniform { references: 4 })
        .with_execution(Execution::Threaded { workers: None });
    let ensemble = Ensemble::new(store_of(&train), config).unwrap();
    assert_eq!(ensemble.worker_count(), 2);
}

#[test]
fn ensemble_from_toml_and_saved_layout() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("kpools.toml");
    std::fs::write(
        &config_path,
        r#"
pool_count = 12
dimensions_per_pool = 2
seed = 21

[selection]
mode = "stratified"
per_class = 4

[execution]
mode = "threaded"
workers = 3
"#,
    )
    .unwrap();
    let config = load_config(&config_path).unwrap();
    let train = clusters(2, 4, 10, 13);
    let store = store_of(&train);
    let mut ensemble = Ensemble::new(Arc::clone(&store), config.clone()).unwrap();
    assert_eq!(ensemble.seed(), Some(21));

    let layout_path = dir.path().join("layout.json");
    ensemble.layout().save_json(&layout_path).unwrap();
    let layout = PoolLayout::load_json(&layout_path).unwrap();
    let mut restored = Ensemble::from_layout(store, layout, config).unwrap();
    for sample in &train {
        assert_eq!(
            ensemble.predict(&sample.input).unwrap(),
            restored.predict(&sample.input).unwrap()
        );
    }
}

#[test]
fn logging_init_is_idempotent() {
    kpools::logging::init().unwrap();
    kpools::logging::init().unwrap();
}

#[test]
fn layout_from_another_store_is_rejected() {
    let source = clusters(2, 3, 5, 14);
    let other = clusters(2, 3, 3, 15);
    let config = EnsembleConfig::new(4, 2, SelectionStrategy::Uniform { references: 3 })
        .with_execution(Execution::Inline)
        .with_seed(14);
    let layout = Ensemble::new(store_of(&source), config.clone())
        .unwrap()
        .layout();
    let err = Ensemble::from_layout(store_of(&other), layout, config)
        .err()
        .expect("layout belongs to a different store");
    assert!(matches!(
        err,
        KPoolsError::Config(ConfigError::LayoutMismatch(_))
    ));
}
