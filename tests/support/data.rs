use kpools::Sample;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Two overlapping 2-D blobs: class 0 around (0, 0), class 1 around (2, 2).
pub fn two_blobs(per_class: usize, seed: u64) -> Vec<Sample> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut samples = Vec::with_capacity(per_class * 2);
    for i in 0..per_class * 2 {
        let class = i % 2;
        let center = if class == 0 { 0.0 } else { 2.0 };
        let x = center + rng.random_range(-1.5f32..1.5);
        let y = center + rng.random_range(-1.5f32..1.5);
        samples.push(Sample::class(vec![x, y], class));
    }
    samples
}

/// `classes` well-separated clusters in `dims` dimensions, with unequal class sizes.
pub fn clusters(classes: usize, dims: usize, base_count: usize, seed: u64) -> Vec<Sample> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut samples = Vec::new();
    for class in 0..classes {
        for _ in 0..base_count + class * 3 {
            let input = (0..dims)
                .map(|d| {
                    let center = if d % classes == class { 5.0 } else { 0.0 };
                    center + rng.random_range(-1.0f32..1.0)
                })
                .collect();
            samples.push(Sample::class(input, class));
        }
    }
    samples
}

/// Same inputs with one-hot value targets instead of class labels.
pub fn one_hot(samples: &[Sample], classes: usize) -> Vec<Sample> {
    samples
        .iter()
        .map(|sample| {
            let mut target = vec![0.0; classes];
            target[sample.label.class_index()] = 1.0;
            Sample::values(sample.input.clone(), target)
        })
        .collect()
}

/// Plain 1-nearest-neighbor over every sample and dimension.
///
/// Ties go to the lowest training index.
pub fn brute_force_1nn(train: &[Sample], query: &[f32]) -> usize {
    let mut best_idx = 0usize;
    let mut best_distance = f32::INFINITY;
    for (idx, sample) in train.iter().enumerate() {
        let mut distance = 0.0f32;
        for d in 0..query.len() {
            let diff = query[d] - sample.input[d];
            distance += diff * diff;
        }
        if distance < best_distance {
            best_distance = distance;
            best_idx = idx;
        }
    }
    train[best_idx].label.class_index()
}
