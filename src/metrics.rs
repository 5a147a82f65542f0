//! Classification metrics for evaluating an ensemble on held-out samples.

#[derive(Debug, Clone, PartialEq, Eq)]
/// Confusion matrix for a `K`-class classifier.
pub struct ConfusionMatrix {
    /// Number of classes.
    pub n_classes: usize,
    /// Row-major `KxK` counts (`truth * K + predicted`).
    pub counts: Vec<u32>,
}

impl ConfusionMatrix {
    /// Create an empty `KxK` confusion matrix.
    pub fn new(n_classes: usize) -> Self {
        Self {
            n_classes,
            counts: vec![0; n_classes * n_classes],
        }
    }

    /// Record one outcome, growing the matrix if either class is new.
    pub fn add(&mut self, truth: usize, predicted: usize) {
        let needed = truth.max(predicted) + 1;
        if needed > self.n_classes {
            self.grow(needed);
        }
        let idx = truth * self.n_classes + predicted;
        self.counts[idx] = self.counts[idx].saturating_add(1);
    }

    pub fn get(&self, truth: usize, predicted: usize) -> u32 {
        self.counts[truth * self.n_classes + predicted]
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().map(|&c| c as u64).sum()
    }

    pub fn correct(&self) -> u64 {
        (0..self.n_classes).map(|k| self.get(k, k) as u64).sum()
    }

    fn grow(&mut self, n_classes: usize) {
        let mut counts = vec![0u32; n_classes * n_classes];
        for truth in 0..self.n_classes {
            for predicted in 0..self.n_classes {
                counts[truth * n_classes + predicted] = self.get(truth, predicted);
            }
        }
        self.n_classes = n_classes;
        self.counts = counts;
    }
}

#[derive(Debug, Clone, PartialEq)]
/// Precision/recall statistics for a single class.
pub struct PerClassStats {
    /// `TP / (TP + FP)`.
    pub precision: f32,
    /// `TP / (TP + FN)`.
    pub recall: f32,
    /// Total number of true examples for the class.
    pub support: u32,
}

/// Outcome of scoring an ensemble against labeled test samples.
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub confusion: ConfusionMatrix,
    pub accuracy: f32,
    pub per_class: Vec<PerClassStats>,
}

impl Evaluation {
    pub fn from_confusion(confusion: ConfusionMatrix) -> Self {
        Self {
            accuracy: accuracy(&confusion),
            per_class: precision_recall_by_class(&confusion),
            confusion,
        }
    }
}

/// Compute per-class precision and recall from a confusion matrix.
pub fn precision_recall_by_class(cm: &ConfusionMatrix) -> Vec<PerClassStats> {
    let k = cm.n_classes;
    (0..k)
        .map(|class_idx| {
            let tp = cm.get(class_idx, class_idx) as f32;
            let support: u32 = (0..k).map(|j| cm.get(class_idx, j)).sum();
            let predicted: u32 = (0..k).map(|i| cm.get(i, class_idx)).sum();
            let fn_ = support as f32 - tp;
            let fp = predicted as f32 - tp;
            PerClassStats {
                precision: ratio(tp, tp + fp),
                recall: ratio(tp, tp + fn_),
                support,
            }
        })
        .collect()
}

/// Fraction of outcomes on the diagonal; 0.0 for an empty matrix.
pub fn accuracy(cm: &ConfusionMatrix) -> f32 {
    ratio(cm.correct() as f32, cm.total() as f32)
}

fn ratio(num: f32, denom: f32) -> f32 {
    if denom == 0.0 { 0.0 } else { num / denom }
}
