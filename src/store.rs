//! Immutable training sample storage.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Label attached to a training sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Label {
    /// Dense class id.
    Class(usize),
    /// Real-valued target vector (regression or pre-encoded soft target).
    Values(Vec<f32>),
}

impl Label {
    /// Class id for class labels, argmax of the target for value labels.
    pub fn class_index(&self) -> usize {
        match self {
            Label::Class(class) => *class,
            Label::Values(values) => argmax(values),
        }
    }
}

/// One labeled input vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub input: Vec<f32>,
    pub label: Label,
}

impl Sample {
    /// Convenience constructor for a class-labeled sample.
    pub fn class(input: Vec<f32>, class: usize) -> Self {
        Self {
            input,
            label: Label::Class(class),
        }
    }

    /// Convenience constructor for a value-labeled sample.
    pub fn values(input: Vec<f32>, target: Vec<f32>) -> Self {
        Self {
            input,
            label: Label::Values(target),
        }
    }
}

/// Source of labeled samples in stable order.
///
/// Ingestion (CSV readers, augmentation) lives outside this crate; anything
/// that can hand over its samples in order can feed a [`SampleStore`].
pub trait SampleSource {
    fn into_samples(self) -> Vec<Sample>;
}

impl SampleSource for Vec<Sample> {
    fn into_samples(self) -> Vec<Sample> {
        self
    }
}

impl<const N: usize> SampleSource for [Sample; N] {
    fn into_samples(self) -> Vec<Sample> {
        self.into_iter().collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LabelKind {
    Class { classes: usize },
    Values { len: usize },
}

/// Read-only, validated collection of samples sharing one input length.
#[derive(Debug, Clone)]
pub struct SampleStore {
    samples: Vec<Sample>,
    input_len: usize,
    kind: LabelKind,
}

impl SampleStore {
    /// Validate and take ownership of `samples`.
    pub fn new(samples: Vec<Sample>) -> Result<Self, ConfigError> {
        let first = samples.first().ok_or(ConfigError::EmptyStore)?;
        let input_len = first.input.len();
        if input_len == 0 {
            return Err(ConfigError::EmptyInput);
        }
        let mut kind = match &first.label {
            Label::Class(_) => LabelKind::Class { classes: 0 },
            Label::Values(values) => LabelKind::Values { len: values.len() },
        };
        for (index, sample) in samples.iter().enumerate() {
            if sample.input.len() != input_len {
                return Err(ConfigError::InconsistentInput {
                    index,
                    expected: input_len,
                    actual: sample.input.len(),
                });
            }
            match (&mut kind, &sample.label) {
                (LabelKind::Class { classes }, Label::Class(class)) => {
                    *classes = (*classes).max(class + 1);
                }
                (LabelKind::Values { len }, Label::Values(values)) => {
                    if values.len() != *len {
                        return Err(ConfigError::InconsistentTarget {
                            index,
                            expected: *len,
                            actual: values.len(),
                        });
                    }
                }
                _ => return Err(ConfigError::MixedLabels { index }),
            }
        }
        Ok(Self {
            samples,
            input_len,
            kind,
        })
    }

    /// Drain a [`SampleSource`] into a validated store.
    pub fn from_source(source: impl SampleSource) -> Result<Self, ConfigError> {
        Self::new(source.into_samples())
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Input vector length `D` shared by every sample.
    pub fn input_len(&self) -> usize {
        self.input_len
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn sample(&self, index: usize) -> &Sample {
        &self.samples[index]
    }

    pub fn input(&self, index: usize) -> &[f32] {
        &self.samples[index].input
    }

    /// True when every sample carries a class label.
    pub fn has_class_labels(&self) -> bool {
        matches!(self.kind, LabelKind::Class { .. })
    }

    /// Class id of sample `index`, if the store holds class labels.
    pub fn class_of(&self, index: usize) -> Option<usize> {
        match self.samples[index].label {
            Label::Class(class) => Some(class),
            Label::Values(_) => None,
        }
    }

    /// Width of soft-output vectors: class count or target length.
    pub fn score_len(&self) -> usize {
        match self.kind {
            LabelKind::Class { classes } => classes,
            LabelKind::Values { len } => len,
        }
    }

    /// Add sample `index`'s target row into `out`, scaled by `weight`.
    ///
    /// Class labels contribute a one-hot row.
    pub fn accumulate_target(&self, index: usize, weight: f32, out: &mut [f32]) {
        match &self.samples[index].label {
            Label::Class(class) => {
                if let Some(slot) = out.get_mut(*class) {
                    *slot += weight;
                }
            }
            Label::Values(values) => {
                for (slot, value) in out.iter_mut().zip(values) {
                    *slot += value * weight;
                }
            }
        }
    }

    /// Sample indices grouped by class, in ascending class order.
    ///
    /// Empty for value-labeled stores.
    pub fn class_buckets(&self) -> BTreeMap<usize, Vec<usize>> {
        let mut buckets: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for (index, sample) in self.samples.iter().enumerate() {
            if let Label::Class(class) = sample.label {
                buckets.entry(class).or_default().push(index);
            }
        }
        buckets
    }

    /// Smallest class and its size, if the store holds class labels.
    pub fn min_class_size(&self) -> Option<(usize, usize)> {
        self.class_buckets()
            .into_iter()
            .map(|(class, members)| (class, members.len()))
            .min_by_key(|&(_, size)| size)
    }
}

/// Index of the largest value; ties go to the lowest index.
pub(crate) fn argmax(values: &[f32]) -> usize {
    let mut best_idx = 0usize;
    let mut best_val = f32::NEG_INFINITY;
    for (idx, &v) in values.iter().enumerate() {
        if v > best_val {
            best_val = v;
            best_idx = idx;
        }
    }
    best_idx
}
