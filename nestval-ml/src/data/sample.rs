//! Sample sets: feature rows paired with labels.

use crate::error::MlError;
use serde::{Deserialize, Serialize};

/// Multi-class source data: feature rows with integer class ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledDataset {
    features: Vec<Vec<f64>>,
    classes: Vec<u32>,
}

impl LabeledDataset {
    pub fn new(features: Vec<Vec<f64>>, classes: Vec<u32>) -> Result<Self, MlError> {
        check_rows(&features, classes.len())?;
        Ok(Self { features, classes })
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn features(&self) -> &[Vec<f64>] {
        &self.features
    }

    pub fn classes(&self) -> &[u32] {
        &self.classes
    }

    /// Dimensionality of each row (0 for an empty dataset).
    pub fn n_features(&self) -> usize {
        self.features.first().map_or(0, Vec::len)
    }

    /// Indices of all rows belonging to `class`, in dataset order.
    pub fn indices_of(&self, class: u32) -> Vec<usize> {
        self.classes
            .iter()
            .enumerate()
            .filter(|(_, c)| **c == class)
            .map(|(i, _)| i)
            .collect()
    }

    /// Distinct class ids, ascending.
    pub fn distinct_classes(&self) -> Vec<u32> {
        let mut classes = self.classes.clone();
        classes.sort_unstable();
        classes.dedup();
        classes
    }
}

/// Binary-labeled sample set.
///
/// Invariant: `features.len() == labels.len()` and every row has the same
/// dimensionality.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleSet {
    features: Vec<Vec<f64>>,
    labels: Vec<bool>,
}

impl SampleSet {
    pub fn new(features: Vec<Vec<f64>>, labels: Vec<bool>) -> Result<Self, MlError> {
        check_rows(&features, labels.len())?;
        Ok(Self { features, labels })
    }

    pub fn empty() -> Self {
        Self {
            features: Vec::new(),
            labels: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn features(&self) -> &[Vec<f64>] {
        &self.features
    }

    pub fn labels(&self) -> &[bool] {
        &self.labels
    }

    pub fn n_features(&self) -> usize {
        self.features.first().map_or(0, Vec::len)
    }

    pub fn n_positive(&self) -> usize {
        self.labels.iter().filter(|l| **l).count()
    }

    pub fn n_negative(&self) -> usize {
        self.len() - self.n_positive()
    }

    /// Gather the rows at `indices`, in the given order.
    ///
    /// # Panics
    ///
    /// Panics if any index is out of range. Fold partitions produced for this
    /// sample set always satisfy that.
    pub fn subset(&self, indices: &[usize]) -> Self {
        Self {
            features: indices.iter().map(|&i| self.features[i].clone()).collect(),
            labels: indices.iter().map(|&i| self.labels[i]).collect(),
        }
    }
}

fn check_rows(features: &[Vec<f64>], n_labels: usize) -> Result<(), MlError> {
    if features.len() != n_labels {
        return Err(MlError::dataset(format!(
            "{} feature rows but {} labels",
            features.len(),
            n_labels
        )));
    }
    if let Some(first) = features.first() {
        let width = first.len();
        if let Some((row, bad)) = features.iter().enumerate().find(|(_, r)| r.len() != width) {
            return Err(MlError::dataset(format!(
                "row {row} has {} features, expected {width}",
                bad.len()
            )));
        }
    }
    Ok(())
}
