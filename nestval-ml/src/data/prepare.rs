//! Two-class sample preparation from a multi-class dataset.

use crate::data::sample::{LabeledDataset, SampleSet};
use crate::error::MlError;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Selects two classes, perturbs every feature with Gaussian noise and
/// assigns boolean labels (`true` for the positive class).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetPreparer {
    pub positive_class: u32,
    pub negative_class: u32,
    /// Standard deviation of the additive noise.
    pub noise_scale: f64,
}

impl DatasetPreparer {
    pub fn new(positive_class: u32, negative_class: u32, noise_scale: f64) -> Self {
        Self {
            positive_class,
            negative_class,
            noise_scale,
        }
    }

    /// Build the binary sample set. Rows of the positive class come first.
    ///
    /// A class that does not occur simply contributes no rows.
    pub fn prepare<R: Rng + ?Sized>(
        &self,
        dataset: &LabeledDataset,
        rng: &mut R,
    ) -> Result<SampleSet, MlError> {
        if self.positive_class == self.negative_class {
            return Err(MlError::invalid_input(format!(
                "positive and negative class are both {}",
                self.positive_class
            )));
        }
        if !self.noise_scale.is_finite() || self.noise_scale < 0.0 {
            return Err(MlError::invalid_input(format!(
                "noise scale must be a non-negative finite number, got {}",
                self.noise_scale
            )));
        }

        let positive = dataset.indices_of(self.positive_class);
        let negative = dataset.indices_of(self.negative_class);

        let mut features = Vec::with_capacity(positive.len() + negative.len());
        for &i in positive.iter().chain(negative.iter()) {
            features.push(add_gaussian_noise(
                &dataset.features()[i],
                self.noise_scale,
                rng,
            ));
        }

        let mut labels = vec![true; positive.len()];
        labels.extend(std::iter::repeat_n(false, negative.len()));

        tracing::debug!(
            positive = positive.len(),
            negative = negative.len(),
            noise = self.noise_scale,
            "Prepared binary sample set"
        );
        SampleSet::new(features, labels)
    }
}

/// Add `N(0, std_dev²)` noise to each value.
pub fn add_gaussian_noise<R: Rng + ?Sized>(values: &[f64], std_dev: f64, rng: &mut R) -> Vec<f64> {
    if std_dev == 0.0 {
        return values.to_vec();
    }
    values
        .iter()
        .map(|&x| x + standard_normal(rng) * std_dev)
        .collect()
}

/// One draw from the standard normal distribution (Box-Muller).
pub fn standard_normal<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    let u1: f64 = rng.gen_range(0.0..1.0_f64).max(1e-10);
    let u2: f64 = rng.gen_range(0.0..1.0_f64);
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}
