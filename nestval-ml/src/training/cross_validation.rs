//! Generic cross-validated runner.
//!
//! Wraps a per-fold function `(train, test) -> T` and turns it into a
//! function of the whole sample set: partitions are drawn once, the function
//! is called for every partition in order, and the results are aggregated.

use crate::data::SampleSet;
use crate::error::MlError;
use crate::training::aggregate::{Aggregated, Aggregator, Scored};
use crate::training::folds::{FoldPartition, StratifiedKFold};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Stratified cross-validation followed by an aggregation policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossValidation {
    pub folds: StratifiedKFold,
    pub aggregator: Aggregator,
}

impl CrossValidation {
    pub fn new(folds: StratifiedKFold, aggregator: Aggregator) -> Self {
        Self { folds, aggregator }
    }

    /// Call `per_fold` for every partition (repeat-major, fold-minor) and
    /// return the raw results. The first error stops the loop.
    pub fn collect<R, T, F>(
        &self,
        data: &SampleSet,
        rng: &mut R,
        mut per_fold: F,
    ) -> Result<Vec<T>, MlError>
    where
        R: Rng + ?Sized,
        F: FnMut(&FoldPartition, &SampleSet, &SampleSet) -> Result<T, MlError>,
    {
        let partitions = self.folds.split_labels(data.labels(), rng)?;
        let mut results = Vec::with_capacity(partitions.len());
        for partition in &partitions {
            let train = data.subset(&partition.train);
            let test = data.subset(&partition.test);
            results.push(per_fold(partition, &train, &test)?);
        }
        Ok(results)
    }

    /// [`collect`](Self::collect), then reduce with the configured policy.
    pub fn run<R, T, F>(
        &self,
        data: &SampleSet,
        rng: &mut R,
        per_fold: F,
    ) -> Result<Aggregated<T>, MlError>
    where
        R: Rng + ?Sized,
        T: Scored,
        F: FnMut(&FoldPartition, &SampleSet, &SampleSet) -> Result<T, MlError>,
    {
        let results = self.collect(data, rng, per_fold)?;
        self.aggregator.aggregate(results)
    }
}
