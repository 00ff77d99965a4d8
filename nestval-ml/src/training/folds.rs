//! Fold partitioning: label strata and (repeated) stratified k-fold.

use crate::error::MlError;
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

/// One train/test split. Both index lists are sorted and disjoint, and
/// together cover `0..n` for the data they were generated for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoldPartition {
    pub repeat: usize,
    pub fold: usize,
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Group indices by label: the `false` group first, then the `true` group.
/// Empty groups are omitted.
pub fn strata_by_labels(labels: &[bool]) -> Vec<Vec<usize>> {
    let (positive, negative): (Vec<usize>, Vec<usize>) =
        (0..labels.len()).partition(|&i| labels[i]);
    [negative, positive]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect()
}

/// Stratified k-fold, optionally repeated with fresh shuffles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StratifiedKFold {
    pub num_folds: usize,
    /// Number of independent repetitions of the k-fold split.
    pub num_iter: usize,
}

impl Default for StratifiedKFold {
    fn default() -> Self {
        Self {
            num_folds: 5,
            num_iter: 1,
        }
    }
}

impl StratifiedKFold {
    pub fn new(num_folds: usize, num_iter: usize) -> Self {
        Self {
            num_folds,
            num_iter,
        }
    }

    /// Generate `num_iter` repetitions of `num_folds` partitions over `0..n`.
    ///
    /// Members of each stratum are shuffled and dealt round-robin into the
    /// folds; the dealing cursor carries over between strata so fold sizes
    /// differ by at most one. Indices outside every stratum are dealt last.
    pub fn generate<R: Rng + ?Sized>(
        &self,
        n: usize,
        strata: &[Vec<usize>],
        rng: &mut R,
    ) -> Result<Vec<Vec<FoldPartition>>, MlError> {
        self.validate(n)?;

        let mut in_stratum = vec![false; n];
        for &idx in strata.iter().flatten() {
            if idx >= n {
                return Err(MlError::invalid_input(format!(
                    "stratum index {idx} out of range for {n} samples"
                )));
            }
            if in_stratum[idx] {
                return Err(MlError::invalid_input(format!(
                    "index {idx} appears in more than one stratum"
                )));
            }
            in_stratum[idx] = true;
        }
        let unstratified: Vec<usize> = (0..n).filter(|&i| !in_stratum[i]).collect();

        let mut repeats = Vec::with_capacity(self.num_iter);
        for repeat in 0..self.num_iter {
            let mut fold_of = vec![0usize; n];
            let mut cursor = 0usize;
            for group in strata.iter().chain(std::iter::once(&unstratified)) {
                let mut members = group.clone();
                members.shuffle(rng);
                for idx in members {
                    fold_of[idx] = cursor % self.num_folds;
                    cursor += 1;
                }
            }

            let partitions = (0..self.num_folds)
                .map(|fold| {
                    let (test, train): (Vec<usize>, Vec<usize>) =
                        (0..n).partition(|&i| fold_of[i] == fold);
                    FoldPartition {
                        repeat,
                        fold,
                        train,
                        test,
                    }
                })
                .collect();
            repeats.push(partitions);
        }
        Ok(repeats)
    }

    /// Stratify by `labels` and flatten all repetitions, repeat-major.
    pub fn split_labels<R: Rng + ?Sized>(
        &self,
        labels: &[bool],
        rng: &mut R,
    ) -> Result<Vec<FoldPartition>, MlError> {
        let strata = strata_by_labels(labels);
        Ok(self
            .generate(labels.len(), &strata, rng)?
            .into_iter()
            .flatten()
            .collect())
    }

    fn validate(&self, n: usize) -> Result<(), MlError> {
        if self.num_folds < 2 {
            return Err(MlError::invalid_input(format!(
                "need at least 2 folds, got {}",
                self.num_folds
            )));
        }
        if self.num_folds > n {
            return Err(MlError::invalid_input(format!(
                "{} folds requested for only {n} samples",
                self.num_folds
            )));
        }
        if self.num_iter == 0 {
            return Err(MlError::invalid_input("num_iter must be at least 1"));
        }
        Ok(())
    }
}
