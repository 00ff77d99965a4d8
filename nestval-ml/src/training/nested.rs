//! Nested cross-validation: an outer loop estimates the performance of the
//! whole tuning pipeline, an inner loop tunes hyperparameters on each outer
//! training partition.
//!
//! ```text
//! samples ──► outer stratified k-fold
//!               └─ per fold: train ──► inner repeated k-fold (fixed)
//!                                        └─ maximize(mean inner AUROC)
//!                            refit(best) on train ──► AUROC on test
//!          ──► aggregate(fold outcomes)
//! ```

use crate::algorithms::{Classifier, DecisionFunction, Svm};
use crate::config::NestedCvConfig;
use crate::data::SampleSet;
use crate::error::MlError;
use crate::training::aggregate::{Aggregated, Scored};
use crate::training::cross_validation::CrossValidation;
use crate::training::folds::{FoldPartition, StratifiedKFold};
use crate::training::metrics::roc_auc;
use crate::training::reproducibility::SeedManager;
use crate::training::sweep::{HyperParams, Trial, maximize};
use serde::{Deserialize, Serialize};

/// Result of one outer fold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoldOutcome {
    pub repeat: usize,
    pub fold: usize,
    /// AUROC of the refitted model on the outer test partition.
    pub score: f64,
    /// Hyperparameters chosen by the inner search.
    pub hyperparams: HyperParams,
    /// Cross-validated inner score of `hyperparams`.
    pub inner_optimum: f64,
    pub inner_evals: usize,
    pub n_train: usize,
    pub n_test: usize,
    /// Every candidate the inner search evaluated.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub call_log: Vec<Trial>,
}

impl Scored for FoldOutcome {
    fn score(&self) -> f64 {
        self.score
    }
}

/// Output of [`NestedEvaluator::evaluate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NestedCvResult {
    /// The outer aggregation policy applied to the fold outcomes.
    pub aggregated: Aggregated<FoldOutcome>,
    /// All fold outcomes in fold order, whatever the policy.
    pub folds: Vec<FoldOutcome>,
    pub seed: u64,
}

impl NestedCvResult {
    pub fn scores(&self) -> Vec<f64> {
        self.folds.iter().map(|f| f.score).collect()
    }

    pub fn mean_score(&self) -> Option<f64> {
        if self.folds.is_empty() {
            return None;
        }
        Some(self.folds.iter().map(|f| f.score).sum::<f64>() / self.folds.len() as f64)
    }
}

/// Runs nested cross-validation for a classifier.
#[derive(Debug, Clone)]
pub struct NestedEvaluator<C: Classifier = Svm> {
    config: NestedCvConfig,
    classifier: C,
}

impl NestedEvaluator<Svm> {
    pub fn new(config: NestedCvConfig) -> Result<Self, MlError> {
        Self::with_classifier(config, Svm::new())
    }
}

impl<C: Classifier> NestedEvaluator<C> {
    pub fn with_classifier(config: NestedCvConfig, classifier: C) -> Result<Self, MlError> {
        config.validate()?;
        Ok(Self { config, classifier })
    }

    pub fn config(&self) -> &NestedCvConfig {
        &self.config
    }

    /// Evaluate the full tune-then-refit pipeline on `data`.
    ///
    /// Deterministic for a given configuration: every random stream is
    /// derived from `config.seed`.
    pub fn evaluate(&self, data: &SampleSet) -> Result<NestedCvResult, MlError> {
        let mut seeds = SeedManager::new(self.config.seed);
        let outer = CrossValidation::new(
            StratifiedKFold::new(self.config.outer.num_folds, self.config.outer.num_iter),
            self.config.outer.aggregator,
        );

        tracing::info!(
            samples = data.len(),
            positives = data.n_positive(),
            outer_folds = outer.folds.num_folds,
            inner_folds = self.config.inner.num_folds,
            num_evals = self.config.search.num_evals,
            solver = self.config.search.solver.as_str(),
            aggregator = outer.aggregator.as_str(),
            "Starting nested cross-validation"
        );

        let mut outer_rng = seeds.rng("outer/folds");
        let folds = outer.collect(data, &mut outer_rng, |partition, train, test| {
            self.evaluate_fold(&mut seeds, partition, train, test)
        })?;
        let aggregated = outer.aggregator.aggregate(folds.clone())?;

        let result = NestedCvResult {
            aggregated,
            folds,
            seed: self.config.seed,
        };
        if let Some(mean) = result.mean_score() {
            tracing::info!(
                mean_auroc = mean,
                folds = result.folds.len(),
                "Nested cross-validation finished"
            );
        }
        Ok(result)
    }

    fn evaluate_fold(
        &self,
        seeds: &mut SeedManager,
        partition: &FoldPartition,
        train: &SampleSet,
        test: &SampleSet,
    ) -> Result<FoldOutcome, MlError> {
        let tag = format!("outer/{}/{}", partition.repeat, partition.fold);

        // Inner partitions are drawn once and shared by every candidate.
        let inner_folds =
            StratifiedKFold::new(self.config.inner.num_folds, self.config.inner.num_iter);
        let mut fold_rng = seeds.rng(&format!("{tag}/inner_folds"));
        let inner: Vec<(SampleSet, SampleSet)> = inner_folds
            .split_labels(train.labels(), &mut fold_rng)?
            .iter()
            .map(|p| (train.subset(&p.train), train.subset(&p.test)))
            .collect();

        let objective = |params: &HyperParams| -> Result<f64, MlError> {
            let mut total = 0.0;
            for (inner_train, inner_test) in &inner {
                total += self.fit_and_score(inner_train, inner_test, params)?;
            }
            Ok(total / inner.len() as f64)
        };

        let mut solver_rng = seeds.rng(&format!("{tag}/solver"));
        let outcome = maximize(
            objective,
            &self.config.space,
            &self.config.search,
            &mut solver_rng,
        )?;

        let score = self.fit_and_score(train, test, &outcome.best)?;
        tracing::info!(
            repeat = partition.repeat,
            fold = partition.fold,
            auroc = score,
            inner_optimum = outcome.info.optimum,
            hyperparams = ?outcome.best,
            "Outer fold evaluated"
        );

        Ok(FoldOutcome {
            repeat: partition.repeat,
            fold: partition.fold,
            score,
            hyperparams: outcome.best,
            inner_optimum: outcome.info.optimum,
            inner_evals: outcome.info.num_evals,
            n_train: train.len(),
            n_test: test.len(),
            call_log: outcome.info.call_log,
        })
    }

    fn fit_and_score(
        &self,
        train: &SampleSet,
        test: &SampleSet,
        params: &HyperParams,
    ) -> Result<f64, MlError> {
        let model = self.classifier.fit(train, params)?;
        let decisions = model.decision_function(test.features());
        roc_auc(test.labels(), &decisions)
    }
}
