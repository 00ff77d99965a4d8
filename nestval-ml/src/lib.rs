//! # nestval-ml: nested cross-validation for binary classifiers
//!
//! Estimates how well a *tuned* classifier generalises. An outer stratified
//! k-fold loop holds out test partitions; on every outer training partition
//! an inner repeated k-fold loop scores hyperparameter candidates proposed by
//! a bounded solver, the winner is refitted and scored once on the held-out
//! partition.
//!
//! The pipeline is `DatasetPreparer` → `NestedEvaluator` → `ResultReporter`;
//! [`run_workflow`] wires the three together from an [`MlConfig`].

pub mod algorithms;
pub mod config;
pub mod data;
pub mod error;
pub mod report;
pub mod training;

pub use algorithms::{Classifier, DecisionFunction, Svm, SvmModel, SvmParams};
pub use config::{MlConfig, NestedCvConfig, load_config};
pub use data::{DataSourceInfo, DatasetPreparer, LabeledDataset, SampleSet};
pub use error::MlError;
pub use report::{FoldColumns, ResultReporter, RunReport};
pub use training::{Aggregated, Aggregator, FoldOutcome, NestedCvResult, NestedEvaluator};

use training::reproducibility::SeedManager;

/// A finished run and the dataset it was evaluated on.
#[derive(Debug, Clone)]
pub struct WorkflowRun {
    pub source: DataSourceInfo,
    pub result: NestedCvResult,
}

impl WorkflowRun {
    pub fn reporter(&self) -> ResultReporter<'_> {
        ResultReporter::new(&self.result).with_source(&self.source)
    }
}

/// Load the configured dataset, build the binary task and run the nested
/// evaluation.
pub fn run_workflow(config: &MlConfig) -> Result<WorkflowRun, MlError> {
    let source = config.data.source().into_source();
    let mut info = source.source_info();
    tracing::info!(source = %info.source_type, location = %info.location, "Loading dataset");
    let dataset = source.load()?;
    info.row_count = Some(dataset.len());

    let preparer = DatasetPreparer {
        positive_class: config.data.positive_class,
        negative_class: config.data.negative_class,
        noise_scale: config.data.noise_scale,
    };
    let mut rng = SeedManager::new(config.nested.seed).rng("data/noise");
    let samples = preparer.prepare(&dataset, &mut rng)?;

    let result = NestedEvaluator::new(config.nested.clone())?.evaluate(&samples)?;
    Ok(WorkflowRun {
        source: info,
        result,
    })
}
