//! Evaluation machinery: folds, aggregation, search, metrics and the nested loop.

pub mod aggregate;
pub mod cross_validation;
pub mod folds;
pub mod metrics;
pub mod nested;
pub mod reproducibility;
pub mod solver;
pub mod sweep;

pub use aggregate::{Aggregated, Aggregator, Scored};
pub use cross_validation::CrossValidation;
pub use folds::{FoldPartition, StratifiedKFold, strata_by_labels};
pub use metrics::{ScoreSummary, roc_auc};
pub use nested::{FoldOutcome, NestedCvResult, NestedEvaluator};
pub use reproducibility::{EnvironmentSnapshot, SeedManager};
pub use solver::{GridSearch, ParticleSwarm, RandomSearch, Solver};
pub use sweep::{
    Bounds, HyperParams, SearchConfig, SearchInfo, SearchOutcome, SearchSpace, SolverKind, Trial,
    maximize,
};
