//! Classifiers used to score hyperparameter candidates.

pub mod svm;

pub use svm::{Svm, SvmModel, SvmParams};

use crate::data::SampleSet;
use crate::error::MlError;
use crate::training::sweep::HyperParams;

/// A fitted model that scores rows; larger means more likely `true`.
pub trait DecisionFunction {
    fn decision_function(&self, rows: &[Vec<f64>]) -> Vec<f64>;
}

/// Fits a model from a sample set and a hyperparameter point.
pub trait Classifier {
    type Model: DecisionFunction;

    fn fit(&self, data: &SampleSet, params: &HyperParams) -> Result<Self::Model, MlError>;
}

impl DecisionFunction for SvmModel {
    fn decision_function(&self, rows: &[Vec<f64>]) -> Vec<f64> {
        SvmModel::decision_function(self, rows)
    }
}

impl Classifier for Svm {
    type Model = SvmModel;

    fn fit(&self, data: &SampleSet, params: &HyperParams) -> Result<SvmModel, MlError> {
        Svm::fit(self, data, SvmParams::from_hyperparams(params)?)
    }
}
