//! Aggregation policies for per-fold results.

use crate::error::MlError;
use serde::{Deserialize, Serialize};

/// A per-fold result that carries a scalar score.
pub trait Scored {
    fn score(&self) -> f64;
}

impl Scored for f64 {
    fn score(&self) -> f64 {
        *self
    }
}

/// How per-fold results are combined into one result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregator {
    /// Arithmetic mean of the per-fold scores.
    #[default]
    Mean,
    /// Per-fold results, verbatim and in fold order.
    Identity,
    /// Both the mean and the verbatim list.
    MeanAndList,
}

/// Output of an [`Aggregator`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "policy", content = "value", rename_all = "snake_case")]
pub enum Aggregated<T> {
    Mean(f64),
    Identity(Vec<T>),
    MeanAndList { mean: f64, values: Vec<T> },
}

impl Aggregator {
    pub fn aggregate<T: Scored>(self, values: Vec<T>) -> Result<Aggregated<T>, MlError> {
        match self {
            Self::Mean => Ok(Aggregated::Mean(mean_score(&values)?)),
            Self::Identity => Ok(Aggregated::Identity(values)),
            Self::MeanAndList => Ok(Aggregated::MeanAndList {
                mean: mean_score(&values)?,
                values,
            }),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mean => "mean",
            Self::Identity => "identity",
            Self::MeanAndList => "mean_and_list",
        }
    }
}

impl std::str::FromStr for Aggregator {
    type Err = MlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mean" => Ok(Self::Mean),
            "identity" => Ok(Self::Identity),
            "mean_and_list" => Ok(Self::MeanAndList),
            other => Err(MlError::invalid_input(format!(
                "unknown aggregator '{other}' (expected mean, identity or mean_and_list)"
            ))),
        }
    }
}

impl<T: Scored> Aggregated<T> {
    /// The mean score, computing it from the list for the identity policy.
    pub fn mean(&self) -> Option<f64> {
        match self {
            Self::Mean(m) | Self::MeanAndList { mean: m, .. } => Some(*m),
            Self::Identity(values) => mean_score(values).ok(),
        }
    }

    /// The verbatim per-fold values, when the policy kept them.
    pub fn values(&self) -> Option<&[T]> {
        match self {
            Self::Mean(_) => None,
            Self::Identity(values) | Self::MeanAndList { values, .. } => Some(values),
        }
    }
}

fn mean_score<T: Scored>(values: &[T]) -> Result<f64, MlError> {
    if values.is_empty() {
        return Err(MlError::evaluation("cannot average an empty set of fold results"));
    }
    Ok(values.iter().map(Scored::score).sum::<f64>() / values.len() as f64)
}
