//! Scoring metrics: AUROC and summary statistics over fold scores.

use crate::error::MlError;
use serde::{Deserialize, Serialize};

/// Area under the ROC curve for boolean labels and continuous decision scores.
///
/// Computed as the normalised Mann-Whitney rank statistic; tied scores count
/// one half. Always in `[0, 1]`.
pub fn roc_auc(labels: &[bool], scores: &[f64]) -> Result<f64, MlError> {
    if labels.len() != scores.len() {
        return Err(MlError::evaluation(format!(
            "{} labels but {} scores",
            labels.len(),
            scores.len()
        )));
    }
    if scores.iter().any(|s| s.is_nan()) {
        return Err(MlError::evaluation("decision scores contain NaN"));
    }
    let n = labels.len();
    let n_pos = labels.iter().filter(|l| **l).count();
    let n_neg = n - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return Err(MlError::evaluation(format!(
            "AUROC needs both classes, got {n_pos} positive and {n_neg} negative"
        )));
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    // Sum of 1-based ascending ranks of the positives, ties averaged.
    let mut rank_sum_pos = 0.0f64;
    let mut i = 0;
    while i < n {
        let mut j = i + 1;
        while j < n && scores[order[j]] == scores[order[i]] {
            j += 1;
        }
        let avg_rank = (i + 1 + j) as f64 / 2.0;
        let pos_in_group = order[i..j].iter().filter(|&&idx| labels[idx]).count();
        rank_sum_pos += avg_rank * pos_in_group as f64;
        i = j;
    }

    let n_pos = n_pos as f64;
    let u = rank_sum_pos - n_pos * (n_pos + 1.0) / 2.0;
    Ok((u / (n_pos * n_neg as f64)).clamp(0.0, 1.0))
}

/// Summary statistics over per-fold scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreSummary {
    pub count: usize,
    pub mean: f64,
    /// Population standard deviation.
    pub std: f64,
    pub min: f64,
    pub max: f64,
    pub metric_name: String,
}

impl ScoreSummary {
    pub fn from_scores(scores: &[f64], metric_name: &str) -> Result<Self, MlError> {
        if scores.is_empty() {
            return Err(MlError::evaluation("no scores to summarise"));
        }
        let count = scores.len();
        let mean = scores.iter().sum::<f64>() / count as f64;
        let variance = scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / count as f64;
        Ok(Self {
            count,
            mean,
            std: variance.sqrt(),
            min: scores.iter().copied().fold(f64::INFINITY, f64::min),
            max: scores.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            metric_name: metric_name.to_string(),
        })
    }
}
