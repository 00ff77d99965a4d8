//! Reporting for nested cross-validation results.

use crate::data::DataSourceInfo;
use crate::error::MlError;
use crate::training::aggregate::Aggregated;
use crate::training::metrics::ScoreSummary;
use crate::training::nested::{FoldOutcome, NestedCvResult};
use crate::training::reproducibility::EnvironmentSnapshot;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use uuid::Uuid;

/// Per-fold tuples unpacked into parallel columns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FoldColumns {
    pub scores: Vec<f64>,
    /// One column per hyperparameter, keyed by name.
    pub params: BTreeMap<String, Vec<f64>>,
    pub optima: Vec<f64>,
}

/// The serialized form of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub environment: EnvironmentSnapshot,
    /// Where the evaluated samples came from, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<DataSourceInfo>,
    pub summary: ScoreSummary,
    pub columns: FoldColumns,
    pub result: NestedCvResult,
}

/// Summaries and renderings of a [`NestedCvResult`].
#[derive(Debug, Clone)]
pub struct ResultReporter<'a> {
    result: &'a NestedCvResult,
    source: Option<&'a DataSourceInfo>,
    include_call_log: bool,
}

impl<'a> ResultReporter<'a> {
    pub fn new(result: &'a NestedCvResult) -> Self {
        Self {
            result,
            source: None,
            include_call_log: false,
        }
    }

    pub fn with_source(mut self, source: &'a DataSourceInfo) -> Self {
        self.source = Some(source);
        self
    }

    /// Keep the inner-search call logs in the JSON report.
    pub fn with_call_log(mut self, include: bool) -> Self {
        self.include_call_log = include;
        self
    }

    /// Mean, population standard deviation, min and max of the fold scores.
    pub fn summary(&self) -> Result<ScoreSummary, MlError> {
        ScoreSummary::from_scores(&self.result.scores(), "auroc")
    }

    pub fn unzip(&self) -> FoldColumns {
        let mut columns = FoldColumns::default();
        for fold in &self.result.folds {
            columns.scores.push(fold.score);
            columns.optima.push(fold.inner_optimum);
            for (name, value) in &fold.hyperparams {
                columns.params.entry(name.clone()).or_default().push(*value);
            }
        }
        columns
    }

    pub fn render_table(&self) -> Result<String, MlError> {
        let names: Vec<&String> = self
            .result
            .folds
            .first()
            .map(|f| f.hyperparams.keys().collect())
            .unwrap_or_default();

        let mut out = String::new();
        out.push_str(&format!("{:>6} {:>4} {:>8} {:>8}", "repeat", "fold", "auroc", "inner"));
        for name in &names {
            out.push_str(&format!(" {name:>10}"));
        }
        out.push_str(&format!(" {:>6}\n", "evals"));

        for fold in &self.result.folds {
            out.push_str(&format!(
                "{:>6} {:>4} {:>8.4} {:>8.4}",
                fold.repeat, fold.fold, fold.score, fold.inner_optimum
            ));
            for name in &names {
                match fold.hyperparams.get(*name) {
                    Some(value) => out.push_str(&format!(" {value:>10.4}")),
                    None => out.push_str(&format!(" {:>10}", "-")),
                }
            }
            out.push_str(&format!(" {:>6}\n", fold.inner_evals));
        }

        let summary = self.summary()?;
        out.push_str(&format!(
            "\n{}: mean {:.4} ± {:.4} (min {:.4}, max {:.4}) over {} folds\n",
            summary.metric_name, summary.mean, summary.std, summary.min, summary.max, summary.count
        ));
        Ok(out)
    }

    pub fn report(&self) -> Result<RunReport, MlError> {
        let mut result = self.result.clone();
        if !self.include_call_log {
            strip_call_logs(&mut result);
        }
        Ok(RunReport {
            run_id: Uuid::new_v4(),
            created_at: Utc::now(),
            environment: EnvironmentSnapshot::capture(),
            source: self.source.cloned(),
            summary: self.summary()?,
            columns: self.unzip(),
            result,
        })
    }

    pub fn to_json(&self) -> Result<String, MlError> {
        Ok(serde_json::to_string_pretty(&self.report()?)?)
    }

    pub fn write_json(&self, path: &Path) -> Result<(), MlError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_json()?)?;
        tracing::info!(path = %path.display(), "Wrote JSON report");
        Ok(())
    }
}

fn strip_call_logs(result: &mut NestedCvResult) {
    fn clear(folds: &mut [FoldOutcome]) {
        folds.iter_mut().for_each(|f| f.call_log.clear());
    }
    clear(&mut result.folds);
    match &mut result.aggregated {
        Aggregated::Identity(values) | Aggregated::MeanAndList { values, .. } => clear(values),
        Aggregated::Mean(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::sweep::{HyperParams, Trial};
    use pretty_assertions::assert_eq;

    fn outcome(fold: usize, score: f64, c: f64, optimum: f64) -> FoldOutcome {
        let hyperparams: HyperParams =
            [("C".to_string(), c), ("log_gamma".to_string(), -1.0)].into();
        FoldOutcome {
            repeat: 0,
            fold,
            score,
            hyperparams: hyperparams.clone(),
            inner_optimum: optimum,
            inner_evals: 1,
            n_train: 8,
            n_test: 2,
            call_log: vec![Trial {
                number: 0,
                params: hyperparams,
                value: optimum,
            }],
        }
    }

    fn result() -> NestedCvResult {
        let folds = vec![outcome(0, 0.75, 1.0, 0.9), outcome(1, 1.0, 3.0, 0.8)];
        NestedCvResult {
            aggregated: Aggregated::Identity(folds.clone()),
            folds,
            seed: 42,
        }
    }

    #[test]
    fn test_summary() {
        let result = result();
        let summary = ResultReporter::new(&result).summary().unwrap();
        assert_eq!(summary.count, 2);
        assert_eq!(summary.mean, 0.875);
        assert_eq!(summary.std, 0.125);
        assert_eq!(summary.min, 0.75);
        assert_eq!(summary.max, 1.0);
    }

    #[test]
    fn test_unzip() {
        let result = result();
        let columns = ResultReporter::new(&result).unzip();
        assert_eq!(columns.scores, vec![0.75, 1.0]);
        assert_eq!(columns.optima, vec![0.9, 0.8]);
        assert_eq!(columns.params["C"], vec![1.0, 3.0]);
        assert_eq!(columns.params["log_gamma"], vec![-1.0, -1.0]);
    }

    #[test]
    fn test_render_table() {
        let result = result();
        let table = ResultReporter::new(&result).render_table().unwrap();
        assert!(table.contains("auroc"));
        assert!(table.contains("log_gamma"));
        assert!(table.contains("0.7500"));
        assert!(table.contains("mean 0.8750"));
        assert_eq!(table.lines().count(), 5);
    }

    #[test]
    fn test_json_call_log_toggle() {
        let result = result();
        let without = ResultReporter::new(&result).to_json().unwrap();
        assert!(!without.contains("call_log"));
        assert!(without.contains("run_id"));

        let with = ResultReporter::new(&result).with_call_log(true).to_json().unwrap();
        let parsed: RunReport = serde_json::from_str(&with).unwrap();
        assert_eq!(parsed.result.folds[0].call_log.len(), 1);
        assert_eq!(parsed.summary.mean, 0.875);
    }

    #[test]
    fn test_write_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("report.json");
        let result = result();
        ResultReporter::new(&result).write_json(&path).unwrap();
        let parsed: RunReport =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed.result.seed, 42);
    }

    #[test]
    fn test_source_carried_into_report() {
        let result = result();
        let without = ResultReporter::new(&result).to_json().unwrap();
        assert!(!without.contains("\"source\""));

        let info = DataSourceInfo {
            source_type: "csv".into(),
            location: "digits.csv".into(),
            accessed_at: Utc::now(),
            row_count: Some(20),
        };
        let json = ResultReporter::new(&result).with_source(&info).to_json().unwrap();
        let parsed: RunReport = serde_json::from_str(&json).unwrap();
        let source = parsed.source.unwrap();
        assert_eq!(source.source_type, "csv");
        assert_eq!(source.location, "digits.csv");
        assert_eq!(source.row_count, Some(20));
    }

    #[test]
    fn test_empty_result_has_no_summary() {
        let empty = NestedCvResult {
            aggregated: Aggregated::Identity(Vec::new()),
            folds: Vec::new(),
            seed: 0,
        };
        assert!(ResultReporter::new(&empty).summary().is_err());
    }
}
