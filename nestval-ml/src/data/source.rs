//! Data source abstraction for loading labeled datasets.

use crate::data::prepare::standard_normal;
use crate::data::sample::LabeledDataset;
use crate::error::MlError;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// The type of data source to load from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DataSourceType {
    Csv {
        path: PathBuf,
        #[serde(default = "default_delimiter")]
        delimiter: char,
    },
    Synthetic(SyntheticBlobs),
}

fn default_delimiter() -> char {
    ','
}

impl DataSourceType {
    /// Build the concrete source for this description.
    pub fn into_source(self) -> Box<dyn DataSource> {
        match self {
            Self::Csv { path, delimiter } => Box::new(CsvSource { path, delimiter }),
            Self::Synthetic(blobs) => Box::new(blobs),
        }
    }
}

/// Information about a data source, carried into the JSON report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSourceInfo {
    pub source_type: String,
    pub location: String,
    pub accessed_at: chrono::DateTime<chrono::Utc>,
    pub row_count: Option<usize>,
}

/// Trait for loading a labeled dataset.
pub trait DataSource {
    fn load(&self) -> Result<LabeledDataset, MlError>;

    /// Return metadata about this source.
    fn source_info(&self) -> DataSourceInfo;
}

// ---------------------------------------------------------------------------
// CsvSource
// ---------------------------------------------------------------------------

/// CSV file with a header row; the last column holds the integer class id,
/// every other column is a numeric feature.
pub struct CsvSource {
    pub path: PathBuf,
    pub delimiter: char,
}

impl CsvSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            delimiter: default_delimiter(),
        }
    }

    fn parse(&self, content: &str) -> Result<LabeledDataset, MlError> {
        let mut lines = content.lines();
        let columns: Vec<&str> = lines
            .next()
            .ok_or_else(|| MlError::dataset("Empty CSV file"))?
            .split(self.delimiter)
            .collect();
        if columns.len() < 2 {
            return Err(MlError::dataset(
                "CSV needs at least one feature column and a class column",
            ));
        }

        let mut features = Vec::new();
        let mut classes = Vec::new();
        for (line_no, line) in lines.enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let cells: Vec<&str> = line
                .split(self.delimiter)
                .map(|s| s.trim().trim_matches('"'))
                .collect();
            if cells.len() != columns.len() {
                return Err(MlError::dataset(format!(
                    "line {}: expected {} columns, found {}",
                    line_no + 2,
                    columns.len(),
                    cells.len()
                )));
            }
            let Some((class_cell, feature_cells)) = cells.split_last() else {
                continue;
            };
            let class = class_cell.parse::<u32>().map_err(|e| {
                MlError::dataset(format!("line {}: bad class '{class_cell}': {e}", line_no + 2))
            })?;
            let row = feature_cells
                .iter()
                .map(|c| {
                    c.parse::<f64>().map_err(|e| {
                        MlError::dataset(format!("line {}: bad feature '{c}': {e}", line_no + 2))
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            features.push(row);
            classes.push(class);
        }

        LabeledDataset::new(features, classes)
    }
}

impl DataSource for CsvSource {
    fn load(&self) -> Result<LabeledDataset, MlError> {
        let content = std::fs::read_to_string(&self.path)?;
        let dataset = self.parse(&content)?;
        tracing::info!(
            path = %self.path.display(),
            rows = dataset.len(),
            features = dataset.n_features(),
            "Loaded CSV dataset"
        );
        Ok(dataset)
    }

    fn source_info(&self) -> DataSourceInfo {
        DataSourceInfo {
            source_type: "csv".to_string(),
            location: self.path.display().to_string(),
            accessed_at: chrono::Utc::now(),
            row_count: None,
        }
    }
}

// ---------------------------------------------------------------------------
// SyntheticBlobs
// ---------------------------------------------------------------------------

/// Gaussian blobs: one isotropic cluster per class around a random centre.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntheticBlobs {
    #[serde(default = "default_n_classes")]
    pub n_classes: u32,
    #[serde(default = "default_samples_per_class")]
    pub samples_per_class: usize,
    #[serde(default = "default_n_features")]
    pub n_features: usize,
    /// Standard deviation of each cluster.
    #[serde(default = "default_spread")]
    pub spread: f64,
    /// Half-width of the box the class centres are drawn from.
    #[serde(default = "default_center_box")]
    pub center_box: f64,
    #[serde(default)]
    pub seed: u64,
}

impl Default for SyntheticBlobs {
    fn default() -> Self {
        Self {
            n_classes: default_n_classes(),
            samples_per_class: default_samples_per_class(),
            n_features: default_n_features(),
            spread: default_spread(),
            center_box: default_center_box(),
            seed: 0,
        }
    }
}

fn default_n_classes() -> u32 {
    10
}

fn default_samples_per_class() -> usize {
    50
}

fn default_n_features() -> usize {
    16
}

fn default_spread() -> f64 {
    4.0
}

fn default_center_box() -> f64 {
    8.0
}

impl DataSource for SyntheticBlobs {
    fn load(&self) -> Result<LabeledDataset, MlError> {
        if self.n_features == 0 {
            return Err(MlError::invalid_input("synthetic data needs at least one feature"));
        }
        if !self.spread.is_finite() || self.spread < 0.0 {
            return Err(MlError::invalid_input(format!(
                "spread must be non-negative, got {}",
                self.spread
            )));
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let half = self.center_box.abs();
        let mut features = Vec::with_capacity(self.n_classes as usize * self.samples_per_class);
        let mut classes = Vec::with_capacity(features.capacity());
        for class in 0..self.n_classes {
            let centre: Vec<f64> = (0..self.n_features)
                .map(|_| if half > 0.0 { rng.gen_range(-half..=half) } else { 0.0 })
                .collect();
            for _ in 0..self.samples_per_class {
                features.push(
                    centre
                        .iter()
                        .map(|c| c + standard_normal(&mut rng) * self.spread)
                        .collect(),
                );
                classes.push(class);
            }
        }
        LabeledDataset::new(features, classes)
    }

    fn source_info(&self) -> DataSourceInfo {
        DataSourceInfo {
            source_type: "synthetic".to_string(),
            location: format!(
                "blobs(classes={}, per_class={}, features={}, seed={})",
                self.n_classes, self.samples_per_class, self.n_features, self.seed
            ),
            accessed_at: chrono::Utc::now(),
            row_count: Some(self.n_classes as usize * self.samples_per_class),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_csv_load() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "f0,f1,class").unwrap();
        writeln!(file, "0.5,1.5,8").unwrap();
        writeln!(file, "\"2.0\",3.0,9").unwrap();
        writeln!(file).unwrap();

        let dataset = CsvSource::new(file.path()).load().unwrap();
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.classes(), &[8, 9]);
        assert_eq!(dataset.features()[1], vec![2.0, 3.0]);
    }

    #[test]
    fn test_csv_bad_cell() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "f0,class").unwrap();
        writeln!(file, "abc,1").unwrap();
        let err = CsvSource::new(file.path()).load().unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_csv_missing_file() {
        let err = CsvSource::new("/nonexistent/data.csv").load().unwrap_err();
        assert!(matches!(err, MlError::Io(_)));
    }

    #[test]
    fn test_synthetic_blobs_shape_and_determinism() {
        let blobs = SyntheticBlobs {
            n_classes: 3,
            samples_per_class: 4,
            n_features: 5,
            seed: 9,
            ..SyntheticBlobs::default()
        };
        let a = blobs.load().unwrap();
        let b = blobs.load().unwrap();
        assert_eq!(a.len(), 12);
        assert_eq!(a.n_features(), 5);
        assert_eq!(a.indices_of(2).len(), 4);
        assert_eq!(a, b);
    }

    #[test]
    fn test_source_type_from_json() {
        let json = r#"{"type": "synthetic", "n_classes": 2, "seed": 4}"#;
        let source: DataSourceType = serde_json::from_str(json).unwrap();
        let dataset = source.into_source().load().unwrap();
        assert_eq!(dataset.distinct_classes(), vec![0, 1]);
    }
}
