//! Configuration for nestval.
//!
//! Uses `figment` for layered configuration: defaults -> user config ->
//! workspace config -> explicit file -> environment -> CLI overrides.
//! Configuration is loaded from `~/.config/nestval/config.toml` and/or
//! `.nestval/config.toml` in the workspace directory.

use crate::data::{DataSourceType, SyntheticBlobs};
use crate::error::MlError;
use crate::training::aggregate::Aggregator;
use crate::training::sweep::{Bounds, SearchConfig, SearchSpace};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MlConfig {
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub nested: NestedCvConfig,
    #[serde(default)]
    pub report: ReportConfig,
}

/// Where the samples come from and how the binary task is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataConfig {
    /// Explicit source; the synthetic blobs below are used when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<DataSourceType>,
    #[serde(default)]
    pub synthetic: SyntheticBlobs,
    #[serde(default = "default_positive_class")]
    pub positive_class: u32,
    #[serde(default = "default_negative_class")]
    pub negative_class: u32,
    /// Standard deviation of the noise added to every feature.
    #[serde(default = "default_noise_scale")]
    pub noise_scale: f64,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            source: None,
            synthetic: SyntheticBlobs::default(),
            positive_class: default_positive_class(),
            negative_class: default_negative_class(),
            noise_scale: default_noise_scale(),
        }
    }
}

impl DataConfig {
    pub fn source(&self) -> DataSourceType {
        self.source
            .clone()
            .unwrap_or_else(|| DataSourceType::Synthetic(self.synthetic.clone()))
    }
}

fn default_positive_class() -> u32 {
    8
}

fn default_negative_class() -> u32 {
    9
}

fn default_noise_scale() -> f64 {
    5.0
}

/// Settings for the whole nested evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NestedCvConfig {
    /// Global seed; every random stream of a run is derived from it.
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default)]
    pub outer: OuterCvConfig,
    #[serde(default)]
    pub inner: InnerCvConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default = "default_space")]
    pub space: SearchSpace,
}

impl Default for NestedCvConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            outer: OuterCvConfig::default(),
            inner: InnerCvConfig::default(),
            search: SearchConfig::default(),
            space: default_space(),
        }
    }
}

impl NestedCvConfig {
    pub fn validate(&self) -> Result<(), MlError> {
        if self.outer.num_folds < 2 || self.inner.num_folds < 2 {
            return Err(MlError::config(format!(
                "fold counts must be at least 2 (outer {}, inner {})",
                self.outer.num_folds, self.inner.num_folds
            )));
        }
        if self.outer.num_iter == 0 || self.inner.num_iter == 0 {
            return Err(MlError::config("num_iter must be at least 1"));
        }
        if self.search.num_evals == 0 {
            return Err(MlError::config("search.num_evals must be at least 1"));
        }
        if self.space.is_empty() {
            return Err(MlError::config("search space has no parameters"));
        }
        for (name, bounds) in self.space.iter() {
            Bounds::new(bounds.low, bounds.high)
                .map_err(|e| MlError::config(format!("parameter '{name}': {e}")))?;
        }
        Ok(())
    }
}

fn default_seed() -> u64 {
    42
}

/// `C` in `[0, 10]` and `log_gamma` in `[-5, 0]`.
fn default_space() -> SearchSpace {
    let mut space = SearchSpace::new();
    space.insert("C", Bounds { low: 0.0, high: 10.0 });
    space.insert("log_gamma", Bounds { low: -5.0, high: 0.0 });
    space
}

/// Outer evaluation loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OuterCvConfig {
    #[serde(default = "default_folds")]
    pub num_folds: usize,
    #[serde(default = "default_outer_iter")]
    pub num_iter: usize,
    #[serde(default)]
    pub aggregator: Aggregator,
}

impl Default for OuterCvConfig {
    fn default() -> Self {
        Self {
            num_folds: default_folds(),
            num_iter: default_outer_iter(),
            aggregator: Aggregator::default(),
        }
    }
}

/// Inner (tuning) loop, run on each outer training partition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InnerCvConfig {
    #[serde(default = "default_folds")]
    pub num_folds: usize,
    #[serde(default = "default_inner_iter")]
    pub num_iter: usize,
}

impl Default for InnerCvConfig {
    fn default() -> Self {
        Self {
            num_folds: default_folds(),
            num_iter: default_inner_iter(),
        }
    }
}

fn default_folds() -> usize {
    5
}

fn default_outer_iter() -> usize {
    1
}

fn default_inner_iter() -> usize {
    2
}

/// Report output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Also write the JSON report here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json_path: Option<PathBuf>,
    /// Include every inner-search trial in the JSON report.
    #[serde(default)]
    pub include_call_log: bool,
}

/// Load configuration from layered sources.
///
/// Priority (highest to lowest):
/// 1. Explicit overrides (passed as argument)
/// 2. Environment variables (prefixed with `NESTVAL_`)
/// 3. Explicit config file
/// 4. Workspace-local config (`.nestval/config.toml`)
/// 5. User config (`~/.config/nestval/config.toml`)
/// 6. Built-in defaults
pub fn load_config(
    workspace: Option<&Path>,
    config_file: Option<&Path>,
    overrides: Option<&serde_json::Value>,
) -> Result<MlConfig, MlError> {
    let mut figment = Figment::from(Serialized::defaults(MlConfig::default()));

    if let Some(path) = user_config_path() {
        if path.exists() {
            figment = figment.merge(Toml::file(&path));
        }
    }

    if let Some(ws) = workspace {
        let ws_config = ws.join(".nestval").join("config.toml");
        if ws_config.exists() {
            figment = figment.merge(Toml::file(&ws_config));
        }
    }

    if let Some(path) = config_file {
        if !path.exists() {
            return Err(MlError::config(format!(
                "config file {} does not exist",
                path.display()
            )));
        }
        figment = figment.merge(Toml::file(path));
    }

    // NESTVAL_NESTED__SEED, NESTVAL_DATA__NOISE_SCALE, ...
    figment = figment.merge(Env::prefixed("NESTVAL_").split("__"));

    if let Some(overrides) = overrides {
        figment = figment.merge(Serialized::defaults(overrides));
    }

    let config: MlConfig = figment.extract()?;
    config.nested.validate()?;
    Ok(config)
}

/// `~/.config/nestval/config.toml` (platform equivalent).
pub fn user_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("dev", "nestval", "nestval")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Render a configuration as TOML.
pub fn to_toml(config: &MlConfig) -> Result<String, MlError> {
    Ok(toml::to_string_pretty(config)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::sweep::SolverKind;

    #[test]
    fn test_default_config() {
        let config = MlConfig::default();
        assert_eq!(config.nested.seed, 42);
        assert_eq!(config.nested.outer.num_folds, 5);
        assert_eq!(config.nested.inner.num_iter, 2);
        assert_eq!(config.nested.search.num_evals, 100);
        assert_eq!(config.nested.search.solver, SolverKind::ParticleSwarm);
        assert_eq!(config.nested.space.len(), 2);
        assert_eq!(config.data.positive_class, 8);
        assert!(config.nested.validate().is_ok());
    }

    #[test]
    fn test_load_config_with_overrides() {
        let overrides = serde_json::json!({
            "nested": { "seed": 7, "search": { "num_evals": 3, "solver": "grid" } }
        });
        let config = load_config(None, None, Some(&overrides)).unwrap();
        assert_eq!(config.nested.seed, 7);
        assert_eq!(config.nested.search.num_evals, 3);
        assert_eq!(config.nested.search.solver, SolverKind::GridSearch);
        assert_eq!(config.nested.outer.num_folds, 5);
    }

    #[test]
    fn test_load_config_from_workspace() {
        let dir = tempfile::tempdir().unwrap();
        let config_dir = dir.path().join(".nestval");
        std::fs::create_dir_all(&config_dir).unwrap();
        std::fs::write(
            config_dir.join("config.toml"),
            r#"
[data]
noise_scale = 1.5

[nested.outer]
num_folds = 3
aggregator = "identity"

[nested.space]
C = { low = 0.5, high = 2.0 }
"#,
        )
        .unwrap();

        let config = load_config(Some(dir.path()), None, None).unwrap();
        assert_eq!(config.data.noise_scale, 1.5);
        assert_eq!(config.nested.outer.num_folds, 3);
        assert_eq!(config.nested.outer.aggregator, Aggregator::Identity);
        let c = config.nested.space.get("C").unwrap();
        assert_eq!((c.low, c.high), (0.5, 2.0));
    }

    #[test]
    fn test_explicit_file_and_validation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[nested.inner]\nnum_folds = 1\n").unwrap();
        assert!(matches!(
            load_config(None, Some(&path), None),
            Err(MlError::Config(_))
        ));
        assert!(load_config(None, Some(&dir.path().join("missing.toml")), None).is_err());

        let inverted = dir.path().join("inverted.toml");
        std::fs::write(&inverted, "[nested.space]\nC = { low = 3.0, high = 1.0 }\n").unwrap();
        assert!(load_config(None, Some(&inverted), None).is_err());
    }

    #[test]
    fn test_toml_rendering() {
        let rendered = to_toml(&MlConfig::default()).unwrap();
        assert!(rendered.contains("num_evals = 100"));
        assert!(rendered.contains("particle_swarm"));
    }
}
