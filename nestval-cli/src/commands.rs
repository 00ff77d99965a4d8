//! Subcommand handlers.

use crate::{Commands, ConfigAction, RunArgs};
use anyhow::Context;
use nestval_ml::config::{load_config, to_toml};
use nestval_ml::training::{Aggregator, SolverKind};
use nestval_ml::{MlConfig, run_workflow};
use serde_json::{Map, Value, json};
use std::path::Path;

pub(crate) fn handle_command(
    command: Commands,
    workspace: &Path,
    config_file: Option<&Path>,
) -> anyhow::Result<()> {
    match command {
        Commands::Run(args) => handle_run(args, workspace, config_file),
        Commands::Config { action } => {
            handle_config(action.unwrap_or(ConfigAction::Show), workspace, config_file)
        }
    }
}

fn handle_run(args: RunArgs, workspace: &Path, config_file: Option<&Path>) -> anyhow::Result<()> {
    let overrides = run_overrides(&args)?;
    let config = load_config(Some(workspace), config_file, Some(&overrides))
        .context("Failed to load configuration")?;

    let run = run_workflow(&config).context("Nested cross-validation failed")?;

    let reporter = run.reporter().with_call_log(config.report.include_call_log);
    print!("{}", reporter.render_table()?);

    if let Some(path) = &config.report.json_path {
        reporter
            .write_json(path)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        tracing::info!(
            path = %path.display(),
            source = %run.source.location,
            folds = run.result.folds.len(),
            "Run report saved"
        );
        println!("Report written to {}", path.display());
    }
    Ok(())
}

fn handle_config(
    action: ConfigAction,
    workspace: &Path,
    config_file: Option<&Path>,
) -> anyhow::Result<()> {
    match action {
        ConfigAction::Init => {
            let config_dir = workspace.join(".nestval");
            std::fs::create_dir_all(&config_dir)?;

            let config_path = config_dir.join("config.toml");
            if config_path.exists() {
                println!(
                    "Configuration file already exists at: {}",
                    config_path.display()
                );
                return Ok(());
            }

            std::fs::write(&config_path, to_toml(&MlConfig::default())?)?;
            println!(
                "Created default configuration at: {}",
                config_path.display()
            );
            Ok(())
        }
        ConfigAction::Show => {
            let config = load_config(Some(workspace), config_file, None)
                .context("Failed to load config")?;
            println!("{}", to_toml(&config)?);
            Ok(())
        }
    }
}

/// Translate command-line flags into a partial configuration that is merged
/// on top of every other layer.
pub(crate) fn run_overrides(args: &RunArgs) -> anyhow::Result<Value> {
    let mut data = Map::new();
    if let Some(path) = &args.data {
        data.insert("source".into(), json!({ "type": "csv", "path": path }));
    }
    insert_opt(&mut data, "positive_class", args.positive);
    insert_opt(&mut data, "negative_class", args.negative);
    insert_opt(&mut data, "noise_scale", args.noise);

    let mut outer = Map::new();
    insert_opt(&mut outer, "num_folds", args.outer_folds);
    if let Some(aggregator) = &args.aggregator {
        let aggregator: Aggregator = aggregator.parse()?;
        outer.insert("aggregator".into(), json!(aggregator));
    }

    let mut inner = Map::new();
    insert_opt(&mut inner, "num_folds", args.inner_folds);
    insert_opt(&mut inner, "num_iter", args.inner_iter);

    let mut search = Map::new();
    insert_opt(&mut search, "num_evals", args.evals);
    if let Some(solver) = &args.solver {
        let solver: SolverKind = solver.parse()?;
        search.insert("solver".into(), json!(solver));
    }

    let mut nested = Map::new();
    insert_opt(&mut nested, "seed", args.seed);
    insert_section(&mut nested, "outer", outer);
    insert_section(&mut nested, "inner", inner);
    insert_section(&mut nested, "search", search);

    let mut report = Map::new();
    if let Some(path) = &args.json {
        report.insert("json_path".into(), json!(path));
    }
    if args.call_log {
        report.insert("include_call_log".into(), Value::Bool(true));
    }

    let mut root = Map::new();
    insert_section(&mut root, "data", data);
    insert_section(&mut root, "nested", nested);
    insert_section(&mut root, "report", report);
    Ok(Value::Object(root))
}

fn insert_opt<T: Into<Value>>(map: &mut Map<String, Value>, key: &str, value: Option<T>) {
    if let Some(value) = value {
        map.insert(key.to_string(), value.into());
    }
}

fn insert_section(map: &mut Map<String, Value>, key: &str, section: Map<String, Value>) {
    if !section.is_empty() {
        map.insert(key.to_string(), Value::Object(section));
    }
}
