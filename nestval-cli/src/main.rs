//! nestval CLI: nested cross-validation from the terminal.

mod commands;

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// nestval: estimate the performance of a tuned classifier with nested cross-validation
#[derive(Parser, Debug)]
#[command(name = "nestval", version, about, long_about = None)]
struct Cli {
    /// Workspace directory (looked up for `.nestval/config.toml`)
    #[arg(short, long, default_value = ".", global = true)]
    workspace: PathBuf,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
pub(crate) enum Commands {
    /// Run nested cross-validation and print the report
    Run(RunArgs),
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

#[derive(clap::Args, Debug, Default)]
pub(crate) struct RunArgs {
    /// CSV dataset (header row, last column is the class id)
    #[arg(long)]
    pub data: Option<PathBuf>,

    /// Class id labelled positive
    #[arg(long)]
    pub positive: Option<u32>,

    /// Class id labelled negative
    #[arg(long)]
    pub negative: Option<u32>,

    /// Standard deviation of the Gaussian noise added to every feature
    #[arg(long)]
    pub noise: Option<f64>,

    /// Number of outer folds
    #[arg(long)]
    pub outer_folds: Option<usize>,

    /// Number of inner folds
    #[arg(long)]
    pub inner_folds: Option<usize>,

    /// Repetitions of the inner k-fold split
    #[arg(long)]
    pub inner_iter: Option<usize>,

    /// Candidate evaluations per inner search
    #[arg(long)]
    pub evals: Option<usize>,

    /// Solver: particle_swarm, random, grid
    #[arg(long)]
    pub solver: Option<String>,

    /// Outer aggregation: mean, identity, mean_and_list
    #[arg(long)]
    pub aggregator: Option<String>,

    /// Global random seed
    #[arg(long)]
    pub seed: Option<u64>,

    /// Also write the JSON report to this path
    #[arg(long)]
    pub json: Option<PathBuf>,

    /// Include every inner-search trial in the JSON report
    #[arg(long)]
    pub call_log: bool,
}

#[derive(clap::Subcommand, Debug)]
pub(crate) enum ConfigAction {
    /// Create a default `.nestval/config.toml` in the workspace
    Init,
    /// Show the effective configuration (default)
    Show,
}

fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Set up tracing: human-readable stderr + JSON file logging
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::new(filter));

    let log_dir = directories::ProjectDirs::from("dev", "nestval", "nestval")
        .map(|d| d.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("."));
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = tracing_appender::rolling::daily(&log_dir, "nestval.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let workspace = cli
        .workspace
        .canonicalize()
        .unwrap_or_else(|_| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    tracing::info!(
        workspace = %workspace.display(),
        config = ?cli.config,
        "Resolved workspace"
    );

    commands::handle_command(cli.command, &workspace, cli.config.as_deref())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run_flags() {
        let cli = Cli::parse_from([
            "nestval",
            "-vv",
            "run",
            "--outer-folds",
            "3",
            "--solver",
            "grid",
            "--aggregator",
            "identity",
            "--json",
            "out.json",
        ]);
        assert_eq!(cli.verbose, 2);
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.outer_folds, Some(3));
        assert_eq!(args.solver.as_deref(), Some("grid"));
        assert_eq!(args.json, Some(PathBuf::from("out.json")));
        assert!(args.evals.is_none());
    }

    #[test]
    fn test_parse_config_without_action() {
        let cli = Cli::parse_from(["nestval", "-c", "cfg.toml", "config"]);
        assert_eq!(cli.config, Some(PathBuf::from("cfg.toml")));
        assert!(matches!(cli.command, Commands::Config { action: None }));
    }
}
