//! Marginalia - Entry Point

use clap::Parser;
use marginalia::config::{self, CliOverrides};
use marginalia::error::AppError;
use marginalia::scenario::Scenario;
use std::path::PathBuf;
use tracing::info;

/// Marginalia - lay out margin comments without overlaps
#[derive(Parser, Debug)]
#[command(name = "marginalia")]
#[command(version)]
#[command(about = "Solve a margin comment layout scenario and print card offsets as JSON")]
pub struct Args {
    /// Path to JSON scenario file (reads from stdin if not provided)
    pub scenario: Option<PathBuf>,

    /// Pin this comment id (overrides the scenario's pin)
    #[arg(long)]
    pub pin: Option<u64>,

    /// Path to configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Gap between stacked cards, in pixels
    #[arg(long, allow_negative_numbers = true)]
    pub gap: Option<f64>,

    /// Space kept free at the top of the page when nothing is pinned
    #[arg(long, allow_negative_numbers = true)]
    pub top_margin: Option<f64>,

    /// Shift applied to every anchor position
    #[arg(long, allow_negative_numbers = true)]
    pub offset: Option<f64>,

    /// Pretty-print the JSON output
    #[arg(long)]
    pub pretty: bool,
}

impl Args {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            gap: self.gap,
            top_margin: self.top_margin,
            offset: self.offset,
            // Only an explicit flag overrides the config file.
            pretty: self.pretty.then_some(true),
        }
    }
}

fn main() -> Result<(), AppError> {
    let args = Args::parse();

    // Defaults → Config File → Env Vars → CLI Args
    let config = {
        let config_file = config::load_config_with_precedence(args.config.clone())?;
        let merged = config::merge_config(config_file);
        let with_env = config::apply_env_overrides(merged);
        config::apply_cli_overrides(with_env, args.overrides())
    };

    marginalia::logging::init(&config.log_file_path)?;

    info!(config = ?config, "Configuration loaded and resolved");

    let scenario = match &args.scenario {
        Some(path) => Scenario::load(path)?,
        None => Scenario::read(std::io::stdin().lock())?,
    };

    let report = scenario.solve(config.layout_params(), args.pin);
    println!("{}", report.to_json(config.pretty)?);

    Ok(())
}
