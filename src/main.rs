//! Shift-DSS command-line entry point
//!
//! ```text
//! shift-dss run      [--input P] [--output P] [--json]
//! shift-dss decide   --orders N --ratio R --start HH:MM [--recalibrate] [--input P]
//! shift-dss hops     [--trajectories N] [--seed S]
//! shift-dss summary  [--processed P] [--input P] [--refresh]
//! shift-dss config   [--check P]
//! ```
//!
//! Logs go to stderr so JSON output on stdout stays machine-readable.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use shift_dss::dashboard::{self, DashboardSummary, RowsOrigin};
use shift_dss::etl::loader;
use shift_dss::invariants::report;
use shift_dss::{
    hops, CalibrationConfig, DecisionEvaluator, InvariantCalculator, Pipeline, ShiftQuery,
};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "shift-dss")]
#[command(about = "Delivery shift ETL, invariant recalibration and operate/do-not-operate advisory")]
#[command(version)]
struct CliArgs {
    /// Calibration file (overrides $SHIFT_DSS_CONFIG and ./calibration.toml)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: SubCommand,
}

#[derive(Subcommand, Debug)]
enum SubCommand {
    /// Run the ETL pipeline, export the processed file and print the invariants
    Run {
        /// Raw shift CSV (default: paths.raw)
        #[arg(long)]
        input: Option<PathBuf>,
        /// Processed CSV destination (default: paths.processed)
        #[arg(long)]
        output: Option<PathBuf>,
        /// Print the invariant set as JSON instead of the text report
        #[arg(long)]
        json: bool,
    },

    /// Evaluate a hypothetical shift
    Decide {
        /// Projected physical orders
        #[arg(long)]
        orders: u32,
        /// Observed optimization ratio
        #[arg(long)]
        ratio: f64,
        /// Projected start time (HH:MM)
        #[arg(long)]
        start: String,
        /// Recompute slope, intercept and sigma from the raw sample first
        #[arg(long)]
        recalibrate: bool,
        /// Raw shift CSV used by --recalibrate (default: paths.raw)
        #[arg(long, requires = "recalibrate")]
        input: Option<PathBuf>,
        #[arg(long)]
        json: bool,
    },

    /// Simulate hypothetical outcome trajectories and print them as JSON
    Hops {
        #[arg(long)]
        trajectories: Option<usize>,
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Print the dashboard data contract as JSON
    Summary {
        /// Processed CSV to read (default: paths.processed)
        #[arg(long)]
        processed: Option<PathBuf>,
        /// Raw shift CSV used when regenerating (default: paths.raw)
        #[arg(long)]
        input: Option<PathBuf>,
        /// Rerun the pipeline even if the processed file exists
        #[arg(long)]
        refresh: bool,
    },

    /// Print the effective calibration as TOML, or validate a file
    Config {
        #[arg(long, value_name = "PATH")]
        check: Option<PathBuf>,
    },
}

#[derive(Serialize)]
struct SummaryOutput {
    origin: RowsOrigin,
    summary: DashboardSummary,
}

// ============================================================================
// Commands
// ============================================================================

fn load_calibration(path: Option<&Path>) -> Result<CalibrationConfig> {
    match path {
        Some(p) => CalibrationConfig::load_from_file(p)
            .with_context(|| format!("loading calibration from {}", p.display())),
        None => Ok(CalibrationConfig::load()),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn cmd_run(
    calibration: CalibrationConfig,
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    json: bool,
) -> Result<()> {
    let raw = input.unwrap_or_else(|| calibration.paths.raw.clone());
    let processed = output.unwrap_or_else(|| calibration.paths.processed.clone());

    let run = Pipeline::standard(calibration)
        .run(&raw, &processed)
        .with_context(|| format!("pipeline failed for {}", raw.display()))?;

    if json {
        print_json(&run.invariants)
    } else {
        print!("{}", report::render(&run.invariants, run.exported_columns));
        Ok(())
    }
}

fn cmd_decide(
    calibration: &CalibrationConfig,
    query: &ShiftQuery,
    recalibrate: bool,
    input: Option<PathBuf>,
    json: bool,
) -> Result<()> {
    let evaluator = if recalibrate {
        let raw = input.unwrap_or_else(|| calibration.paths.raw.clone());
        let shifts = loader::load_raw_shifts(&raw)
            .with_context(|| format!("loading {}", raw.display()))?;
        let records = Pipeline::standard(calibration.clone()).transform(shifts)?;
        let invariants = InvariantCalculator::compute(&records)?;
        info!(shifts = invariants.n_total, "Model recalibrated from sample");
        DecisionEvaluator::recalibrated(calibration, &invariants)
    } else {
        DecisionEvaluator::new(calibration)
    };

    let decision = evaluator.evaluate(query)?;
    if json {
        return print_json(&decision);
    }

    let model = evaluator.model();
    println!("Decision:          {}", decision.verdict);
    println!("Reason:            {}", decision.reason);
    println!(
        "Window:            {}",
        if decision.peak_window { "PEAK" } else { "OFF-PEAK" }
    );
    println!(
        "Expected profit:   ${} (efficiency factor {})",
        report::group_thousands(decision.adjusted_profit),
        decision.efficiency_factor
    );
    println!(
        "Model:             y = {}x + ({}), sigma {}",
        model.order_slope, model.intercept, model.residual_sigma
    );
    Ok(())
}

fn cmd_hops(
    calibration: &CalibrationConfig,
    trajectories: Option<usize>,
    seed: Option<u64>,
) -> Result<()> {
    let mut config = calibration.hops;
    if let Some(n) = trajectories {
        config.trajectories = n;
    }
    if let Some(s) = seed {
        config.seed = s;
    }
    let simulation = hops::simulate(&calibration.model, &config)?;
    print_json(&simulation)
}

fn cmd_summary(
    calibration: CalibrationConfig,
    processed: Option<PathBuf>,
    input: Option<PathBuf>,
    refresh: bool,
) -> Result<()> {
    let processed = processed.unwrap_or_else(|| calibration.paths.processed.clone());
    let raw = input.unwrap_or_else(|| calibration.paths.raw.clone());
    let pipeline = Pipeline::standard(calibration);

    let loaded = dashboard::load_or_regenerate(&pipeline, &raw, &processed, refresh)
        .with_context(|| format!("no processed data available at {}", processed.display()))?;

    print_json(&SummaryOutput {
        origin: loaded.origin,
        summary: DashboardSummary::from_rows(&loaded.rows),
    })
}

fn cmd_config(calibration: &CalibrationConfig, check: Option<PathBuf>) -> Result<()> {
    match check {
        Some(path) => {
            CalibrationConfig::load_from_file(&path)
                .with_context(|| format!("{} is not a valid calibration", path.display()))?;
            println!("{}: OK", path.display());
        }
        None => print!("{}", calibration.to_toml()?),
    }
    Ok(())
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = CliArgs::parse();
    let calibration = load_calibration(args.config.as_deref())?;

    match args.command {
        SubCommand::Run {
            input,
            output,
            json,
        } => cmd_run(calibration, input, output, json),
        SubCommand::Decide {
            orders,
            ratio,
            start,
            recalibrate,
            input,
            json,
        } => {
            let query = ShiftQuery {
                orders,
                ratio,
                start_time: start,
            };
            cmd_decide(&calibration, &query, recalibrate, input, json)
        }
        SubCommand::Hops { trajectories, seed } => cmd_hops(&calibration, trajectories, seed),
        SubCommand::Summary {
            processed,
            input,
            refresh,
        } => cmd_summary(calibration, processed, input, refresh),
        SubCommand::Config { check } => cmd_config(&calibration, check),
    }
}
