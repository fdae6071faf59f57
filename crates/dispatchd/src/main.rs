//! dispatchd — the dispatchgrid scenario runner.
//!
//! Assembles one scenario in a single process:
//! - Simulation server (calls, ground-truth inventory, scoring)
//! - Planner with the configured placement strategy
//! - Scenario controller driving the dispatch loop
//!
//! # Usage
//!
//! ```text
//! dispatchd init --path scenario.toml
//! dispatchd run --config scenario.toml --format json
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::bail;
use clap::{Parser, Subcommand};
use dispatch_core::{DispatchConfig, ScenarioMetrics};
use dispatchgrid_placement::Planner;
use dispatchgrid_scheduler::{Backend, RunSummary, ScenarioController};
use dispatchgrid_sim::Simulation;
use tracing::info;

#[derive(Parser)]
#[command(name = "dispatchd", about = "dispatchgrid scenario runner", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one scenario against the in-process simulation.
    Run {
        /// Scenario configuration file.
        #[arg(short, long, default_value = "scenario.toml")]
        config: PathBuf,

        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },
    /// Write a scaffolded scenario configuration.
    Init {
        #[arg(short, long, default_value = "scenario.toml")]
        path: PathBuf,

        /// Seed for the scaffolded scenario.
        #[arg(long, default_value = "default")]
        seed: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,dispatchd=debug,dispatchgrid=debug".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Run { config, format } => run_scenario(&config, &format).await,
        Command::Init { path, seed } => init_config(&path, &seed),
    }
}

async fn run_scenario(path: &Path, format: &str) -> anyhow::Result<()> {
    if !matches!(format, "text" | "json") {
        bail!("unknown output format '{format}' (expected text or json)");
    }

    let config = DispatchConfig::from_file(path)?;
    info!(path = ?path, locations = config.locations.len(), "configuration loaded");

    let simulation = Arc::new(Simulation::from_config(&config));
    let mut controller = ScenarioController::new(
        Backend::shared(simulation),
        Planner::new(config.planner.clone()),
    );

    controller.start(config.scenario.clone()).await?;

    // Ctrl-C halts the loop at the next call boundary; the run still stops cleanly.
    let stop = controller.stop_handle();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, halting dispatch loop");
            stop.request_stop();
        }
    });

    let summary = controller.run().await;
    interrupt.abort();
    let metrics = controller.stop().await?;
    let summary = summary?;

    print_report(format, &summary, &metrics)
}

fn print_report(
    format: &str,
    summary: &RunSummary,
    metrics: &ScenarioMetrics,
) -> anyhow::Result<()> {
    if format == "json" {
        let report = serde_json::json!({
            "summary": summary,
            "metrics": metrics,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "{}   {} or {}   {} {} {}",
            metrics.running_time_ms,
            metrics.request_count,
            metrics.http_requests,
            metrics.penalty,
            metrics.errors.missed,
            metrics.errors.over_dispatched,
        );
        println!(
            "{:?} after {} passes, dispatched {} over {} calls, {} calls pending",
            summary.termination,
            summary.passes,
            summary.dispatched_quantity,
            summary.completed_calls,
            summary.stranded_calls,
        );
    }
    Ok(())
}

fn init_config(path: &Path, seed: &str) -> anyhow::Result<()> {
    if path.exists() {
        bail!("{} already exists", path.display());
    }
    let config = DispatchConfig::scaffold(seed);
    std::fs::write(path, config.to_toml_string()?)?;
    println!("Wrote {}", path.display());
    Ok(())
}
