//! Wine quality pipeline CLI
//!
//! One subcommand per pipeline entry point, each reading the YAML config.

use clap::{Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::config::{PipelineConfig, DEFAULT_CONFIG_PATH};
use crate::database::ResultStore;
use crate::evaluation::{run_evaluation, EvaluationReport};
use crate::preprocessing::{run_preprocessing, PreprocessSummary};
use crate::server::{run_server, ServerConfig};
use crate::tracking::open_tracker;
use crate::training::{run_training, TrainingSummary};

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString    { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn kv_line(key: &str, val: impl std::fmt::Display) {
    println!("  {:<18} {}", muted(key), val.to_string().white());
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "wine-quality")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Wine quality regression pipeline: prepare, train, evaluate and serve")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Clean the raw dataset, add engineered features and save it
    Preprocess {
        /// Configuration file
        #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,
    },

    /// Train a random forest on the prepared dataset and track the run
    Train {
        /// Configuration file
        #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,
    },

    /// Evaluate the most recent tracked model
    Evaluate {
        /// Configuration file
        #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,
    },

    /// Start the prediction server
    Serve {
        /// Configuration file
        #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,

        /// Server port (overrides the config)
        #[arg(short, long)]
        port: Option<u16>,

        /// Server host (overrides the config)
        #[arg(long)]
        host: Option<String>,
    },

    /// Preprocess, train and evaluate in one go
    Run {
        /// Configuration file
        #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,
    },

    /// Show stored training results
    Results {
        /// Configuration file
        #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,
    },

    /// List tracked runs, most recent first
    Runs {
        /// Configuration file
        #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,

        /// Maximum number of runs to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },
}

fn load(config_path: &Path) -> anyhow::Result<PipelineConfig> {
    Ok(PipelineConfig::from_file(config_path)?)
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_preprocess(config_path: &Path) -> anyhow::Result<()> {
    let config = load(config_path)?;
    section("Preprocess");
    let summary = preprocess_step(&config)?;
    print_preprocess(&summary);
    Ok(())
}

pub fn cmd_train(config_path: &Path) -> anyhow::Result<()> {
    let config = load(config_path)?;
    section("Train");
    let summary = train_step(&config)?;
    print_training(&summary);
    Ok(())
}

pub fn cmd_evaluate(config_path: &Path) -> anyhow::Result<()> {
    let config = load(config_path)?;
    section("Evaluate");
    let report = evaluate_step(&config)?;
    print_evaluation(&report);
    Ok(())
}

pub fn cmd_run(config_path: &Path) -> anyhow::Result<()> {
    let config = load(config_path)?;
    let start = Instant::now();

    section("Pipeline");
    let prepared = preprocess_step(&config)?;
    let trained = train_step(&config)?;
    let evaluated = evaluate_step(&config)?;

    print_preprocess(&prepared);
    print_training(&trained);
    print_evaluation(&evaluated);
    kv_line("Total time", format!("{:.2?}", start.elapsed()));
    println!();
    Ok(())
}

pub async fn cmd_serve(config_path: &Path, host: Option<String>, port: Option<u16>) -> anyhow::Result<()> {
    let config = load(config_path)?;
    let mut server_config = ServerConfig::from(&config);
    if let Some(host) = host {
        server_config.host = host;
    }
    if let Some(port) = port {
        server_config.port = port;
    }

    section("Serve");
    kv_line("Address", format!("http://{}:{}", server_config.host, server_config.port));
    kv_line("Tracking", &server_config.tracking.tracking_uri);
    println!();

    run_server(server_config).await
}

pub fn cmd_results(config_path: &Path) -> anyhow::Result<()> {
    let config = load(config_path)?;
    section("Stored results");

    let store = ResultStore::open(config.database.path.clone())?;
    let results = store.fetch_results();
    if results.is_empty() {
        println!("  {}", muted("no results stored"));
        println!();
        return Ok(());
    }

    println!(
        "  {:<6} {:<10} {:<10} {:<26} {}",
        muted("id"),
        muted("train R²"),
        muted("test R²"),
        muted("model"),
        muted("run")
    );
    for row in &results {
        println!(
            "  {:<6} {:<10.4} {:<10.4} {:<26} {}",
            row.id.map(|i| i.to_string()).unwrap_or_default(),
            row.accuracy,
            row.loss,
            row.model_name,
            row.run_id.as_deref().unwrap_or("-")
        );
    }
    println!();
    Ok(())
}

pub fn cmd_runs(config_path: &Path, limit: usize) -> anyhow::Result<()> {
    let config = load(config_path)?;
    section(&format!("Runs in experiment {}", config.tracking.experiment_id));

    let tracker = open_tracker(&config.tracking)?;
    let runs = tracker.search_runs()?;
    if runs.is_empty() {
        println!("  {}", muted("no runs tracked"));
    }
    for run in runs.iter().take(limit) {
        let status = match run.status {
            crate::tracking::RunStatus::Finished => run.status.to_string().green(),
            crate::tracking::RunStatus::Running => run.status.to_string().cyan(),
            _ => run.status.to_string().red(),
        };
        println!(
            "  {}  {:<11} {:<10} {}  {:>8}  {}",
            run.run_id.white(),
            run.run_name,
            status,
            dim(&run.start_time.format("%Y-%m-%d %H:%M:%S").to_string()),
            muted(&format!("{:.1}s", run.duration_secs())),
            if run.has_model() { accent("model") } else { dim("") }
        );
    }
    println!();
    Ok(())
}

// ─── Steps ─────────────────────────────────────────────────────────────────────

fn preprocess_step(config: &PipelineConfig) -> anyhow::Result<PreprocessSummary> {
    step_run(&format!("Preparing {}", config.data.raw_path.display()));
    let start = Instant::now();
    let summary = run_preprocessing(config)?;
    step_done(&format!("{:.2?}", start.elapsed()));
    Ok(summary)
}

fn train_step(config: &PipelineConfig) -> anyhow::Result<TrainingSummary> {
    step_run(&format!("Training {}", config.model.name.cyan()));
    let start = Instant::now();
    let summary = run_training(config)?;
    step_done(&format!("{:.2?}", start.elapsed()));
    Ok(summary)
}

fn evaluate_step(config: &PipelineConfig) -> anyhow::Result<EvaluationReport> {
    step_run("Evaluating latest model");
    let start = Instant::now();
    let report = run_evaluation(config)?;
    step_done(&format!("{:.2?}", start.elapsed()));
    Ok(report)
}

fn print_preprocess(summary: &PreprocessSummary) {
    println!();
    kv_line("Rows in", summary.rows_in);
    kv_line("Rows out", summary.rows_out);
    kv_line("Columns", summary.columns_out);
    kv_line("Saved to", summary.output_path.display());
}

fn print_training(summary: &TrainingSummary) {
    println!();
    kv_line("Run", &summary.run_id);
    kv_line("Train R²", format!("{:.4}", summary.train_score));
    kv_line("Test R²", format!("{:.4}", summary.test_score));
    kv_line("Rows", format!("{} train / {} test", summary.n_train, summary.n_test));
    kv_line("Stored", if summary.persisted { "yes" } else { "no" });
}

fn print_evaluation(report: &EvaluationReport) {
    println!();
    kv_line("Model run", &report.source_run_id);
    kv_line("Evaluation run", &report.evaluation_run_id);
    for (name, value) in report.metrics.as_pairs() {
        kv_line(name, format!("{:.4}", value));
    }
    for plot in &report.plots {
        kv_line("Plot", plot.display());
    }
    println!();
}
