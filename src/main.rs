//! perf-visualizer CLI
//!
//! Charts, frontiers and reports for inference benchmark campaigns

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use perf_visualizer::{
    process_frontier, process_inline, process_peak, InlineResults, PeakResults, PipelineContext,
    PublishConfig, Publisher, VisualizerConfig,
};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "perf-visualizer")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Report a peak throughput campaign
    Peak {
        /// Peak results JSON
        #[arg(long, default_value = "peak_results.json")]
        json: PathBuf,

        /// Visualizer configuration (YAML)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output directory for charts and reports
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },

    /// Report a time-limited throughput campaign
    Inline {
        /// Inline results JSON
        #[arg(long, default_value = "inline_results.json")]
        json: PathBuf,

        /// Visualizer configuration (YAML)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output directory for reports
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },

    /// Merge local runs into one throughput/latency frontier
    Frontier {
        /// Runs as LABEL=DIR, where LABEL is numeric (e.g. output tokens)
        #[arg(long, value_parser = parse_run, num_args = 1.., required = true)]
        runs: Vec<(String, PathBuf)>,

        /// Chart title and frontier label
        #[arg(long, default_value = "throughput_vs_latency")]
        title: String,

        /// Relative latency tolerance
        #[arg(long)]
        tolerance: Option<f64>,

        /// Visualizer configuration (YAML)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output directory for the chart
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
}

fn parse_run(value: &str) -> Result<(String, PathBuf), String> {
    let (label, dir) = value
        .split_once('=')
        .ok_or_else(|| format!("expected LABEL=DIR, got '{value}'"))?;
    if label.trim().is_empty() || dir.is_empty() {
        return Err(format!("expected LABEL=DIR, got '{value}'"));
    }
    Ok((label.trim().to_string(), PathBuf::from(dir)))
}

fn load_config(path: Option<&PathBuf>, output_dir: Option<PathBuf>) -> Result<VisualizerConfig> {
    let mut config = match path {
        Some(path) => VisualizerConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => VisualizerConfig::default(),
    };
    if let Some(dir) = output_dir {
        config.output_dir = dir;
    }
    Ok(config)
}

/// The only place that reads process environment
fn build_publisher(config: &VisualizerConfig) -> Result<Publisher> {
    let publish = config
        .publish
        .clone()
        .unwrap_or_else(|| PublishConfig::from_env_vars(|key| std::env::var(key).ok()));
    Ok(Publisher::from_config(&publish)?)
}

fn report_failure(publisher: &Publisher, error: &anyhow::Error, user: &str) -> ! {
    eprintln!("Failed to generate report: {error:#}");
    if let Err(e) = publisher.notify_failure(&format!("{error:#}"), user) {
        tracing::warn!(error = %e, "Failed to send failure message");
    }
    std::process::exit(1);
}

fn main() {
    let cli = Cli::parse();

    let fallback = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)),
        )
        .init();

    match cli.command {
        Commands::Peak {
            json,
            config,
            output_dir,
        } => {
            tracing::info!(json = %json.display(), "Processing peak results");
            let ctx = match context(config.as_ref(), output_dir) {
                Ok(ctx) => ctx,
                Err(e) => {
                    eprintln!("{e:#}");
                    std::process::exit(1);
                }
            };

            let results = match PeakResults::load(&json)
                .with_context(|| format!("Failed to load {}", json.display()))
            {
                Ok(results) => results,
                Err(e) => report_failure(ctx.publisher(), &e, ""),
            };

            match process_peak(&results, &ctx) {
                Ok(outcome) => {
                    println!(
                        "Generated report: {}",
                        outcome.files.html.display()
                    );
                    for frontier in &outcome.frontiers {
                        println!("  {}: {} points", frontier.label, frontier.points.len());
                    }
                    if let Some(url) = outcome.url {
                        println!("Uploaded: {url}");
                    }
                }
                Err(e) => report_failure(ctx.publisher(), &e, &results.config.user),
            }
        }
        Commands::Inline {
            json,
            config,
            output_dir,
        } => {
            tracing::info!(json = %json.display(), "Processing inline results");
            let ctx = match context(config.as_ref(), output_dir) {
                Ok(ctx) => ctx,
                Err(e) => {
                    eprintln!("{e:#}");
                    std::process::exit(1);
                }
            };

            let results = match InlineResults::load(&json)
                .with_context(|| format!("Failed to load {}", json.display()))
            {
                Ok(results) => results,
                Err(e) => report_failure(ctx.publisher(), &e, ""),
            };

            match process_inline(&results, &ctx) {
                Ok(outcome) => {
                    println!("Generated report: {}", outcome.files.html.display());
                    if let Some(url) = outcome.url {
                        println!("Uploaded: {url}");
                    }
                }
                Err(e) => report_failure(ctx.publisher(), &e, &results.config.user),
            }
        }
        Commands::Frontier {
            runs,
            title,
            tolerance,
            config,
            output_dir,
        } => {
            tracing::info!(runs = runs.len(), title = %title, "Merging runs");
            let mut config = match load_config(config.as_ref(), output_dir) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("{e:#}");
                    std::process::exit(1);
                }
            };
            if let Some(tolerance) = tolerance {
                config.tolerance = tolerance;
            }
            let ctx = PipelineContext::new(config, Publisher::disabled());

            match process_frontier(&runs, &title, &ctx) {
                Ok((frontier, chart)) => {
                    println!("Frontier: {}", frontier.label);
                    println!("{:>16} {:>16}", "latency (ms)", "tokens/s");
                    for point in &frontier.points {
                        println!("{:>16.1} {:>16.3}", point.latency, point.throughput);
                    }
                    println!("Chart: {}", chart.path.display());
                }
                Err(e) => {
                    eprintln!("Failed to merge runs: {e:#}");
                    std::process::exit(1);
                }
            }
        }
    }
}

fn context(config: Option<&PathBuf>, output_dir: Option<PathBuf>) -> Result<PipelineContext> {
    let config = load_config(config, output_dir)?;
    let publisher = build_publisher(&config)?;
    Ok(PipelineContext::new(config, publisher))
}
