use anyhow::{Result, anyhow};
use chrono::Local;
use clap::{Parser, Subcommand};
use crowd_report::config::AnalysisConfig;
use crowd_report::pipeline;
use crowd_report::plot::TimelinePlot;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "crowd_report", version, about = "Timeline plots and detector evaluation for recorded crowd-monitoring logs")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// YAML file with analysis settings; flags below override it
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Record CSV written by the detector
    #[arg(long, global = true)]
    records: Option<PathBuf>,

    /// Video metadata JSON written by the detector
    #[arg(long, global = true)]
    metadata: Option<PathBuf>,

    /// Independently labelled record CSV; without it synthetic labels are used
    #[arg(long, global = true)]
    ground_truth: Option<PathBuf>,

    /// Seed for synthetic labels
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Where to write the timeline image
    #[arg(long, global = true)]
    plot_output: Option<PathBuf>,

    /// Directory for metrics.json and confusion-matrix images
    #[arg(long, global = true)]
    results_dir: Option<PathBuf>,

    /// Open the timeline in a window after saving it
    #[arg(long, global = true)]
    show: bool,
}

#[derive(Debug, Clone, Copy, Subcommand)]
enum Command {
    /// Draw crowd size, violations and flagged events over time
    Plot,
    /// Score each event category and write the results document
    Evaluate,
    /// Run both paths
    All,
}

impl Cli {
    fn resolve_config(&self) -> Result<AnalysisConfig> {
        let mut config = match &self.config {
            Some(path) => AnalysisConfig::load(path).map_err(|e| anyhow!("Failed to load config {}: {}", path.display(), e))?,
            None => AnalysisConfig::default(),
        };

        if let Some(p) = &self.records {
            config.records_path = p.clone();
        }
        if let Some(p) = &self.metadata {
            config.metadata_path = p.clone();
        }
        if let Some(p) = &self.ground_truth {
            config.ground_truth_path = Some(p.clone());
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(p) = &self.plot_output {
            config.plot_path = p.clone();
        }
        if let Some(p) = &self.results_dir {
            config.results_dir = p.clone();
        }
        config.plot.show |= self.show;
        Ok(config)
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("crowd_report=info")))
        .init();

    let cli = Cli::parse();
    let config = cli.resolve_config()?;

    match cli.command {
        Command::Plot => {
            let plot = pipeline::run_visualization(&config)?;
            show_if_requested(&config, plot)?;
        }
        Command::Evaluate => {
            evaluate(&config)?;
        }
        Command::All => {
            // The timeline is independent of the metrics; a failed render is reported but evaluation still runs.
            let timeline = pipeline::run_visualization(&config);
            if let Err(e) = &timeline {
                error!("Timeline plot failed: {:#}", e);
            }
            evaluate(&config)?;

            let plot = timeline.map_err(|_| anyhow!("timeline plot was not produced"))?;
            show_if_requested(&config, plot)?;
        }
    }

    Ok(())
}

fn evaluate(config: &AnalysisConfig) -> Result<()> {
    let evaluation = pipeline::run_evaluation(config, Local::now().naive_local())?;
    println!("{}", evaluation.report.summary());
    pipeline::render_confusion_matrices(config, &evaluation.results)?;
    info!("Evaluation complete. Results have been saved in {}", config.results_dir.display());
    Ok(())
}

#[cfg(feature = "gui")]
fn show_if_requested(config: &AnalysisConfig, plot: TimelinePlot) -> Result<()> {
    if config.plot.show {
        crowd_report::viewer::show_timeline(plot).map_err(|e| anyhow!("Viewer failed: {}", e))?;
    }
    Ok(())
}

#[cfg(not(feature = "gui"))]
fn show_if_requested(config: &AnalysisConfig, _plot: TimelinePlot) -> Result<()> {
    if config.plot.show {
        tracing::warn!("Built without the `gui` feature; ignoring --show");
    }
    Ok(())
}
