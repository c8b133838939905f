//! Top-level composition of the visualization and evaluation paths.
//!
//! Both paths read the same record file and never share state; each can run on
//! its own or one after the other.

use crate::config::AnalysisConfig;
use crate::error::Result as AnalysisResult;
use crate::ground_truth::GroundTruthSource;
use crate::metadata::VideoMetadata;
use crate::metrics::MetricsResult;
use crate::plot::{TimelinePlot, confusion_matrix_file_name, render_confusion_matrix, render_timeline};
use crate::record::{EventCategory, RecordStore};
use crate::report::EvaluationReport;
use crate::timeline::TimeAxis;
use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Load records and metadata, build the time axis and write the timeline image
///
/// Returns the laid-out plot so the caller can also show it interactively.
pub fn run_visualization(config: &AnalysisConfig) -> Result<TimelinePlot> {
    let metadata = VideoMetadata::load(&config.metadata_path).with_context(|| format!("loading metadata from {}", config.metadata_path.display()))?;
    let store = RecordStore::load(&config.records_path).with_context(|| format!("loading records from {}", config.records_path.display()))?;

    let axis = TimeAxis::build(store.records(), &metadata)?;
    debug!("Time axis: {} entries, step {:.3}s", axis.len(), axis.step_secs());

    let plot = TimelinePlot::build(&axis, store.records())?;
    render_timeline(&plot, &config.plot_path, (config.plot.width, config.plot.height))?;
    Ok(plot)
}

/// Score every event category of `store` against `reference`
pub fn evaluate(store: &RecordStore, reference: &GroundTruthSource) -> AnalysisResult<Vec<(EventCategory, MetricsResult)>> {
    EventCategory::ALL
        .iter()
        .map(|&category| {
            let predicted = category.labels(store.records());
            let truth = reference.labels_for(category, &predicted);
            let metrics = MetricsResult::evaluate(&truth, &predicted)?;
            debug!("{}: {:?}", category.label(), metrics.confusion);
            Ok((category, metrics))
        })
        .collect()
}

/// Outcome of the evaluation path: the written document and the per-category scores behind it
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub report: EvaluationReport,
    pub results: Vec<(EventCategory, MetricsResult)>,
}

/// Evaluate the record file and write `metrics.json`
///
/// All inputs are loaded and validated before anything is written.
pub fn run_evaluation(config: &AnalysisConfig, evaluated_at: NaiveDateTime) -> Result<Evaluation> {
    let metadata = VideoMetadata::load(&config.metadata_path).with_context(|| format!("loading metadata from {}", config.metadata_path.display()))?;
    metadata.evaluation_fields().context("metadata is incomplete for evaluation")?;
    let store = RecordStore::load(&config.records_path).with_context(|| format!("loading records from {}", config.records_path.display()))?;

    let reference = match &config.ground_truth_path {
        Some(path) => GroundTruthSource::load_recorded(path).with_context(|| format!("loading ground truth from {}", path.display()))?,
        None => {
            // No annotated labels: fall back to noisy copies of the predictions.
            // The report marks these scores as synthetic.
            warn!("No ground truth file configured; using synthetic labels (seed {}). Scores are illustrative only.", config.seed);
            GroundTruthSource::Synthetic { seed: config.seed }
        }
    };

    let results = evaluate(&store, &reference).context("scoring event categories")?;
    let report = EvaluationReport::new(&metadata, reference.kind(), &results, evaluated_at)?;
    report.write(&config.metrics_path())?;

    info!("Evaluated {} records across {} categories", store.len(), results.len());
    Ok(Evaluation { report, results })
}

/// Write one confusion-matrix image per category into the results directory
pub fn render_confusion_matrices(config: &AnalysisConfig, results: &[(EventCategory, MetricsResult)]) -> AnalysisResult<Vec<PathBuf>> {
    results
        .iter()
        .map(|(category, metrics)| {
            let path = config.results_dir.join(confusion_matrix_file_name(category.label()));
            render_confusion_matrix(&metrics.confusion, category.label(), &path, config.plot.confusion_size)?;
            Ok(path)
        })
        .collect()
}
