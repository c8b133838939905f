//! Results document for one evaluation run.
//!
//! The document is JSON with four top-level keys: `timestamp`, `ground_truth`,
//! `video_info` and `metrics`. `metrics` maps each event category label to its
//! scores and a `[[tn, fp], [fn, tp]]` confusion grid.

use crate::error::{AnalysisError, Result};
use crate::ground_truth::GroundTruthKind;
use crate::metadata::{RecordedDuration, VideoMetadata};
use crate::metrics::MetricsResult;
use crate::record::EventCategory;
use chrono::NaiveDateTime;
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::ser::PrettyFormatter;
use std::fmt::{self, Write as _};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::info;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub timestamp: String,
    /// Whether scores were computed against recorded labels or a synthetic stand-in
    pub ground_truth: GroundTruthKind,
    pub video_info: VideoInfo,
    pub metrics: CategoryScores,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoInfo {
    pub fps: f64,
    pub frame_size: u32,
    pub duration: RecordedDuration,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryMetrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub confusion_matrix: [[u64; 2]; 2],
}

/// Per-category scores keyed by label, kept in evaluation order
///
/// Serialized as a JSON object whose keys appear in the order the categories
/// were evaluated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryScores(Vec<(String, CategoryMetrics)>);

impl CategoryScores {
    pub fn get(&self, label: &str) -> Option<&CategoryMetrics> {
        self.0.iter().find(|(l, _)| l == label).map(|(_, m)| m)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CategoryMetrics)> {
        self.0.iter().map(|(l, m)| (l.as_str(), m))
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(l, _)| l.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &CategoryMetrics> {
        self.0.iter().map(|(_, m)| m)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Insert or replace the scores for `label`; a new label goes last
    pub fn insert(&mut self, label: String, metrics: CategoryMetrics) {
        match self.0.iter_mut().find(|(l, _)| *l == label) {
            Some(entry) => entry.1 = metrics,
            None => self.0.push((label, metrics)),
        }
    }
}

impl FromIterator<(String, CategoryMetrics)> for CategoryScores {
    fn from_iter<I: IntoIterator<Item = (String, CategoryMetrics)>>(iter: I) -> Self {
        let mut scores = CategoryScores::default();
        for (label, metrics) in iter {
            scores.insert(label, metrics);
        }
        scores
    }
}

impl Serialize for CategoryScores {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|(l, m)| (l, m)))
    }
}

impl<'de> Deserialize<'de> for CategoryScores {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct ScoresVisitor;

        impl<'de> Visitor<'de> for ScoresVisitor {
            type Value = CategoryScores;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map from category label to scores")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<CategoryScores, A::Error> {
                let mut scores = CategoryScores::default();
                while let Some((label, metrics)) = map.next_entry::<String, CategoryMetrics>()? {
                    scores.insert(label, metrics);
                }
                Ok(scores)
            }
        }

        deserializer.deserialize_map(ScoresVisitor)
    }
}

impl From<&MetricsResult> for CategoryMetrics {
    fn from(m: &MetricsResult) -> Self {
        Self {
            accuracy: m.accuracy,
            precision: m.precision,
            recall: m.recall,
            f1_score: m.f1,
            confusion_matrix: m.confusion.rows(),
        }
    }
}

impl EvaluationReport {
    /// Assemble the document. Fails if the metadata lacks frame size or duration.
    pub fn new(meta: &VideoMetadata, ground_truth: GroundTruthKind, results: &[(EventCategory, MetricsResult)], evaluated_at: NaiveDateTime) -> Result<Self> {
        let (frame_size, duration) = meta.evaluation_fields()?;
        Ok(Self {
            timestamp: evaluated_at.format(TIMESTAMP_FORMAT).to_string(),
            ground_truth,
            video_info: VideoInfo { fps: meta.fps, frame_size, duration: duration.clone() },
            metrics: results.iter().map(|(category, m)| (category.label().to_string(), CategoryMetrics::from(m))).collect(),
        })
    }

    /// Write the document to `path`, creating parent directories as needed
    ///
    /// The JSON is written to a temporary file in the destination directory and
    /// renamed over `path` only once it is complete, so a failed write leaves any
    /// previous document untouched.
    pub fn write(&self, path: &Path) -> Result<()> {
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).map_err(|e| AnalysisError::write_failure(path, e))?;

        let tmp = NamedTempFile::new_in(dir).map_err(|e| AnalysisError::write_failure(path, e))?;
        let mut writer = BufWriter::new(tmp);
        let mut ser = serde_json::Serializer::with_formatter(&mut writer, PrettyFormatter::with_indent(b"    "));
        self.serialize(&mut ser).map_err(|e| AnalysisError::write_failure(path, e))?;
        writer.write_all(b"\n").map_err(|e| AnalysisError::write_failure(path, e))?;

        let tmp = writer.into_inner().map_err(|e| AnalysisError::write_failure(path, e.error()))?;
        tmp.as_file().sync_all().map_err(|e| AnalysisError::write_failure(path, e))?;
        tmp.persist(path).map_err(|e| AnalysisError::write_failure(path, e.error))?;

        info!("Saved evaluation results to {}", path.display());
        Ok(())
    }

    /// Human-readable per-category summary for the console
    pub fn summary(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "\nCrowd Analysis Evaluation Results");
        let _ = writeln!(out, "{}", "=".repeat(50));
        if self.ground_truth == GroundTruthKind::Synthetic {
            let _ = writeln!(out, "Reference labels are SYNTHETIC (predictions with injected noise); scores are not a measure of detector accuracy.");
        }
        for (label, m) in self.metrics.iter() {
            let _ = writeln!(out, "\n{} Detection Results:", label);
            let _ = writeln!(out, "Accuracy:  {:.2}%", m.accuracy * 100.0);
            let _ = writeln!(out, "Precision: {:.2}%", m.precision * 100.0);
            let _ = writeln!(out, "Recall:    {:.2}%", m.recall * 100.0);
            let _ = writeln!(out, "F1 Score:  {:.2}%", m.f1_score * 100.0);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::ConfusionMatrix;
    use chrono::NaiveDate;

    fn make_meta(frame_size: Option<u32>) -> VideoMetadata {
        VideoMetadata {
            record_interval_frames: 5,
            fps: 3.0,
            start_time: NaiveDate::from_ymd_opt(2020, 11, 5).unwrap().and_hms_opt(0, 0, 0).unwrap(),
            is_live_source: false,
            processed_frame_size: frame_size,
            total_duration: Some(RecordedDuration::Timestamp("05/11/2020, 00:10:00".to_string())),
        }
    }

    fn evaluated_at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap().and_hms_opt(12, 30, 5).unwrap()
    }

    fn make_results() -> Vec<(EventCategory, MetricsResult)> {
        let m = MetricsResult::from_confusion(ConfusionMatrix { true_negative: 2, false_positive: 1, false_negative: 0, true_positive: 2 });
        vec![(EventCategory::AbnormalActivity, m), (EventCategory::RestrictedEntry, MetricsResult::from_confusion(ConfusionMatrix::default()))]
    }

    #[test]
    fn test_report_shape() {
        let report = EvaluationReport::new(&make_meta(Some(1080)), GroundTruthKind::Synthetic, &make_results(), evaluated_at()).unwrap();
        let value = serde_json::to_value(&report).unwrap();

        assert_eq!(value["timestamp"], "2024-03-01 12:30:05");
        assert_eq!(value["ground_truth"], "synthetic");
        assert_eq!(value["video_info"]["fps"], 3.0);
        assert_eq!(value["video_info"]["frame_size"], 1080);
        assert_eq!(value["video_info"]["duration"], "05/11/2020, 00:10:00");
        assert_eq!(value["metrics"]["Abnormal Activity"]["confusion_matrix"], serde_json::json!([[2, 1], [0, 2]]));
        assert_eq!(value["metrics"]["Restricted Entry"]["f1_score"], 0.0);
    }

    #[test]
    fn test_categories_keep_evaluation_order() {
        let m = MetricsResult::from_confusion(ConfusionMatrix::default());
        let results: Vec<_> = EventCategory::ALL.iter().map(|&c| (c, m)).collect();
        let report = EvaluationReport::new(&make_meta(Some(1080)), GroundTruthKind::Synthetic, &results, evaluated_at()).unwrap();

        let expected = ["Abnormal Activity", "Social Distance Violation", "Restricted Entry"];
        assert_eq!(report.metrics.labels().collect::<Vec<_>>(), expected);

        let text = serde_json::to_string_pretty(&report).unwrap();
        let positions: Vec<usize> = expected.iter().map(|label| text.find(label).unwrap()).collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));

        let back: EvaluationReport = serde_json::from_str(&text).unwrap();
        assert_eq!(back.metrics.labels().collect::<Vec<_>>(), expected);

        let summary = report.summary();
        let positions: Vec<usize> = expected.iter().map(|label| summary.find(label).unwrap()).collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_report_requires_frame_size() {
        let err = EvaluationReport::new(&make_meta(None), GroundTruthKind::Synthetic, &make_results(), evaluated_at()).unwrap_err();
        assert!(matches!(err, AnalysisError::MissingMetadataField("PROCESSED_FRAME_SIZE")));
    }

    #[test]
    fn test_write_creates_directory_and_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/results/metrics.json");
        let report = EvaluationReport::new(&make_meta(Some(720)), GroundTruthKind::Recorded, &make_results(), evaluated_at()).unwrap();

        report.write(&path).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("\n    \"timestamp\""));
        let back: EvaluationReport = serde_json::from_str(&text).unwrap();
        assert_eq!(back, report);
        assert_eq!(fs::read_dir(path.parent().unwrap()).unwrap().count(), 1);
    }

    #[test]
    fn test_failed_write_keeps_previous_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metrics.json");
        fs::write(&path, "previous").unwrap();

        let bad = dir.path().join("metrics.json").join("child.json");
        let report = EvaluationReport::new(&make_meta(Some(720)), GroundTruthKind::Synthetic, &make_results(), evaluated_at()).unwrap();
        assert!(matches!(report.write(&bad), Err(AnalysisError::ArtifactWriteFailure { .. })));
        assert_eq!(fs::read_to_string(&path).unwrap(), "previous");
    }

    #[test]
    fn test_summary_flags_synthetic() {
        let report = EvaluationReport::new(&make_meta(Some(1080)), GroundTruthKind::Synthetic, &make_results(), evaluated_at()).unwrap();
        let text = report.summary();
        assert!(text.contains("SYNTHETIC"));
        assert!(text.contains("Abnormal Activity Detection Results:"));
        assert!(text.contains("Accuracy:  80.00%"));
        assert!(text.contains("Precision: 66.67%"));
    }
}
