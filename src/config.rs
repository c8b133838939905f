use crate::ground_truth::DEFAULT_SEED;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Settings for one analysis run. Built once and passed by reference; nothing reads process-wide state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub records_path: PathBuf,
    pub metadata_path: PathBuf,
    /// Independently labelled record file; synthetic labels are used when absent
    pub ground_truth_path: Option<PathBuf>,
    pub seed: u64,
    pub plot_path: PathBuf,
    pub results_dir: PathBuf,
    pub plot: PlotConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlotConfig {
    pub width: u32,
    pub height: u32,
    pub confusion_size: u32,
    /// Open an interactive window after the timeline image is written
    pub show: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            records_path: PathBuf::from("processed_data/crowd_data.csv"),
            metadata_path: PathBuf::from("processed_data/video_data.json"),
            ground_truth_path: None,
            seed: DEFAULT_SEED,
            plot_path: PathBuf::from("crowd_analysis_plot.png"),
            results_dir: PathBuf::from("evaluation_results"),
            plot: PlotConfig::default(),
        }
    }
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self { width: 1280, height: 720, confusion_size: 640, show: false }
    }
}

impl AnalysisConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: AnalysisConfig = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    pub fn metrics_path(&self) -> PathBuf {
        self.results_dir.join("metrics.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config: AnalysisConfig = serde_yaml::from_str("seed: 7\nplot:\n  show: true\n").unwrap();
        assert_eq!(config.seed, 7);
        assert!(config.plot.show);
        assert_eq!(config.plot.width, 1280);
        assert_eq!(config.records_path, PathBuf::from("processed_data/crowd_data.csv"));
        assert_eq!(config.metrics_path(), PathBuf::from("evaluation_results/metrics.json"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("crowd.yaml");
        fs::write(&path, "records_path: data/a.csv\nground_truth_path: data/labels.csv\n").unwrap();

        let config = AnalysisConfig::load(&path).unwrap();
        assert_eq!(config.records_path, PathBuf::from("data/a.csv"));
        assert_eq!(config.ground_truth_path, Some(PathBuf::from("data/labels.csv")));
        assert_eq!(config.seed, DEFAULT_SEED);
    }
}
