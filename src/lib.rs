//! crowd_report library
//!
//! This library post-processes crowd-monitoring logs written by a video-analysis
//! pipeline. It includes:
//!
//! - `record`: Per-interval crowd records and the CSV loader
//! - `metadata`: Video metadata (frame rate, record interval, start time)
//! - `timeline`: Reconstruction of absolute timestamps from record indices
//! - `ground_truth`: Recorded reference labels, or a seeded synthetic stand-in
//! - `metrics`: Confusion matrix, accuracy, precision, recall and F1 per event category
//! - `plot`: Timeline and confusion-matrix PNG rendering
//! - `report`: The JSON results document
//! - `pipeline`: Composition of the visualization and evaluation paths
//!
//! # Example
//!
//! ```rust,ignore
//! use crowd_report::metadata::VideoMetadata;
//! use crowd_report::metrics::MetricsResult;
//! use crowd_report::record::{EventCategory, RecordStore};
//! use crowd_report::timeline::TimeAxis;
//!
//! let store = RecordStore::load("processed_data/crowd_data.csv".as_ref())?;
//! let meta = VideoMetadata::load("processed_data/video_data.json".as_ref())?;
//!
//! // One timestamp per record
//! let axis = TimeAxis::build(store.records(), &meta)?;
//!
//! // Score one category against reference labels
//! let predicted = EventCategory::RestrictedEntry.labels(store.records());
//! let metrics = MetricsResult::evaluate(&reference, &predicted)?;
//! ```

pub mod config;
pub mod error;
pub mod ground_truth;
pub mod metadata;
pub mod metrics;
pub mod pipeline;
pub mod plot;
pub mod record;
pub mod report;
pub mod timeline;
#[cfg(feature = "gui")]
pub mod viewer;
