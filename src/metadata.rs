//! Video metadata written by the upstream detector alongside the record file.
//!
//! The document is a flat JSON object. `DATA_RECORD_FRAME`, `IS_CAM`, `VID_FPS`
//! and `START_TIME` are needed to place records on a time axis; the evaluation
//! report additionally echoes `PROCESSED_FRAME_SIZE` and `END_TIME`.

use crate::error::{AnalysisError, Result};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Format of `START_TIME`, e.g. `05/11/2020, 00:00:00`
pub const START_TIME_FORMAT: &str = "%d/%m/%Y, %H:%M:%S";

/// How long the source ran, as recorded in `END_TIME`
///
/// The detector writes either a formatted timestamp or an elapsed number of
/// seconds depending on the source; the value is carried through unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordedDuration {
    Elapsed(f64),
    Timestamp(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct VideoMetadata {
    pub record_interval_frames: u32,
    pub fps: f64,
    pub start_time: NaiveDateTime,
    pub is_live_source: bool,
    pub processed_frame_size: Option<u32>,
    pub total_duration: Option<RecordedDuration>,
}

/// Raw document shape; every key optional so missing keys can be named precisely
#[derive(Debug, Deserialize)]
struct RawMetadata {
    #[serde(rename = "DATA_RECORD_FRAME")]
    data_record_frame: Option<i64>,
    #[serde(rename = "IS_CAM")]
    is_cam: Option<bool>,
    #[serde(rename = "VID_FPS")]
    vid_fps: Option<f64>,
    #[serde(rename = "START_TIME")]
    start_time: Option<String>,
    #[serde(rename = "PROCESSED_FRAME_SIZE")]
    processed_frame_size: Option<u32>,
    #[serde(rename = "END_TIME")]
    end_time: Option<RecordedDuration>,
}

impl VideoMetadata {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(AnalysisError::MissingInputFile { path: path.to_path_buf() });
        }
        let contents = fs::read_to_string(path)?;
        Self::from_json(&contents).map_err(|e| match e {
            AnalysisError::MalformedMetadataDocument { reason, .. } => AnalysisError::MalformedMetadataDocument { path: path.to_path_buf(), reason },
            other => other,
        })
    }

    /// Parse a metadata document. Only the fields needed for the time axis are required here.
    pub fn from_json(contents: &str) -> Result<Self> {
        let malformed = |reason: String| AnalysisError::MalformedMetadataDocument { path: "<inline>".into(), reason };

        let raw: RawMetadata = serde_json::from_str(contents).map_err(|e| malformed(e.to_string()))?;

        let interval = raw.data_record_frame.ok_or(AnalysisError::MissingMetadataField("DATA_RECORD_FRAME"))?;
        let record_interval_frames = u32::try_from(interval)
            .ok()
            .filter(|&frames| frames > 0)
            .ok_or_else(|| AnalysisError::InvalidMetadata(format!("DATA_RECORD_FRAME must be a positive frame count, got {}", interval)))?;
        let is_live_source = raw.is_cam.ok_or(AnalysisError::MissingMetadataField("IS_CAM"))?;
        let fps = raw.vid_fps.ok_or(AnalysisError::MissingMetadataField("VID_FPS"))?;
        let start_time = raw.start_time.ok_or(AnalysisError::MissingMetadataField("START_TIME"))?;
        let start_time = NaiveDateTime::parse_from_str(&start_time, START_TIME_FORMAT)
            .map_err(|e| malformed(format!("START_TIME {:?} does not match \"{}\": {}", start_time, START_TIME_FORMAT, e)))?;

        Ok(Self {
            record_interval_frames,
            fps,
            start_time,
            is_live_source,
            processed_frame_size: raw.processed_frame_size,
            total_duration: raw.end_time,
        })
    }

    /// Frame size and duration, which the evaluation report cannot do without
    pub fn evaluation_fields(&self) -> Result<(u32, &RecordedDuration)> {
        let frame_size = self.processed_frame_size.ok_or(AnalysisError::MissingMetadataField("PROCESSED_FRAME_SIZE"))?;
        let duration = self.total_duration.as_ref().ok_or(AnalysisError::MissingMetadataField("END_TIME"))?;
        Ok((frame_size, duration))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const FULL: &str = r#"{
        "DATA_RECORD_FRAME": 5,
        "IS_CAM": false,
        "VID_FPS": 3,
        "START_TIME": "05/11/2020, 00:00:00",
        "PROCESSED_FRAME_SIZE": 1080,
        "END_TIME": "05/11/2020, 00:10:00",
        "UNUSED_KEY": [1, 2, 3]
    }"#;

    #[test]
    fn test_from_json_full_document() {
        let meta = VideoMetadata::from_json(FULL).unwrap();
        assert_eq!(meta.record_interval_frames, 5);
        assert_eq!(meta.fps, 3.0);
        assert!(!meta.is_live_source);
        assert_eq!(meta.start_time, NaiveDate::from_ymd_opt(2020, 11, 5).unwrap().and_hms_opt(0, 0, 0).unwrap());
        let (frame_size, duration) = meta.evaluation_fields().unwrap();
        assert_eq!(frame_size, 1080);
        assert_eq!(duration, &RecordedDuration::Timestamp("05/11/2020, 00:10:00".to_string()));
    }

    #[test]
    fn test_elapsed_end_time() {
        let doc = r#"{"DATA_RECORD_FRAME": 5, "IS_CAM": true, "VID_FPS": 3.0, "START_TIME": "05/11/2020, 00:00:00", "END_TIME": 612.5}"#;
        let meta = VideoMetadata::from_json(doc).unwrap();
        assert_eq!(meta.total_duration, Some(RecordedDuration::Elapsed(612.5)));
    }

    #[test]
    fn test_missing_required_key_is_named() {
        let doc = r#"{"DATA_RECORD_FRAME": 5, "IS_CAM": false, "START_TIME": "05/11/2020, 00:00:00"}"#;
        let err = VideoMetadata::from_json(doc).unwrap_err();
        assert!(matches!(err, AnalysisError::MissingMetadataField("VID_FPS")));
    }

    #[test]
    fn test_evaluation_fields_missing() {
        let doc = r#"{"DATA_RECORD_FRAME": 5, "IS_CAM": false, "VID_FPS": 3, "START_TIME": "05/11/2020, 00:00:00"}"#;
        let meta = VideoMetadata::from_json(doc).unwrap();
        assert!(matches!(meta.evaluation_fields(), Err(AnalysisError::MissingMetadataField("PROCESSED_FRAME_SIZE"))));
    }

    #[test]
    fn test_bad_start_time_format() {
        let doc = r#"{"DATA_RECORD_FRAME": 5, "IS_CAM": false, "VID_FPS": 3, "START_TIME": "2020-11-05 00:00:00"}"#;
        assert!(matches!(VideoMetadata::from_json(doc), Err(AnalysisError::MalformedMetadataDocument { .. })));
    }

    #[test]
    fn test_not_json() {
        assert!(matches!(VideoMetadata::from_json("fps = 3"), Err(AnalysisError::MalformedMetadataDocument { .. })));
    }

    #[test]
    fn test_non_positive_record_interval() {
        for interval in ["0", "-5", "4294967296"] {
            let doc = format!(r#"{{"DATA_RECORD_FRAME": {}, "IS_CAM": false, "VID_FPS": 3, "START_TIME": "05/11/2020, 00:00:00"}}"#, interval);
            let err = VideoMetadata::from_json(&doc).unwrap_err();
            assert!(matches!(err, AnalysisError::InvalidMetadata(_)), "interval {}: {:?}", interval, err);
        }
    }

    #[test]
    fn test_wrong_value_type() {
        let doc = r#"{"DATA_RECORD_FRAME": "five", "IS_CAM": false, "VID_FPS": 3, "START_TIME": "05/11/2020, 00:00:00"}"#;
        assert!(matches!(VideoMetadata::from_json(doc), Err(AnalysisError::MalformedMetadataDocument { .. })));
    }
}
