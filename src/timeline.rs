//! Time axis reconstruction for recorded crowd data
//!
//! The detector writes one record every `record_interval_frames` frames, so the
//! record at index `i` closes the interval ending at
//! `start_time + (i + 1) * record_interval_frames / fps` seconds.
//! Offsets are computed from the index at nanosecond resolution rather than by
//! accumulating steps, so long recordings do not drift.

use crate::error::{AnalysisError, Result};
use crate::metadata::VideoMetadata;
use crate::record::CrowdRecord;
use chrono::{Duration, NaiveDateTime};

const NANOS_PER_SEC: f64 = 1_000_000_000.0;

#[derive(Debug, Clone, PartialEq)]
pub struct TimeAxis {
    start_time: NaiveDateTime,
    step_secs: f64,
    timestamps: Vec<NaiveDateTime>,
}

impl TimeAxis {
    /// Build the axis for `records` using the frame interval and rate from `meta`
    ///
    /// Fails with `InvalidMetadata` when fps is not a positive finite number, the
    /// record interval is zero, the resulting step is below one nanosecond, or the
    /// last timestamp cannot be represented.
    pub fn build(records: &[CrowdRecord], meta: &VideoMetadata) -> Result<Self> {
        Self::with_len(records.len(), meta)
    }

    pub fn with_len(len: usize, meta: &VideoMetadata) -> Result<Self> {
        if !(meta.fps.is_finite() && meta.fps > 0.0) {
            return Err(AnalysisError::InvalidMetadata(format!("fps must be positive, got {}", meta.fps)));
        }
        if meta.record_interval_frames == 0 {
            return Err(AnalysisError::InvalidMetadata("record interval must be at least one frame".to_string()));
        }

        let step_secs = meta.record_interval_frames as f64 / meta.fps;
        if step_secs * NANOS_PER_SEC < 1.0 {
            return Err(AnalysisError::InvalidMetadata(format!("time step of {:e}s is below nanosecond resolution", step_secs)));
        }

        // Offsets are i64 nanoseconds; the last one must fit without saturating.
        let span_nanos = len as f64 * step_secs * NANOS_PER_SEC;
        if span_nanos >= i64::MAX as f64 {
            return Err(AnalysisError::InvalidMetadata(format!("{} records of {:e}s each overflow the time axis", len, step_secs)));
        }

        let timestamps = (0..len)
            .map(|i| {
                shift_by_seconds(meta.start_time, (i + 1) as f64 * step_secs).ok_or_else(|| {
                    AnalysisError::InvalidMetadata(format!("timestamp of record {} is past the supported date range", i))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { start_time: meta.start_time, step_secs, timestamps })
    }

    pub fn timestamps(&self) -> &[NaiveDateTime] {
        &self.timestamps
    }

    pub fn start_time(&self) -> NaiveDateTime {
        self.start_time
    }

    /// Constant spacing between consecutive records, in seconds
    pub fn step_secs(&self) -> f64 {
        self.step_secs
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Seconds elapsed between the start time and record `i`
    pub fn seconds_from_start(&self, i: usize) -> f64 {
        (i + 1) as f64 * self.step_secs
    }

    /// Absolute time for a position expressed in seconds from the start
    pub fn at_seconds(&self, secs: f64) -> Option<NaiveDateTime> {
        shift_by_seconds(self.start_time, secs)
    }
}

/// `start + secs` rounded to the nanosecond, or `None` if it does not fit
pub fn shift_by_seconds(start: NaiveDateTime, secs: f64) -> Option<NaiveDateTime> {
    let nanos = (secs * NANOS_PER_SEC).round();
    if !nanos.is_finite() || nanos.abs() >= i64::MAX as f64 {
        return None;
    }
    start.checked_add_signed(Duration::nanoseconds(nanos as i64))
}
