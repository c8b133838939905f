//! Crowd record module with the per-interval observation struct and its CSV loader
//!
//! A `CrowdRecord` is one recording step produced by the upstream detector: the
//! number of people seen, the number of distancing violations, and two event flags.
//! Records are indexed by recording step, not by raw frame number; the frame
//! interval between steps lives in the video metadata.

use crate::error::{AnalysisError, Result};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{info, warn};

/// CrowdRecord is one timestep's aggregated crowd observation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrowdRecord {
    pub human_count: u32,
    pub violate_count: u32,
    pub restricted_entry: bool,
    pub abnormal_activity: bool,
}

impl CrowdRecord {
    pub fn new(human_count: u32, violate_count: u32, restricted_entry: bool, abnormal_activity: bool) -> Self {
        Self { human_count, violate_count, restricted_entry, abnormal_activity }
    }

    /// True when at least one distancing violation was recorded in this step
    pub fn has_violation(&self) -> bool {
        self.violate_count > 0
    }
}

/// The event categories evaluated independently by the metrics path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventCategory {
    AbnormalActivity,
    SocialDistanceViolation,
    RestrictedEntry,
}

impl EventCategory {
    pub const ALL: [EventCategory; 3] = [EventCategory::AbnormalActivity, EventCategory::SocialDistanceViolation, EventCategory::RestrictedEntry];

    pub fn label(&self) -> &'static str {
        match self {
            EventCategory::AbnormalActivity => "Abnormal Activity",
            EventCategory::SocialDistanceViolation => "Social Distance Violation",
            EventCategory::RestrictedEntry => "Restricted Entry",
        }
    }

    /// Whether the detector flagged this category for a single record
    pub fn is_flagged(&self, record: &CrowdRecord) -> bool {
        match self {
            EventCategory::AbnormalActivity => record.abnormal_activity,
            EventCategory::SocialDistanceViolation => record.has_violation(),
            EventCategory::RestrictedEntry => record.restricted_entry,
        }
    }

    /// Binary label sequence for this category, one entry per record
    pub fn labels(&self, records: &[CrowdRecord]) -> Vec<bool> {
        records.iter().map(|r| self.is_flagged(r)).collect()
    }
}

/// RecordStore owns the ordered record sequence loaded for one analysis run
#[derive(Debug, Clone, Default)]
pub struct RecordStore {
    records: Vec<CrowdRecord>,
    skipped_rows: usize,
}

impl RecordStore {
    pub fn from_records(records: Vec<CrowdRecord>) -> Self {
        Self { records, skipped_rows: 0 }
    }

    /// Load records from a CSV file with a header row
    ///
    /// Fails with `MissingInputFile` if the file does not exist. Rows that do not
    /// parse are skipped with a warning; see [`RecordStore::from_reader`].
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(AnalysisError::MissingInputFile { path: path.to_path_buf() });
        }
        let store = Self::from_reader(BufReader::new(File::open(path)?))?;
        info!("Loaded {} records from {} ({} skipped)", store.len(), path.display(), store.skipped_rows);
        Ok(store)
    }

    /// Parse records from any buffered reader
    ///
    /// The first line is treated as the header and ignored. Blank lines are
    /// ignored silently. Any other line that fails [`parser::parse_row`] is
    /// logged and dropped; the remaining records keep their relative order.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut records = Vec::new();
        let mut skipped_rows = 0;

        for (line_idx, raw) in reader.split(b'\n').enumerate() {
            let raw = raw?;
            if line_idx == 0 {
                continue;
            }

            let line_no = line_idx + 1;
            let line = match String::from_utf8(raw) {
                Ok(line) => line,
                Err(e) => {
                    let err = AnalysisError::MalformedRecordRow { line: line_no, reason: format!("not valid UTF-8: {}", e.utf8_error()) };
                    warn!("Skipping row {:?}: {}", String::from_utf8_lossy(e.as_bytes()), err);
                    skipped_rows += 1;
                    continue;
                }
            };
            if line.trim().is_empty() {
                continue;
            }

            match parser::parse_row(&line, line_no) {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!("Skipping row {:?}: {}", line, e);
                    skipped_rows += 1;
                }
            }
        }

        Ok(Self { records, skipped_rows })
    }

    pub fn records(&self) -> &[CrowdRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of rows dropped while loading
    pub fn skipped_rows(&self) -> usize {
        self.skipped_rows
    }

    /// Largest crowd count in the sequence, or 1 when there are no records or all counts are zero
    pub fn max_crowd_count(&self) -> u32 {
        max_crowd_count(&self.records)
    }
}

pub fn max_crowd_count(records: &[CrowdRecord]) -> u32 {
    records.iter().map(|r| r.human_count).max().unwrap_or(1).max(1)
}

/// Parser module for turning CSV rows into crowd records
pub mod parser {
    use super::CrowdRecord;
    use crate::error::AnalysisError;

    /// Expected number of columns per row
    pub const COLUMNS: usize = 5;

    /// Parse one data row
    ///
    /// Expected format (5 integer columns):
    /// - column 0: record index (validated, not used)
    /// - column 1: human count
    /// - column 2: violation count
    /// - column 3: restricted entry flag (nonzero = true)
    /// - column 4: abnormal activity flag (nonzero = true)
    pub fn parse_row(line: &str, line_no: usize) -> Result<CrowdRecord, AnalysisError> {
        let parts: Vec<&str> = line.split(',').map(str::trim).collect();
        if parts.len() != COLUMNS {
            return Err(AnalysisError::MalformedRecordRow {
                line: line_no,
                reason: format!("expected {} columns, found {}", COLUMNS, parts.len()),
            });
        }

        let field = |idx: usize, name: &str| -> Result<i64, AnalysisError> {
            parts[idx].parse::<i64>().map_err(|e| AnalysisError::MalformedRecordRow {
                line: line_no,
                reason: format!("{} {:?}: {}", name, parts[idx], e),
            })
        };
        let count = |idx: usize, name: &str| -> Result<u32, AnalysisError> {
            let value = field(idx, name)?;
            u32::try_from(value).map_err(|_| AnalysisError::MalformedRecordRow {
                line: line_no,
                reason: format!("{} {} is out of range", name, value),
            })
        };

        field(0, "index")?;
        Ok(CrowdRecord {
            human_count: count(1, "human count")?,
            violate_count: count(2, "violation count")?,
            restricted_entry: field(3, "restricted entry flag")? != 0,
            abnormal_activity: field(4, "abnormal activity flag")? != 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_parse_row() {
        let record = parser::parse_row("3,12,2,1,0", 4).unwrap();
        assert_eq!(record, CrowdRecord::new(12, 2, true, false));
    }

    #[test]
    fn test_parse_row_trims_whitespace() {
        let record = parser::parse_row(" 0, 7 ,0 , 0, 1 ", 2).unwrap();
        assert_eq!(record, CrowdRecord::new(7, 0, false, true));
    }

    #[test]
    fn test_parse_row_nonzero_flag_is_true() {
        let record = parser::parse_row("0,1,0,2,0", 2).unwrap();
        assert!(record.restricted_entry);
    }

    #[test]
    fn test_parse_row_wrong_arity() {
        let err = parser::parse_row("1,2,3", 5).unwrap_err();
        assert!(matches!(err, AnalysisError::MalformedRecordRow { line: 5, .. }));
        assert!(parser::parse_row("1,2,3,0,0,9", 5).is_err());
    }

    #[test]
    fn test_parse_row_non_integer() {
        assert!(parser::parse_row("1,abc,0,0,0", 2).is_err());
        assert!(parser::parse_row("1,4,0.5,0,0", 2).is_err());
        assert!(parser::parse_row("x,4,0,0,0", 2).is_err());
    }

    #[test]
    fn test_parse_row_negative_count() {
        assert!(parser::parse_row("1,-4,0,0,0", 2).is_err());
    }

    #[test]
    fn test_from_reader_skips_header_and_blank_lines() {
        let data = "idx,human,violate,restricted,abnormal\n0,5,0,0,0\n\n1,8,2,1,0\n";
        let store = RecordStore::from_reader(Cursor::new(data)).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.skipped_rows(), 0);
    }

    #[test]
    fn test_malformed_row_does_not_shift_following_rows() {
        let data = "idx,human,violate,restricted,abnormal\n0,5,0,0,0\n1,8,2\n2,8,2,1,0\n3,3,0,0,1\n";
        let store = RecordStore::from_reader(Cursor::new(data)).unwrap();

        assert_eq!(store.skipped_rows(), 1);
        assert_eq!(
            store.records(),
            &[CrowdRecord::new(5, 0, false, false), CrowdRecord::new(8, 2, true, false), CrowdRecord::new(3, 0, false, true)]
        );
    }

    #[test]
    fn test_invalid_utf8_row_is_skipped() {
        let mut data = b"idx,human,violate,restricted,abnormal\n0,5,0,0,0\n1,".to_vec();
        data.extend_from_slice(&[0xff, 0xfe]);
        data.extend_from_slice(b",0,0,0\n2,8,2,1,0\n");

        let store = RecordStore::from_reader(Cursor::new(data)).unwrap();
        assert_eq!(store.skipped_rows(), 1);
        assert_eq!(store.records(), &[CrowdRecord::new(5, 0, false, false), CrowdRecord::new(8, 2, true, false)]);
    }

    #[test]
    fn test_crlf_line_endings() {
        let data = "idx,human,violate,restricted,abnormal\r\n0,5,0,0,1\r\n\r\n1,8,2,1,0\r\n";
        let store = RecordStore::from_reader(Cursor::new(data)).unwrap();
        assert_eq!(store.skipped_rows(), 0);
        assert_eq!(store.records(), &[CrowdRecord::new(5, 0, false, true), CrowdRecord::new(8, 2, true, false)]);
    }

    #[test]
    fn test_load_missing_file() {
        let err = RecordStore::load(Path::new("definitely/not/here.csv")).unwrap_err();
        assert!(matches!(err, AnalysisError::MissingInputFile { .. }));
    }

    #[test]
    fn test_max_crowd_count() {
        let records = vec![CrowdRecord::new(5, 0, false, false), CrowdRecord::new(8, 2, true, false), CrowdRecord::new(3, 0, false, true)];
        assert_eq!(max_crowd_count(&records), 8);
        assert_eq!(max_crowd_count(&[]), 1);
        assert_eq!(max_crowd_count(&[CrowdRecord::new(0, 0, false, false)]), 1);
    }

    #[test]
    fn test_category_labels() {
        let records = vec![CrowdRecord::new(5, 0, false, false), CrowdRecord::new(8, 2, true, false), CrowdRecord::new(3, 0, false, true)];
        assert_eq!(EventCategory::AbnormalActivity.labels(&records), vec![false, false, true]);
        assert_eq!(EventCategory::SocialDistanceViolation.labels(&records), vec![false, true, false]);
        assert_eq!(EventCategory::RestrictedEntry.labels(&records), vec![false, true, false]);
    }
}
