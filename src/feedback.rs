//! Feedback log
//!
//! Append-only CSV file with the columns `Date,Summary,Feedback`. The file is
//! created on the first write, read in full on every write and on every
//! dashboard render, and rewritten atomically (temp file + rename) on append.
//! All appends in the process go through one writer lock.

use crate::error::PersistenceError;
use chrono::{DateTime, Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info};

/// Column names, in file order
pub const COLUMNS: [&str; 3] = ["Date", "Summary", "Feedback"];

/// How timestamps are written to the `Date` column
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FeedbackLabel {
    Yes,
    No,
}

impl FeedbackLabel {
    pub const ALL: [FeedbackLabel; 2] = [FeedbackLabel::Yes, FeedbackLabel::No];

    pub fn as_str(&self) -> &'static str {
        match self {
            FeedbackLabel::Yes => "Yes",
            FeedbackLabel::No => "No",
        }
    }
}

impl std::str::FromStr for FeedbackLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Yes" => Ok(FeedbackLabel::Yes),
            "No" => Ok(FeedbackLabel::No),
            _ => Err(format!("Unknown feedback '{}'", s)),
        }
    }
}

impl std::fmt::Display for FeedbackLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the feedback log
#[derive(Debug, Clone, PartialEq)]
pub struct FeedbackRecord {
    pub timestamp: NaiveDateTime,
    pub summary: String,
    pub label: FeedbackLabel,
}

impl FeedbackRecord {
    /// Record stamped with the current local time
    pub fn now(summary: impl Into<String>, label: FeedbackLabel) -> Self {
        Self {
            timestamp: Local::now().naive_local(),
            summary: summary.into(),
            label,
        }
    }
}

/// Row shape as it sits on disk
#[derive(Debug, Serialize, Deserialize)]
struct CsvRow {
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "Summary")]
    summary: String,
    #[serde(rename = "Feedback")]
    feedback: FeedbackLabel,
}

impl From<&FeedbackRecord> for CsvRow {
    fn from(record: &FeedbackRecord) -> Self {
        CsvRow {
            date: record.timestamp.format(DATE_FORMAT).to_string(),
            summary: record.summary.clone(),
            feedback: record.label,
        }
    }
}

impl TryFrom<CsvRow> for FeedbackRecord {
    type Error = PersistenceError;

    fn try_from(row: CsvRow) -> Result<Self, Self::Error> {
        Ok(FeedbackRecord {
            timestamp: parse_timestamp(&row.date)?,
            summary: row.summary,
            label: row.feedback,
        })
    }
}

/// Parse a `Date` cell; accepts our own format, second precision and RFC 3339
fn parse_timestamp(s: &str) -> Result<NaiveDateTime, PersistenceError> {
    NaiveDateTime::parse_from_str(s, DATE_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S"))
        .or_else(|_| DateTime::parse_from_rfc3339(s).map(|dt| dt.naive_local()))
        .map_err(|_| PersistenceError::InvalidTimestamp(s.to_string()))
}

pub struct FeedbackStore {
    path: PathBuf,
    writer: Mutex<()>,
}

impl FeedbackStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            writer: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether any feedback has ever been written
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Append one record as the last row
    pub fn append(&self, record: &FeedbackRecord) -> Result<(), PersistenceError> {
        let _guard = self.writer.lock().map_err(|_| PersistenceError::LockPoisoned)?;

        if !self.path.exists() {
            self.write_all(&[])?;
            info!("Created feedback log at {}", self.path.display());
        }

        let mut records = self.load_all()?;
        records.push(record.clone());
        self.write_all(&records)?;

        debug!("Appended '{}' feedback ({} rows total)", record.label, records.len());
        Ok(())
    }

    /// Every record in file order; a missing file is an empty log
    pub fn load_all(&self) -> Result<Vec<FeedbackRecord>, PersistenceError> {
        let mut reader = match csv::ReaderBuilder::new().has_headers(true).from_path(&self.path) {
            Ok(reader) => reader,
            Err(e) => {
                if let csv::ErrorKind::Io(io) = e.kind() {
                    if io.kind() == std::io::ErrorKind::NotFound {
                        return Ok(Vec::new());
                    }
                }
                return Err(e.into());
            }
        };

        let headers = reader.headers()?.clone();
        if headers.iter().ne(COLUMNS.iter().copied()) {
            return Err(PersistenceError::UnexpectedHeader(
                headers.iter().collect::<Vec<_>>().join(","),
            ));
        }

        reader
            .deserialize::<CsvRow>()
            .map(|row| FeedbackRecord::try_from(row?))
            .collect()
    }

    /// Row count per label (labels with no rows are absent)
    pub fn aggregate_by_label(&self) -> Result<BTreeMap<FeedbackLabel, usize>, PersistenceError> {
        Ok(count_labels(&self.load_all()?))
    }

    /// Replace the file contents with the header followed by `records`
    fn write_all(&self, records: &[FeedbackRecord]) -> Result<(), PersistenceError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        let tmp = tempfile::NamedTempFile::new_in(&dir)?;
        {
            let mut writer = csv::WriterBuilder::new()
                .has_headers(false)
                .from_writer(tmp.as_file());
            writer.write_record(COLUMNS)?;
            for record in records {
                writer.serialize(CsvRow::from(record))?;
            }
            writer.flush()?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| PersistenceError::Io(e.error))?;
        Ok(())
    }
}

/// Count records per label
pub fn count_labels(records: &[FeedbackRecord]) -> BTreeMap<FeedbackLabel, usize> {
    let mut counts = BTreeMap::new();
    for record in records {
        *counts.entry(record.label).or_insert(0) += 1;
    }
    counts
}
