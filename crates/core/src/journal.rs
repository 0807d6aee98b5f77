//! Append-only JSON array log of completed analyses.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

const LOG_TARGET: &str = "journal";

#[derive(thiserror::Error, Debug)]
pub enum JournalError {
    #[error("journal io error: {0}")]
    Io(#[from] io::Error),
    #[error("journal serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("journal {0} does not contain a JSON array")]
    NotAnArray(PathBuf),
}

#[derive(Serialize)]
struct LogEntry<'a, T: Serialize> {
    timestamp: DateTime<Utc>,
    #[serde(flatten)]
    record: &'a T,
}

#[derive(Clone, Debug)]
pub struct JsonJournal {
    path: PathBuf,
}

impl JsonJournal {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads every entry; a missing or blank file is an empty journal.
    pub fn entries(&self) -> Result<Vec<Value>, JournalError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }
        match serde_json::from_str(&raw)? {
            Value::Array(entries) => Ok(entries),
            _ => Err(JournalError::NotAnArray(self.path.clone())),
        }
    }

    /// Stamps `record` with the current UTC time and rewrites the file atomically.
    /// Returns the number of entries now stored.
    pub fn append<T: Serialize>(&self, record: &T) -> Result<usize, JournalError> {
        self.append_at(record, Utc::now())
    }

    pub fn append_at<T: Serialize>(
        &self,
        record: &T,
        timestamp: DateTime<Utc>,
    ) -> Result<usize, JournalError> {
        let mut entries = self.entries()?;
        entries.push(serde_json::to_value(LogEntry { timestamp, record })?);

        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let mut tmp = NamedTempFile::new_in(&dir)?;
        serde_json::to_writer_pretty(&mut tmp, &entries)?;
        tmp.write_all(b"\n")?;
        tmp.flush()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;

        tracing::debug!(
            target: LOG_TARGET,
            path = %self.path.display(),
            entries = entries.len(),
            "journal entry appended"
        );
        Ok(entries.len())
    }
}
