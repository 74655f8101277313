//! History storage backends

use super::HistoryRecord;
use crate::error::{ForecastError, Result};
use parking_lot::{Mutex, RwLock};
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Append-only history persistence
pub trait HistoryStore: Send + Sync {
    fn append(&self, record: HistoryRecord) -> Result<()>;

    /// Up to `limit` records, newest first
    fn recent(&self, limit: usize) -> Result<Vec<HistoryRecord>>;
}

/// Newest first by timestamp; among equal timestamps the later append wins
fn newest_first(mut records: Vec<HistoryRecord>, limit: usize) -> Vec<HistoryRecord> {
    records.reverse();
    records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    records.truncate(limit);
    records
}

/// One JSON record per line in a local file
pub struct JsonLinesStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonLinesStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_all(&self) -> Result<Vec<HistoryRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let file = fs::File::open(&self.path)?;
        let mut records = Vec::new();
        for (n, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<HistoryRecord>(&line) {
                Ok(record) => records.push(record),
                Err(e) => warn!(line = n + 1, error = %e, "Skipping malformed history line"),
            }
        }
        Ok(records)
    }
}

impl HistoryStore for JsonLinesStore {
    fn append(&self, record: HistoryRecord) -> Result<()> {
        let line = serde_json::to_string(&record)?;
        let _guard = self.write_lock.lock();

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| ForecastError::HistoryError(format!("Failed to create directory: {}", e)))?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| ForecastError::HistoryError(format!("Failed to open history file: {}", e)))?;
        writeln!(file, "{}", line)
            .map_err(|e| ForecastError::HistoryError(format!("Failed to write history: {}", e)))?;
        Ok(())
    }

    fn recent(&self, limit: usize) -> Result<Vec<HistoryRecord>> {
        let _guard = self.write_lock.lock();
        Ok(newest_first(self.load_all()?, limit))
    }
}

/// In-process store
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<Vec<HistoryRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

impl HistoryStore for MemoryStore {
    fn append(&self, record: HistoryRecord) -> Result<()> {
        self.records.write().push(record);
        Ok(())
    }

    fn recent(&self, limit: usize) -> Result<Vec<HistoryRecord>> {
        Ok(newest_first(self.records.read().clone(), limit))
    }
}
