//! Bounded submission log persisted as a flat JSON file.
//!
//! Storage is a pretty-printed JSON array of arrays: one inner array per
//! submission, holding that submission's field values in form order. The log
//! store itself treats records as opaque. Storage order is chronological;
//! [`SubmissionLog::list`] reverses it for display.

use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;

/// One logged submission: its field values, in form order.
pub type SubmissionRecord = Vec<String>;

/// Size-bounded submission log.
///
/// `capacity` comes from the `logs_count` setting. A capacity of zero or less
/// disables logging entirely: [`append`](Self::append) becomes a no-op and
/// never touches the file. Otherwise an append loads the current list, pushes
/// the new record, evicts from the front down to `max(0, capacity)` entries
/// and persists the result. The read-modify-write is not atomic across
/// processes; a racing writer can lose an update, which is accepted for a
/// low-traffic log.
#[derive(Debug, Clone)]
pub struct SubmissionLog {
    path: Utf8PathBuf,
    capacity: i64,
}

impl SubmissionLog {
    pub fn new<P: AsRef<Utf8Path>>(path: P, capacity: i64) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            capacity,
        }
    }

    /// Append one record, evicting the oldest entries past the bound.
    ///
    /// No-op when logging is disabled. A missing or corrupt log file counts
    /// as an empty list, not an error.
    pub fn append(&self, record: SubmissionRecord) -> Result<()> {
        if self.capacity <= 0 {
            tracing::debug!("Submission logging disabled, skipping append");
            return Ok(());
        }

        let mut records = self.entries();
        records.push(record);

        let bound = self.capacity.max(0) as usize;
        while records.len() > bound {
            records.remove(0);
        }

        let body = serde_json::to_string_pretty(&records)
            .context("Failed to serialize submission log")?;
        fs::write(&self.path, body)
            .with_context(|| format!("Failed to write submission log: {}", self.path))?;
        tracing::info!("Logged submission ({} entries) to {}", records.len(), self.path);
        Ok(())
    }

    /// All records in storage (chronological) order.
    pub fn entries(&self) -> Vec<SubmissionRecord> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) => {
                tracing::debug!("No submission log at {}: {}", self.path, err);
                return Vec::new();
            }
        };
        match serde_json::from_str(&raw) {
            Ok(records) => records,
            Err(err) => {
                tracing::warn!("Ignoring unreadable submission log {}: {}", self.path, err);
                Vec::new()
            }
        }
    }

    /// Records in display order: most recent first. Stored order is untouched.
    pub fn list(&self) -> Vec<SubmissionRecord> {
        let mut records = self.entries();
        records.reverse();
        records
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }
}
