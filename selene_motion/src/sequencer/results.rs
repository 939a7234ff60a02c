//! Worklist, per-entry results and their persistence.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::error::FailureKind;

/// What happened to one worklist entry.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "kebab-case")]
pub enum EntryResult {
    /// Not run yet.
    #[default]
    Pending,
    /// Excluded by the section filter.
    NotSelected,
    /// Skipped by the operator.
    Skipped,
    /// Measured full range.
    Range(f64),
    Failed(FailureKind),
}

impl EntryResult {
    /// Cell of the `range` column: a number, `FAIL`, or empty.
    pub fn range_cell(&self) -> String {
        match self {
            Self::Range(range) => format!("{range}"),
            Self::Failed(_) => "FAIL".to_string(),
            Self::Pending | Self::NotSelected | Self::Skipped => String::new(),
        }
    }

    /// Cell of the `status` column.
    pub fn status_cell(&self) -> String {
        match self {
            Self::Pending => "pending".to_string(),
            Self::NotSelected => "not-selected".to_string(),
            Self::Skipped => "skipped".to_string(),
            Self::Range(_) => "ok".to_string(),
            Self::Failed(kind) => format!("fail:{kind}"),
        }
    }

    pub const fn is_processed(&self) -> bool {
        matches!(self, Self::Skipped | Self::Range(_) | Self::Failed(_))
    }
}

impl fmt::Display for EntryResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Range(range) => write!(f, "{range:.3}"),
            Self::Failed(kind) => write!(f, "FAIL ({kind})"),
            other => f.write_str(&other.status_cell()),
        }
    }
}

/// One X/Z position of the worklist and its result.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorklistEntry {
    pub x: f64,
    pub z: f64,
    pub result: EntryResult,
}

impl WorklistEntry {
    pub fn new(x: f64, z: f64) -> Self {
        Self {
            x,
            z,
            result: EntryResult::Pending,
        }
    }
}

/// Ordered worklist with a result slot per entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultsTable {
    entries: Vec<WorklistEntry>,
}

impl ResultsTable {
    pub fn new(entries: Vec<WorklistEntry>) -> Self {
        Self { entries }
    }

    pub fn from_positions(positions: impl IntoIterator<Item = (f64, f64)>) -> Self {
        Self::new(
            positions
                .into_iter()
                .map(|(x, z)| WorklistEntry::new(x, z))
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[WorklistEntry] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&WorklistEntry> {
        self.entries.get(index)
    }

    pub fn result(&self, index: usize) -> Option<EntryResult> {
        self.entries.get(index).map(|entry| entry.result)
    }

    /// Record `result` for `index`. Out-of-range indices are ignored and
    /// reported as `false`.
    pub fn set_result(&mut self, index: usize, result: EntryResult) -> bool {
        match self.entries.get_mut(index) {
            Some(entry) => {
                entry.result = result;
                true
            }
            None => false,
        }
    }
}

#[derive(Debug, Error)]
pub enum ResultsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Results format error: {0}")]
    Format(String),
}

/// Where the table goes after every entry.
pub trait ResultsSink {
    fn persist(&mut self, table: &ResultsTable) -> Result<(), ResultsError>;
}

/// Discards every snapshot.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl ResultsSink for NullSink {
    fn persist(&mut self, _table: &ResultsTable) -> Result<(), ResultsError> {
        Ok(())
    }
}

/// Keeps every snapshot in memory. Clones share the same history.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    snapshots: Arc<Mutex<Vec<ResultsTable>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshots(&self) -> Vec<ResultsTable> {
        self.snapshots.lock().clone()
    }

    pub fn last(&self) -> Option<ResultsTable> {
        self.snapshots.lock().last().cloned()
    }
}

impl ResultsSink for MemorySink {
    fn persist(&mut self, table: &ResultsTable) -> Result<(), ResultsError> {
        self.snapshots.lock().push(table.clone());
        Ok(())
    }
}

/// Counts of a finished (or interrupted) run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RunSummary {
    pub total: usize,
    pub processed: usize,
    pub measured: usize,
    pub failed: usize,
    pub skipped: usize,
    pub not_selected: usize,
    pub pending: usize,
    /// Stopped between entries before the worklist was exhausted.
    pub interrupted: bool,
}

impl RunSummary {
    pub fn from_table(table: &ResultsTable, interrupted: bool) -> Self {
        let mut summary = Self {
            total: table.len(),
            interrupted,
            ..Self::default()
        };
        for entry in table.entries() {
            match entry.result {
                EntryResult::Pending => summary.pending += 1,
                EntryResult::NotSelected => summary.not_selected += 1,
                EntryResult::Skipped => summary.skipped += 1,
                EntryResult::Range(_) => summary.measured += 1,
                EntryResult::Failed(_) => summary.failed += 1,
            }
            if entry.result.is_processed() {
                summary.processed += 1;
            }
        }
        summary
    }

    /// Every selected entry was measured: nothing failed, skipped or left
    /// pending, and the run was not interrupted.
    pub fn all_measured(&self) -> bool {
        self.failed == 0 && self.skipped == 0 && self.pending == 0 && !self.interrupted
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} entries: {} measured, {} failed, {} skipped, {} not selected, {} pending",
            self.total, self.measured, self.failed, self.skipped, self.not_selected, self.pending
        )?;
        if self.interrupted {
            f.write_str(" (interrupted)")?;
        }
        Ok(())
    }
}
