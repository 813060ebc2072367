//! Append-only log of completed timers, newest first.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::StorageError;
use crate::storage::{KeyValueStore, PersistenceGateway};
use crate::timer::model::{next_id, now_ms};
use crate::timer::TimerWithStatus;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: String,
    pub timer_name: String,
    pub category: String,
    /// The timer's original duration in seconds.
    pub duration: u64,
    /// Epoch milliseconds.
    pub completed_at: i64,
}

impl HistoryEntry {
    /// Entry for a timer completing now.
    pub fn completed(timer: &TimerWithStatus) -> Self {
        Self {
            id: next_id(),
            timer_name: timer.timer.name.clone(),
            category: timer.timer.category.clone(),
            duration: timer.timer.duration,
            completed_at: now_ms(),
        }
    }
}

pub struct HistoryLog<S> {
    gateway: PersistenceGateway<S>,
}

impl<S: KeyValueStore> HistoryLog<S> {
    pub fn new(gateway: PersistenceGateway<S>) -> Self {
        Self { gateway }
    }

    /// Prepend `entry` and write the full list back.
    ///
    /// A malformed stored list is discarded and replaced.
    pub fn append(&self, entry: HistoryEntry) -> Result<(), StorageError> {
        let mut history = match self.gateway.read_history() {
            Ok(history) => history,
            Err(e) if e.is_malformed() => {
                warn!(error = %e, "discarding unreadable history");
                Vec::new()
            }
            Err(e) => return Err(e),
        };
        history.insert(0, entry);
        self.gateway.write_history(&history)
    }

    /// Build and append the entry for a completed timer.
    pub fn record_completion(&self, timer: &TimerWithStatus) -> Result<HistoryEntry, StorageError> {
        let entry = HistoryEntry::completed(timer);
        self.append(entry.clone())?;
        Ok(entry)
    }

    /// Entries newest first; empty when missing or unreadable.
    pub fn load_all(&self) -> Vec<HistoryEntry> {
        match self.gateway.read_history() {
            Ok(history) => history,
            Err(e) => {
                warn!(error = %e, "failed to load history");
                Vec::new()
            }
        }
    }
}
