//! JSON persistence of the timer list and the history log.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::kv::KeyValueStore;
use crate::error::StorageError;
use crate::history::HistoryEntry;
use crate::timer::Timer;

pub const TIMERS_KEY: &str = "@timers";
pub const HISTORY_KEY: &str = "@timer_history";

/// Reads and writes the two persisted records, each a JSON array under a
/// fixed key. Every write replaces the whole array.
pub struct PersistenceGateway<S> {
    store: Arc<S>,
}

impl<S> Clone for PersistenceGateway<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: KeyValueStore> PersistenceGateway<S> {
    pub fn new(store: S) -> Self {
        Self::from_shared(Arc::new(store))
    }

    pub fn from_shared(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Empty when the key is missing; `Malformed` when the payload is not a
    /// valid timer array.
    pub fn read_timers(&self) -> Result<Vec<Timer>, StorageError> {
        self.read_list(TIMERS_KEY)
    }

    pub fn write_timers(&self, timers: &[Timer]) -> Result<(), StorageError> {
        self.write_list(TIMERS_KEY, timers)
    }

    pub fn read_history(&self) -> Result<Vec<HistoryEntry>, StorageError> {
        self.read_list(HISTORY_KEY)
    }

    pub fn write_history(&self, entries: &[HistoryEntry]) -> Result<(), StorageError> {
        self.write_list(HISTORY_KEY, entries)
    }

    fn read_list<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>, StorageError> {
        match self.store.get(key)? {
            Some(json) => serde_json::from_str(&json).map_err(|source| StorageError::Malformed {
                key: key.to_string(),
                source,
            }),
            None => Ok(Vec::new()),
        }
    }

    fn write_list<T: Serialize>(&self, key: &str, items: &[T]) -> Result<(), StorageError> {
        let json = serde_json::to_string(items).map_err(|source| StorageError::Encode {
            key: key.to_string(),
            source,
        })?;
        self.store.set(key, &json)
    }
}
