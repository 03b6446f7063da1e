//! Persistence gateway over a consumed key-value store.
//!
//! The gateway treats [`AppState`] as an opaque blob: it serializes the whole
//! state under one fixed key and never writes partial updates.
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;

use crate::KeyValueStore;
use crate::constants::STORAGE_KEY;
use crate::state::AppState;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Load/save/clear of the full application state blob.
#[derive(Debug, Clone)]
pub struct PersistenceGateway<K> {
    store: K,
}

impl<K: KeyValueStore> PersistenceGateway<K> {
    pub const fn new(store: K) -> Self {
        Self { store }
    }

    /// Borrow the underlying key-value store.
    pub const fn store(&self) -> &K {
        &self.store
    }

    /// Read the stored blob, `None` when nothing was saved yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails or the blob cannot be decoded.
    pub fn load(&self) -> Result<Option<AppState>, PersistenceError> {
        let raw = self
            .store
            .get(STORAGE_KEY)
            .map_err(|err| PersistenceError::Storage(err.to_string()))?;
        raw.map(|json| serde_json::from_str(&json))
            .transpose()
            .map_err(PersistenceError::from)
    }

    /// Write the whole state blob.
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be encoded or the store rejects the write.
    pub fn save(&self, state: &AppState) -> Result<(), PersistenceError> {
        let json = serde_json::to_string(state)?;
        self.store
            .set(STORAGE_KEY, &json)
            .map_err(|err| PersistenceError::Storage(err.to_string()))
    }

    /// Remove everything the store holds.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be cleared.
    pub fn clear(&self) -> Result<(), PersistenceError> {
        self.store
            .clear()
            .map_err(|err| PersistenceError::Storage(err.to_string()))
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MemoryStoreError {
    #[error("writes are disabled (key {key})")]
    WritesDisabled { key: String },
}

/// In-process key-value store.
///
/// Clones share the same map, so a caller can keep a handle for inspection
/// after handing the store to an engine. Writes can be switched off to
/// exercise failure paths.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<BTreeMap<String, String>>>,
    reject_writes: Arc<AtomicBool>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `set` and `clear` fail until re-enabled.
    pub fn set_reject_writes(&self, reject: bool) {
        self.reject_writes.store(reject, Ordering::SeqCst);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_writable(&self, key: &str) -> Result<(), MemoryStoreError> {
        if self.reject_writes.load(Ordering::SeqCst) {
            return Err(MemoryStoreError::WritesDisabled {
                key: key.to_string(),
            });
        }
        Ok(())
    }
}

impl KeyValueStore for MemoryStore {
    type Error = MemoryStoreError;

    fn get(&self, key: &str) -> Result<Option<String>, Self::Error> {
        Ok(self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), Self::Error> {
        self.check_writable(key)?;
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<(), Self::Error> {
        self.check_writable("*")?;
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::habit::{Habit, NewHabit};
    use chrono::DateTime;

    fn sample_state() -> AppState {
        let mut state = AppState::default();
        state.habits.push(Habit::from_new(
            "h1".into(),
            NewHabit::new("Read"),
            DateTime::from_timestamp_millis(1_700_000_000_000).unwrap(),
        ));
        state.progress.xp = 30;
        state.progress.streak_by_habit.insert("h1".into(), 3);
        state
    }

    #[test]
    fn save_then_load_round_trips() {
        let gateway = PersistenceGateway::new(MemoryStore::new());
        assert!(gateway.load().unwrap().is_none());

        let state = sample_state();
        gateway.save(&state).unwrap();
        assert_eq!(gateway.load().unwrap(), Some(state));
        assert!(gateway.store().get(STORAGE_KEY).unwrap().is_some());

        gateway.clear().unwrap();
        assert!(gateway.load().unwrap().is_none());
    }

    #[test]
    fn failures_surface_as_persistence_errors() {
        let store = MemoryStore::new();
        let gateway = PersistenceGateway::new(store.clone());

        store.set_reject_writes(true);
        assert!(matches!(
            gateway.save(&sample_state()),
            Err(PersistenceError::Storage(_))
        ));
        assert!(store.is_empty());

        store.set_reject_writes(false);
        store.set(STORAGE_KEY, "{not json").unwrap();
        assert!(matches!(
            gateway.load(),
            Err(PersistenceError::Serialization(_))
        ));
    }
}
