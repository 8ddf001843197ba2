//! In-memory key-value store.
//!
//! Holds the same string encoding as the SQLite store, so tests exercise the
//! lenient decoding path. Writes can be made to fail on demand.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use super::StateStore;
use crate::error::{DatabaseError, Result};
use crate::state::CounterState;

#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-seeded with `state`.
    pub fn with_state(state: &CounterState) -> Self {
        let store = Self::new();
        store.write_entries(state);
        store
    }

    /// Make every subsequent `save` fail (or succeed again).
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Raw stored value, for inspecting the encoding.
    pub fn raw(&self, key: &str) -> Option<String> {
        self.lock().get(key).cloned()
    }

    /// Overwrite a raw stored value.
    pub fn set_raw(&self, key: &str, value: &str) {
        self.lock().insert(key.to_string(), value.to_string());
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.values.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn write_entries(&self, state: &CounterState) {
        let mut values = self.lock();
        for (key, value) in state.to_entries() {
            match value {
                Some(v) => {
                    values.insert(key.to_string(), v);
                }
                None => {
                    values.remove(key);
                }
            }
        }
    }
}

impl StateStore for MemoryStore {
    fn load(&self) -> Result<CounterState> {
        let values = self.lock();
        Ok(CounterState::from_lookup(|key| values.get(key).cloned()))
    }

    fn save(&self, state: &CounterState) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(DatabaseError::WriteFailed("memory store is read-only".into()).into());
        }
        self.write_entries(state);
        Ok(())
    }
}
