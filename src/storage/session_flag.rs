// Session flag: "has the overlay already played in this session" over a pluggable store.

use std::collections::HashMap;

use parking_lot::RwLock;
use thiserror::Error;
use tracing::debug;

use crate::config::SESSION_FLAG_VALUE;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("session storage unavailable: {0}")]
    Unavailable(String),
}

/// Ephemeral key-value capability scoped to one session.
pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// In-process store; lives as long as the value does.
#[derive(Default)]
pub struct MemorySessionStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries
            .write()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Store that rejects every access, e.g. storage disabled by the host.
pub struct UnavailableStore;

impl SessionStore for UnavailableStore {
    fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
        Err(StoreError::Unavailable("reads disabled".into()))
    }

    fn set(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("writes disabled".into()))
    }
}

/// Whether the flag under `key` is set. Storage failures read as "never ran".
pub fn has_run(store: &dyn SessionStore, key: &str) -> bool {
    match store.get(key) {
        Ok(value) => value.as_deref() == Some(SESSION_FLAG_VALUE),
        Err(e) => {
            debug!("session flag read failed key={}: {}", key, e);
            false
        }
    }
}

/// Set the flag under `key`. Failures are dropped.
pub fn mark_run(store: &dyn SessionStore, key: &str) {
    if let Err(e) = store.set(key, SESSION_FLAG_VALUE) {
        debug!("session flag write failed key={}: {}", key, e);
    }
}
