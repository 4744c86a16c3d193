use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::ApiError;

/// Key-value store holding access tokens, refresh tokens and gateway tickets.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), ApiError>;
    async fn get(&self, key: &str) -> Result<Option<String>, ApiError>;
    /// Read and delete in one step. Used for single-use credentials.
    async fn take(&self, key: &str) -> Result<Option<String>, ApiError>;
}

// ---------------------------------------------------------------------------
// In-memory implementation
// ---------------------------------------------------------------------------

struct Entry {
    value: String,
    expires_at: Instant,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

pub struct MemoryStore {
    data: Mutex<HashMap<String, Entry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            data: Mutex::new(HashMap::new()),
        }
    }

    /// Drop expired keys. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut data = self.data.lock();
        let before = data.len();
        data.retain(|_, entry| entry.is_live(now));
        before - data.len()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), ApiError> {
        let entry = Entry {
            value: value.to_string(),
            expires_at: Instant::now() + Duration::from_secs(ttl_secs),
        };
        self.data.lock().insert(key.to_string(), entry);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, ApiError> {
        let now = Instant::now();
        let data = self.data.lock();
        Ok(data
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.value.clone()))
    }

    async fn take(&self, key: &str) -> Result<Option<String>, ApiError> {
        let now = Instant::now();
        Ok(self
            .data
            .lock()
            .remove(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.value))
    }
}
