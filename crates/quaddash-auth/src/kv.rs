//! Key-value store seam for the gate's per-email state.
//!
//! Rate-limit windows, pending challenges, and payment bookkeeping all live
//! behind this trait so the process-wide state has an explicit lifecycle and
//! can be swapped for a persistent store without touching callers.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};

pub trait KeyValue<T: Clone>: Send + Sync {
    fn get(&self, key: &str) -> Option<T>;
    fn put(&self, key: &str, value: T);
    fn remove(&self, key: &str) -> Option<T>;
    /// Schedule `key` for eviction once `at` passes. No-op for absent keys.
    /// A later `put` on the same key clears the deadline, so callers that
    /// rewrite an entry must re-arm it.
    fn expire(&self, key: &str, at: DateTime<Utc>);
}

struct Entry<T> {
    value: T,
    expires_at: Option<DateTime<Utc>>,
}

/// In-process backing store. Forgotten on restart, which also forgets all
/// outstanding rate-limit windows and unexpired challenges. Entries past
/// their deadline are evicted on the next read.
pub struct MemoryKv<T> {
    inner: RwLock<HashMap<String, Entry<T>>>,
}

impl<T> MemoryKv<T> {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }
}

impl<T> Default for MemoryKv<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Send + Sync> KeyValue<T> for MemoryKv<T> {
    fn get(&self, key: &str) -> Option<T> {
        let mut inner = self.inner.write().unwrap_or_else(|p| p.into_inner());
        let expired = match inner.get(key) {
            Some(entry) => entry.expires_at.is_some_and(|at| at <= Utc::now()),
            None => return None,
        };
        if expired {
            inner.remove(key);
            return None;
        }
        inner.get(key).map(|entry| entry.value.clone())
    }

    fn put(&self, key: &str, value: T) {
        self.inner
            .write()
            .unwrap_or_else(|p| p.into_inner())
            .insert(
                key.to_string(),
                Entry {
                    value,
                    expires_at: None,
                },
            );
    }

    fn remove(&self, key: &str) -> Option<T> {
        self.inner
            .write()
            .unwrap_or_else(|p| p.into_inner())
            .remove(key)
            .map(|entry| entry.value)
    }

    fn expire(&self, key: &str, at: DateTime<Utc>) {
        if let Some(entry) = self
            .inner
            .write()
            .unwrap_or_else(|p| p.into_inner())
            .get_mut(key)
        {
            entry.expires_at = Some(at);
        }
    }
}
