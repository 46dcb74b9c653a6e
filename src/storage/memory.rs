//! In-memory ephemeral store for tests and local development
//!
//! Mirrors the REST-backed store's observable behavior, including per-key
//! expiry. Expired keys are dropped lazily on access, so tests driving
//! `tokio::time` (paused clock) see deterministic TTL behavior.

use crate::error::Result;
use crate::storage::EphemeralStore;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use tokio::sync::RwLock;
use tokio::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<String, Entry>,
    queues: HashMap<String, VecDeque<String>>,
}

/// Shared in-memory key/value store with TTL support
#[derive(Debug, Default)]
pub struct InMemoryStore {
    inner: RwLock<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pop the head of a queue; the consumer side of the hand-off,
    /// used by tests standing in for the external scorer
    pub async fn queue_pop(&self, queue: &str) -> Option<String> {
        let mut inner = self.inner.write().await;
        inner.queues.get_mut(queue).and_then(VecDeque::pop_front)
    }
}

#[async_trait]
impl EphemeralStore for InMemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let now = Instant::now();
        let mut inner = self.inner.write().await;
        match inner.entries.get(key) {
            Some(entry) if entry.is_expired(now) => {
                inner.entries.remove(key);
                Ok(None)
            }
            Some(entry) => Ok(Some(entry.value.clone())),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: None,
            },
        );
        Ok(())
    }

    async fn set_ex(&self, key: &str, ttl_secs: u64, value: &str) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Some(Instant::now() + Duration::from_secs(ttl_secs)),
            },
        );
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.get(key).await?.is_some())
    }

    async fn ttl(&self, key: &str) -> Result<Option<i64>> {
        let now = Instant::now();
        let mut inner = self.inner.write().await;
        match inner.entries.get(key) {
            Some(entry) if entry.is_expired(now) => {
                inner.entries.remove(key);
                Ok(None)
            }
            Some(Entry {
                expires_at: Some(at),
                ..
            }) => {
                // Whole seconds, rounded up, matching the store's TTL command
                let remaining = at.duration_since(now);
                let mut secs = remaining.as_secs() as i64;
                if remaining.subsec_nanos() > 0 {
                    secs += 1;
                }
                Ok(Some(secs))
            }
            _ => Ok(None),
        }
    }

    async fn queue_push(&self, queue: &str, payload: &str) -> Result<u64> {
        let mut inner = self.inner.write().await;
        let q = inner.queues.entry(queue.to_string()).or_default();
        q.push_back(payload.to_string());
        Ok(q.len() as u64)
    }

    async fn queue_len(&self, queue: &str) -> Result<u64> {
        let inner = self.inner.read().await;
        Ok(inner.queues.get(queue).map_or(0, VecDeque::len) as u64)
    }

    async fn scan_keys(&self, pattern: &str) -> Result<Vec<String>> {
        let now = Instant::now();
        let mut inner = self.inner.write().await;
        inner.entries.retain(|_, entry| !entry.is_expired(now));

        // Only prefix globs are needed by this subsystem
        let prefix = pattern.strip_suffix('*').unwrap_or(pattern);
        let mut keys: Vec<String> = inner
            .entries
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }
}
