//! Store clients for the two external sources of truth
//!
//! Provides trait seams and implementations for:
//! - the ephemeral keyed store holding the job queue, live reputation
//!   scores, and expiring cooldown markers
//! - the durable, append-only record store of fully-resolved feedback
//!
//! The subsystem holds no state of its own; every component receives these
//! handles at construction, which keeps instances isolated for testing.

pub mod libsql;
pub mod memory;
pub mod upstash;

use crate::error::Result;
use crate::types::{FeedbackKind, FeedbackRecord};
use async_trait::async_trait;

/// TTL-capable key/value store client
///
/// Implementations must bound every call with a timeout and surface
/// `StoreUnavailable` on expiry; no call may block indefinitely.
#[async_trait]
pub trait EphemeralStore: Send + Sync {
    /// Read a key; `None` when absent
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a key without expiry
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Write a key with an expiry in seconds
    ///
    /// This subsystem never writes cooldown markers itself; the method is
    /// the producer side of the contract, used by the scorer and by tests.
    async fn set_ex(&self, key: &str, ttl_secs: u64, value: &str) -> Result<()>;

    /// Key existence check
    async fn exists(&self, key: &str) -> Result<bool>;

    /// Remaining time-to-live in whole seconds, rounded up;
    /// `None` when the key is absent or has no expiry
    async fn ttl(&self, key: &str) -> Result<Option<i64>>;

    /// Append to the tail of a FIFO queue, returning the new depth
    async fn queue_push(&self, queue: &str, payload: &str) -> Result<u64>;

    /// Current queue depth
    async fn queue_len(&self, queue: &str) -> Result<u64>;

    /// Enumerate keys matching a glob pattern
    ///
    /// Full scan over the keyspace; acceptable only while entity
    /// cardinality stays small. Callers bound the result set themselves.
    async fn scan_keys(&self, pattern: &str) -> Result<Vec<String>>;
}

/// Ordering of record query results by processing time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOrder {
    NewestFirst,
    OldestFirst,
}

/// Filter for querying the durable record store
#[derive(Debug, Clone, Default)]
pub struct RecordQuery {
    /// Restrict to one feedback kind (canonical)
    pub kind: Option<FeedbackKind>,
    /// Restrict to one entity
    pub driver_id: Option<String>,
    /// Cap on returned rows; `None` means unbounded (entity series only)
    pub limit: Option<usize>,
    pub order: RecordOrder,
}

impl Default for RecordOrder {
    fn default() -> Self {
        RecordOrder::NewestFirst
    }
}

/// Append-only store of resolved feedback records
///
/// Records are created exclusively by the external scorer; this subsystem
/// only appends on the scorer's behalf (tests, tooling) and queries.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Append one resolved record; records are never mutated or deleted
    async fn append(&self, record: &FeedbackRecord) -> Result<()>;

    /// Query records matching the filter, in the requested order
    async fn query(&self, query: &RecordQuery) -> Result<Vec<FeedbackRecord>>;
}
