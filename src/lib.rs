//! RidePulse - Reputation Cache and Alert Derivation for Rider Feedback
//!
//! A Rust service that collects rider feedback about drivers, trips, the
//! mobile application, and station marshals, hands it off to an asynchronous
//! sentiment scorer, and surfaces a live reputation and alerting view:
//! - Gated, validated ingestion onto a FIFO scoring queue
//! - Fast expiring per-entity reputation scores and cooldown markers
//! - A race-free, read-only "who needs attention now" alert feed
//! - Reconciliation against a durable, append-only feedback history
//!
//! # Architecture
//!
//! State lives in two external stores; the service itself is stateless
//! between requests:
//! - **Types**: feedback kinds, queued jobs, durable records, alert entries
//! - **Storage**: ephemeral keyed store (TTL-capable) and durable record
//!   store, behind trait seams with REST, in-memory, and libSQL backends
//! - **Components**: ingestion gateway, feature flag gate, score reader,
//!   alert engine, analytics reconciler
//! - **API**: axum HTTP surface consumed by dashboards and feedback forms
//!
//! # Example
//!
//! ```ignore
//! use ridepulse_core::{AlertEngine, InMemoryStore};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = Arc::new(InMemoryStore::new());
//!     let engine = AlertEngine::new(store, 2.5);
//!     let alerts = engine.derive_alerts().await?;
//!     println!("{} entities need attention", alerts.len());
//!     Ok(())
//! }
//! ```

pub mod alerts;
pub mod analytics;
pub mod api;
pub mod config;
pub mod error;
pub mod flags;
pub mod gateway;
pub mod keys;
pub mod reputation;
pub mod storage;
pub mod types;

// Re-export commonly used types
pub use alerts::AlertEngine;
pub use analytics::{AggregateFilter, AnalyticsReconciler, FeedbackStatistics};
pub use api::ApiServer;
pub use config::Settings;
pub use error::{Result, RidepulseError};
pub use flags::FeatureFlagGate;
pub use gateway::{IngestionGateway, Submission, SubmitAck};
pub use reputation::ScoreReader;
pub use storage::{
    libsql::LibsqlRecordStore, memory::InMemoryStore, upstash::UpstashStore, EphemeralStore,
    RecordOrder, RecordQuery, RecordStore,
};
pub use types::{
    AlertEntry, EntityScore, FeatureFlagSet, FeatureFlagUpdate, FeedbackJob, FeedbackKind,
    FeedbackRecord,
};
