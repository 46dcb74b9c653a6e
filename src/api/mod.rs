//! HTTP API for dashboards and feedback forms
//!
//! Provides:
//! - Feedback submission (202 queued hand-off)
//! - Feature flag read/update
//! - Live score, alert, and analytics views
//!
//! Handlers map the core error taxonomy onto HTTP statuses; analytics
//! endpoints degrade to an explicit "unavailable" shape when the durable
//! store is down instead of crashing the dashboard.

pub mod server;

pub use server::{ApiServer, AppState};
