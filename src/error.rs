//! Error types for the RidePulse feedback subsystem
//!
//! This module provides structured error handling using thiserror for
//! error definitions and anyhow for propagation at the binary edge.
//!
//! The taxonomy mirrors the HTTP contract: validation and unknown-kind
//! failures are user-fixable (400), disabled features are distinguishable
//! from invalid input (403), and store outages are always surfaced (503)
//! rather than swallowed into fabricated empty responses.

use thiserror::Error;

/// Main error type for RidePulse operations
#[derive(Error, Debug)]
pub enum RidepulseError {
    /// Malformed or missing input in a request
    #[error("Validation error: {0}")]
    Validation(String),

    /// Feedback kind outside the known set
    #[error("Unknown feedback kind: {0}")]
    UnknownKind(String),

    /// Submissions of this kind are currently switched off
    #[error("{0} feedback is currently disabled")]
    FeatureDisabled(String),

    /// Requested entity has no live state
    #[error("Not found: {0}")]
    NotFound(String),

    /// Ephemeral or durable store unreachable or timed out
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Unexpected internal failure
    #[error("Internal error: {0}")]
    Internal(String),
}

impl RidepulseError {
    /// Machine-readable kind, stable across releases; used by API clients
    /// to distinguish "disabled" from "invalid" without parsing messages.
    pub fn kind(&self) -> &'static str {
        match self {
            RidepulseError::Validation(_) => "validation_error",
            RidepulseError::UnknownKind(_) => "unknown_kind",
            RidepulseError::FeatureDisabled(_) => "feature_disabled",
            RidepulseError::NotFound(_) => "not_found",
            RidepulseError::StoreUnavailable(_) => "store_unavailable",
            RidepulseError::Config(_) => "config_error",
            RidepulseError::Serialization(_) => "serialization_error",
            RidepulseError::Io(_) => "io_error",
            RidepulseError::Internal(_) => "internal_error",
        }
    }
}

/// Result type alias for RidePulse operations
pub type Result<T> = std::result::Result<T, RidepulseError>;

/// Convert anyhow::Error to RidepulseError
impl From<anyhow::Error> for RidepulseError {
    fn from(err: anyhow::Error) -> Self {
        RidepulseError::Internal(err.to_string())
    }
}
