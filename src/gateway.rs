//! Ingestion gateway
//!
//! Validates and normalizes a feedback submission, enforces the per-kind
//! feature flag, and appends the job to the scorer's FIFO queue. Acceptance
//! means "durably queued for processing", not "processed": there is no
//! completion tracking, no deduplication, and no retraction of a queued job.

use crate::error::{Result, RidepulseError};
use crate::flags::FeatureFlagGate;
use crate::keys;
use crate::storage::EphemeralStore;
use crate::types::{FeedbackJob, FeedbackKind};
use chrono::Utc;
use std::sync::Arc;
use tracing::info;

/// An unvalidated submission, as received from the client
#[derive(Debug, Clone, Default)]
pub struct Submission {
    /// Raw kind string; `app` and `mobile` are synonyms
    pub kind: Option<String>,
    pub driver_id: Option<String>,
    pub trip_id: Option<String>,
    pub comment: Option<String>,
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

/// Acknowledgement returned for an accepted submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitAck {
    /// The kind string as submitted (not normalized), echoed back
    pub kind: String,
    pub driver_id: Option<String>,
    /// Queue depth immediately after the push
    pub queue_depth: u64,
}

/// Accepts feedback and hands it off to the asynchronous scorer
#[derive(Clone)]
pub struct IngestionGateway {
    store: Arc<dyn EphemeralStore>,
    flags: FeatureFlagGate,
}

impl IngestionGateway {
    pub fn new(store: Arc<dyn EphemeralStore>, flags: FeatureFlagGate) -> Self {
        Self { store, flags }
    }

    /// Validate, gate, and enqueue one submission
    ///
    /// Resubmitting identical content creates a second independent job;
    /// exactly-once semantics are an explicit non-goal.
    pub async fn submit(&self, submission: Submission) -> Result<SubmitAck> {
        let raw_kind = match submission.kind.as_deref() {
            Some(k) if !k.is_empty() => k,
            _ => {
                return Err(RidepulseError::Validation(
                    "missing required fields: comment and type are required".to_string(),
                ))
            }
        };
        let comment = match submission.comment.as_deref() {
            Some(c) if !c.is_empty() => c,
            _ => {
                return Err(RidepulseError::Validation(
                    "missing required fields: comment and type are required".to_string(),
                ))
            }
        };

        let kind = FeedbackKind::parse(raw_kind)?;

        if kind.requires_driver_id() && submission.driver_id.is_none() {
            return Err(RidepulseError::Validation(
                "driverId is required for driver and trip feedback".to_string(),
            ));
        }

        if !self.flags.is_enabled(kind).await? {
            return Err(RidepulseError::FeatureDisabled(capitalize(kind.display())));
        }

        let job = FeedbackJob {
            kind,
            driver_id: submission.driver_id.clone(),
            trip_id: submission.trip_id,
            comment: comment.to_string(),
            metadata: submission.metadata.unwrap_or_default(),
            submitted_at: Utc::now(),
        };

        let payload = serde_json::to_string(&job)?;
        let queue_depth = self.store.queue_push(keys::FEEDBACK_QUEUE, &payload).await?;

        info!(
            kind = %kind,
            driver_id = ?job.driver_id,
            comment_len = job.comment.len(),
            queue_depth,
            "feedback queued"
        );

        Ok(SubmitAck {
            kind: raw_kind.to_string(),
            driver_id: submission.driver_id,
            queue_depth,
        })
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
