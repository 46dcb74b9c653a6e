//! Shared key namespace for the ephemeral store
//!
//! The sentiment scorer (producer) and this subsystem (consumer) must agree
//! on these names byte-for-byte. Changing any of them is a breaking change
//! to the deployed worker.

use crate::types::FeedbackKind;

/// FIFO queue of pending feedback jobs, consumed by the scorer
pub const FEEDBACK_QUEUE: &str = "sentiment_feedback_queue";

/// Prefix of per-entity reputation score keys (no expiry)
pub const SCORE_PREFIX: &str = "driver_score:";

/// Prefix of per-entity cooldown markers (30-minute TTL, scorer-written)
pub const COOLDOWN_PREFIX: &str = "alert_cooldown:";

/// Match pattern enumerating every scored entity
pub const SCORE_PATTERN: &str = "driver_score:*";

/// Reputation score key for one entity
pub fn score_key(entity_id: &str) -> String {
    format!("{SCORE_PREFIX}{entity_id}")
}

/// Cooldown marker key for one entity
pub fn cooldown_key(entity_id: &str) -> String {
    format!("{COOLDOWN_PREFIX}{entity_id}")
}

/// Feature flag key for one feedback kind (display spelling: `app` maps
/// to the `mobile` flag)
pub fn flag_key(kind: FeedbackKind) -> String {
    format!("feature:{}:enabled", kind.display())
}

/// Extract the entity id from a score key, if it is one
pub fn entity_from_score_key(key: &str) -> Option<&str> {
    key.strip_prefix(SCORE_PREFIX).filter(|id| !id.is_empty())
}
