//! Core data types for the RidePulse feedback subsystem
//!
//! This module defines the structures shared across ingestion, the score
//! and cooldown read path, alert derivation, and analytics: feedback kinds,
//! queued jobs, durable records, and the derived alert entries.

use crate::error::{Result, RidepulseError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Classification of a feedback submission
///
/// `App` is the canonical kind for mobile-application feedback; the public
/// surface accepts and displays it as `mobile`. Everything that crosses the
/// queue or the durable store uses the canonical spelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackKind {
    /// Feedback about a specific driver
    Driver,
    /// Feedback about a specific trip (still attributed to its driver)
    Trip,
    /// Feedback about the mobile application
    #[serde(alias = "mobile")]
    App,
    /// Feedback about a station marshal
    Marshal,
}

impl FeedbackKind {
    /// All kinds, in flag-set order
    pub const ALL: [FeedbackKind; 4] = [
        FeedbackKind::Driver,
        FeedbackKind::Trip,
        FeedbackKind::App,
        FeedbackKind::Marshal,
    ];

    /// Parse a submitted kind string; `app` and `mobile` are synonyms
    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "driver" => Ok(FeedbackKind::Driver),
            "trip" => Ok(FeedbackKind::Trip),
            "app" | "mobile" => Ok(FeedbackKind::App),
            "marshal" => Ok(FeedbackKind::Marshal),
            other => Err(RidepulseError::UnknownKind(other.to_string())),
        }
    }

    /// Canonical spelling used on the queue and in the durable store
    pub fn canonical(&self) -> &'static str {
        match self {
            FeedbackKind::Driver => "driver",
            FeedbackKind::Trip => "trip",
            FeedbackKind::App => "app",
            FeedbackKind::Marshal => "marshal",
        }
    }

    /// Display spelling used by dashboards and the flag set
    pub fn display(&self) -> &'static str {
        match self {
            FeedbackKind::App => "mobile",
            other => other.canonical(),
        }
    }

    /// Driver and trip feedback must name the driver being scored
    pub fn requires_driver_id(&self) -> bool {
        matches!(self, FeedbackKind::Driver | FeedbackKind::Trip)
    }
}

impl std::fmt::Display for FeedbackKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.canonical())
    }
}

/// A validated feedback job queued for the external sentiment scorer
///
/// Serialized field names are the wire contract the scorer consumes;
/// immutable once enqueued, with no completion tracking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackJob {
    #[serde(rename = "type")]
    pub kind: FeedbackKind,
    #[serde(rename = "driverId")]
    pub driver_id: Option<String>,
    #[serde(rename = "tripId")]
    pub trip_id: Option<String>,
    pub comment: String,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
    #[serde(rename = "timestamp")]
    pub submitted_at: DateTime<Utc>,
}

/// One immutable, fully-resolved feedback document in the durable store
///
/// Written only by the external scorer after processing; `driver_ema_score`
/// is the entity's reputation at write time and is present only when the
/// item carried a driver id. Field names match the stored documents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackRecord {
    #[serde(rename = "type")]
    pub kind: FeedbackKind,
    #[serde(rename = "driverId")]
    pub driver_id: Option<String>,
    #[serde(rename = "tripId")]
    pub trip_id: Option<String>,
    pub comment: String,
    pub sentiment_score: f64,
    #[serde(rename = "driver_ema_score", skip_serializing_if = "Option::is_none")]
    pub reputation_at_write: Option<f64>,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
    pub processed_at: DateTime<Utc>,
}

/// Live reputation state for one entity, from the ephemeral store
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityScore {
    pub entity_id: String,
    pub score: f64,
    pub is_below_threshold: bool,
    pub has_active_cooldown: bool,
}

/// One entry in the derived alert feed; computed on demand, never persisted
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertEntry {
    pub entity_id: String,
    pub score: f64,
    pub threshold: f64,
    /// True when the scorer fired an alert within the cooldown window
    pub triggered: bool,
    pub cooldown_remaining_seconds: Option<i64>,
    pub cooldown_minutes: Option<i64>,
}

/// Fully-resolved feature flag set; absent keys resolve to enabled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureFlagSet {
    pub driver: bool,
    pub trip: bool,
    pub mobile: bool,
    pub marshal: bool,
}

impl FeatureFlagSet {
    /// Resolved value for a kind; `App` gates on the `mobile` flag
    pub fn is_enabled(&self, kind: FeedbackKind) -> bool {
        match kind {
            FeedbackKind::Driver => self.driver,
            FeedbackKind::Trip => self.trip,
            FeedbackKind::App => self.mobile,
            FeedbackKind::Marshal => self.marshal,
        }
    }
}

impl Default for FeatureFlagSet {
    /// Fail-open: every kind enabled
    fn default() -> Self {
        Self {
            driver: true,
            trip: true,
            mobile: true,
            marshal: true,
        }
    }
}

/// Partial flag update; only the keys present are written
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct FeatureFlagUpdate {
    pub driver: Option<bool>,
    pub trip: Option<bool>,
    pub mobile: Option<bool>,
    pub marshal: Option<bool>,
}

impl FeatureFlagUpdate {
    pub fn is_empty(&self) -> bool {
        self.driver.is_none()
            && self.trip.is_none()
            && self.mobile.is_none()
            && self.marshal.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_parse_accepts_synonyms() {
        assert_eq!(FeedbackKind::parse("app").unwrap(), FeedbackKind::App);
        assert_eq!(FeedbackKind::parse("mobile").unwrap(), FeedbackKind::App);
        assert_eq!(FeedbackKind::parse("driver").unwrap(), FeedbackKind::Driver);
        assert_eq!(FeedbackKind::parse("marshal").unwrap(), FeedbackKind::Marshal);
    }

    #[test]
    fn test_kind_parse_rejects_unknown() {
        let err = FeedbackKind::parse("vehicle").unwrap_err();
        assert!(matches!(err, RidepulseError::UnknownKind(_)));
    }

    #[test]
    fn test_kind_spellings() {
        assert_eq!(FeedbackKind::App.canonical(), "app");
        assert_eq!(FeedbackKind::App.display(), "mobile");
        assert_eq!(FeedbackKind::Trip.canonical(), "trip");
        assert_eq!(FeedbackKind::Trip.display(), "trip");
    }

    #[test]
    fn test_driver_id_requirement() {
        assert!(FeedbackKind::Driver.requires_driver_id());
        assert!(FeedbackKind::Trip.requires_driver_id());
        assert!(!FeedbackKind::App.requires_driver_id());
        assert!(!FeedbackKind::Marshal.requires_driver_id());
    }

    #[test]
    fn test_job_wire_format_matches_scorer_contract() {
        let job = FeedbackJob {
            kind: FeedbackKind::App,
            driver_id: None,
            trip_id: Some("t-42".to_string()),
            comment: "crashes on login".to_string(),
            metadata: serde_json::Map::new(),
            submitted_at: "2026-08-06T12:00:00Z".parse().unwrap(),
        };

        let wire: serde_json::Value = serde_json::to_value(&job).unwrap();
        assert_eq!(wire["type"], "app");
        assert_eq!(wire["tripId"], "t-42");
        assert_eq!(wire["driverId"], serde_json::Value::Null);
        assert_eq!(wire["comment"], "crashes on login");
        assert!(wire.get("timestamp").is_some());
    }

    #[test]
    fn test_record_deserializes_mobile_alias() {
        let raw = serde_json::json!({
            "type": "mobile",
            "driverId": null,
            "tripId": null,
            "comment": "nice update",
            "sentiment_score": 4.2,
            "metadata": {},
            "processed_at": "2026-08-06T12:00:00Z"
        });
        let record: FeedbackRecord = serde_json::from_value(raw).unwrap();
        assert_eq!(record.kind, FeedbackKind::App);
        assert!(record.reputation_at_write.is_none());
    }

    #[test]
    fn test_flag_set_default_is_fail_open() {
        let flags = FeatureFlagSet::default();
        for kind in FeedbackKind::ALL {
            assert!(flags.is_enabled(kind));
        }
    }

    #[test]
    fn test_app_gates_on_mobile_flag() {
        let flags = FeatureFlagSet {
            mobile: false,
            ..Default::default()
        };
        assert!(!flags.is_enabled(FeedbackKind::App));
        assert!(flags.is_enabled(FeedbackKind::Driver));
    }
}
