//! Analytics reconciler
//!
//! Merges the durable history of resolved feedback with aggregate counts to
//! answer "by kind", "average sentiment", and "per-entity performance over
//! time" queries. Statistics are computed over the fetched window only, not
//! the whole collection — a documented approximation carried over from the
//! original behavior.
//!
//! The durable store's canonical kind for mobile feedback (`app`) differs
//! from the display kind (`mobile`); translation happens here, at the read
//! boundary, in both directions.

use crate::config::AnalyticsSettings;
use crate::error::Result;
use crate::storage::{RecordOrder, RecordQuery, RecordStore};
use crate::types::{FeedbackKind, FeedbackRecord};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::debug;

/// Filter for an aggregate query
#[derive(Debug, Clone, Default)]
pub struct AggregateFilter {
    pub kind: Option<FeedbackKind>,
    pub driver_id: Option<String>,
    pub limit: Option<usize>,
}

/// Statistics over one fetched window of records
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedbackStatistics {
    pub total: usize,
    /// Counts keyed by display kind; never contains `app`
    #[serde(rename = "byType")]
    pub by_kind: BTreeMap<String, u64>,
    #[serde(rename = "averageSentiment")]
    pub average_sentiment: f64,
    #[serde(rename = "uniqueDrivers")]
    pub unique_driver_count: usize,
    #[serde(rename = "uniqueTrips")]
    pub unique_trip_count: usize,
}

impl FeedbackStatistics {
    /// Zeroed shape used when the durable store is unavailable or empty
    pub fn empty() -> Self {
        Self {
            total: 0,
            by_kind: BTreeMap::new(),
            average_sentiment: 0.0,
            unique_driver_count: 0,
            unique_trip_count: 0,
        }
    }
}

/// Records plus the statistics computed over them
#[derive(Debug, Clone)]
pub struct AggregateResult {
    pub records: Vec<FeedbackRecord>,
    pub statistics: FeedbackStatistics,
}

/// One point of an entity's performance trend line
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformancePoint {
    /// Calendar date (UTC) of processing, `YYYY-MM-DD`
    pub date: String,
    #[serde(rename = "sentimentScore")]
    pub sentiment_score: f64,
    /// Entity reputation at write time
    #[serde(rename = "driverScore")]
    pub reputation_at_time: Option<f64>,
    /// Display kind
    #[serde(rename = "type")]
    pub kind: String,
}

/// Read-side view over the durable record store
#[derive(Clone)]
pub struct AnalyticsReconciler {
    store: Arc<dyn RecordStore>,
    limits: AnalyticsSettings,
}

impl AnalyticsReconciler {
    pub fn new(store: Arc<dyn RecordStore>, limits: AnalyticsSettings) -> Self {
        Self { store, limits }
    }

    /// Query matching records newest-first and compute window statistics
    pub async fn aggregate(&self, filter: &AggregateFilter) -> Result<AggregateResult> {
        let limit = filter
            .limit
            .unwrap_or(self.limits.default_limit)
            .min(self.limits.max_limit);

        let records = self
            .store
            .query(&RecordQuery {
                kind: filter.kind,
                driver_id: filter.driver_id.clone(),
                limit: Some(limit),
                order: RecordOrder::NewestFirst,
            })
            .await?;

        let statistics = compute_statistics(&records);
        debug!(
            total = statistics.total,
            drivers = statistics.unique_driver_count,
            trips = statistics.unique_trip_count,
            "aggregate window computed"
        );

        Ok(AggregateResult {
            records,
            statistics,
        })
    }

    /// Every record for one entity, oldest-first, projected for trend lines
    pub async fn performance_series(&self, entity_id: &str) -> Result<Vec<PerformancePoint>> {
        let records = self
            .store
            .query(&RecordQuery {
                driver_id: Some(entity_id.to_string()),
                limit: Some(self.limits.max_limit),
                order: RecordOrder::OldestFirst,
                ..Default::default()
            })
            .await?;

        Ok(records
            .iter()
            .map(|record| PerformancePoint {
                date: record.processed_at.format("%Y-%m-%d").to_string(),
                sentiment_score: record.sentiment_score,
                reputation_at_time: record.reputation_at_write,
                kind: record.kind.display().to_string(),
            })
            .collect())
    }
}

/// Statistics over the fetched slice; display-kind keys, zero-safe average
fn compute_statistics(records: &[FeedbackRecord]) -> FeedbackStatistics {
    let mut by_kind: BTreeMap<String, u64> = BTreeMap::new();
    let mut drivers = HashSet::new();
    let mut trips = HashSet::new();
    let mut sentiment_sum = 0.0;

    for record in records {
        *by_kind.entry(record.kind.display().to_string()).or_insert(0) += 1;
        if let Some(driver_id) = &record.driver_id {
            drivers.insert(driver_id.as_str());
        }
        if let Some(trip_id) = &record.trip_id {
            trips.insert(trip_id.as_str());
        }
        sentiment_sum += record.sentiment_score;
    }

    let average_sentiment = if records.is_empty() {
        0.0
    } else {
        sentiment_sum / records.len() as f64
    };

    FeedbackStatistics {
        total: records.len(),
        by_kind,
        average_sentiment,
        unique_driver_count: drivers.len(),
        unique_trip_count: trips.len(),
    }
}
