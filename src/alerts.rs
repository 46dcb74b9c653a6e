//! Alert derivation engine
//!
//! Combines live reputation scores, the configured threshold, and cooldown
//! state into a sorted, de-duplicated alert feed. The read path is strictly
//! read-only over cooldown state: the trigger decision (and its 30-minute
//! suppression window) is made exactly once, at write time, by the scorer.
//! Polling this engine any number of times has no side effects.
//!
//! An unreachable ephemeral store surfaces `StoreUnavailable`; the feed is
//! never silently replaced by a fabricated "all clear".

use crate::error::Result;
use crate::keys;
use crate::reputation::ScoreReader;
use crate::storage::EphemeralStore;
use crate::types::AlertEntry;
use std::sync::Arc;

/// Derives the "who needs attention now" feed
#[derive(Clone)]
pub struct AlertEngine {
    store: Arc<dyn EphemeralStore>,
    reader: ScoreReader,
    threshold: f64,
}

impl AlertEngine {
    pub fn new(store: Arc<dyn EphemeralStore>, threshold: f64) -> Self {
        let reader = ScoreReader::new(store.clone(), threshold);
        Self {
            store,
            reader,
            threshold,
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Compute the current alert feed
    ///
    /// Entities with a score strictly below the threshold appear exactly
    /// once, sorted ascending by score (ties by entity id). A cooldown
    /// marker means the scorer fired an alert within the last 30 minutes.
    pub async fn derive_alerts(&self) -> Result<Vec<AlertEntry>> {
        let entities = self.reader.list_entities().await?;

        let mut alerts = Vec::new();
        for entity in entities {
            if entity.score >= self.threshold {
                continue;
            }

            let cooldown_key = keys::cooldown_key(&entity.entity_id);
            let triggered = self.store.exists(&cooldown_key).await?;
            let remaining = if triggered {
                self.store.ttl(&cooldown_key).await?.filter(|secs| *secs > 0)
            } else {
                None
            };

            alerts.push(AlertEntry {
                entity_id: entity.entity_id,
                score: entity.score,
                threshold: self.threshold,
                triggered,
                cooldown_remaining_seconds: remaining,
                cooldown_minutes: remaining.map(|secs| (secs as u64).div_ceil(60) as i64),
            });
        }

        // list_entities is already score-ascending with id tie-break
        Ok(alerts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RidepulseError;
    use crate::storage::memory::InMemoryStore;
    use async_trait::async_trait;

    async fn engine_with_scores(
        threshold: f64,
        scores: &[(&str, &str)],
    ) -> (Arc<InMemoryStore>, AlertEngine) {
        let store = Arc::new(InMemoryStore::new());
        for (id, score) in scores {
            store.set(&keys::score_key(id), score).await.unwrap();
        }
        let engine = AlertEngine::new(store.clone(), threshold);
        (store, engine)
    }

    #[tokio::test]
    async fn test_scores_at_or_above_threshold_excluded() {
        let (_store, engine) =
            engine_with_scores(2.5, &[("at", "2.5"), ("above", "3.0"), ("below", "2.49")]).await;
        let alerts = engine.derive_alerts().await.unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].entity_id, "below");
    }

    #[tokio::test]
    async fn test_feed_sorted_ascending_by_score() {
        let (_store, engine) =
            engine_with_scores(2.5, &[("A", "1.2"), ("B", "0.9"), ("C", "2.4")]).await;
        let alerts = engine.derive_alerts().await.unwrap();
        let ids: Vec<&str> = alerts.iter().map(|a| a.entity_id.as_str()).collect();
        assert_eq!(ids, vec!["B", "A", "C"]);
    }

    #[tokio::test]
    async fn test_concrete_scenario_with_cooldowns() {
        let (store, engine) =
            engine_with_scores(2.5, &[("d1", "1.8"), ("d2", "3.1"), ("d3", "2.0")]).await;
        store.set_ex(&keys::cooldown_key("d1"), 120, "1").await.unwrap();

        let alerts = engine.derive_alerts().await.unwrap();
        assert_eq!(alerts.len(), 2);

        assert_eq!(alerts[0].entity_id, "d1");
        assert!(alerts[0].triggered);
        assert_eq!(alerts[0].cooldown_remaining_seconds, Some(120));
        assert_eq!(alerts[0].cooldown_minutes, Some(2));

        assert_eq!(alerts[1].entity_id, "d3");
        assert!(!alerts[1].triggered);
        assert_eq!(alerts[1].cooldown_minutes, None);
    }

    #[tokio::test]
    async fn test_cooldown_minutes_round_up() {
        let (store, engine) = engine_with_scores(2.5, &[("d1", "1.0")]).await;

        store.set_ex(&keys::cooldown_key("d1"), 600, "1").await.unwrap();
        let alerts = engine.derive_alerts().await.unwrap();
        assert_eq!(alerts[0].cooldown_minutes, Some(10));

        store.set_ex(&keys::cooldown_key("d1"), 601, "1").await.unwrap();
        let alerts = engine.derive_alerts().await.unwrap();
        assert_eq!(alerts[0].cooldown_minutes, Some(11));
    }

    #[tokio::test]
    async fn test_derivation_is_read_only_over_cooldowns() {
        let (store, engine) = engine_with_scores(2.5, &[("d1", "1.0"), ("d2", "2.0")]).await;
        store.set_ex(&keys::cooldown_key("d1"), 300, "1").await.unwrap();

        for _ in 0..5 {
            engine.derive_alerts().await.unwrap();
        }

        // Polling never set a marker for d2 nor cleared d1's
        assert!(store.exists(&keys::cooldown_key("d1")).await.unwrap());
        assert!(!store.exists(&keys::cooldown_key("d2")).await.unwrap());
    }

    /// Store stub whose every call fails, standing in for an outage
    struct UnreachableStore;

    #[async_trait]
    impl EphemeralStore for UnreachableStore {
        async fn get(&self, _key: &str) -> Result<Option<String>> {
            Err(RidepulseError::StoreUnavailable("connection refused".into()))
        }
        async fn set(&self, _key: &str, _value: &str) -> Result<()> {
            Err(RidepulseError::StoreUnavailable("connection refused".into()))
        }
        async fn set_ex(&self, _key: &str, _ttl_secs: u64, _value: &str) -> Result<()> {
            Err(RidepulseError::StoreUnavailable("connection refused".into()))
        }
        async fn exists(&self, _key: &str) -> Result<bool> {
            Err(RidepulseError::StoreUnavailable("connection refused".into()))
        }
        async fn ttl(&self, _key: &str) -> Result<Option<i64>> {
            Err(RidepulseError::StoreUnavailable("connection refused".into()))
        }
        async fn queue_push(&self, _queue: &str, _payload: &str) -> Result<u64> {
            Err(RidepulseError::StoreUnavailable("connection refused".into()))
        }
        async fn queue_len(&self, _queue: &str) -> Result<u64> {
            Err(RidepulseError::StoreUnavailable("connection refused".into()))
        }
        async fn scan_keys(&self, _pattern: &str) -> Result<Vec<String>> {
            Err(RidepulseError::StoreUnavailable("connection refused".into()))
        }
    }

    #[tokio::test]
    async fn test_outage_surfaces_instead_of_empty_feed() {
        let engine = AlertEngine::new(Arc::new(UnreachableStore), 2.5);
        let err = engine.derive_alerts().await.unwrap_err();
        assert!(matches!(err, RidepulseError::StoreUnavailable(_)));
    }
}
