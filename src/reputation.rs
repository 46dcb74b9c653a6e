//! Score and cooldown read path
//!
//! Enumerates every entity with a live reputation score via a key-pattern
//! scan of the ephemeral store. The scan is intentional and acceptable only
//! while entity cardinality stays small; `MAX_SCANNED_ENTITIES` is the
//! documented ceiling, with truncation logged rather than failing the read.

use crate::error::Result;
use crate::keys;
use crate::storage::EphemeralStore;
use crate::types::EntityScore;
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::warn;

/// Upper bound on entities considered per enumeration
pub const MAX_SCANNED_ENTITIES: usize = 500;

/// Read-only view over live reputation scores and cooldown markers
#[derive(Clone)]
pub struct ScoreReader {
    store: Arc<dyn EphemeralStore>,
    threshold: f64,
}

impl ScoreReader {
    pub fn new(store: Arc<dyn EphemeralStore>, threshold: f64) -> Self {
        Self { store, threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Enumerate all scored entities, most concerning first
    ///
    /// Values that do not parse as finite floats are excluded; a bad score
    /// entry must never crash the listing.
    pub async fn list_entities(&self) -> Result<Vec<EntityScore>> {
        let mut score_keys = self.store.scan_keys(keys::SCORE_PATTERN).await?;
        score_keys.sort();
        if score_keys.len() > MAX_SCANNED_ENTITIES {
            warn!(
                total = score_keys.len(),
                ceiling = MAX_SCANNED_ENTITIES,
                "entity scan truncated; consider a secondary score index"
            );
            score_keys.truncate(MAX_SCANNED_ENTITIES);
        }

        let mut entities = Vec::with_capacity(score_keys.len());
        for key in &score_keys {
            let Some(entity_id) = keys::entity_from_score_key(key) else {
                continue;
            };
            let Some(raw) = self.store.get(key).await? else {
                // Deleted between scan and read; skip
                continue;
            };
            let score = match raw.parse::<f64>() {
                Ok(value) if value.is_finite() => value,
                _ => {
                    warn!(%key, value = %raw, "unparseable reputation score excluded");
                    continue;
                }
            };

            let has_active_cooldown = self.store.exists(&keys::cooldown_key(entity_id)).await?;
            entities.push(EntityScore {
                entity_id: entity_id.to_string(),
                score,
                is_below_threshold: score < self.threshold,
                has_active_cooldown,
            });
        }

        entities.sort_by(|a, b| {
            a.score
                .partial_cmp(&b.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.entity_id.cmp(&b.entity_id))
        });
        Ok(entities)
    }

    /// Read one entity's score; `None` when the entity has no live state
    pub async fn entity_score(&self, entity_id: &str) -> Result<Option<f64>> {
        match self.store.get(&keys::score_key(entity_id)).await? {
            Some(raw) => match raw.parse::<f64>() {
                Ok(value) if value.is_finite() => Ok(Some(value)),
                _ => {
                    warn!(entity_id, value = %raw, "unparseable reputation score");
                    Ok(None)
                }
            },
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::InMemoryStore;

    async fn reader_with_scores(scores: &[(&str, &str)]) -> (Arc<InMemoryStore>, ScoreReader) {
        let store = Arc::new(InMemoryStore::new());
        for (id, score) in scores {
            store.set(&keys::score_key(id), score).await.unwrap();
        }
        let reader = ScoreReader::new(store.clone(), 2.5);
        (store, reader)
    }

    #[tokio::test]
    async fn test_entities_sorted_ascending_by_score() {
        let (_store, reader) =
            reader_with_scores(&[("a", "1.2"), ("b", "0.9"), ("c", "2.4")]).await;
        let entities = reader.list_entities().await.unwrap();
        let ids: Vec<&str> = entities.iter().map(|e| e.entity_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
    }

    #[tokio::test]
    async fn test_score_ties_break_by_entity_id() {
        let (_store, reader) =
            reader_with_scores(&[("z", "1.0"), ("a", "1.0"), ("m", "1.0")]).await;
        let entities = reader.list_entities().await.unwrap();
        let ids: Vec<&str> = entities.iter().map(|e| e.entity_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "m", "z"]);
    }

    #[tokio::test]
    async fn test_unparseable_scores_excluded() {
        let (_store, reader) = reader_with_scores(&[
            ("good", "3.1"),
            ("garbage", "not-a-number"),
            ("nan", "NaN"),
            ("inf", "inf"),
        ])
        .await;
        let entities = reader.list_entities().await.unwrap();
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].entity_id, "good");
    }

    #[tokio::test]
    async fn test_threshold_and_cooldown_flags() {
        let (store, reader) = reader_with_scores(&[("low", "1.8"), ("high", "3.1")]).await;
        store.set_ex(&keys::cooldown_key("low"), 600, "1").await.unwrap();

        let entities = reader.list_entities().await.unwrap();
        assert_eq!(entities[0].entity_id, "low");
        assert!(entities[0].is_below_threshold);
        assert!(entities[0].has_active_cooldown);
        assert!(!entities[1].is_below_threshold);
        assert!(!entities[1].has_active_cooldown);
    }

    #[tokio::test]
    async fn test_single_entity_lookup() {
        let (_store, reader) = reader_with_scores(&[("d1", "4.2")]).await;
        assert_eq!(reader.entity_score("d1").await.unwrap(), Some(4.2));
        assert_eq!(reader.entity_score("d2").await.unwrap(), None);
    }
}
