//! Feature flag gate
//!
//! Four independent boolean switches, one per feedback kind, stored as
//! individual keys in the ephemeral store. An absent key resolves to
//! enabled (fail-open); a stored value enables only when it equals the
//! string `"true"`. Partial updates write only the keys present, so
//! concurrent updates to different keys never clobber each other. No
//! cross-key atomicity is provided or required.

use crate::error::Result;
use crate::keys;
use crate::storage::EphemeralStore;
use crate::types::{FeatureFlagSet, FeatureFlagUpdate, FeedbackKind};
use std::sync::Arc;
use tracing::{info, warn};

/// Reads and writes the per-kind submission switches
#[derive(Clone)]
pub struct FeatureFlagGate {
    store: Arc<dyn EphemeralStore>,
}

impl FeatureFlagGate {
    pub fn new(store: Arc<dyn EphemeralStore>) -> Self {
        Self { store }
    }

    /// Resolve the full flag set
    pub async fn get_flags(&self) -> Result<FeatureFlagSet> {
        Ok(FeatureFlagSet {
            driver: self.resolve(FeedbackKind::Driver).await?,
            trip: self.resolve(FeedbackKind::Trip).await?,
            mobile: self.resolve(FeedbackKind::App).await?,
            marshal: self.resolve(FeedbackKind::Marshal).await?,
        })
    }

    /// Resolve one kind's switch
    pub async fn is_enabled(&self, kind: FeedbackKind) -> Result<bool> {
        self.resolve(kind).await
    }

    async fn resolve(&self, kind: FeedbackKind) -> Result<bool> {
        // Absent resolves enabled; anything but the literal "true" disables
        Ok(match self.store.get(&keys::flag_key(kind)).await? {
            None => true,
            Some(value) => value == "true",
        })
    }

    /// Apply a partial update, then return the full resolved set
    ///
    /// Each provided key is written independently; readers observe the old
    /// or new value per key, never a torn one.
    pub async fn set_flags(&self, update: &FeatureFlagUpdate) -> Result<FeatureFlagSet> {
        let writes = [
            (FeedbackKind::Driver, update.driver),
            (FeedbackKind::Trip, update.trip),
            (FeedbackKind::App, update.mobile),
            (FeedbackKind::Marshal, update.marshal),
        ];

        for (kind, value) in writes {
            if let Some(enabled) = value {
                self.store
                    .set(&keys::flag_key(kind), if enabled { "true" } else { "false" })
                    .await?;
            }
        }

        let resolved = self.get_flags().await?;
        info!(?resolved, "feature flags updated");
        Ok(resolved)
    }

    /// Write `"true"` to any absent flag key
    ///
    /// Run once at startup so dashboards see explicit values; a store
    /// outage here is logged and non-fatal.
    pub async fn seed_defaults(&self) -> Result<()> {
        for kind in FeedbackKind::ALL {
            let key = keys::flag_key(kind);
            if self.store.get(&key).await?.is_none() {
                if let Err(e) = self.store.set(&key, "true").await {
                    warn!(%key, error = %e, "could not seed flag default");
                    return Err(e);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::InMemoryStore;

    fn gate() -> (Arc<InMemoryStore>, FeatureFlagGate) {
        let store = Arc::new(InMemoryStore::new());
        (store.clone(), FeatureFlagGate::new(store))
    }

    #[tokio::test]
    async fn test_absent_flags_resolve_enabled() {
        let (_store, gate) = gate();
        let flags = gate.get_flags().await.unwrap();
        assert_eq!(flags, FeatureFlagSet::default());
    }

    #[tokio::test]
    async fn test_partial_update_leaves_others_untouched() {
        let (_store, gate) = gate();
        gate.set_flags(&FeatureFlagUpdate {
            marshal: Some(false),
            ..Default::default()
        })
        .await
        .unwrap();

        let flags = gate
            .set_flags(&FeatureFlagUpdate {
                driver: Some(false),
                ..Default::default()
            })
            .await
            .unwrap();

        assert!(!flags.driver);
        assert!(!flags.marshal);
        assert!(flags.trip);
        assert!(flags.mobile);
    }

    #[tokio::test]
    async fn test_non_true_values_disable() {
        let (store, gate) = gate();
        store
            .set("feature:driver:enabled", "garbage")
            .await
            .unwrap();
        assert!(!gate.is_enabled(FeedbackKind::Driver).await.unwrap());

        store.set("feature:driver:enabled", "true").await.unwrap();
        assert!(gate.is_enabled(FeedbackKind::Driver).await.unwrap());
    }

    #[tokio::test]
    async fn test_app_kind_uses_mobile_flag() {
        let (_store, gate) = gate();
        gate.set_flags(&FeatureFlagUpdate {
            mobile: Some(false),
            ..Default::default()
        })
        .await
        .unwrap();

        assert!(!gate.is_enabled(FeedbackKind::App).await.unwrap());
    }

    #[tokio::test]
    async fn test_concurrent_updates_to_different_keys() {
        let (_store, gate) = gate();
        let a = gate.clone();
        let b = gate.clone();

        let update_a = FeatureFlagUpdate {
            driver: Some(false),
            ..Default::default()
        };
        let update_b = FeatureFlagUpdate {
            trip: Some(false),
            ..Default::default()
        };
        let (ra, rb) = tokio::join!(a.set_flags(&update_a), b.set_flags(&update_b),);
        ra.unwrap();
        rb.unwrap();

        let flags = gate.get_flags().await.unwrap();
        assert!(!flags.driver);
        assert!(!flags.trip);
        assert!(flags.mobile);
        assert!(flags.marshal);
    }

    #[tokio::test]
    async fn test_seed_defaults_writes_only_absent_keys() {
        let (store, gate) = gate();
        store.set("feature:trip:enabled", "false").await.unwrap();

        gate.seed_defaults().await.unwrap();

        assert_eq!(
            store.get("feature:trip:enabled").await.unwrap().as_deref(),
            Some("false")
        );
        assert_eq!(
            store
                .get("feature:driver:enabled")
                .await
                .unwrap()
                .as_deref(),
            Some("true")
        );
    }
}
