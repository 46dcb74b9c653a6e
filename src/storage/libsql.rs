//! Durable record store on libSQL
//!
//! One append-only table of fully-resolved feedback records, queryable by
//! kind, entity, and processing time. The schema is created idempotently at
//! construction. Every operation is bounded by a timeout; expiry surfaces
//! `StoreUnavailable` instead of hanging a request.

use crate::error::{Result, RidepulseError};
use crate::storage::{RecordOrder, RecordQuery, RecordStore};
use crate::types::{FeedbackKind, FeedbackRecord};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{params, Builder, Connection, Database};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS feedback_records (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    kind TEXT NOT NULL,
    driver_id TEXT,
    trip_id TEXT,
    comment TEXT NOT NULL,
    sentiment_score REAL NOT NULL,
    reputation_at_write REAL,
    metadata TEXT NOT NULL DEFAULT '{}',
    processed_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_feedback_records_kind ON feedback_records(kind);
CREATE INDEX IF NOT EXISTS idx_feedback_records_driver ON feedback_records(driver_id);
CREATE INDEX IF NOT EXISTS idx_feedback_records_processed_at ON feedback_records(processed_at);
"#;

/// libSQL-backed append-only record store
pub struct LibsqlRecordStore {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
    timeout: Duration,
}

impl LibsqlRecordStore {
    /// Open (or create) a local database file
    pub async fn new_local(path: &str, timeout: Duration) -> Result<Self> {
        let db = Builder::new_local(path)
            .build()
            .await
            .map_err(|e| RidepulseError::StoreUnavailable(format!("open {path}: {e}")))?;

        let conn = db
            .connect()
            .map_err(|e| RidepulseError::StoreUnavailable(format!("connect: {e}")))?;
        let store = Self { db, conn, timeout };
        store.init_schema().await?;
        info!(path, "durable record store ready");
        Ok(store)
    }

    /// Open an in-memory database (tests and local development)
    pub async fn in_memory() -> Result<Self> {
        let db = Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| RidepulseError::StoreUnavailable(format!("open :memory:: {e}")))?;

        let conn = db
            .connect()
            .map_err(|e| RidepulseError::StoreUnavailable(format!("connect: {e}")))?;
        let store = Self {
            db,
            conn,
            timeout: Duration::from_secs(5),
        };
        store.init_schema().await?;
        Ok(store)
    }

    fn connect(&self) -> Result<Connection> {
        Ok(self.conn.clone())
    }

    /// Bound a store operation by the configured timeout
    async fn bounded<T, F>(&self, operation: &str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        tokio::time::timeout(self.timeout, fut).await.map_err(|_| {
            RidepulseError::StoreUnavailable(format!("{operation}: timed out"))
        })?
    }

    async fn init_schema(&self) -> Result<()> {
        let conn = self.connect()?;
        self.bounded("init_schema", async {
            for statement in SCHEMA.split(';').map(str::trim).filter(|s| !s.is_empty()) {
                conn.execute(statement, params![]).await.map_err(|e| {
                    RidepulseError::StoreUnavailable(format!("init_schema: {e}"))
                })?;
            }
            Ok(())
        })
        .await
    }

    fn row_to_record(row: &libsql::Row) -> Result<FeedbackRecord> {
        let kind_str: String = row
            .get(0)
            .map_err(|e| RidepulseError::Internal(format!("read kind column: {e}")))?;
        let kind = FeedbackKind::parse(&kind_str)
            .map_err(|_| RidepulseError::Internal(format!("stored unknown kind: {kind_str}")))?;

        let driver_id: Option<String> = row
            .get(1)
            .map_err(|e| RidepulseError::Internal(format!("read driver_id column: {e}")))?;
        let trip_id: Option<String> = row
            .get(2)
            .map_err(|e| RidepulseError::Internal(format!("read trip_id column: {e}")))?;
        let comment: String = row
            .get(3)
            .map_err(|e| RidepulseError::Internal(format!("read comment column: {e}")))?;
        let sentiment_score: f64 = row
            .get(4)
            .map_err(|e| RidepulseError::Internal(format!("read sentiment column: {e}")))?;
        let reputation_at_write: Option<f64> = row
            .get(5)
            .map_err(|e| RidepulseError::Internal(format!("read reputation column: {e}")))?;
        let metadata_json: String = row
            .get(6)
            .map_err(|e| RidepulseError::Internal(format!("read metadata column: {e}")))?;
        let processed_at_str: String = row
            .get(7)
            .map_err(|e| RidepulseError::Internal(format!("read processed_at column: {e}")))?;

        let metadata = serde_json::from_str(&metadata_json)?;
        let processed_at = DateTime::parse_from_rfc3339(&processed_at_str)
            .map_err(|e| RidepulseError::Internal(format!("stored timestamp invalid: {e}")))?
            .with_timezone(&Utc);

        Ok(FeedbackRecord {
            kind,
            driver_id,
            trip_id,
            comment,
            sentiment_score,
            reputation_at_write,
            metadata,
            processed_at,
        })
    }
}

#[async_trait]
impl RecordStore for LibsqlRecordStore {
    async fn append(&self, record: &FeedbackRecord) -> Result<()> {
        let conn = self.connect()?;
        let metadata_json = serde_json::to_string(&record.metadata)?;

        self.bounded("append", async {
            conn.execute(
                r#"
                INSERT INTO feedback_records (
                    kind, driver_id, trip_id, comment,
                    sentiment_score, reputation_at_write, metadata, processed_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
                params![
                    record.kind.canonical(),
                    record.driver_id.clone(),
                    record.trip_id.clone(),
                    record.comment.clone(),
                    record.sentiment_score,
                    record.reputation_at_write,
                    metadata_json.clone(),
                    record.processed_at.to_rfc3339(),
                ],
            )
            .await
            .map_err(|e| RidepulseError::StoreUnavailable(format!("append: {e}")))?;
            Ok(())
        })
        .await?;

        debug!(kind = %record.kind, driver_id = ?record.driver_id, "feedback record appended");
        Ok(())
    }

    async fn query(&self, query: &RecordQuery) -> Result<Vec<FeedbackRecord>> {
        let conn = self.connect()?;

        let mut sql = String::from(
            "SELECT kind, driver_id, trip_id, comment, sentiment_score, \
             reputation_at_write, metadata, processed_at FROM feedback_records",
        );
        let mut clauses = Vec::new();
        let mut values: Vec<libsql::Value> = Vec::new();

        if let Some(kind) = query.kind {
            clauses.push("kind = ?");
            values.push(libsql::Value::Text(kind.canonical().to_string()));
        }
        if let Some(driver_id) = &query.driver_id {
            clauses.push("driver_id = ?");
            values.push(libsql::Value::Text(driver_id.clone()));
        }
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(match query.order {
            RecordOrder::NewestFirst => " ORDER BY processed_at DESC, id DESC",
            RecordOrder::OldestFirst => " ORDER BY processed_at ASC, id ASC",
        });
        if let Some(limit) = query.limit {
            sql.push_str(" LIMIT ?");
            values.push(libsql::Value::Integer(limit as i64));
        }

        self.bounded("query", async {
            let mut rows = conn
                .query(&sql, libsql::params::Params::Positional(values))
                .await
                .map_err(|e| RidepulseError::StoreUnavailable(format!("query: {e}")))?;

            let mut records = Vec::new();
            while let Some(row) = rows
                .next()
                .await
                .map_err(|e| RidepulseError::StoreUnavailable(format!("query row: {e}")))?
            {
                records.push(Self::row_to_record(&row)?);
            }
            Ok(records)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(kind: FeedbackKind, driver: Option<&str>, hour: u32) -> FeedbackRecord {
        FeedbackRecord {
            kind,
            driver_id: driver.map(str::to_string),
            trip_id: None,
            comment: format!("comment at {hour:02}h"),
            sentiment_score: 3.0,
            reputation_at_write: driver.map(|_| 3.2),
            metadata: serde_json::Map::new(),
            processed_at: Utc.with_ymd_and_hms(2026, 8, 6, hour, 0, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_append_and_query_roundtrip() {
        let store = LibsqlRecordStore::in_memory().await.unwrap();
        store
            .append(&record(FeedbackKind::Driver, Some("d1"), 9))
            .await
            .unwrap();

        let all = store.query(&RecordQuery::default()).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].kind, FeedbackKind::Driver);
        assert_eq!(all[0].driver_id.as_deref(), Some("d1"));
        assert_eq!(all[0].reputation_at_write, Some(3.2));
    }

    #[tokio::test]
    async fn test_query_order_and_limit() {
        let store = LibsqlRecordStore::in_memory().await.unwrap();
        for hour in [9, 11, 10] {
            store
                .append(&record(FeedbackKind::Driver, Some("d1"), hour))
                .await
                .unwrap();
        }

        let newest = store
            .query(&RecordQuery {
                limit: Some(2),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(newest.len(), 2);
        assert_eq!(newest[0].comment, "comment at 11h");
        assert_eq!(newest[1].comment, "comment at 10h");

        let oldest = store
            .query(&RecordQuery {
                order: RecordOrder::OldestFirst,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(oldest[0].comment, "comment at 09h");
    }

    #[tokio::test]
    async fn test_query_filters_by_kind_and_driver() {
        let store = LibsqlRecordStore::in_memory().await.unwrap();
        store
            .append(&record(FeedbackKind::Driver, Some("d1"), 9))
            .await
            .unwrap();
        store
            .append(&record(FeedbackKind::App, None, 10))
            .await
            .unwrap();
        store
            .append(&record(FeedbackKind::Driver, Some("d2"), 11))
            .await
            .unwrap();

        let apps = store
            .query(&RecordQuery {
                kind: Some(FeedbackKind::App),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(apps.len(), 1);
        assert!(apps[0].driver_id.is_none());

        let d1 = store
            .query(&RecordQuery {
                driver_id: Some("d1".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(d1.len(), 1);
        assert_eq!(d1[0].driver_id.as_deref(), Some("d1"));
    }

    #[tokio::test]
    async fn test_on_disk_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.db");
        let path_str = path.to_str().unwrap();

        {
            let store = LibsqlRecordStore::new_local(path_str, Duration::from_secs(5))
                .await
                .unwrap();
            store
                .append(&record(FeedbackKind::Marshal, None, 9))
                .await
                .unwrap();
        }

        let reopened = LibsqlRecordStore::new_local(path_str, Duration::from_secs(5))
            .await
            .unwrap();
        let all = reopened.query(&RecordQuery::default()).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].kind, FeedbackKind::Marshal);
    }
}
