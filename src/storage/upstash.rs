//! Ephemeral store client for Upstash-style Redis REST endpoints
//!
//! Commands are POSTed to the base URL as a JSON array (`["GET", "key"]`)
//! with bearer authentication; responses arrive as `{"result": ...}` or
//! `{"error": "..."}`. The HTTP client carries a request timeout so no
//! store call can block past the configured bound.

use crate::config::EphemeralSettings;
use crate::error::{Result, RidepulseError};
use crate::storage::EphemeralStore;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// REST client for the ephemeral keyed store
pub struct UpstashStore {
    endpoint: String,
    token: String,
    client: reqwest::Client,
}

/// Wire shape of a command response
#[derive(Debug, Deserialize)]
struct CommandResponse {
    result: Option<Value>,
    error: Option<String>,
}

impl UpstashStore {
    /// Create a new client from settings
    pub fn new(settings: &EphemeralSettings) -> Result<Self> {
        if settings.url.is_empty() || settings.token.is_empty() {
            return Err(RidepulseError::Config(config::ConfigError::Message(
                "ephemeral store credentials are not set; provide \
                 RIDEPULSE__EPHEMERAL__URL and RIDEPULSE__EPHEMERAL__TOKEN"
                    .to_string(),
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(settings.timeout_ms))
            .build()
            .map_err(|e| RidepulseError::Internal(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            endpoint: settings.url.trim_end_matches('/').to_string(),
            token: settings.token.clone(),
            client,
        })
    }

    /// Connectivity check used at startup
    pub async fn ping(&self) -> Result<()> {
        let result = self.command(&["PING"]).await?;
        match result.as_str() {
            Some("PONG") => Ok(()),
            other => Err(RidepulseError::StoreUnavailable(format!(
                "PING returned unexpected result: {other:?}"
            ))),
        }
    }

    /// Execute one Redis command and return its raw result
    async fn command(&self, cmd: &[&str]) -> Result<Value> {
        let context = || {
            let mut parts = cmd.iter().take(2).copied().collect::<Vec<_>>();
            if cmd.len() > 2 {
                parts.push("...");
            }
            parts.join(" ")
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.token)
            .json(&cmd)
            .send()
            .await
            .map_err(|e| {
                warn!(command = %context(), error = %e, "ephemeral store request failed");
                if e.is_timeout() {
                    RidepulseError::StoreUnavailable(format!("{}: request timed out", context()))
                } else {
                    RidepulseError::StoreUnavailable(format!("{}: {e}", context()))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(command = %context(), %status, "ephemeral store rejected request");
            return Err(RidepulseError::StoreUnavailable(format!(
                "{}: endpoint returned {status}",
                context()
            )));
        }

        let body: CommandResponse = response.json().await.map_err(|e| {
            RidepulseError::StoreUnavailable(format!("{}: malformed response: {e}", context()))
        })?;

        if let Some(err) = body.error {
            return Err(RidepulseError::Internal(format!(
                "{}: command error: {err}",
                context()
            )));
        }

        debug!(command = %context(), "ephemeral store command ok");
        Ok(body.result.unwrap_or(Value::Null))
    }

    /// Integer result, tolerating the string encoding some proxies use
    fn expect_int(result: &Value, context: &str) -> Result<i64> {
        result
            .as_i64()
            .or_else(|| result.as_str().and_then(|s| s.parse().ok()))
            .ok_or_else(|| {
                RidepulseError::Internal(format!("{context}: expected integer, got {result}"))
            })
    }
}

#[async_trait]
impl EphemeralStore for UpstashStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let result = self.command(&["GET", key]).await?;
        match result {
            Value::Null => Ok(None),
            Value::String(s) => Ok(Some(s)),
            other => Ok(Some(other.to_string())),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.command(&["SET", key, value]).await?;
        Ok(())
    }

    async fn set_ex(&self, key: &str, ttl_secs: u64, value: &str) -> Result<()> {
        let ttl = ttl_secs.to_string();
        self.command(&["SETEX", key, &ttl, value]).await?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let result = self.command(&["EXISTS", key]).await?;
        Ok(Self::expect_int(&result, "EXISTS")? == 1)
    }

    async fn ttl(&self, key: &str) -> Result<Option<i64>> {
        let result = self.command(&["TTL", key]).await?;
        let secs = Self::expect_int(&result, "TTL")?;
        // -2 means no key, -1 means no expiry
        Ok(if secs >= 0 { Some(secs) } else { None })
    }

    async fn queue_push(&self, queue: &str, payload: &str) -> Result<u64> {
        let result = self.command(&["RPUSH", queue, payload]).await?;
        Ok(Self::expect_int(&result, "RPUSH")? as u64)
    }

    async fn queue_len(&self, queue: &str) -> Result<u64> {
        let result = self.command(&["LLEN", queue]).await?;
        Ok(Self::expect_int(&result, "LLEN")? as u64)
    }

    async fn scan_keys(&self, pattern: &str) -> Result<Vec<String>> {
        let result = self.command(&["KEYS", pattern]).await?;
        match result {
            Value::Array(items) => Ok(items
                .into_iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()),
            Value::Null => Ok(Vec::new()),
            other => Err(RidepulseError::Internal(format!(
                "KEYS: expected array, got {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(url: &str, token: &str) -> EphemeralSettings {
        EphemeralSettings {
            url: url.to_string(),
            token: token.to_string(),
            timeout_ms: 1_000,
        }
    }

    #[test]
    fn test_missing_credentials_rejected() {
        assert!(UpstashStore::new(&settings("", "")).is_err());
        assert!(UpstashStore::new(&settings("https://example.test", "")).is_err());
        assert!(UpstashStore::new(&settings("https://example.test", "tok")).is_ok());
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let store = UpstashStore::new(&settings("https://example.test/", "tok")).unwrap();
        assert_eq!(store.endpoint, "https://example.test");
    }

    #[test]
    fn test_command_response_parsing() {
        let ok: CommandResponse = serde_json::from_str(r#"{"result": "PONG"}"#).unwrap();
        assert_eq!(ok.result.unwrap(), Value::String("PONG".to_string()));
        assert!(ok.error.is_none());

        let err: CommandResponse = serde_json::from_str(r#"{"error": "WRONGTYPE"}"#).unwrap();
        assert_eq!(err.error.as_deref(), Some("WRONGTYPE"));
    }

    #[test]
    fn test_expect_int_tolerates_string_encoding() {
        assert_eq!(UpstashStore::expect_int(&serde_json::json!(3), "t").unwrap(), 3);
        assert_eq!(UpstashStore::expect_int(&serde_json::json!("17"), "t").unwrap(), 17);
        assert!(UpstashStore::expect_int(&serde_json::json!([1]), "t").is_err());
    }
}
