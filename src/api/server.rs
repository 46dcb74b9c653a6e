//! HTTP server and route handlers

use crate::analytics::{AggregateFilter, AnalyticsReconciler, FeedbackStatistics, PerformancePoint};
use crate::alerts::AlertEngine;
use crate::config::Settings;
use crate::error::RidepulseError;
use crate::flags::FeatureFlagGate;
use crate::gateway::{IngestionGateway, Submission};
use crate::reputation::ScoreReader;
use crate::storage::{EphemeralStore, RecordStore};
use crate::types::{FeatureFlagSet, FeatureFlagUpdate, FeedbackKind, FeedbackRecord};
use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, warn};

/// Shared per-request state: the core components over injected store handles
#[derive(Clone)]
pub struct AppState {
    flags: FeatureFlagGate,
    gateway: IngestionGateway,
    reader: ScoreReader,
    alerts: AlertEngine,
    analytics: AnalyticsReconciler,
}

impl AppState {
    pub fn new(
        settings: &Settings,
        ephemeral: Arc<dyn EphemeralStore>,
        durable: Arc<dyn RecordStore>,
    ) -> Self {
        let flags = FeatureFlagGate::new(ephemeral.clone());
        let threshold = settings.alerting.threshold;
        Self {
            flags: flags.clone(),
            gateway: IngestionGateway::new(ephemeral.clone(), flags),
            reader: ScoreReader::new(ephemeral.clone(), threshold),
            alerts: AlertEngine::new(ephemeral, threshold),
            analytics: AnalyticsReconciler::new(durable, settings.analytics.clone()),
        }
    }
}

/// API server
pub struct ApiServer {
    addr: SocketAddr,
    state: AppState,
}

impl ApiServer {
    pub fn new(
        settings: &Settings,
        ephemeral: Arc<dyn EphemeralStore>,
        durable: Arc<dyn RecordStore>,
    ) -> crate::error::Result<Self> {
        Ok(Self {
            addr: settings.server.addr()?,
            state: AppState::new(settings, ephemeral, durable),
        })
    }

    /// Build the router; exposed for in-process tests
    pub fn router(state: AppState) -> Router {
        Router::new()
            .route("/health", get(health_handler))
            .route("/api/config/features", get(get_features_handler))
            .route("/api/config/features", put(put_features_handler))
            .route("/feedback", post(post_feedback_handler))
            .route("/api/drivers/scores", get(driver_scores_handler))
            .route("/api/drivers/:driver_id/score", get(driver_score_handler))
            .route("/api/alerts", get(alerts_handler))
            .route("/api/analytics/feedback", get(analytics_feedback_handler))
            .route(
                "/api/analytics/drivers/:driver_id/performance",
                get(driver_performance_handler),
            )
            .route("/api/analytics/:kind", get(analytics_by_kind_handler))
            .with_state(state)
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http())
    }

    /// Bind and serve until ctrl-c or SIGTERM
    pub async fn serve(self) -> anyhow::Result<()> {
        let router = Self::router(self.state);
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        info!("API server listening on http://{}", self.addr);

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        info!("API server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("shutdown requested (ctrl-c)"),
        _ = terminate => info!("shutdown requested (SIGTERM)"),
    }
}

/// Error wrapper rendering the core taxonomy as HTTP responses
#[derive(Debug)]
pub struct ApiError(pub RidepulseError);

impl ApiError {
    fn status(&self) -> StatusCode {
        match &self.0 {
            RidepulseError::Validation(_) | RidepulseError::UnknownKind(_) => {
                StatusCode::BAD_REQUEST
            }
            RidepulseError::FeatureDisabled(_) => StatusCode::FORBIDDEN,
            RidepulseError::NotFound(_) => StatusCode::NOT_FOUND,
            RidepulseError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<RidepulseError> for ApiError {
    fn from(err: RidepulseError) -> Self {
        ApiError(err)
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(kind = self.0.kind(), "request failed: {}", self.0);
        } else {
            warn!(kind = self.0.kind(), "request rejected: {}", self.0);
        }
        let body = ErrorBody {
            error: self.0.kind(),
            message: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

// ---------------------------------------------------------------------------
// Health

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: String,
    service: String,
    version: String,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        service: "ridepulse".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ---------------------------------------------------------------------------
// Feature flags

#[derive(Debug, Serialize)]
struct FeaturesResponse {
    features: FeatureFlagSet,
}

async fn get_features_handler(
    State(state): State<AppState>,
) -> Result<Json<FeaturesResponse>, ApiError> {
    let features = state.flags.get_flags().await?;
    Ok(Json(FeaturesResponse { features }))
}

#[derive(Debug, Deserialize)]
struct UpdateFeaturesRequest {
    features: FeatureFlagUpdate,
}

#[derive(Debug, Serialize)]
struct UpdateFeaturesResponse {
    features: FeatureFlagSet,
    message: String,
}

async fn put_features_handler(
    State(state): State<AppState>,
    payload: Result<Json<UpdateFeaturesRequest>, JsonRejection>,
) -> Result<Json<UpdateFeaturesResponse>, ApiError> {
    let Json(request) = payload.map_err(|e| {
        RidepulseError::Validation(format!(
            "expected body {{ features: {{ driver?, trip?, mobile?, marshal? }} }}: {e}"
        ))
    })?;

    let features = state.flags.set_flags(&request.features).await?;
    Ok(Json(UpdateFeaturesResponse {
        features,
        message: "Feature flags updated successfully".to_string(),
    }))
}

// ---------------------------------------------------------------------------
// Feedback submission

#[derive(Debug, Deserialize)]
struct SubmitFeedbackRequest {
    #[serde(rename = "type")]
    kind: Option<String>,
    #[serde(rename = "driverId")]
    driver_id: Option<String>,
    #[serde(rename = "tripId")]
    trip_id: Option<String>,
    comment: Option<String>,
    metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

#[derive(Debug, Serialize)]
struct SubmitFeedbackResponse {
    message: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(rename = "driverId")]
    driver_id: Option<String>,
    #[serde(rename = "queueLength")]
    queue_length: u64,
}

async fn post_feedback_handler(
    State(state): State<AppState>,
    payload: Result<Json<SubmitFeedbackRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SubmitFeedbackResponse>), ApiError> {
    let Json(request) = payload
        .map_err(|e| RidepulseError::Validation(format!("malformed feedback body: {e}")))?;

    let ack = state
        .gateway
        .submit(Submission {
            kind: request.kind,
            driver_id: request.driver_id,
            trip_id: request.trip_id,
            comment: request.comment,
            metadata: request.metadata,
        })
        .await?;

    // 202: accepted means durably queued, not processed
    Ok((
        StatusCode::ACCEPTED,
        Json(SubmitFeedbackResponse {
            message: "Feedback received and queued for processing".to_string(),
            kind: ack.kind,
            driver_id: ack.driver_id,
            queue_length: ack.queue_depth,
        }),
    ))
}

// ---------------------------------------------------------------------------
// Scores and alerts

#[derive(Debug, Serialize)]
struct DriverScoreEntry {
    #[serde(rename = "driverId")]
    driver_id: String,
    score: f64,
    #[serde(rename = "isAlerting")]
    is_alerting: bool,
    #[serde(rename = "hasActiveAlert")]
    has_active_alert: bool,
}

#[derive(Debug, Serialize)]
struct DriverScoresResponse {
    drivers: Vec<DriverScoreEntry>,
}

async fn driver_scores_handler(
    State(state): State<AppState>,
) -> Result<Json<DriverScoresResponse>, ApiError> {
    let entities = state.reader.list_entities().await?;
    let drivers = entities
        .into_iter()
        .map(|e| DriverScoreEntry {
            driver_id: e.entity_id,
            score: e.score,
            is_alerting: e.is_below_threshold,
            has_active_alert: e.is_below_threshold && e.has_active_cooldown,
        })
        .collect();
    Ok(Json(DriverScoresResponse { drivers }))
}

#[derive(Debug, Serialize)]
struct DriverScoreResponse {
    #[serde(rename = "driverId")]
    driver_id: String,
    score: f64,
    threshold: f64,
}

async fn driver_score_handler(
    State(state): State<AppState>,
    Path(driver_id): Path<String>,
) -> Result<Json<DriverScoreResponse>, ApiError> {
    match state.reader.entity_score(&driver_id).await? {
        Some(score) => Ok(Json(DriverScoreResponse {
            driver_id,
            score,
            threshold: state.reader.threshold(),
        })),
        None => Err(RidepulseError::NotFound(format!("driver score: {driver_id}")).into()),
    }
}

#[derive(Debug, Serialize)]
struct AlertWireEntry {
    #[serde(rename = "driverId")]
    driver_id: String,
    score: f64,
    threshold: f64,
    #[serde(rename = "alertTriggered")]
    alert_triggered: bool,
    #[serde(rename = "cooldownRemaining")]
    cooldown_remaining: Option<i64>,
    #[serde(rename = "cooldownMinutes")]
    cooldown_minutes: Option<i64>,
}

#[derive(Debug, Serialize)]
struct AlertsResponse {
    alerts: Vec<AlertWireEntry>,
    total: usize,
    threshold: f64,
}

async fn alerts_handler(State(state): State<AppState>) -> Result<Json<AlertsResponse>, ApiError> {
    // A store outage surfaces as 503; an empty feed is never fabricated
    let alerts = state.alerts.derive_alerts().await?;
    let threshold = state.alerts.threshold();
    let alerts: Vec<AlertWireEntry> = alerts
        .into_iter()
        .map(|a| AlertWireEntry {
            driver_id: a.entity_id,
            score: a.score,
            threshold: a.threshold,
            alert_triggered: a.triggered,
            cooldown_remaining: a.cooldown_remaining_seconds,
            cooldown_minutes: a.cooldown_minutes,
        })
        .collect();
    Ok(Json(AlertsResponse {
        total: alerts.len(),
        alerts,
        threshold,
    }))
}

// ---------------------------------------------------------------------------
// Analytics

#[derive(Debug, Deserialize)]
struct AnalyticsQuery {
    #[serde(rename = "type")]
    kind: Option<String>,
    #[serde(rename = "driverId")]
    driver_id: Option<String>,
    limit: Option<usize>,
}

#[derive(Debug, Serialize)]
struct AnalyticsResponse {
    feedback: Vec<FeedbackRecord>,
    statistics: FeedbackStatistics,
}

#[derive(Debug, Serialize)]
struct DegradedAnalyticsResponse {
    error: &'static str,
    message: String,
    feedback: Vec<FeedbackRecord>,
    statistics: FeedbackStatistics,
}

/// Render an aggregate result, degrading explicitly on durable-store outage
fn analytics_response(
    result: crate::error::Result<crate::analytics::AggregateResult>,
) -> Response {
    match result {
        Ok(aggregate) => Json(AnalyticsResponse {
            feedback: aggregate.records,
            statistics: aggregate.statistics,
        })
        .into_response(),
        Err(err @ RidepulseError::StoreUnavailable(_)) => {
            warn!("analytics degraded: {err}");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(DegradedAnalyticsResponse {
                    error: err.kind(),
                    message: err.to_string(),
                    feedback: Vec::new(),
                    statistics: FeedbackStatistics::empty(),
                }),
            )
                .into_response()
        }
        Err(err) => ApiError(err).into_response(),
    }
}

async fn analytics_feedback_handler(
    State(state): State<AppState>,
    query: Result<Query<AnalyticsQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(query) =
        query.map_err(|e| RidepulseError::Validation(format!("malformed query: {e}")))?;

    let kind = match query.kind.as_deref() {
        Some(raw) => Some(FeedbackKind::parse(raw)?),
        None => None,
    };

    let result = state
        .analytics
        .aggregate(&AggregateFilter {
            kind,
            driver_id: query.driver_id,
            limit: query.limit,
        })
        .await;
    Ok(analytics_response(result))
}

async fn analytics_by_kind_handler(
    State(state): State<AppState>,
    Path(raw_kind): Path<String>,
) -> Result<Response, ApiError> {
    let kind = FeedbackKind::parse(&raw_kind)?;
    let result = state
        .analytics
        .aggregate(&AggregateFilter {
            kind: Some(kind),
            ..Default::default()
        })
        .await;
    Ok(analytics_response(result))
}

#[derive(Debug, Serialize)]
struct PerformanceResponse {
    #[serde(rename = "driverId")]
    driver_id: String,
    performance: Vec<PerformancePoint>,
    #[serde(rename = "totalFeedback")]
    total_feedback: usize,
}

async fn driver_performance_handler(
    State(state): State<AppState>,
    Path(driver_id): Path<String>,
) -> Result<Json<PerformanceResponse>, ApiError> {
    let performance = state.analytics.performance_series(&driver_id).await?;
    Ok(Json(PerformanceResponse {
        driver_id,
        total_feedback: performance.len(),
        performance,
    }))
}
