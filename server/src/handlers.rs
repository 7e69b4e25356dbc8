//! HTTP request handlers.

use axum::{
    Json,
    extract::State,
    http::{StatusCode, header},
    response::IntoResponse
};
use cache::CacheStats;
use dv_core::Provider;
use engine::AnalysisRequest;
use serde::Serialize;
use std::sync::Arc;

use crate::error::{Result, ServerError};
use crate::sse::event_stream;
use crate::state::AppState;

const REPORT_FILE_NAME: &str = "validation_report.txt";

#[derive(Debug, Serialize)]
pub struct ServiceInfo {
    pub message: &'static str,
    pub version: &'static str
}

/// GET /
pub async fn root() -> Json<ServiceInfo> {
    Json(ServiceInfo {
        message: "Discharge Summary Validator API",
        version: env!("CARGO_PKG_VERSION")
    })
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub cache_backend: &'static str,
    pub cache_connected: bool,
    pub redis_connected: bool,
    pub gemini_configured: bool,
    pub claude_configured: bool
}

/// GET /health
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let cache = state.orchestrator.cache();
    let registry = state.orchestrator.registry();
    let cache_connected = cache.is_connected().await;
    if !cache_connected {
        tracing::warn!(backend = cache.backend_kind(), "Cache health check failed");
    }

    Json(HealthResponse {
        status: "healthy",
        cache_backend: cache.backend_kind(),
        cache_connected,
        redis_connected: cache.backend_kind() == "redis" && cache_connected,
        gemini_configured: registry.is_configured(Provider::Gemini),
        claude_configured: registry.is_configured(Provider::Claude)
    })
}

/// POST /api/analyze/stream
///
/// Starts a run and streams `started`, `check_complete`, `analysis_complete`
/// and `error` events.
pub async fn analyze_stream(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AnalysisRequest>
) -> impl IntoResponse {
    tracing::info!(
        provider = %request.provider,
        content_bytes = request.content.len(),
        "Analysis requested"
    );
    event_stream(state.orchestrator.submit(request))
}

/// GET /api/cache/stats
pub async fn cache_stats(State(state): State<Arc<AppState>>) -> Json<CacheStats> {
    Json(state.orchestrator.cache().stats().await)
}

#[derive(Debug, Serialize)]
pub struct ClearResponse {
    pub success: bool,
    pub removed: u64,
    pub message: String
}

/// POST /api/cache/clear
pub async fn cache_clear(State(state): State<Arc<AppState>>) -> Result<Json<ClearResponse>> {
    let removed = state.orchestrator.cache().clear().await?;
    Ok(Json(ClearResponse {
        success: true,
        removed,
        message: format!("Cache cleared successfully ({removed} entries removed)")
    }))
}

fn latest_report(state: &AppState) -> Result<String> {
    state
        .orchestrator
        .latest_report_text()
        .ok_or_else(|| ServerError::NotFound("No report available".to_string()))
}

/// GET /api/report/latest
pub async fn report_latest(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse> {
    let report = latest_report(&state)?;
    Ok(([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], report))
}

/// GET /api/report/download
pub async fn report_download(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse> {
    let report = latest_report(&state)?;
    let disposition = format!("attachment; filename=\"{REPORT_FILE_NAME}\"");
    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition)
        ],
        report
    ))
}

/// GET /metrics
pub async fn metrics(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse> {
    let handle = state
        .metrics
        .as_ref()
        .ok_or_else(|| ServerError::NotFound("Metrics are disabled".to_string()))?;
    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        handle.render()
    ))
}
