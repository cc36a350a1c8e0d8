//! Health and quota endpoints
//!
//! `/api/health` reports storage reachability and metrics quota usage.
//! Status is 200 while the store answers, 503 otherwise.

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use serde::Serialize;
use std::sync::Arc;

use super::{error_response, json_response};
use crate::server::AppState;
use crate::services::QuotaStatus;
use crate::types::EngineError;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub healthy: bool,
    /// 'online' or 'degraded'
    pub status: &'static str,
    pub version: &'static str,
    /// Uptime in seconds
    pub uptime: u64,
    pub timestamp: String,
    pub dev_mode: bool,
    pub storage: StorageHealth,
    /// Absent when metrics are served without a quota-limited client
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quota: Option<QuotaStatus>,
    pub verifications_in_flight: usize,
}

#[derive(Serialize)]
pub struct StorageHealth {
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub async fn health_check(state: Arc<AppState>) -> Response<Full<Bytes>> {
    let storage = match state.influencer_store.ping().await {
        Ok(()) => StorageHealth {
            connected: true,
            error: None,
        },
        Err(e) => StorageHealth {
            connected: false,
            error: Some(e.to_string()),
        },
    };
    let healthy = storage.connected;

    let response = HealthResponse {
        healthy,
        status: if healthy { "online" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        uptime: state.started_at.elapsed().as_secs(),
        timestamp: state.clock.now().to_rfc3339(),
        dev_mode: state.args.dev_mode,
        storage,
        quota: state.metrics.quota_status(),
        verifications_in_flight: state.queue.in_flight(),
    };

    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    json_response(status, response)
}

pub fn quota_status(state: Arc<AppState>) -> Response<Full<Bytes>> {
    match state.metrics.quota_status() {
        Some(status) => json_response(StatusCode::OK, status),
        None => error_response(EngineError::NotFound(
            "metrics provider has no quota".into(),
        )),
    }
}
