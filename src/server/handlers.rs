//! HTTP endpoint handler functions.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Instant;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::warn;

use crate::upstream::ForwardOutcome;

use super::logging::{PredictOutcome, RecordEvent};
use super::types::*;
use super::ServerState;

/// Maximum request body size in bytes (1 MB).
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// `POST /api/predict`: relay the body to the first healthy backend.
///
/// Returns the backend's JSON unchanged with 200, a 502 aggregate failure
/// when every backend fails, or 500 when the inbound body is not JSON.
pub async fn predict_handler(
    axum::extract::State(state): axum::extract::State<Arc<ServerState>>,
    body: axum::body::Bytes,
) -> Response {
    let start = Instant::now();
    state.usage.ep_predict.fetch_add(1, Ordering::Relaxed);

    let payload: serde_json::Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => {
            warn!(error = %e, "rejecting unreadable prediction request");
            state.usage.record(&RecordEvent {
                outcome: PredictOutcome::BadRequest,
                status: StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
                target: None,
                attempts: 0,
                processing_time_ms: start.elapsed().as_millis() as u64,
            });
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                axum::Json(ErrorResponse {
                    error: e.to_string(),
                }),
            )
                .into_response();
        }
    };

    match state.forwarder.forward(&payload).await {
        ForwardOutcome::Success {
            target,
            attempts,
            body,
        } => {
            state.usage.record(&RecordEvent {
                outcome: PredictOutcome::Forwarded,
                status: StatusCode::OK.as_u16(),
                target: Some(target.as_str()),
                attempts,
                processing_time_ms: start.elapsed().as_millis() as u64,
            });
            (StatusCode::OK, axum::Json(body)).into_response()
        }
        ForwardOutcome::Exhausted(failure) => {
            state.usage.record(&RecordEvent {
                outcome: PredictOutcome::UpstreamFailure,
                status: StatusCode::BAD_GATEWAY.as_u16(),
                target: failure.details.as_ref().map(|d| d.target()),
                attempts: failure.attempts.len(),
                processing_time_ms: start.elapsed().as_millis() as u64,
            });
            (StatusCode::BAD_GATEWAY, axum::Json(failure)).into_response()
        }
    }
}

pub async fn health_handler(
    axum::extract::State(state): axum::extract::State<Arc<ServerState>>,
) -> impl axum::response::IntoResponse {
    state.usage.ep_health.fetch_add(1, Ordering::Relaxed);

    let response = HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        upstreams: state.forwarder.bases().to_vec(),
    };
    axum::Json(response)
}

pub async fn stats_handler(
    axum::extract::State(state): axum::extract::State<Arc<ServerState>>,
) -> impl axum::response::IntoResponse {
    state.usage.ep_stats.fetch_add(1, Ordering::Relaxed);

    let response = StatsResponse {
        uptime_seconds: state.start_time.elapsed().as_secs(),
        requests: RequestStats {
            predict_total: state.usage.total_requests.load(Ordering::Relaxed),
            forwarded: state.usage.forwarded.load(Ordering::Relaxed),
            upstream_failures: state.usage.upstream_failures.load(Ordering::Relaxed),
            bad_requests: state.usage.bad_requests.load(Ordering::Relaxed),
        },
        endpoints: EndpointStats {
            predict: state.usage.ep_predict.load(Ordering::Relaxed),
            health: state.usage.ep_health.load(Ordering::Relaxed),
            stats: state.usage.ep_stats.load(Ordering::Relaxed),
        },
    };
    axum::Json(response)
}
