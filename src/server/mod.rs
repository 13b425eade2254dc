//! HTTP server for the prediction gateway.
//!
//! Exposes `POST /api/predict`, which relays prediction requests to the
//! configured backends through [`PredictionForwarder`], plus `GET /health`
//! and `GET /stats`.
//!
//! Features:
//! - Sequential failover across candidate backends
//! - JSONL access logging with size-based rotation (configurable via `max_access_log_bytes`)
//! - Permissive CORS so the dashboard can call the route from a browser
//! - Structured logging via [`tracing`]

pub mod handlers;
pub mod logging;
pub mod types;

pub use handlers::{health_handler, predict_handler, stats_handler, MAX_BODY_BYTES};
pub use logging::{PredictOutcome, RecordEvent, UsageMetrics};
pub use types::{
    EndpointStats, ErrorResponse, HealthResponse, RequestStats, ServerConfig, StatsResponse,
};

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use eyre::{Result, WrapErr};
use tracing::info;

use crate::upstream::{resolve_candidate_bases, PredictionForwarder};

// ---------------------------------------------------------------------------
// Server state
// ---------------------------------------------------------------------------

pub struct ServerState {
    pub config: ServerConfig,
    pub forwarder: PredictionForwarder,
    pub start_time: Instant,
    pub usage: UsageMetrics,
}

impl ServerState {
    pub fn new(config: ServerConfig) -> Self {
        let bases = resolve_candidate_bases(
            config.backend_url.as_deref(),
            &config.default_backend_url,
        );
        Self::with_forwarder(config, PredictionForwarder::with_bases(bases))
    }

    /// Build state around an existing forwarder (e.g. one with more than two candidates).
    pub fn with_forwarder(config: ServerConfig, forwarder: PredictionForwarder) -> Self {
        let usage = UsageMetrics::new(&config.access_log_path, config.max_access_log_bytes);
        Self {
            config,
            forwarder,
            start_time: Instant::now(),
            usage,
        }
    }
}

// ---------------------------------------------------------------------------
// HTTP server
// ---------------------------------------------------------------------------

/// Router with every gateway route and layer attached.
pub fn router(state: Arc<ServerState>) -> axum::Router {
    use axum::{
        extract::DefaultBodyLimit,
        routing::{get, post},
        Router,
    };
    use tower_http::cors::{Any, CorsLayer};

    // CORS layer — allow any origin so the dashboard can call the route directly
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/stats", get(handlers::stats_handler))
        .route("/api/predict", post(handlers::predict_handler))
        .layer(cors)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}

/// Run the HTTP server (blocking)
pub async fn run_server(config: ServerConfig) -> Result<()> {
    let bind_addr = config.bind_addr;
    let access_log = config.access_log_path.clone();
    let state = Arc::new(ServerState::new(config));
    let app = router(state.clone());

    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .wrap_err_with(|| format!("Failed to bind {}", bind_addr))?;
    info!(bind = %bind_addr, "healthgate server listening");
    info!("Endpoints: GET /health, GET /stats, POST /api/predict");
    for (idx, base) in state.forwarder.bases().iter().enumerate() {
        info!(priority = idx + 1, base = %base, "prediction backend candidate");
    }
    info!(access_log = %access_log);

    // Graceful shutdown on SIGTERM/SIGINT
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    let sigterm_recv = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let sigterm_recv = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT, shutting down gracefully"),
        _ = sigterm_recv => info!("received SIGTERM, shutting down gracefully"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upstream::DEFAULT_BACKEND_URL;

    #[test]
    fn test_health_response_serialization() {
        let response = HealthResponse {
            status: "ok".to_string(),
            version: "0.1.0".to_string(),
            uptime_seconds: 100,
            upstreams: vec![DEFAULT_BACKEND_URL.to_string()],
        };

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"status\":\"ok\""));
        assert!(json.contains("onrender.com"));
    }

    #[test]
    fn test_stats_response_serialization() {
        let response = StatsResponse {
            uptime_seconds: 3600,
            requests: RequestStats {
                predict_total: 100,
                forwarded: 90,
                upstream_failures: 8,
                bad_requests: 2,
            },
            endpoints: EndpointStats {
                predict: 100,
                health: 12,
                stats: 3,
            },
        };

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"predict_total\":100"));
        assert!(json.contains("\"upstream_failures\":8"));
        assert!(json.contains("\"predict\":100"));
    }

    #[test]
    fn test_server_config_default_uses_fallback_backend() {
        let config = ServerConfig::default();
        assert!(config.backend_url.is_none());
        assert_eq!(config.default_backend_url, DEFAULT_BACKEND_URL);
    }

    #[test]
    fn test_from_env_backend_aliases() {
        // Every env mutation lives in this one test so no other test observes it.
        let saved: Vec<(&str, Option<String>)> = crate::upstream::BACKEND_URL_ENV_VARS
            .iter()
            .map(|name| (*name, std::env::var(name).ok()))
            .collect();

        std::env::remove_var("API_URL");
        std::env::remove_var("NEXT_PUBLIC_API_URL");
        assert!(ServerConfig::from_env().backend_url.is_none());

        std::env::set_var("NEXT_PUBLIC_API_URL", "http://public:8000/api/predict");
        assert_eq!(
            ServerConfig::from_env().backend_url.as_deref(),
            Some("http://public:8000/api/predict")
        );

        std::env::set_var("API_URL", "http://private:9000/");
        let config = ServerConfig::from_env();
        assert_eq!(config.backend_url.as_deref(), Some("http://private:9000/"));

        let tmpdir = tempfile::tempdir().expect("failed to create temp dir");
        let state = ServerState::new(ServerConfig {
            access_log_path: tmpdir.path().join("a.jsonl").to_string_lossy().to_string(),
            ..config
        });
        assert_eq!(
            state.forwarder.bases(),
            &[
                "http://private:9000".to_string(),
                DEFAULT_BACKEND_URL.to_string()
            ]
        );

        // A blank API_URL falls through to the second name.
        std::env::set_var("API_URL", "   ");
        assert_eq!(
            ServerConfig::from_env().backend_url.as_deref(),
            Some("http://public:8000/api/predict")
        );

        for (name, value) in saved {
            match value {
                Some(v) => std::env::set_var(name, v),
                None => std::env::remove_var(name),
            }
        }
    }

    #[test]
    fn test_state_orders_configured_backend_first() {
        let tmpdir = tempfile::tempdir().expect("failed to create temp dir");
        let config = ServerConfig {
            backend_url: Some("http://localhost:8000/api/predict/".to_string()),
            access_log_path: tmpdir.path().join("a.jsonl").to_string_lossy().to_string(),
            ..Default::default()
        };
        let state = ServerState::new(config);
        assert_eq!(
            state.forwarder.bases(),
            &[
                "http://localhost:8000".to_string(),
                DEFAULT_BACKEND_URL.to_string()
            ]
        );
    }
}
