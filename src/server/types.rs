//! Response types and configuration for the prediction gateway.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

use crate::upstream::DEFAULT_BACKEND_URL;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to (defaults to 127.0.0.1:3000; use 0.0.0.0 to expose externally)
    pub bind_addr: SocketAddr,
    /// Configured prediction backend, tried before `default_backend_url`.
    pub backend_url: Option<String>,
    /// Fallback prediction backend, always the last candidate.
    pub default_backend_url: String,
    /// Path for JSONL access log
    pub access_log_path: String,
    /// Maximum access log file size in bytes before rotation (0 = no limit)
    pub max_access_log_bytes: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:3000"
                .parse()
                .expect("valid default bind address"),
            backend_url: None,
            default_backend_url: DEFAULT_BACKEND_URL.to_string(),
            access_log_path: "healthgate-access.jsonl".to_string(),
            max_access_log_bytes: 50 * 1024 * 1024, // 50 MB
        }
    }
}

impl ServerConfig {
    /// Default configuration with the backend taken from the environment.
    pub fn from_env() -> Self {
        Self {
            backend_url: crate::upstream::configured_base_from_env(),
            ..Default::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

/// Body of a 500 response for an unreadable inbound request.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    /// Candidate backend bases in the order they are tried.
    pub upstreams: Vec<String>,
}

/// Stats response
#[derive(Debug, Serialize, Deserialize)]
pub struct StatsResponse {
    pub uptime_seconds: u64,
    pub requests: RequestStats,
    pub endpoints: EndpointStats,
}

/// Outcomes of `POST /api/predict` requests; other endpoints are not counted here.
#[derive(Debug, Serialize, Deserialize)]
pub struct RequestStats {
    /// All prediction requests, whatever their outcome.
    pub predict_total: u64,
    /// Requests answered by some upstream.
    pub forwarded: u64,
    /// Requests where every upstream failed.
    pub upstream_failures: u64,
    /// Requests rejected before forwarding.
    pub bad_requests: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EndpointStats {
    pub predict: u64,
    pub health: u64,
    pub stats: u64,
}
