//! Client for the gateway's prediction route.
//!
//! Posts a [`PredictionRequest`] to `POST /api/predict`, turns failed
//! responses into readable errors and normalizes successful bodies with
//! [`normalize_prediction`].

use eyre::{Result, WrapErr};
use tracing::debug;

use crate::normalize::{normalize_prediction, PredictionResult};
use crate::request::PredictionRequest;

const DEFAULT_GATEWAY_URL: &str = "http://127.0.0.1:3000";

/// Fallback message when a failed response carries nothing useful.
pub const GENERIC_FAILURE: &str = "Prediction failed";

/// Pick a message out of a failed gateway response.
///
/// Prefers the body's `error` field, then `details.message`, then the raw
/// text itself.
pub fn error_message_from_body(raw: &str) -> String {
    let fallback = if raw.is_empty() {
        GENERIC_FAILURE.to_string()
    } else {
        raw.to_string()
    };
    let Ok(parsed) = serde_json::from_str::<serde_json::Value>(raw) else {
        return fallback;
    };
    parsed
        .get("error")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .or_else(|| {
            parsed
                .get("details")
                .and_then(|d| d.get("message"))
                .and_then(|v| v.as_str())
                .filter(|s| !s.is_empty())
        })
        .map(|s| s.to_string())
        .unwrap_or(fallback)
}

/// Client for a running gateway.
pub struct PredictClient {
    base_url: String,
    client: reqwest::Client,
}

impl Default for PredictClient {
    fn default() -> Self {
        Self::with_base_url(DEFAULT_GATEWAY_URL)
    }
}

impl PredictClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Client for a gateway at `base_url` (e.g. `http://localhost:3000`).
    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn endpoint(&self) -> String {
        format!("{}/api/predict", self.base_url)
    }

    /// Raw JSON returned by the gateway on success.
    pub async fn predict_raw(&self, request: &PredictionRequest) -> Result<serde_json::Value> {
        let url = self.endpoint();
        let resp = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .wrap_err_with(|| format!("Failed to connect to prediction gateway at {}", url))?;

        let status = resp.status();
        let raw = resp
            .text()
            .await
            .wrap_err("Failed to read prediction response")?;
        debug!(status = status.as_u16(), body = %raw, "prediction gateway responded");

        if !status.is_success() {
            eyre::bail!(error_message_from_body(&raw));
        }

        serde_json::from_str(&raw).wrap_err("Prediction response was not valid JSON")
    }

    /// Request a prediction and normalize the result.
    pub async fn predict(&self, request: &PredictionRequest) -> Result<PredictionResult> {
        let raw = self.predict_raw(request).await?;
        Ok(normalize_prediction(&raw))
    }
}
