//! Forwarding of prediction requests to upstream backends.
//!
//! [`PredictionForwarder`] holds an ordered list of candidate base URLs and
//! posts each request to `{base}/api/predict/` until one answers with a 2xx
//! status. Candidates are tried one after another; a failed attempt is
//! recorded as an [`AttemptFailure`] and the scan moves on. When every
//! candidate fails the caller gets an [`UpstreamExhausted`] carrying all
//! attempted targets and the last failure.

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

/// Production prediction backend, always tried last.
pub const DEFAULT_BACKEND_URL: &str = "https://health-prediction-1rcn.onrender.com";

/// Environment variables holding the configured backend, in lookup order.
pub const BACKEND_URL_ENV_VARS: [&str; 2] = ["API_URL", "NEXT_PUBLIC_API_URL"];

/// Path appended to every candidate base.
pub const PREDICT_PATH: &str = "/api/predict/";

/// Summary message of the aggregate failure.
pub const EXHAUSTED_MESSAGE: &str = "Prediction API request failed";

// ---------------------------------------------------------------------------
// Candidate bases
// ---------------------------------------------------------------------------

/// Strip a trailing `/api/predict` (with or without slash), then trailing slashes.
pub fn normalize_base(value: &str) -> String {
    let base = value
        .strip_suffix("/api/predict/")
        .or_else(|| value.strip_suffix("/api/predict"))
        .unwrap_or(value);
    base.trim_end_matches('/').to_string()
}

/// First non-empty backend URL from [`BACKEND_URL_ENV_VARS`].
pub fn configured_base_from_env() -> Option<String> {
    BACKEND_URL_ENV_VARS
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .find(|value| !value.trim().is_empty())
}

/// Normalize and de-duplicate candidate bases, keeping first occurrences.
pub fn dedup_bases<I, S>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut bases: Vec<String> = Vec::new();
    for value in values {
        let value = value.as_ref().trim();
        if value.is_empty() {
            continue;
        }
        let base = normalize_base(value);
        if !bases.contains(&base) {
            bases.push(base);
        }
    }
    bases
}

/// Candidate list: the configured backend (if any) followed by `fallback`.
pub fn resolve_candidate_bases(configured: Option<&str>, fallback: &str) -> Vec<String> {
    dedup_bases(configured.into_iter().chain(std::iter::once(fallback)))
}

/// Full prediction URL for a candidate base.
pub fn predict_target(base: &str) -> String {
    format!("{}{}", base, PREDICT_PATH)
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Why a single candidate did not produce a prediction.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AttemptFailure {
    /// The backend answered with a non-2xx status.
    Status {
        target: String,
        #[serde(rename = "upstreamStatus")]
        upstream_status: u16,
        details: Value,
    },
    /// The request never got a response (DNS, connect, TLS, body read).
    Transport { target: String, message: String },
}

impl AttemptFailure {
    pub fn target(&self) -> &str {
        match self {
            Self::Status { target, .. } | Self::Transport { target, .. } => target,
        }
    }
}

/// Every candidate failed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpstreamExhausted {
    pub error: String,
    /// Targets in the order they were tried.
    pub attempts: Vec<String>,
    /// Last recorded failure; `None` only when there were no candidates.
    pub details: Option<AttemptFailure>,
}

/// Result of forwarding one request.
#[derive(Debug, Clone, PartialEq)]
pub enum ForwardOutcome {
    /// Parsed body of the first 2xx response.
    Success {
        target: String,
        /// Candidates contacted, including the successful one.
        attempts: usize,
        body: Value,
    },
    Exhausted(UpstreamExhausted),
}

/// Parse an upstream body. Empty bodies become `{}` and non-JSON text is
/// wrapped as `{"error": text}`.
pub fn parse_upstream_body(raw: &str) -> Value {
    if raw.is_empty() {
        return Value::Object(serde_json::Map::new());
    }
    serde_json::from_str(raw).unwrap_or_else(|_| serde_json::json!({ "error": raw }))
}

// ---------------------------------------------------------------------------
// Forwarder
// ---------------------------------------------------------------------------

/// Sequential multi-backend forwarder.
pub struct PredictionForwarder {
    bases: Vec<String>,
    client: reqwest::Client,
}

impl Default for PredictionForwarder {
    fn default() -> Self {
        Self::new(None)
    }
}

impl PredictionForwarder {
    /// Forwarder for an optional configured backend followed by [`DEFAULT_BACKEND_URL`].
    pub fn new(configured: Option<&str>) -> Self {
        Self::with_bases(resolve_candidate_bases(configured, DEFAULT_BACKEND_URL))
    }

    /// Forwarder for an explicit candidate list (normalized and de-duplicated).
    pub fn with_bases<I, S>(bases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            bases: dedup_bases(bases),
            client: reqwest::Client::new(),
        }
    }

    pub fn bases(&self) -> &[String] {
        &self.bases
    }

    pub fn targets(&self) -> Vec<String> {
        self.bases.iter().map(|b| predict_target(b)).collect()
    }

    /// Try each candidate in order and stop at the first 2xx response.
    pub async fn forward(&self, payload: &Value) -> ForwardOutcome {
        let mut last_failure: Option<AttemptFailure> = None;

        for (idx, base) in self.bases.iter().enumerate() {
            let target = predict_target(base);
            match self.attempt(&target, payload).await {
                Ok(body) => {
                    info!(target = %target, attempt = idx + 1, "prediction upstream succeeded");
                    return ForwardOutcome::Success {
                        target,
                        attempts: idx + 1,
                        body,
                    };
                }
                Err(failure) => {
                    warn!(target = %failure.target(), failure = ?failure, "prediction upstream attempt failed");
                    last_failure = Some(failure);
                }
            }
        }

        ForwardOutcome::Exhausted(UpstreamExhausted {
            error: EXHAUSTED_MESSAGE.to_string(),
            attempts: self.targets(),
            details: last_failure,
        })
    }

    async fn attempt(&self, target: &str, payload: &Value) -> Result<Value, AttemptFailure> {
        let transport = |e: reqwest::Error| AttemptFailure::Transport {
            target: target.to_string(),
            message: e.to_string(),
        };

        let resp = self
            .client
            .post(target)
            .json(payload)
            .send()
            .await
            .map_err(transport)?;

        let status = resp.status();
        let raw = resp.text().await.map_err(transport)?;
        debug!(target = %target, status = status.as_u16(), bytes = raw.len(), "upstream responded");
        let body = parse_upstream_body(&raw);

        if status.is_success() {
            Ok(body)
        } else {
            Err(AttemptFailure::Status {
                target: target.to_string(),
                upstream_status: status.as_u16(),
                details: body,
            })
        }
    }
}
