//! healthgate — prediction gateway for chronic-disease risk assessment.
//!
//! Relays health/lifestyle attributes to an external prediction service and
//! maps whatever it answers onto one canonical result:
//! - **Low**: backend reports no chronic-disease risk
//! - **Medium**: moderate risk
//! - **High**: at risk, or an unrecognized risk label
//!
//! The [`server`] module hosts `POST /api/predict`, which tries each
//! configured backend in order ([`upstream`]). The [`client`] module posts
//! [`request::PredictionRequest`]s to that route and runs responses through
//! [`normalize::normalize_prediction`].
//!
//! Uses structured logging via [`tracing`]. Set the `RUST_LOG` environment
//! variable to control log verbosity (e.g., `RUST_LOG=healthgate=debug`).

pub mod client;
pub mod normalize;
pub mod request;
pub mod server;
pub mod upstream;

pub use client::PredictClient;
pub use normalize::{normalize_prediction, PredictionResult, RiskLevel};
pub use request::{HealthForm, PredictionRequest};
pub use upstream::{ForwardOutcome, PredictionForwarder};
