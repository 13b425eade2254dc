//! Regression tests for response normalization and request building.
//!
//! Covers the response shapes seen from different prediction backends and
//! checks that normalization stays total over awkward inputs.

use serde_json::{json, Value};

use healthgate::normalize::{normalize_prediction, PredictionResult, RiskLevel};
use healthgate::request::{format_bmi, HealthForm, PredictionRequest, BMI_PLACEHOLDER};
use healthgate::upstream::{resolve_candidate_bases, DEFAULT_BACKEND_URL};

fn expect(raw: Value, at_risk: bool, risk_level: RiskLevel, confidence: f64) {
    let result = normalize_prediction(&raw);
    assert_eq!(
        result,
        PredictionResult {
            at_risk,
            risk_level,
            confidence,
        },
        "input: {}",
        raw
    );
}

// ---------------------------------------------------------------------------
// Backend response shapes
// ---------------------------------------------------------------------------

#[test]
fn test_known_backend_shapes() {
    expect(
        json!({ "chronic_disease": "Yes", "risk": "moderate", "probability": 133 }),
        true,
        RiskLevel::Medium,
        100.0,
    );
    expect(json!({ "prediction": 0 }), false, RiskLevel::Low, 0.0);
    expect(json!({ "chronicDisease": true }), true, RiskLevel::High, 0.0);
    expect(
        json!({ "chronicDisease": "No", "riskLevel": "Low", "confidence": 82.5 }),
        false,
        RiskLevel::Low,
        82.5,
    );
    expect(
        json!({ "prediction": "Not At Risk", "risk_level": "LOW", "confidence": "64.199" }),
        false,
        RiskLevel::Low,
        64.2,
    );
}

#[test]
fn test_explicit_risk_level_overrides_flag() {
    // An explicit label wins even when it disagrees with the flag.
    expect(
        json!({ "chronicDisease": false, "riskLevel": "high" }),
        false,
        RiskLevel::High,
        0.0,
    );
    expect(
        json!({ "chronicDisease": true, "risk": "low" }),
        true,
        RiskLevel::Low,
        0.0,
    );
}

#[test]
fn test_error_body_from_backend_normalizes_to_defaults() {
    // The backend's own error shape carries none of the expected fields.
    expect(
        json!({ "error": "'age' is a required property" }),
        false,
        RiskLevel::Low,
        0.0,
    );
    expect(json!({}), false, RiskLevel::Low, 0.0);
}

#[test]
fn test_normalizer_is_total_and_confidence_bounded() {
    let values = vec![
        Value::Null,
        json!(true),
        json!(false),
        json!(0),
        json!(1),
        json!(-1),
        json!(1e308),
        json!(-1e308),
        json!(0.005),
        json!(99.999),
        json!(u64::MAX),
        json!(i64::MIN),
        json!(""),
        json!("   "),
        json!("NaN"),
        json!("-Infinity"),
        json!("1e400"),
        json!("42"),
        json!("yes"),
        json!("ModeRate"),
        json!([]),
        json!([1]),
        json!({ "nested": true }),
    ];

    for disease in &values {
        for risk in &values {
            for confidence in &values {
                let raw = json!({
                    "prediction": disease,
                    "risk": risk,
                    "probability": confidence,
                });
                let result = normalize_prediction(&raw);
                assert!(
                    (0.0..=100.0).contains(&result.confidence),
                    "confidence out of range for {}: {}",
                    raw,
                    result.confidence
                );
                assert!(result.confidence.is_finite());
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Request building
// ---------------------------------------------------------------------------

#[test]
fn test_bmi_reference_values() {
    assert_eq!(format_bmi(180.0, 81.0), "25.0");
    assert_eq!(format_bmi(165.0, 50.0), "18.4");
    assert_eq!(format_bmi(150.0, 120.0), "53.3");
    assert_eq!(format_bmi(0.0, 0.0), BMI_PLACEHOLDER);
}

#[test]
fn test_missing_body_metrics_send_zero_bmi() {
    let request = PredictionRequest::from_form(&HealthForm::default());
    let json = serde_json::to_value(&request).unwrap();
    assert_eq!(json["bmi"], 0.0);
    assert_eq!(json["sleepHours"], 7.0);
    assert_eq!(json["stressLevel"], 5);
}

#[test]
fn test_candidate_list_with_same_backend_configured() {
    let configured = format!("{}/api/predict", DEFAULT_BACKEND_URL);
    let bases = resolve_candidate_bases(Some(&configured), DEFAULT_BACKEND_URL);
    assert_eq!(bases, vec![DEFAULT_BACKEND_URL.to_string()]);
}
