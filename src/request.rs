//! Prediction request data structures.
//!
//! A [`PredictionRequest`] is the body the dashboard posts to the forwarder.
//! Field names on the wire follow the dashboard form (`sleepHours`,
//! `stressLevel`), and `bmi` is always derived from height and weight.

use eyre::Result;
use serde::{Deserialize, Serialize};

/// Placeholder shown when BMI cannot be computed.
pub const BMI_PLACEHOLDER: &str = "-";

/// Accepted sleep range in hours per night.
pub const SLEEP_HOURS_RANGE: (f64, f64) = (3.0, 10.0);

/// Accepted stress level range.
pub const STRESS_LEVEL_RANGE: (u8, u8) = (1, 10);

// ---------------------------------------------------------------------------
// Categorical attributes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Smoker {
    Yes,
    No,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Alcohol {
    None,
    Low,
    Moderate,
    High,
}

/// Weekly exercise frequency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
pub enum Exercise {
    #[serde(rename = "none")]
    #[value(name = "none")]
    None,
    #[serde(rename = "1-2")]
    #[value(name = "1-2")]
    OneToTwo,
    #[serde(rename = "3-5")]
    #[value(name = "3-5")]
    ThreeToFive,
    #[serde(rename = "daily")]
    #[value(name = "daily")]
    Daily,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Diet {
    Poor,
    Good,
    Excellent,
}

// ---------------------------------------------------------------------------
// BMI
// ---------------------------------------------------------------------------

/// Body mass index from height in centimetres and weight in kilograms.
///
/// Returns `None` unless both inputs are positive and finite.
pub fn compute_bmi(height_cm: f64, weight_kg: f64) -> Option<f64> {
    if !(height_cm.is_finite() && weight_kg.is_finite()) || height_cm <= 0.0 || weight_kg <= 0.0 {
        return None;
    }
    let height_m = height_cm / 100.0;
    Some(weight_kg / (height_m * height_m))
}

/// One decimal place with exact ties rounded up (`22.25` gives `"22.3"`).
///
/// `{:.1}` alone rounds exact binary ties to even.
fn to_fixed_1(value: f64) -> String {
    let twentieths = (value * 20.0).round();
    let exact_tie = twentieths % 2.0 == 1.0 && value.mul_add(20.0, -twentieths) == 0.0;
    if exact_tie {
        format!("{:.1}", (twentieths + 1.0) / 20.0)
    } else {
        format!("{:.1}", value)
    }
}

/// BMI as displayed by the form: one decimal place, or [`BMI_PLACEHOLDER`].
pub fn format_bmi(height_cm: f64, weight_kg: f64) -> String {
    match compute_bmi(height_cm, weight_kg) {
        Some(bmi) => to_fixed_1(bmi),
        None => BMI_PLACEHOLDER.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// Health attributes sent to the prediction service.
///
/// Deserializing ignores any incoming `bmi` and derives it again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "WireRequest")]
pub struct PredictionRequest {
    pub age: u32,
    pub gender: Gender,
    height: f64,
    weight: f64,
    bmi: f64,
    pub smoker: Smoker,
    pub alcohol: Alcohol,
    pub exercise: Exercise,
    pub diet: Diet,
    pub sleep_hours: f64,
    pub stress_level: u8,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireRequest {
    age: u32,
    gender: Gender,
    height: f64,
    weight: f64,
    smoker: Smoker,
    alcohol: Alcohol,
    exercise: Exercise,
    diet: Diet,
    sleep_hours: f64,
    stress_level: u8,
}

impl From<WireRequest> for PredictionRequest {
    fn from(wire: WireRequest) -> Self {
        Self::from_form(&HealthForm {
            age: wire.age,
            gender: wire.gender,
            height_cm: wire.height,
            weight_kg: wire.weight,
            smoker: wire.smoker,
            alcohol: wire.alcohol,
            exercise: wire.exercise,
            diet: wire.diet,
            sleep_hours: wire.sleep_hours,
            stress_level: wire.stress_level,
        })
    }
}

/// Form values used to build a [`PredictionRequest`].
#[derive(Debug, Clone)]
pub struct HealthForm {
    pub age: u32,
    pub gender: Gender,
    pub height_cm: f64,
    pub weight_kg: f64,
    pub smoker: Smoker,
    pub alcohol: Alcohol,
    pub exercise: Exercise,
    pub diet: Diet,
    pub sleep_hours: f64,
    pub stress_level: u8,
}

impl Default for HealthForm {
    fn default() -> Self {
        // Slider defaults from the dashboard form.
        Self {
            age: 0,
            gender: Gender::Other,
            height_cm: 0.0,
            weight_kg: 0.0,
            smoker: Smoker::No,
            alcohol: Alcohol::None,
            exercise: Exercise::None,
            diet: Diet::Good,
            sleep_hours: 7.0,
            stress_level: 5,
        }
    }
}

impl PredictionRequest {
    /// Build a request from form values, deriving BMI.
    pub fn from_form(form: &HealthForm) -> Self {
        let mut request = Self {
            age: form.age,
            gender: form.gender,
            height: form.height_cm,
            weight: form.weight_kg,
            bmi: 0.0,
            smoker: form.smoker,
            alcohol: form.alcohol,
            exercise: form.exercise,
            diet: form.diet,
            sleep_hours: form.sleep_hours,
            stress_level: form.stress_level,
        };
        request.recompute_bmi();
        request
    }

    /// Height in centimetres.
    pub fn height(&self) -> f64 {
        self.height
    }

    /// Weight in kilograms.
    pub fn weight(&self) -> f64 {
        self.weight
    }

    /// Derived BMI, rounded to one decimal (0 when height or weight is missing).
    pub fn bmi(&self) -> f64 {
        self.bmi
    }

    /// Update height and weight together, keeping BMI in sync.
    pub fn set_body(&mut self, height_cm: f64, weight_kg: f64) {
        self.height = height_cm;
        self.weight = weight_kg;
        self.recompute_bmi();
    }

    fn recompute_bmi(&mut self) {
        // Round through the displayed string so the wire value matches the form.
        self.bmi = format_bmi(self.height, self.weight)
            .parse::<f64>()
            .unwrap_or(0.0);
    }

    /// Check value ranges accepted by the form.
    pub fn validate(&self) -> Result<()> {
        if self.age == 0 {
            eyre::bail!("age must be a positive number");
        }
        let (min_sleep, max_sleep) = SLEEP_HOURS_RANGE;
        if !(min_sleep..=max_sleep).contains(&self.sleep_hours) {
            eyre::bail!(
                "sleepHours must be between {} and {}, got {}",
                min_sleep,
                max_sleep,
                self.sleep_hours
            );
        }
        let (min_stress, max_stress) = STRESS_LEVEL_RANGE;
        if !(min_stress..=max_stress).contains(&self.stress_level) {
            eyre::bail!(
                "stressLevel must be between {} and {}, got {}",
                min_stress,
                max_stress,
                self.stress_level
            );
        }
        Ok(())
    }
}
