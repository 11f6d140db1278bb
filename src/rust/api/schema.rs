use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};

/// Body of `POST /predict`. Unknown fields are rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PredictionRequest {
    /// Grams; a JSON number or a numeric string such as `"300.0"`
    #[serde(deserialize_with = "number_or_numeric_string")]
    pub package_weight_gr: f64,
    pub package_size: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub input_received: PredictionRequest,
    pub predicted_product_type: String,
}

/// One schema violation, reported under `details`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl PredictionRequest {
    pub fn new(package_weight_gr: f64, package_size: impl Into<String>) -> Self {
        Self {
            package_weight_gr,
            package_size: package_size.into(),
        }
    }

    /// Checks the constraints the type system does not carry.
    pub fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();
        if !self.package_weight_gr.is_finite() || self.package_weight_gr <= 0.0 {
            errors.push(FieldError {
                field: "package_weight_gr".into(),
                message: "Input should be greater than 0".into(),
            });
        }
        if self.package_size.is_empty() {
            errors.push(FieldError {
                field: "package_size".into(),
                message: "Input should not be empty".into(),
            });
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

pub(crate) fn details(errors: &[FieldError]) -> Value {
    json!(errors)
}

fn number_or_numeric_string<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Weight {
        Number(f64),
        Text(String),
    }

    match Weight::deserialize(deserializer)? {
        Weight::Number(n) => Ok(n),
        Weight::Text(s) => s.trim().parse::<f64>().map_err(|_| {
            serde::de::Error::custom(format!("package_weight_gr: '{}' is not a valid number", s))
        }),
    }
}
