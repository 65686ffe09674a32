//! Strict validation of the model's JSON answer.

use serde_json::{json, Map, Value};

use super::AnalysisError;
use crate::models::AnalysisResult;

/// Response schema sent along with the request so the model answers in JSON.
pub fn response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "personCount": {
                "type": "NUMBER",
                "description": "The total number of people detected."
            },
            "confidence": {
                "type": "NUMBER",
                "description": "Confidence score between 0 and 1."
            },
            "description": {
                "type": "STRING",
                "description": "A summary of the visual analysis."
            },
            "detectedFeatures": {
                "type": "ARRAY",
                "items": { "type": "STRING" },
                "description": "List of specific visual cues observed."
            }
        },
        "required": ["personCount", "confidence", "description", "detectedFeatures"]
    })
}

pub fn parse_analysis(text: &str) -> Result<AnalysisResult, AnalysisError> {
    let value: Value = serde_json::from_str(text.trim())
        .map_err(|err| AnalysisError::Malformed(format!("answer is not JSON: {err}")))?;
    validate_analysis(&value)
}

pub fn validate_analysis(value: &Value) -> Result<AnalysisResult, AnalysisError> {
    let object = value
        .as_object()
        .ok_or_else(|| AnalysisError::Schema("answer is not a JSON object".into()))?;

    let person_count = number_field(object, "personCount")?;
    if !person_count.is_finite() || person_count < 0.0 || person_count.fract() != 0.0 {
        return Err(AnalysisError::Schema(format!(
            "personCount must be a non-negative whole number, got {person_count}"
        )));
    }
    if person_count > u32::MAX as f64 {
        return Err(AnalysisError::Schema(format!(
            "personCount {person_count} is out of range"
        )));
    }

    let confidence = number_field(object, "confidence")?;
    if !(0.0..=1.0).contains(&confidence) {
        return Err(AnalysisError::Schema(format!(
            "confidence must be within [0, 1], got {confidence}"
        )));
    }

    let description = field(object, "description")?
        .as_str()
        .ok_or_else(|| wrong_type("description", "a string"))?
        .to_string();

    let detected_features = field(object, "detectedFeatures")?
        .as_array()
        .ok_or_else(|| wrong_type("detectedFeatures", "a list of strings"))?
        .iter()
        .map(|item| {
            item.as_str()
                .map(str::to_string)
                .ok_or_else(|| wrong_type("detectedFeatures", "a list of strings"))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(AnalysisResult {
        person_count: person_count as u32,
        confidence,
        description,
        detected_features,
    })
}

fn field<'a>(object: &'a Map<String, Value>, name: &str) -> Result<&'a Value, AnalysisError> {
    object
        .get(name)
        .filter(|value| !value.is_null())
        .ok_or_else(|| AnalysisError::Schema(format!("missing required field {name}")))
}

fn number_field(object: &Map<String, Value>, name: &str) -> Result<f64, AnalysisError> {
    field(object, name)?
        .as_f64()
        .ok_or_else(|| wrong_type(name, "a number"))
}

fn wrong_type(name: &str, expected: &str) -> AnalysisError {
    AnalysisError::Schema(format!("{name} must be {expected}"))
}
