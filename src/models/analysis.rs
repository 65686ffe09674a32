use serde::{Deserialize, Serialize};

/// Validated headcount returned by the vision model for one recording.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub person_count: u32,
    pub confidence: f64,
    pub description: String,
    pub detected_features: Vec<String>,
}
