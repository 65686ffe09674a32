use std::time::Duration;

use serde::Deserialize;
use serde_json::{json, Value};

use super::{parse_analysis, prompt::ANALYSIS_PROMPT, response_schema, AnalysisError};
use crate::capture::EncodedFrame;
use crate::models::AnalysisResult;
use crate::settings::VisionSettings;

/// Anything that turns a set of frames into a headcount. Calls block; the
/// session runs them on the blocking pool.
pub trait VisionModel: Send + Sync {
    fn analyze(&self, frames: &[EncodedFrame]) -> Result<AnalysisResult, AnalysisError>;
}

/// `generateContent` client for Gemini-style endpoints.
pub struct GeminiClient {
    agent: ureq::Agent,
    settings: VisionSettings,
    api_key: Option<String>,
}

impl GeminiClient {
    pub fn new(settings: VisionSettings) -> Self {
        let api_key = settings.api_key();
        Self::with_api_key(settings, api_key)
    }

    pub fn with_api_key(settings: VisionSettings, api_key: Option<String>) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(settings.timeout_secs.max(1)))
            .user_agent(concat!("classai/", env!("CARGO_PKG_VERSION")))
            .build();
        Self {
            agent,
            settings,
            api_key,
        }
    }

    fn url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.settings.endpoint.trim_end_matches('/'),
            self.settings.model
        )
    }
}

impl VisionModel for GeminiClient {
    fn analyze(&self, frames: &[EncodedFrame]) -> Result<AnalysisResult, AnalysisError> {
        if frames.is_empty() {
            return Err(AnalysisError::NoFrames);
        }
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            AnalysisError::Configuration(format!(
                "no API key; set {}",
                self.settings.api_key_env
            ))
        })?;

        log::info!(
            "Sending {} frame(s) to {} for analysis",
            frames.len(),
            self.settings.model
        );

        let response = self
            .agent
            .post(&self.url())
            .set("x-goog-api-key", api_key)
            .send_json(build_request(frames))
            .map_err(|err| match err {
                ureq::Error::Status(code, response) => AnalysisError::Http {
                    status: code,
                    body: response.into_string().unwrap_or_default(),
                },
                ureq::Error::Transport(transport) => AnalysisError::Network(transport.to_string()),
            })?;

        let body: GenerateContentResponse = response
            .into_json()
            .map_err(|err| AnalysisError::Malformed(format!("unreadable response body: {err}")))?;

        parse_analysis(&body.answer_text()?)
    }
}

/// Request body: every frame inline, then the instruction, then the schema.
pub fn build_request(frames: &[EncodedFrame]) -> Value {
    let mut parts: Vec<Value> = frames
        .iter()
        .map(|frame| {
            json!({
                "inlineData": {
                    "mimeType": frame.mime,
                    "data": frame.to_base64(),
                }
            })
        })
        .collect();
    parts.push(json!({ "text": ANALYSIS_PROMPT }));

    json!({
        "contents": [{ "role": "user", "parts": parts }],
        "generationConfig": {
            "responseMimeType": "application/json",
            "responseSchema": response_schema(),
        }
    })
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

impl GenerateContentResponse {
    fn answer_text(&self) -> Result<String, AnalysisError> {
        let text: String = self
            .candidates
            .first()
            .and_then(|candidate| candidate.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|part| part.text.as_deref())
                    .collect()
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(AnalysisError::Malformed("response carried no answer text".into()));
        }
        Ok(text)
    }
}
