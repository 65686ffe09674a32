//! Headcount estimation through a hosted vision-language model.

mod client;
mod prompt;
mod schema;

use thiserror::Error;

pub use client::{build_request, GeminiClient, VisionModel};
pub use prompt::ANALYSIS_PROMPT;
pub use schema::{parse_analysis, response_schema, validate_analysis};

/// Every way an analysis can fail. All of them are recoverable: the session
/// goes back to idle and the user is told once.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("no frames to analyze")]
    NoFrames,
    #[error("vision model is not configured: {0}")]
    Configuration(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("vision model returned HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("response does not match schema: {0}")]
    Schema(String),
    #[error("analysis worker stopped: {0}")]
    Worker(String),
}
