//! Analysis error types

use oitiva_llm::LlmError;
use thiserror::Error;

/// Analysis pipeline errors
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// Input rejected before any network activity
    #[error("Invalid input: {0}")]
    Validation(String),

    /// The gateway gave up or the provider refused the request
    #[error("Generation failed: {0}")]
    Generation(#[from] LlmError),

    /// The model answered, but not with a JSON object
    #[error("Model output is not valid JSON: {reason}")]
    MalformedOutput {
        reason: String,
        /// Full model response
        raw: String,
        /// Substring that was handed to the JSON parser
        extracted: String,
    },

    /// Another analysis is still running on this session
    #[error("An analysis is already in progress")]
    Busy,
}

impl AnalysisError {
    /// Raw model output, for malformed-output diagnostics
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            AnalysisError::MalformedOutput { raw, .. } => Some(raw),
            _ => None,
        }
    }
}
