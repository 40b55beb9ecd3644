//! LLM error types

use thiserror::Error;

use crate::provider::ProviderId;

/// LLM-related errors
#[derive(Error, Debug)]
pub enum LlmError {
    /// API key not configured for the provider being called
    #[error("API key not configured for {0}")]
    ApiKeyMissing(ProviderId),

    /// Provider answered with a non-retryable status
    #[error("{provider} API error ({status}): {message}")]
    Provider {
        provider: ProviderId,
        status: u16,
        message: String,
    },

    /// Every attempt ended in a retryable status
    #[error("{provider} still failing after {attempts} attempts (last status {status}): {message}")]
    ExhaustedRetries {
        provider: ProviderId,
        attempts: u32,
        status: u16,
        message: String,
    },

    /// Successful status but the envelope had no usable text
    #[error("Invalid API response: {0}")]
    InvalidResponse(String),

    /// Connection error
    #[error("Connection error: {0}")]
    Network(String),

    /// Timeout
    #[error("Request timed out")]
    Timeout,

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl LlmError {
    /// Whether a transport-level failure should be attempted again
    pub fn is_transient(&self) -> bool {
        matches!(self, LlmError::Network(_) | LlmError::Timeout)
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LlmError::Timeout
        } else if err.is_decode() {
            LlmError::InvalidResponse(err.to_string())
        } else {
            LlmError::Network(err.to_string())
        }
    }
}
