//! Error types for envelope encoding and decoding.

use thiserror::Error;

/// Errors surfaced while turning envelopes into bytes and back.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    /// The envelope (or its payload) could not be represented as JSON.
    #[error("failed to serialize envelope: {0}")]
    Serialization(#[source] serde_json::Error),

    /// The bytes are not a JSON object carrying a string `type` field.
    #[error("malformed envelope: {message}")]
    Malformed {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },
}

impl EnvelopeError {
    /// Creates a malformed envelope error from a serde error.
    pub fn from_json_error(source: serde_json::Error) -> Self {
        Self::Malformed {
            message: source.to_string(),
            source: Some(source),
        }
    }

    /// Creates a malformed envelope error with a custom message.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
            source: None,
        }
    }
}
