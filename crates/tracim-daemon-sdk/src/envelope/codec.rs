//! JSON encoding of envelopes.
//!
//! The codec does not bound its input; the transport limits how many bytes
//! reach [`decode`].

use super::{Envelope, EnvelopeError};

/// Serializes an envelope into the bytes written on the wire.
///
/// # Errors
///
/// Returns [`EnvelopeError::Serialization`] when a payload cannot be
/// represented as JSON.
pub fn encode(envelope: &Envelope) -> Result<Vec<u8>, EnvelopeError> {
    serde_json::to_vec(envelope).map_err(EnvelopeError::Serialization)
}

/// Parses the bytes of one message into an envelope.
///
/// Surrounding whitespace is ignored. Unknown type tags are accepted.
///
/// # Errors
///
/// Returns [`EnvelopeError::Malformed`] when the input is empty, is not a
/// JSON object, or lacks a string `type` field.
pub fn decode(bytes: &[u8]) -> Result<Envelope, EnvelopeError> {
    let trimmed = bytes.trim_ascii();
    if trimmed.is_empty() {
        return Err(EnvelopeError::malformed("empty message"));
    }
    if trimmed.first() != Some(&b'{') {
        return Err(EnvelopeError::malformed("message is not a JSON object"));
    }

    serde_json::from_slice(trimmed).map_err(EnvelopeError::from_json_error)
}
