//! Wire-level message shape exchanged between clients and the master.
//!
//! Every message is one JSON object written on its own connection:
//!
//! ```json
//! {"path":"/tmp/tracim_mini_client.sock","type":"daemon_ping"}
//! {"path":"/tmp/tracim_master.sock","type":"daemon_account_info","data":{"user_id":"42"}}
//! ```
//!
//! `path` is the sender's socket and doubles as the reply-to address. `type`
//! is mandatory and drawn from [`event_type`], although unknown tags decode
//! without error. `data` is optional and its shape depends on `type`.

mod codec;
mod errors;
pub mod event_type;

use std::fmt;

use serde::de::{Deserialize, Deserializer};
use serde::ser::{Error as _, Serialize, Serializer};
use serde_json::{Value, json};

use crate::payload::{
    EventPayload, PayloadError, Projectable, ProjectedRecord, ProjectionError, project,
};

pub use self::codec::{decode, encode};
pub use self::errors::EnvelopeError;

/// A single message as seen by the codec and the dispatch engine.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Envelope {
    /// Socket path of the sender.
    #[serde(default)]
    pub path: String,
    /// Type tag used for routing.
    #[serde(rename = "type")]
    pub event_type: String,
    /// Payload, absent for type-only signals such as pings. A JSON `null`
    /// payload is the same as no payload.
    #[serde(default, skip_serializing_if = "payload_is_absent")]
    pub data: Option<EventData>,
}

impl Envelope {
    /// Builds an envelope without payload.
    pub fn new(path: impl Into<String>, event_type: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            event_type: event_type.into(),
            data: None,
        }
    }

    /// Builds an envelope whose payload is the JSON form of `payload`.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::Serialization`] when `payload` cannot be
    /// represented as JSON.
    pub fn with_payload<T: serde::Serialize + ?Sized>(
        path: impl Into<String>,
        event_type: impl Into<String>,
        payload: &T,
    ) -> Result<Self, EnvelopeError> {
        let value = serde_json::to_value(payload).map_err(EnvelopeError::Serialization)?;
        Ok(Self {
            path: path.into(),
            event_type: event_type.into(),
            data: (!value.is_null()).then_some(EventData::Opaque(value)),
        })
    }

    /// Builds an envelope carrying an already typed record.
    pub fn with_record<T: Projectable>(
        path: impl Into<String>,
        event_type: impl Into<String>,
        record: T,
    ) -> Self {
        Self {
            path: path.into(),
            event_type: event_type.into(),
            data: Some(EventData::Projected(Box::new(record))),
        }
    }

    /// Builds the internal report delivered to the error handler.
    pub fn error_report(error: &dyn fmt::Display) -> Self {
        Self {
            path: String::new(),
            event_type: event_type::ERROR.to_owned(),
            data: Some(EventData::Opaque(json!({ "error": error.to_string() }))),
        }
    }

    /// Returns `true` when the envelope carries the given type tag.
    #[must_use]
    pub fn is(&self, event_type: &str) -> bool {
        self.event_type == event_type
    }

    /// Returns the payload in its undecoded form, if it has not been projected.
    #[must_use]
    pub fn opaque(&self) -> Option<&Value> {
        match &self.data {
            Some(EventData::Opaque(value)) => Some(value),
            _ => None,
        }
    }

    /// Returns the payload when it is a non-empty JSON string.
    ///
    /// Relayed Tracim notifications travel this way, double encoded.
    #[must_use]
    pub fn text_payload(&self) -> Option<&str> {
        match self.opaque() {
            Some(Value::String(text)) if !text.is_empty() => Some(text.as_str()),
            _ => None,
        }
    }

    /// Projects the payload onto `T`, replacing it with the typed record.
    ///
    /// # Errors
    ///
    /// See [`project`].
    pub fn project<T: Projectable>(&mut self) -> Result<&T, ProjectionError> {
        project::<T>(self)?;
        self.projected::<T>().ok_or(ProjectionError::ShapeMismatch {
            shape: std::any::type_name::<T>(),
        })
    }

    /// Borrows the payload as `T` if it was projected onto that shape.
    #[must_use]
    pub fn projected<T: Projectable>(&self) -> Option<&T> {
        match &self.data {
            Some(EventData::Projected(record)) => record.as_any().downcast_ref::<T>(),
            _ => None,
        }
    }

    /// Decodes the payload strictly, according to the envelope type.
    ///
    /// # Errors
    ///
    /// Returns a [`PayloadError`] when the payload does not have the shape
    /// the reserved type requires.
    pub fn payload(&self) -> Result<EventPayload, PayloadError> {
        EventPayload::decode(self)
    }
}

fn payload_is_absent(data: &Option<EventData>) -> bool {
    present_payload(data).is_none()
}

fn present_payload(data: &Option<EventData>) -> Option<&EventData> {
    data.as_ref()
        .filter(|payload| !matches!(payload, EventData::Opaque(Value::Null)))
}

impl PartialEq for Envelope {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
            && self.event_type == other.event_type
            && present_payload(&self.data) == present_payload(&other.data)
    }
}

/// Payload of an envelope, either as received or after projection.
pub enum EventData {
    /// JSON value as decoded from the wire.
    Opaque(Value),
    /// Typed record produced by [`project`].
    Projected(Box<dyn ProjectedRecord>),
}

impl EventData {
    /// Renders the payload as JSON regardless of its current form.
    ///
    /// # Errors
    ///
    /// Returns the serializer error when a projected record cannot be
    /// represented as JSON.
    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        match self {
            Self::Opaque(value) => Ok(value.clone()),
            Self::Projected(record) => record.to_value(),
        }
    }
}

impl fmt::Debug for EventData {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Opaque(value) => formatter.debug_tuple("Opaque").field(value).finish(),
            Self::Projected(record) => formatter.debug_tuple("Projected").field(record).finish(),
        }
    }
}

impl Clone for EventData {
    fn clone(&self) -> Self {
        match self {
            Self::Opaque(value) => Self::Opaque(value.clone()),
            Self::Projected(record) => Self::Projected(record.clone_record()),
        }
    }
}

// Projection changes the in-memory form but not the message, so equality is
// decided on the JSON rendering.
impl PartialEq for EventData {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Opaque(left), Self::Opaque(right)) => left == right,
            _ => match (self.to_value(), other.to_value()) {
                (Ok(left), Ok(right)) => left == right,
                _ => false,
            },
        }
    }
}

impl Serialize for EventData {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Opaque(value) => value.serialize(serializer),
            Self::Projected(record) => record
                .to_value()
                .map_err(S::Error::custom)?
                .serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for EventData {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Self::Opaque)
    }
}
