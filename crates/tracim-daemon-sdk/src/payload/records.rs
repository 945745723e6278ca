//! Typed payload records for the reserved envelope types.
//!
//! Field names on the wire follow what the master emits; byte buffers are
//! base64 strings.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use super::projection::{
    Projectable, as_bytes, as_integer, as_record, as_string, assign,
};
use crate::envelope::Envelope;

/// Identifies a client to the master: its socket path and process id.
///
/// Carried by subscription requests and by the master's client broadcasts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientRecord {
    /// Socket path of the client.
    pub path: String,
    /// Decimal process id of the client.
    pub pid: String,
}

impl ClientRecord {
    /// Builds a record from a path and pid.
    pub fn new(path: impl Into<String>, pid: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            pid: pid.into(),
        }
    }

    /// Builds the record describing the current process.
    pub fn for_current_process(path: impl Into<String>) -> Self {
        Self::new(path, std::process::id().to_string())
    }
}

impl Projectable for ClientRecord {
    fn project_fields(&mut self, fields: &Map<String, Value>) {
        assign(fields, "path", &mut self.path, as_string);
        assign(fields, "pid", &mut self.pid, as_string);
    }
}

/// Identity of the Tracim account the master is logged in as.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInfo {
    /// Tracim user id.
    pub user_id: String,
}

impl Projectable for AccountInfo {
    fn project_fields(&mut self, fields: &Map<String, Value>) {
        assign(fields, "user_id", &mut self.user_id, as_string);
    }
}

/// API request the master performs on a client's behalf.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoRequest {
    /// HTTP method.
    #[serde(rename = "Method", alias = "method")]
    pub method: String,
    /// Path appended to the Tracim API base URL.
    #[serde(rename = "Endpoint", alias = "endpoint")]
    pub endpoint: String,
    /// Raw request body.
    #[serde(rename = "Body", alias = "body", default, with = "base64_bytes")]
    pub body: Vec<u8>,
}

impl DoRequest {
    /// Builds a request without body.
    pub fn new(method: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            endpoint: endpoint.into(),
            body: Vec::new(),
        }
    }

    /// Attaches a body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }
}

impl Projectable for DoRequest {
    fn project_fields(&mut self, fields: &Map<String, Value>) {
        assign(fields, "Method", &mut self.method, as_string);
        assign(fields, "Endpoint", &mut self.endpoint, as_string);
        assign(fields, "Body", &mut self.body, as_bytes);
    }
}

/// Outcome of a [`DoRequest`], as reported by the master.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestResult {
    /// The request this result answers.
    #[serde(rename = "Request", alias = "request", default)]
    pub request: DoRequest,
    /// HTTP status code.
    #[serde(rename = "StatusCode", alias = "statusCode", default)]
    pub status_code: i64,
    /// HTTP status line.
    #[serde(rename = "Status", alias = "status", default)]
    pub status: String,
    /// Response body.
    #[serde(default, with = "base64_bytes")]
    pub data: Vec<u8>,
}

impl RequestResult {
    /// Whether the status code is in the 2xx range.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }
}

impl Projectable for RequestResult {
    fn project_fields(&mut self, fields: &Map<String, Value>) {
        assign(fields, "Request", &mut self.request, as_record::<DoRequest>);
        assign(fields, "StatusCode", &mut self.status_code, as_integer);
        assign(fields, "Status", &mut self.status, as_string);
        assign(fields, "data", &mut self.data, as_bytes);
    }
}

/// Acknowledgement echoing the message it acknowledges.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ack {
    /// The acknowledged message. The master sends either the whole message
    /// or only its type tag.
    #[serde(
        rename = "Type",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "acknowledged_message"
    )]
    pub acknowledged: Option<Box<Envelope>>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Acknowledged {
    Tag(String),
    Message(Box<Envelope>),
}

impl From<Acknowledged> for Box<Envelope> {
    fn from(acknowledged: Acknowledged) -> Self {
        match acknowledged {
            Acknowledged::Tag(event_type) => Box::new(Envelope::new("", event_type)),
            Acknowledged::Message(envelope) => envelope,
        }
    }
}

fn acknowledged_message<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<Box<Envelope>>, D::Error> {
    Option::<Acknowledged>::deserialize(deserializer).map(|value| value.map(Into::into))
}

impl Ack {
    /// Type tag of the acknowledged message.
    #[must_use]
    pub fn acknowledged_type(&self) -> Option<&str> {
        self.acknowledged
            .as_deref()
            .map(|envelope| envelope.event_type.as_str())
    }
}

impl Projectable for Ack {
    fn project_fields(&mut self, fields: &Map<String, Value>) {
        assign(fields, "Type", &mut self.acknowledged, |value| {
            serde_json::from_value::<Acknowledged>(value.clone())
                .ok()
                .map(|acknowledged| Some(acknowledged.into()))
        });
    }
}

/// Failure report delivered to the error handler.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    /// Human-readable description.
    pub error: String,
}

impl Projectable for ErrorRecord {
    fn project_fields(&mut self, fields: &Map<String, Value>) {
        assign(fields, "error", &mut self.error, as_string);
    }
}

mod base64_bytes {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD as BASE64;
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&BASE64.encode(bytes))
    }

    // A nil buffer is emitted as `null` by the master.
    pub(super) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<u8>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            Some(text) => BASE64.decode(text).map_err(D::Error::custom),
            None => Ok(Vec::new()),
        }
    }
}
