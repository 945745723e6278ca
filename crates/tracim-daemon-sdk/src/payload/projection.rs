//! Lenient projection of opaque payloads onto typed records.
//!
//! Projection copies every declared field whose key is present and whose JSON
//! value has the field's type. Missing or mismatched keys leave the field at
//! its default. Payloads routinely carry only a subset of fields depending on
//! context, so a partial record is a valid outcome rather than an error.
//!
//! Records opt in by implementing [`Projectable`], usually with one
//! [`assign`] call per field:
//!
//! ```rust
//! use serde::Serialize;
//! use serde_json::{Map, Value};
//! use tracim_daemon_sdk::payload::{Projectable, assign, as_string};
//!
//! #[derive(Debug, Clone, Default, Serialize)]
//! struct Label {
//!     name: String,
//! }
//!
//! impl Projectable for Label {
//!     fn project_fields(&mut self, fields: &Map<String, Value>) {
//!         assign(fields, "name", &mut self.name, as_string);
//!     }
//! }
//! ```

use std::any::Any;
use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::envelope::{Envelope, EventData};

/// A record shape an opaque payload can be projected onto.
pub trait Projectable: Default + Clone + fmt::Debug + Serialize + Send + Sync + 'static {
    /// Copies every field whose key and JSON type match.
    fn project_fields(&mut self, fields: &Map<String, Value>);
}

/// Object-safe view of a projected record stored inside an envelope.
pub trait ProjectedRecord: fmt::Debug + Send + Sync {
    /// Exposes the concrete record for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Renders the record back into JSON.
    ///
    /// # Errors
    ///
    /// Returns the serializer error when the record is not representable.
    fn to_value(&self) -> Result<Value, serde_json::Error>;

    /// Clones the record behind the trait object.
    fn clone_record(&self) -> Box<dyn ProjectedRecord>;
}

impl<T: Projectable> ProjectedRecord for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    fn clone_record(&self) -> Box<dyn ProjectedRecord> {
        Box::new(self.clone())
    }
}

/// Errors raised while projecting a payload.
#[derive(Debug, Error)]
pub enum ProjectionError {
    /// The envelope has no payload.
    #[error("payload is absent")]
    MissingPayload,
    /// The payload is not a key-value object.
    #[error("payload is a JSON {found}, expected an object")]
    NotAMap { found: &'static str },
    /// A previously projected payload could not be rendered back to JSON.
    #[error("failed to re-encode projected payload: {0}")]
    Reencode(#[source] serde_json::Error),
    /// The stored record does not have the requested shape.
    #[error("payload was not projected onto {shape}")]
    ShapeMismatch { shape: &'static str },
}

/// Projects the envelope payload onto `T` in place.
///
/// On success the envelope's payload is the populated `T`. A payload that was
/// already projected is rendered back to JSON and projected again, so records
/// can be re-read under a different shape.
///
/// # Errors
///
/// Returns [`ProjectionError::MissingPayload`] when there is no payload and
/// [`ProjectionError::NotAMap`] when it is not a JSON object. The envelope is
/// left unchanged in both cases.
pub fn project<T: Projectable>(envelope: &mut Envelope) -> Result<(), ProjectionError> {
    let value = match &envelope.data {
        Some(data) => data.to_value().map_err(ProjectionError::Reencode)?,
        None => return Err(ProjectionError::MissingPayload),
    };
    let Value::Object(fields) = &value else {
        return Err(ProjectionError::NotAMap {
            found: json_kind(&value),
        });
    };

    let mut record = T::default();
    record.project_fields(fields);
    envelope.data = Some(EventData::Projected(Box::new(record)));
    Ok(())
}

/// Sets `slot` from `fields[key]` when the key exists and `extract` accepts
/// its value. Returns whether the slot was written.
pub fn assign<T>(
    fields: &Map<String, Value>,
    key: &str,
    slot: &mut T,
    extract: impl FnOnce(&Value) -> Option<T>,
) -> bool {
    match fields.get(key).and_then(extract) {
        Some(value) => {
            *slot = value;
            true
        }
        None => false,
    }
}

/// Accepts JSON strings.
pub fn as_string(value: &Value) -> Option<String> {
    value.as_str().map(str::to_owned)
}

/// Accepts JSON numbers that are whole and fit in an `i64`.
pub fn as_integer(value: &Value) -> Option<i64> {
    value.as_i64()
}

/// Accepts JSON booleans.
pub fn as_bool(value: &Value) -> Option<bool> {
    value.as_bool()
}

/// Accepts any JSON value, for fields that stay opaque.
pub fn as_value(value: &Value) -> Option<Value> {
    Some(value.clone())
}

/// Accepts base64 strings, the JSON encoding of byte buffers on this bus.
pub fn as_bytes(value: &Value) -> Option<Vec<u8>> {
    value.as_str().and_then(|text| BASE64.decode(text).ok())
}

/// Accepts JSON objects and projects them leniently onto `R`.
pub fn as_record<R: Projectable>(value: &Value) -> Option<R> {
    let fields = value.as_object()?;
    let mut record = R::default();
    record.project_fields(fields);
    Some(record)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
