//! Typed views of envelope payloads.
//!
//! Two ways to get at typed data coexist:
//!
//! - [`project`] copies matching fields onto a [`Projectable`] record and
//!   stores the record in the envelope. It is lenient and never fails on a
//!   field mismatch, which suits handlers that want whatever subset of fields
//!   the master sent.
//! - [`EventPayload::decode`] picks the record shape from the envelope type
//!   and decodes strictly, failing when the payload does not fit.

mod notification;
mod projection;
mod records;

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::envelope::{Envelope, EventData, event_type};

pub use self::notification::Notification;
pub use self::projection::{
    Projectable, ProjectedRecord, ProjectionError, as_bool, as_bytes, as_integer, as_record,
    as_string, as_value, assign, project,
};
pub use self::records::{AccountInfo, Ack, ClientRecord, DoRequest, ErrorRecord, RequestResult};

/// Payload of an envelope, decoded according to its type tag.
#[derive(Debug, Clone, PartialEq)]
pub enum EventPayload {
    /// `daemon_client_add`.
    ClientAdd(ClientRecord),
    /// `daemon_client_delete`.
    ClientDelete(ClientRecord),
    /// `daemon_get_clients`.
    GetClients,
    /// `daemon_get_account_info`.
    GetAccountInfo,
    /// `daemon_do_request`.
    DoRequest(DoRequest),
    /// `daemon_ack`.
    Ack(Ack),
    /// `daemon_ping`.
    Ping,
    /// `daemon_pong`.
    Pong,
    /// `daemon_request_result`.
    RequestResult(RequestResult),
    /// `daemon_account_info`.
    AccountInfo(AccountInfo),
    /// `daemon_clients`.
    Clients(Vec<ClientRecord>),
    /// `daemon_tracim_event`, with the inner notification already parsed.
    TracimEvent(Notification),
    /// `daemon_client_added`.
    ClientAdded(ClientRecord),
    /// `daemon_client_deleted`.
    ClientDeleted(ClientRecord),
    /// `custom_error`.
    Error(ErrorRecord),
    /// Any other type, including the internal generic tag.
    Unknown {
        /// Type tag as received.
        event_type: String,
        /// Payload as received.
        data: Option<Value>,
    },
}

/// Errors raised by strict payload decoding.
#[derive(Debug, Error)]
pub enum PayloadError {
    /// The type requires a payload but none was sent.
    #[error("'{event_type}' requires a payload")]
    Missing { event_type: String },
    /// The payload does not have the shape the type requires.
    #[error("invalid '{event_type}' payload: {source}")]
    Shape {
        event_type: String,
        #[source]
        source: serde_json::Error,
    },
    /// A relay payload was not a JSON string.
    #[error("relayed notification must be carried as a JSON string")]
    NotText,
    /// The relayed string is not a notification record.
    #[error("malformed relayed notification: {0}")]
    Notification(#[source] serde_json::Error),
    /// A projected payload could not be rendered back to JSON.
    #[error("failed to re-encode projected payload: {0}")]
    Reencode(#[source] serde_json::Error),
}

impl EventPayload {
    /// Decodes the payload of `envelope` according to its type tag.
    ///
    /// Type-only signals ignore any payload they carry. Unreserved tags never
    /// fail and yield [`EventPayload::Unknown`].
    ///
    /// # Errors
    ///
    /// Returns a [`PayloadError`] when a reserved type's payload is missing or
    /// has the wrong shape.
    pub fn decode(envelope: &Envelope) -> Result<Self, PayloadError> {
        let data = envelope
            .data
            .as_ref()
            .map(EventData::to_value)
            .transpose()
            .map_err(PayloadError::Reencode)?;
        let kind = envelope.event_type.as_str();

        let payload = match kind {
            event_type::CLIENT_ADD => Self::ClientAdd(required(kind, data)?),
            event_type::CLIENT_DELETE => Self::ClientDelete(required(kind, data)?),
            event_type::GET_CLIENTS => Self::GetClients,
            event_type::GET_ACCOUNT_INFO => Self::GetAccountInfo,
            event_type::DO_REQUEST => Self::DoRequest(required(kind, data)?),
            event_type::ACK => Self::Ack(required(kind, data)?),
            event_type::PING => Self::Ping,
            event_type::PONG => Self::Pong,
            event_type::REQUEST_RESULT => Self::RequestResult(required(kind, data)?),
            event_type::ACCOUNT_INFO => Self::AccountInfo(required(kind, data)?),
            event_type::CLIENTS => Self::Clients(required(kind, data)?),
            event_type::TRACIM_EVENT => Self::TracimEvent(relayed(kind, data)?),
            event_type::CLIENT_ADDED => Self::ClientAdded(required(kind, data)?),
            event_type::CLIENT_DELETED => Self::ClientDeleted(required(kind, data)?),
            event_type::ERROR => Self::Error(required(kind, data)?),
            _ => Self::Unknown {
                event_type: kind.to_owned(),
                data,
            },
        };
        Ok(payload)
    }
}

fn required<T: DeserializeOwned>(kind: &str, data: Option<Value>) -> Result<T, PayloadError> {
    let value = data.ok_or_else(|| PayloadError::Missing {
        event_type: kind.to_owned(),
    })?;
    serde_json::from_value(value).map_err(|source| PayloadError::Shape {
        event_type: kind.to_owned(),
        source,
    })
}

fn relayed(kind: &str, data: Option<Value>) -> Result<Notification, PayloadError> {
    match data {
        Some(Value::String(text)) => Notification::parse(&text).map_err(PayloadError::Notification),
        Some(_) => Err(PayloadError::NotText),
        None => Err(PayloadError::Missing {
            event_type: kind.to_owned(),
        }),
    }
}
