//! Error types surfaced by the client.

use std::io;

use thiserror::Error;

use super::ClientState;
use crate::envelope::EnvelopeError;
use crate::transport::{ListenerError, SendError};

/// Errors returned by [`Client`](super::Client) operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The inbound socket could not be bound or run. Fatal to the caller.
    #[error(transparent)]
    Listener(#[from] ListenerError),
    /// A message could not be delivered.
    #[error(transparent)]
    Send(#[from] SendError),
    /// The operation is not allowed in the client's current state.
    #[error("cannot {operation} while the client is {state}")]
    InvalidState {
        operation: &'static str,
        state: ClientState,
    },
}

impl ClientError {
    pub(crate) fn invalid_state(operation: &'static str, state: ClientState) -> Self {
        Self::InvalidState { operation, state }
    }
}

/// Failures raised while serving one inbound connection.
///
/// These never reach the caller of
/// [`Client::listen_to_events`](super::Client::listen_to_events); they are
/// logged and handed to the error handler.
#[derive(Debug, Error)]
pub(crate) enum DispatchError {
    #[error("failed to accept connection: {0}")]
    Accept(#[source] io::Error),
    #[error("failed to read message: {0}")]
    Read(#[source] io::Error),
    #[error("failed to decode message: {0}")]
    Decode(#[source] EnvelopeError),
    #[error("malformed relayed notification: {0}")]
    Relay(#[source] serde_json::Error),
}
