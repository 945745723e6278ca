//! Error types for socket transport operations.

use std::io;

use camino::Utf8PathBuf;
use thiserror::Error;

use crate::envelope::EnvelopeError;

/// Errors surfaced while binding or running the socket listener.
#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("failed to bind unix listener at {path}: {source}")]
    BindUnix {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("existing unix socket {path} is already in use")]
    UnixInUse { path: Utf8PathBuf },
    #[error("unix socket path {path} is not a socket")]
    UnixNotSocket { path: Utf8PathBuf },
    #[error("failed to read metadata for unix socket {path}: {source}")]
    UnixMetadata {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to connect to existing unix socket {path}: {source}")]
    UnixConnect {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to remove stale unix socket {path}: {source}")]
    UnixCleanup {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to enable non-blocking listener: {source}")]
    NonBlocking {
        #[source]
        source: io::Error,
    },
    #[error("listener thread panicked")]
    ThreadPanic,
}

/// Errors surfaced by a one-shot outbound send.
#[derive(Debug, Error)]
pub enum SendError {
    /// Nothing accepted the connection at `path`.
    #[error("failed to connect to {path}: {source}")]
    Connect {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },
    /// The envelope could not be encoded.
    #[error(transparent)]
    Serialization(#[from] EnvelopeError),
    /// The connection was accepted but the write failed or was cut short.
    #[error("failed to write to {path}: {source}")]
    Write {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },
}

impl SendError {
    /// Returns `true` when the peer was not listening at all.
    ///
    /// Connection refused and missing socket files both mean the peer is
    /// down rather than misbehaving.
    #[must_use]
    pub fn is_peer_down(&self) -> bool {
        match self {
            Self::Connect { source, .. } => matches!(
                source.kind(),
                io::ErrorKind::ConnectionRefused | io::ErrorKind::NotFound
            ),
            _ => false,
        }
    }
}
