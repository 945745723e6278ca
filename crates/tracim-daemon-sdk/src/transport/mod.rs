//! Unix socket transport between clients and the master.
//!
//! Every logical message travels on its own connection: the sender connects,
//! writes one envelope and hangs up. Inbound messages are accepted on a
//! socket bound at a filesystem path, and each accepted connection is served
//! on its own thread.

mod errors;
mod handler;
mod listener;
mod sender;
#[cfg(test)]
mod test_utils;

pub use self::errors::{ListenerError, SendError};
pub use self::handler::{ConnectionHandler, MAX_MESSAGE_BYTES, read_message};
pub use self::listener::{ListenerHandle, SocketListener};
pub(crate) use self::listener::remove_socket_file;
pub use self::sender::send;
#[cfg(test)]
pub(crate) use self::test_utils::{CountingHandler, wait_until};

const TRANSPORT_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transport");
