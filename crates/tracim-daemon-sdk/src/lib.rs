//! Client SDK for the Tracim master daemon's local event bus.
//!
//! The master daemon keeps a live connection to a Tracim server and relays
//! its notifications to any number of local client processes over Unix
//! domain sockets. Each client binds its own socket, registers with the
//! master, and runs callbacks keyed by event type as messages arrive.
//!
//! The crate is layered bottom-up:
//!
//! - [`envelope`] defines the JSON message shape and its codec.
//! - [`payload`] turns opaque payloads into typed records, either leniently
//!   by projection or strictly through [`payload::EventPayload`].
//! - [`transport`] binds sockets, runs the accept loop and sends one-shot
//!   messages.
//! - [`client`] ties these together into a [`Client`] with a handler table,
//!   default handlers and a lifecycle.
//!
//! Socket paths and logging settings come from [`tracim_daemon_config`].

pub mod client;
pub mod envelope;
pub mod payload;
pub mod transport;

pub use client::{Client, ClientConfig, ClientError, ClientState, EventHandler};
pub use envelope::{Envelope, EventData, event_type};
pub use payload::{EventPayload, Notification};

#[cfg(test)]
mod tests;
