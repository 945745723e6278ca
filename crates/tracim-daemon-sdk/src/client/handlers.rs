//! Handler table and the handlers every client starts with.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, warn};

use super::{CLIENT_TARGET, Client};
use crate::envelope::{Envelope, event_type};
use crate::payload::{AccountInfo, ErrorRecord};

/// Callback run for envelopes of one type.
///
/// Handlers run on the connection thread that received the envelope, so
/// several may run at once. Any `Fn(&Client, &mut Envelope)` closure that is
/// `Send + Sync` is a handler.
pub trait EventHandler: Send + Sync + 'static {
    /// Handles one envelope. The envelope may be projected in place.
    fn handle(&self, client: &Client, envelope: &mut Envelope);
}

impl<F> EventHandler for F
where
    F: Fn(&Client, &mut Envelope) + Send + Sync + 'static,
{
    fn handle(&self, client: &Client, envelope: &mut Envelope) {
        self(client, envelope);
    }
}

/// Map from type tag to handler, safe to mutate while dispatch runs.
pub(crate) struct HandlerTable {
    handlers: RwLock<HashMap<String, Arc<dyn EventHandler>>>,
}

impl HandlerTable {
    /// Builds a table holding the ping, account info and error handlers.
    pub(crate) fn with_defaults() -> Self {
        let mut handlers: HashMap<String, Arc<dyn EventHandler>> = HashMap::new();
        handlers.insert(event_type::PING.to_owned(), Arc::new(reply_to_ping));
        handlers.insert(event_type::ACCOUNT_INFO.to_owned(), Arc::new(record_account_info));
        handlers.insert(event_type::ERROR.to_owned(), Arc::new(log_error_report));
        Self {
            handlers: RwLock::new(handlers),
        }
    }

    /// Installs `handler` for `event_type`, replacing any previous one.
    pub(crate) fn insert(&self, event_type: String, handler: Arc<dyn EventHandler>) {
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(event_type, handler);
    }

    /// Removes the handler for `event_type`, returning whether one existed.
    pub(crate) fn remove(&self, event_type: &str) -> bool {
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(event_type)
            .is_some()
    }

    /// Looks up the handler for `event_type`.
    ///
    /// The lock is released before the handler runs, so handlers may register
    /// other handlers.
    pub(crate) fn get(&self, event_type: &str) -> Option<Arc<dyn EventHandler>> {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(event_type)
            .cloned()
    }
}

fn reply_to_ping(client: &Client, envelope: &mut Envelope) {
    if envelope.path.is_empty() {
        debug!(target: CLIENT_TARGET, "ping without a reply path ignored");
        return;
    }
    let pong = Envelope::new(client.socket_path().as_str(), event_type::PONG);
    if let Err(error) = client.send_event(envelope.path.as_str(), &pong) {
        warn!(
            target: CLIENT_TARGET,
            error = %error,
            to = %envelope.path,
            "failed to answer ping"
        );
    }
}

fn record_account_info(client: &Client, envelope: &mut Envelope) {
    if envelope.path != client.master_socket().as_str() {
        debug!(
            target: CLIENT_TARGET,
            from = %envelope.path,
            "account info from a peer other than the master ignored"
        );
        return;
    }
    match envelope.project::<AccountInfo>() {
        Ok(info) => client.set_user_id(info.user_id.clone()),
        Err(error) => warn!(
            target: CLIENT_TARGET,
            error = %error,
            "unreadable account info"
        ),
    }
}

fn log_error_report(_client: &Client, envelope: &mut Envelope) {
    match envelope.project::<ErrorRecord>() {
        Ok(record) => warn!(target: CLIENT_TARGET, error = %record.error, "client error"),
        Err(error) => warn!(
            target: CLIENT_TARGET,
            error = %error,
            "unreadable error report"
        ),
    }
}
