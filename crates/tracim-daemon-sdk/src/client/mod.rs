//! Event-bus client for the Tracim master daemon.
//!
//! A [`Client`] binds its own socket, tells the master where it lives, and
//! then runs registered handlers for every envelope that arrives:
//!
//! ```no_run
//! use tracim_daemon_sdk::client::{Client, ClientConfig};
//! use tracim_daemon_sdk::envelope::Envelope;
//!
//! # fn main() -> Result<(), tracim_daemon_sdk::client::ClientError> {
//! let client = Client::new(ClientConfig::new(
//!     "/tmp/tracim_master.sock",
//!     "/tmp/tracim_mini_client.sock",
//! ));
//! client.register_handler("content.created.file", |_: &Client, envelope: &mut Envelope| {
//!     println!("new file announced by {}", envelope.path);
//! });
//! client.create_listener()?;
//! client.register_to_master()?;
//! client.listen_to_events()?;
//! # Ok(())
//! # }
//! ```

mod dispatch;
mod errors;
mod handlers;
mod shutdown;
mod state;

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use camino::{Utf8Path, Utf8PathBuf};
use tracing::{debug, info, warn};
use tracim_daemon_config::Config;

use crate::envelope::{Envelope, event_type};
use crate::payload::{ClientRecord, DoRequest};
use crate::transport::{self, SocketListener};

use self::dispatch::Dispatcher;
use self::handlers::HandlerTable;

pub use self::errors::ClientError;
pub use self::handlers::EventHandler;
pub use self::shutdown::{ShutdownError, ShutdownSignal, SystemShutdownSignal};
pub use self::state::ClientState;

pub(crate) const CLIENT_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::client");

/// Socket addresses a client needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Where the master daemon listens.
    pub master_socket: Utf8PathBuf,
    /// Where this client listens.
    pub client_socket: Utf8PathBuf,
}

impl ClientConfig {
    /// Builds a configuration from the two socket paths.
    pub fn new(master_socket: impl Into<Utf8PathBuf>, client_socket: impl Into<Utf8PathBuf>) -> Self {
        Self {
            master_socket: master_socket.into(),
            client_socket: client_socket.into(),
        }
    }
}

impl From<&Config> for ClientConfig {
    fn from(config: &Config) -> Self {
        Self::new(config.master_socket(), config.client_socket())
    }
}

/// Handle on one event-bus client.
///
/// Clones share the same socket, handlers and state, so a clone can be moved
/// into a handler or a watcher thread and used to close the original.
#[derive(Clone)]
pub struct Client {
    inner: Arc<Inner>,
}

struct Inner {
    config: ClientConfig,
    state: Mutex<ClientState>,
    listener: Mutex<Option<SocketListener>>,
    shutdown: AtomicBool,
    handlers: HandlerTable,
    user_id: RwLock<Option<String>>,
}

impl Client {
    /// Creates a client with the default ping, account info and error
    /// handlers installed. Nothing is bound yet.
    #[must_use]
    pub fn new(config: ClientConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                state: Mutex::new(ClientState::Created),
                listener: Mutex::new(None),
                shutdown: AtomicBool::new(false),
                handlers: HandlerTable::with_defaults(),
                user_id: RwLock::new(None),
            }),
        }
    }

    /// Socket path of the master.
    #[must_use]
    pub fn master_socket(&self) -> &Utf8Path {
        &self.inner.config.master_socket
    }

    /// Socket path this client listens on and advertises as `path`.
    #[must_use]
    pub fn socket_path(&self) -> &Utf8Path {
        &self.inner.config.client_socket
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ClientState {
        *self.lock_state()
    }

    /// Account identity reported by the master, once known.
    #[must_use]
    pub fn user_id(&self) -> Option<String> {
        self.inner
            .user_id
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn set_user_id(&self, user_id: String) {
        debug!(target: CLIENT_TARGET, user_id = %user_id, "account identity updated");
        *self
            .inner
            .user_id
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(user_id);
    }

    /// Binds the client's socket.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Listener`] when the socket cannot be bound and
    /// [`ClientError::InvalidState`] unless the client was just created.
    pub fn create_listener(&self) -> Result<(), ClientError> {
        let mut state = self.lock_state();
        if *state != ClientState::Created {
            return Err(ClientError::invalid_state("create a listener", *state));
        }
        let listener = SocketListener::bind(self.socket_path())?;
        *self.lock_listener() = Some(listener);
        *state = ClientState::Listening;
        info!(target: CLIENT_TARGET, path = %self.socket_path(), "client socket bound");
        Ok(())
    }

    /// Announces this client to the master with `daemon_client_add`.
    ///
    /// Sending again is harmless. A listening client becomes registered.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Send`] when the master cannot be reached and
    /// [`ClientError::InvalidState`] once the client is closed.
    pub fn register_to_master(&self) -> Result<(), ClientError> {
        self.ensure_open("register to the master")?;
        self.send_to_master(&self.presence(event_type::CLIENT_ADD))?;

        let mut state = self.lock_state();
        if *state == ClientState::Listening {
            *state = ClientState::Registered;
        }
        info!(target: CLIENT_TARGET, master = %self.master_socket(), "registered to master");
        Ok(())
    }

    /// Tells the master to stop relaying events with `daemon_client_delete`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Send`] when the master cannot be reached.
    pub fn unregister_from_master(&self) -> Result<(), ClientError> {
        self.send_to_master(&self.presence(event_type::CLIENT_DELETE))
    }

    /// Installs `handler` for envelopes of `event_type`, replacing the
    /// previous handler, defaults included.
    ///
    /// Use [`event_type::GENERIC`] to see every inbound envelope and
    /// [`event_type::ERROR`] to receive failure reports.
    pub fn register_handler(&self, event_type: impl Into<String>, handler: impl EventHandler) {
        let event_type = event_type.into();
        debug!(target: CLIENT_TARGET, event_type = %event_type, "handler registered");
        self.inner.handlers.insert(event_type, Arc::new(handler));
    }

    /// Removes the handler for `event_type`. Returns whether one was set.
    pub fn remove_handler(&self, event_type: &str) -> bool {
        self.inner.handlers.remove(event_type)
    }

    /// Accepts and dispatches inbound messages on the calling thread until
    /// [`Client::close`] is called.
    ///
    /// Failures while serving a connection go to the error handler and never
    /// end the loop.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidState`] unless the listener was created
    /// and the loop is not already running.
    pub fn listen_to_events(&self) -> Result<(), ClientError> {
        let listener = {
            let mut state = self.lock_state();
            if !state.can_listen() {
                return Err(ClientError::invalid_state("listen to events", *state));
            }
            let Some(listener) = self.lock_listener().take() else {
                return Err(ClientError::invalid_state("listen to events", *state));
            };
            *state = ClientState::Running;
            listener
        };

        let handler = Arc::new(Dispatcher::new(self.clone()));
        listener.run(&self.inner.shutdown, handler)?;
        Ok(())
    }

    /// Unregisters from the master, stops the accept loop and removes the
    /// socket file.
    ///
    /// Unregistering is best effort. Closing an already closed client does
    /// nothing.
    pub fn close(&self) {
        let previous = {
            let mut state = self.lock_state();
            if *state == ClientState::Closed {
                return;
            }
            std::mem::replace(&mut *state, ClientState::Closed)
        };

        if previous.has_socket()
            && let Err(error) = self.unregister_from_master()
        {
            warn!(
                target: CLIENT_TARGET,
                error = %error,
                "failed to unregister from master"
            );
        }

        self.inner.shutdown.store(true, Ordering::SeqCst);
        drop(self.lock_listener().take());
        if previous.has_socket() {
            transport::remove_socket_file(self.socket_path());
        }
        info!(target: CLIENT_TARGET, path = %self.socket_path(), "client closed");
    }

    /// Sends `envelope` to the socket at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Send`] when delivery fails.
    pub fn send_event(&self, path: impl AsRef<Utf8Path>, envelope: &Envelope) -> Result<(), ClientError> {
        transport::send(path.as_ref(), envelope)?;
        Ok(())
    }

    /// Asks the master for its registered clients. The answer arrives as a
    /// `daemon_clients` envelope.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Send`] when the master cannot be reached.
    pub fn get_clients(&self) -> Result<(), ClientError> {
        self.send_to_master(&self.signal(event_type::GET_CLIENTS))
    }

    /// Asks the master for its account identity. The answer arrives as a
    /// `daemon_account_info` envelope and updates [`Client::user_id`].
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Send`] when the master cannot be reached.
    pub fn get_account_info(&self) -> Result<(), ClientError> {
        self.send_to_master(&self.signal(event_type::GET_ACCOUNT_INFO))
    }

    /// Asks the master to call the Tracim API. The answer arrives as a
    /// `daemon_request_result` envelope.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Send`] when the master cannot be reached.
    pub fn do_request(&self, request: DoRequest) -> Result<(), ClientError> {
        let envelope = Envelope::with_record(
            self.socket_path().as_str(),
            event_type::DO_REQUEST,
            request,
        );
        self.send_to_master(&envelope)
    }

    /// Pings the master. The answer arrives as a `daemon_pong` envelope.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Send`] when the master cannot be reached.
    pub fn ping_master(&self) -> Result<(), ClientError> {
        self.send_to_master(&self.signal(event_type::PING))
    }

    /// Delivers a failure report to the error handler.
    pub(crate) fn report_error(&self, error: &dyn fmt::Display) {
        debug!(target: CLIENT_TARGET, error = %error, "reporting client error");
        if let Some(handler) = self.inner.handlers.get(event_type::ERROR) {
            handler.handle(self, &mut Envelope::error_report(error));
        }
    }

    fn send_to_master(&self, envelope: &Envelope) -> Result<(), ClientError> {
        self.send_event(self.master_socket(), envelope)
    }

    fn presence(&self, event_type: &str) -> Envelope {
        let path = self.socket_path().as_str();
        Envelope::with_record(path, event_type, ClientRecord::for_current_process(path))
    }

    fn signal(&self, event_type: &str) -> Envelope {
        Envelope::new(self.socket_path().as_str(), event_type)
    }

    fn ensure_open(&self, operation: &'static str) -> Result<(), ClientError> {
        match self.state() {
            ClientState::Closed => Err(ClientError::invalid_state(operation, ClientState::Closed)),
            _ => Ok(()),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, ClientState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_listener(&self) -> MutexGuard<'_, Option<SocketListener>> {
        self.inner
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.inner.config)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
