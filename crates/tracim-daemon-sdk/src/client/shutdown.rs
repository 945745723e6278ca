//! Closing a client when the process is asked to stop.

use std::io;
use std::sync::{Mutex, PoisonError};
use std::thread;

use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGQUIT, SIGTERM};
use signal_hook::iterator::Signals;
use thiserror::Error;
use tracing::{info, warn};

use super::{CLIENT_TARGET, Client};

/// Abstraction over shutdown notification mechanisms.
pub trait ShutdownSignal: Send + Sync {
    /// Blocks until shutdown should proceed.
    fn wait(&self) -> Result<(), ShutdownError>;
}

/// Errors reported by shutdown signal listeners.
#[derive(Debug, Error)]
pub enum ShutdownError {
    /// Installing signal handlers failed.
    #[error("failed to install signal handlers: {source}")]
    Install {
        #[source]
        source: io::Error,
    },
}

/// Waits for SIGTERM, SIGINT, SIGQUIT or SIGHUP.
///
/// The handlers are installed on construction, so signals delivered before
/// [`ShutdownSignal::wait`] is called are not lost.
pub struct SystemShutdownSignal {
    signals: Mutex<Signals>,
}

impl SystemShutdownSignal {
    /// Installs the termination signal handlers.
    ///
    /// # Errors
    ///
    /// Returns [`ShutdownError::Install`] when the handlers cannot be
    /// registered.
    pub fn install() -> Result<Self, ShutdownError> {
        let signals = Signals::new([SIGTERM, SIGINT, SIGQUIT, SIGHUP])
            .map_err(|source| ShutdownError::Install { source })?;
        Ok(Self {
            signals: Mutex::new(signals),
        })
    }
}

impl ShutdownSignal for SystemShutdownSignal {
    fn wait(&self) -> Result<(), ShutdownError> {
        let mut signals = self.signals.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(signal) = signals.forever().next() {
            info!(target: CLIENT_TARGET, signal, "shutdown signal received");
        }
        Ok(())
    }
}

impl Client {
    /// Closes the client once `signal` fires.
    ///
    /// The wait happens on a background thread; the returned handle finishes
    /// after [`Client::close`] has run. When waiting fails the client stays
    /// open.
    pub fn close_on_signal<S>(&self, signal: S) -> thread::JoinHandle<()>
    where
        S: ShutdownSignal + 'static,
    {
        let client = self.clone();
        thread::spawn(move || match signal.wait() {
            Ok(()) => client.close(),
            Err(error) => warn!(
                target: CLIENT_TARGET,
                error = %error,
                "shutdown watcher failed; client left open"
            ),
        })
    }
}
