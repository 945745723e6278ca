//! Reference client for the Tracim master daemon.
//!
//! The binary registers with the master, logs the type of every envelope it
//! receives and answers pings until it is told to stop by a termination
//! signal. It doubles as a smoke test for a running master.

mod telemetry;

use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;

use ortho_config::OrthoError;
use thiserror::Error;
use tracing::{error, info, warn};

use tracim_daemon_config::{Config, OrthoConfig as _, SocketPreparationError};
use tracim_daemon_sdk::client::{Client, ClientConfig, ClientError, SystemShutdownSignal};
use tracim_daemon_sdk::{Envelope, event_type};

pub use telemetry::TelemetryError;

const MINI_CLIENT_TARGET: &str = env!("CARGO_PKG_NAME");

/// Reasons the mini client stops with a failure status.
#[derive(Debug, Error)]
pub enum MiniClientError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Config {
        #[source]
        source: Arc<OrthoError>,
    },
    /// The socket directory could not be prepared.
    #[error("failed to prepare client socket: {source}")]
    Socket {
        #[source]
        source: SocketPreparationError,
    },
    /// Logging could not be set up.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        #[source]
        source: TelemetryError,
    },
    /// Binding, registering or running the client failed.
    #[error(transparent)]
    Client(#[from] ClientError),
}

/// Runs the mini client with the given process arguments.
///
/// Failures are written to `stderr` and mapped to a failure exit code.
pub fn run<I, T, W>(args: I, stderr: &mut W) -> ExitCode
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
    W: Write,
{
    match try_run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(failure) => {
            error!(target: MINI_CLIENT_TARGET, error = %failure, "mini client failed");
            let _ = writeln!(stderr, "tracim-mini-client: {failure}");
            ExitCode::FAILURE
        }
    }
}

fn try_run<I, T>(args: I) -> Result<(), MiniClientError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let config = Config::load_from_iter(args).map_err(|source| MiniClientError::Config { source })?;
    telemetry::initialise(&config).map_err(|source| MiniClientError::Telemetry { source })?;
    config
        .prepare_filesystem()
        .map_err(|source| MiniClientError::Socket { source })?;

    // Install before binding so an early signal is queued instead of killing
    // the process with the socket file left behind.
    let signal = SystemShutdownSignal::install()
        .inspect_err(|error| {
            warn!(
                target: MINI_CLIENT_TARGET,
                error = %error,
                "signal handlers unavailable; stop the client another way"
            );
        })
        .ok();

    let client = Client::new(ClientConfig::from(&config));
    client.register_handler(event_type::GENERIC, log_received);
    client.create_listener()?;
    if let Err(failure) = client.register_to_master() {
        client.close();
        return Err(failure.into());
    }
    if let Some(signal) = signal {
        // Detached; the watcher only has to call `close`.
        drop(client.close_on_signal(signal));
    }

    info!(
        target: MINI_CLIENT_TARGET,
        path = %client.socket_path(),
        master = %client.master_socket(),
        "listening for events"
    );
    client.listen_to_events()?;
    Ok(())
}

fn log_received(client: &Client, envelope: &mut Envelope) {
    info!(
        target: MINI_CLIENT_TARGET,
        path = %client.socket_path(),
        from = %envelope.path,
        "RECV: {}",
        envelope.event_type
    );
}
