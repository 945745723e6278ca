//! Shared configuration for Tracim daemon clients.
//!
//! A client needs two socket paths: the master's well-known socket, which it
//! registers with and sends requests to, and its own socket, which the master
//! pushes events to. Both are resolved through `ortho-config`, layering
//! defaults, an optional configuration file, `TRACIM_DAEMON_*` environment
//! variables and command-line flags, in increasing order of precedence.
//!
//! ```toml
//! master_socket = "/tmp/tracim_master.sock"
//! client_socket = "/run/user/1000/tracim/mini_client.sock"
//! log_filter = "tracim_daemon_sdk=debug,info"
//! log_format = "compact"
//! ```

mod defaults;
mod logging;
mod socket;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

pub use defaults::{
    DEFAULT_LOG_FILTER, DEFAULT_MASTER_SOCKET, default_client_socket,
    default_log_filter_string, default_log_format, default_master_socket,
};
pub use logging::{LogFormat, LogFormatParseError};
pub use ortho_config::OrthoConfig;
pub use socket::{SocketPreparationError, prepare_socket_directory};

/// Resolved configuration for a daemon client process.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq, OrthoConfig)]
#[ortho_config(prefix = "TRACIM_DAEMON")]
#[serde(default)]
pub struct Config {
    /// Socket the master daemon listens on.
    #[ortho_config(default = default_master_socket())]
    pub master_socket: Utf8PathBuf,
    /// Socket this client binds to receive events.
    #[ortho_config(default = default_client_socket())]
    pub client_socket: Utf8PathBuf,
    /// `tracing` filter expression applied by the binaries.
    #[ortho_config(default = default_log_filter_string())]
    pub log_filter: String,
    /// Output format for structured logs.
    #[ortho_config(default = default_log_format())]
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            master_socket: default_master_socket(),
            client_socket: default_client_socket(),
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
        }
    }
}

impl Config {
    /// Path of the master daemon socket.
    #[must_use]
    pub fn master_socket(&self) -> &Utf8Path {
        self.master_socket.as_path()
    }

    /// Path of this client's own socket.
    #[must_use]
    pub fn client_socket(&self) -> &Utf8Path {
        self.client_socket.as_path()
    }

    /// Log filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Selected log output format.
    #[must_use]
    pub fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Ensures the directory holding the client socket exists.
    pub fn prepare_filesystem(&self) -> Result<(), SocketPreparationError> {
        prepare_socket_directory(self.client_socket())
    }
}
