use camino::Utf8PathBuf;
use std::env;

#[cfg(unix)]
use libc::geteuid;

#[cfg(unix)]
use dirs::runtime_dir;

use crate::logging::LogFormat;

/// Well-known socket the Tracim master daemon listens on.
pub const DEFAULT_MASTER_SOCKET: &str = "/tmp/tracim_master.sock";

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

const CLIENT_SOCKET_NAME: &str = "mini_client.sock";

/// Owned log filter value used where allocation is required (e.g. serde).
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_string()
}

/// Default logging format for the binaries.
pub fn default_log_format() -> LogFormat {
    LogFormat::Json
}

/// Default path of the master daemon socket.
pub fn default_master_socket() -> Utf8PathBuf {
    Utf8PathBuf::from(DEFAULT_MASTER_SOCKET)
}

/// Computes the default socket path for a client.
///
/// Prefers the per-user runtime directory; otherwise falls back to the
/// temporary directory namespaced by effective uid so that concurrent users
/// do not collide.
pub fn default_client_socket() -> Utf8PathBuf {
    let (mut base, apply_namespace) = match runtime_base_directory() {
        Some(dir) => (dir, false),
        None => (fallback_base_directory(), true),
    };

    base.push("tracim");
    if apply_namespace {
        base.push(user_namespace());
    }

    base.join(CLIENT_SOCKET_NAME)
}

#[cfg(unix)]
fn runtime_base_directory() -> Option<Utf8PathBuf> {
    runtime_dir().and_then(|path| Utf8PathBuf::from_path_buf(path).ok())
}

#[cfg(not(unix))]
fn runtime_base_directory() -> Option<Utf8PathBuf> {
    None
}

fn fallback_base_directory() -> Utf8PathBuf {
    let candidate = env::temp_dir();
    Utf8PathBuf::from_path_buf(candidate).unwrap_or_else(|_| Utf8PathBuf::from("/tmp"))
}

#[cfg(unix)]
fn user_namespace() -> String {
    let uid = unsafe { geteuid() };
    format!("uid-{uid}")
}

#[cfg(not(unix))]
fn user_namespace() -> String {
    "shared".to_string()
}
