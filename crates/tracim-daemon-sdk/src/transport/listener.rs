//! Accept loop for a client's inbound socket.

use std::fs;
use std::io;
use std::os::unix::fs::FileTypeExt;
use std::os::unix::net::{UnixListener, UnixStream};
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::thread;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use tracing::{debug, info, warn};

use super::{ConnectionHandler, ListenerError, TRANSPORT_TARGET};

const ACCEPT_BACKOFF: Duration = Duration::from_millis(25);
const ERROR_BACKOFF: Duration = Duration::from_millis(150);

/// Listener bound to a Unix socket path.
///
/// The socket file is removed when the listener is dropped, so a bound
/// listener that never runs still releases its address.
#[derive(Debug)]
pub struct SocketListener {
    path: Utf8PathBuf,
    listener: UnixListener,
}

impl SocketListener {
    /// Binds a listener at `path`, replacing a stale socket file left behind
    /// by a dead process.
    ///
    /// # Errors
    ///
    /// Fails when the path is held by a live listener, is not a socket, or
    /// cannot be bound.
    pub fn bind(path: &Utf8Path) -> Result<Self, ListenerError> {
        let listener = bind_unix(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            listener,
        })
    }

    /// Path the listener is bound to.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Runs the accept loop on the calling thread until `shutdown` is set.
    ///
    /// Each accepted connection is handed to `handler` on a new thread.
    /// Accept errors are reported through
    /// [`ConnectionHandler::accept_failed`] and never end the loop.
    ///
    /// # Errors
    ///
    /// Fails only when the listener cannot be switched to non-blocking mode.
    pub fn run(
        self,
        shutdown: &AtomicBool,
        handler: Arc<dyn ConnectionHandler>,
    ) -> Result<(), ListenerError> {
        self.listener
            .set_nonblocking(true)
            .map_err(|source| ListenerError::NonBlocking { source })?;

        info!(
            target: TRANSPORT_TARGET,
            path = %self.path,
            "socket listener active"
        );
        while !shutdown.load(Ordering::SeqCst) {
            match self.accept_connection() {
                Ok(Some(stream)) => {
                    let handler = Arc::clone(&handler);
                    thread::spawn(move || handler.handle(stream));
                }
                Ok(None) => thread::sleep(ACCEPT_BACKOFF),
                Err(error) => {
                    handler.accept_failed(&error);
                    thread::sleep(ERROR_BACKOFF);
                }
            }
        }
        debug!(
            target: TRANSPORT_TARGET,
            path = %self.path,
            "socket listener stopped"
        );
        Ok(())
    }

    /// Runs the accept loop on a background thread.
    ///
    /// # Errors
    ///
    /// Fails when the listener cannot be switched to non-blocking mode.
    pub fn start(self, handler: Arc<dyn ConnectionHandler>) -> Result<ListenerHandle, ListenerError> {
        // Switch modes up front so the error surfaces here, not on the thread.
        self.listener
            .set_nonblocking(true)
            .map_err(|source| ListenerError::NonBlocking { source })?;
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_flag = Arc::clone(&shutdown);
        let handle = thread::spawn(move || self.run(&shutdown_flag, handler));
        Ok(ListenerHandle {
            shutdown,
            handle: Some(handle),
        })
    }

    fn accept_connection(&self) -> io::Result<Option<UnixStream>> {
        match self.listener.accept() {
            Ok((stream, _)) => {
                stream.set_nonblocking(false)?;
                Ok(Some(stream))
            }
            Err(error) if error.kind() == io::ErrorKind::WouldBlock => Ok(None),
            Err(error) => Err(error),
        }
    }
}

impl Drop for SocketListener {
    fn drop(&mut self) {
        remove_socket_file(&self.path);
    }
}

/// Handle to a listener running on a background thread.
#[derive(Debug)]
pub struct ListenerHandle {
    shutdown: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<Result<(), ListenerError>>>,
}

impl ListenerHandle {
    /// Asks the accept loop to stop after its current iteration.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    /// Waits for the accept loop to finish.
    ///
    /// # Errors
    ///
    /// Returns the loop's own error, or [`ListenerError::ThreadPanic`] when
    /// the thread panicked.
    pub fn join(mut self) -> Result<(), ListenerError> {
        match self.handle.take() {
            Some(handle) => handle.join().map_err(|_| ListenerError::ThreadPanic)?,
            None => Ok(()),
        }
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }
}

fn bind_unix(path: &Utf8Path) -> Result<UnixListener, ListenerError> {
    if path.exists() {
        let metadata =
            fs::symlink_metadata(path).map_err(|source| ListenerError::UnixMetadata {
                path: path.to_path_buf(),
                source,
            })?;
        if !metadata.file_type().is_socket() {
            return Err(ListenerError::UnixNotSocket {
                path: path.to_path_buf(),
            });
        }
        match UnixStream::connect(path) {
            Ok(_stream) => {
                return Err(ListenerError::UnixInUse {
                    path: path.to_path_buf(),
                });
            }
            Err(error)
                if matches!(
                    error.kind(),
                    io::ErrorKind::ConnectionRefused | io::ErrorKind::NotFound
                ) =>
            {
                debug!(
                    target: TRANSPORT_TARGET,
                    path = %path,
                    "removing stale unix socket"
                );
                fs::remove_file(path).map_err(|source| ListenerError::UnixCleanup {
                    path: path.to_path_buf(),
                    source,
                })?;
            }
            Err(source) => {
                return Err(ListenerError::UnixConnect {
                    path: path.to_path_buf(),
                    source,
                });
            }
        }
    }

    UnixListener::bind(path).map_err(|source| ListenerError::BindUnix {
        path: path.to_path_buf(),
        source,
    })
}

/// Removes the socket file at `path`, tolerating its absence.
pub(crate) fn remove_socket_file(path: &Utf8Path) {
    if let Err(error) = fs::remove_file(path)
        && error.kind() != io::ErrorKind::NotFound
    {
        warn!(
            target: TRANSPORT_TARGET,
            error = %error,
            path = %path,
            "failed to remove unix socket file"
        );
    }
}
