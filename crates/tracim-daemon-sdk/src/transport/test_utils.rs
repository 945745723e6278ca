//! Test helpers for the transport module.

use std::io;
use std::os::unix::net::UnixStream;
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};
use std::thread;
use std::time::{Duration, Instant};

use super::ConnectionHandler;

/// Counts accepted connections and accept failures.
pub(crate) struct CountingHandler {
    connections: Arc<AtomicUsize>,
    failures: Arc<AtomicUsize>,
}

impl CountingHandler {
    pub(crate) fn new() -> (Arc<AtomicUsize>, Arc<Self>) {
        let connections = Arc::new(AtomicUsize::new(0));
        let handler = Arc::new(Self {
            connections: Arc::clone(&connections),
            failures: Arc::new(AtomicUsize::new(0)),
        });
        (connections, handler)
    }

    pub(crate) fn failures(&self) -> usize {
        self.failures.load(Ordering::SeqCst)
    }
}

impl ConnectionHandler for CountingHandler {
    fn handle(&self, _stream: UnixStream) {
        self.connections.fetch_add(1, Ordering::SeqCst);
    }

    fn accept_failed(&self, _error: &io::Error) {
        self.failures.fetch_add(1, Ordering::SeqCst);
    }
}

/// Polls `condition` every 10ms for up to two seconds.
pub(crate) fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    condition()
}
