//! Harness pairing a real client with a recording fake master.

mod fake_master;

use std::io::Write;
use std::os::unix::net::UnixStream;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use camino::Utf8PathBuf;
use tempfile::TempDir;

use crate::client::{Client, ClientConfig, ClientError};
use crate::envelope::{Envelope, encode};
use crate::transport::wait_until;

pub(in crate::tests) use self::fake_master::FakeMaster;

/// A client bound in a temporary directory next to a fake master.
pub(in crate::tests) struct Harness {
    _dir: TempDir,
    pub master: FakeMaster,
    pub client: Client,
    event_loop: Option<thread::JoinHandle<Result<(), ClientError>>>,
}

impl Harness {
    /// Builds the harness with a running fake master and an idle client.
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("temp dir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf8 temp dir");
        let master = FakeMaster::spawn(&root.join("master.sock"));
        let client = Client::new(ClientConfig::new(
            master.path().to_owned(),
            root.join("client.sock"),
        ));
        Self {
            _dir: dir,
            master,
            client,
            event_loop: None,
        }
    }

    /// Binds the client, registers it and runs its loop on a thread.
    pub fn start(&mut self) {
        self.client.create_listener().expect("bind client socket");
        self.client.register_to_master().expect("register to master");
        let client = self.client.clone();
        self.event_loop = Some(thread::spawn(move || client.listen_to_events()));
    }

    /// Counts calls of a handler registered for `slot`.
    pub fn count(&self, slot: &str) -> Arc<AtomicUsize> {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        self.client
            .register_handler(slot, move |_: &Client, _: &mut Envelope| {
                seen.fetch_add(1, Ordering::SeqCst);
            });
        count
    }

    /// Delivers `envelope` to the client as the master would.
    pub fn deliver(&self, envelope: &Envelope) {
        self.deliver_raw(&encode(envelope).expect("encode"));
    }

    /// Delivers raw bytes to the client on a fresh connection.
    pub fn deliver_raw(&self, bytes: &[u8]) {
        let mut stream = UnixStream::connect(self.client.socket_path()).expect("connect to client");
        stream.write_all(bytes).expect("write to client");
    }

    /// Envelope from the master, as relayed messages are addressed.
    pub fn from_master(&self, event_type: &str) -> Envelope {
        Envelope::new(self.master.path().as_str(), event_type)
    }

    /// Closes the client and waits for its loop to return.
    pub fn stop(&mut self) -> Option<Result<(), ClientError>> {
        self.client.close();
        self.event_loop
            .take()
            .map(|handle| handle.join().expect("event loop thread"))
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        self.client.close();
        if let Some(handle) = self.event_loop.take() {
            let _ = handle.join();
        }
    }
}

/// Waits until `count` reaches `expected`.
pub(in crate::tests) fn reaches(count: &AtomicUsize, expected: usize) -> bool {
    wait_until(|| count.load(Ordering::SeqCst) >= expected)
}

/// Gives in-flight connection threads time to run before asserting that
/// something did not happen.
pub(in crate::tests) fn settle() {
    thread::sleep(std::time::Duration::from_millis(150));
}
