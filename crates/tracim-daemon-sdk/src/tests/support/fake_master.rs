//! Fake master daemon that records every envelope it receives.

use std::os::unix::net::UnixStream;
use std::sync::{Arc, Mutex};

use camino::Utf8Path;

use crate::envelope::{Envelope, decode};
use crate::transport::{
    ConnectionHandler, ListenerHandle, MAX_MESSAGE_BYTES, SocketListener, read_message, wait_until,
};

#[derive(Default)]
struct Recorder {
    received: Mutex<Vec<Envelope>>,
}

impl ConnectionHandler for Recorder {
    fn handle(&self, mut stream: UnixStream) {
        let Ok(Some(bytes)) = read_message(&mut stream, MAX_MESSAGE_BYTES) else {
            return;
        };
        if let Ok(envelope) = decode(&bytes) {
            self.received.lock().expect("recorder lock").push(envelope);
        }
    }
}

/// Master stand-in listening on a Unix socket.
pub(in crate::tests) struct FakeMaster {
    path: camino::Utf8PathBuf,
    recorder: Arc<Recorder>,
    handle: Option<ListenerHandle>,
}

impl FakeMaster {
    /// Binds at `path` and starts recording.
    pub fn spawn(path: &Utf8Path) -> Self {
        let recorder = Arc::new(Recorder::default());
        let listener = SocketListener::bind(path).expect("bind fake master");
        let handle = listener
            .start(Arc::clone(&recorder) as Arc<dyn ConnectionHandler>)
            .expect("start fake master");
        Self {
            path: path.to_owned(),
            recorder,
            handle: Some(handle),
        }
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Snapshot of the envelopes received so far, in arrival order.
    pub fn received(&self) -> Vec<Envelope> {
        self.recorder.received.lock().expect("recorder lock").clone()
    }

    /// Envelopes of the given type received so far.
    pub fn received_of(&self, event_type: &str) -> Vec<Envelope> {
        self.received()
            .into_iter()
            .filter(|envelope| envelope.is(event_type))
            .collect()
    }

    /// Waits until at least `expected` envelopes of `event_type` arrived.
    pub fn wait_for(&self, event_type: &str, expected: usize) -> bool {
        wait_until(|| self.received_of(event_type).len() >= expected)
    }
}

impl Drop for FakeMaster {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.shutdown();
            let _ = handle.join();
        }
    }
}
