//! One-shot outbound delivery.

use std::io::Write;
use std::os::unix::net::UnixStream;

use camino::Utf8Path;
use tracing::trace;

use super::{SendError, TRANSPORT_TARGET};
use crate::envelope::{Envelope, encode};

/// Delivers `envelope` to the socket at `path` on a fresh connection.
///
/// The connection is dropped once the write completes or fails. There is no
/// retry, no timeout and no wait for an acknowledgement; any reply arrives
/// later as an inbound message on the sender's own socket.
///
/// # Errors
///
/// Returns [`SendError::Connect`] when nothing listens at `path`,
/// [`SendError::Serialization`] when the envelope cannot be encoded and
/// [`SendError::Write`] when the write fails.
pub fn send(path: &Utf8Path, envelope: &Envelope) -> Result<(), SendError> {
    let mut stream = UnixStream::connect(path).map_err(|source| SendError::Connect {
        path: path.to_path_buf(),
        source,
    })?;
    let bytes = encode(envelope)?;

    stream
        .write_all(&bytes)
        .and_then(|()| stream.flush())
        .map_err(|source| SendError::Write {
            path: path.to_path_buf(),
            source,
        })?;

    trace!(
        target: TRANSPORT_TARGET,
        path = %path,
        event_type = %envelope.event_type,
        bytes = bytes.len(),
        "envelope sent"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Read;
    use std::os::unix::net::UnixListener;
    use std::thread;

    use camino::Utf8PathBuf;

    use super::*;
    use crate::envelope::{decode, event_type};

    fn socket_path(dir: &tempfile::TempDir, name: &str) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(dir.path().join(name)).expect("utf8 temp path")
    }

    #[test]
    fn delivers_one_envelope_per_connection() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = socket_path(&dir, "peer.sock");
        let listener = UnixListener::bind(&path).expect("bind peer");
        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().expect("accept");
            let mut received = Vec::new();
            stream.read_to_end(&mut received).expect("read until hang-up");
            received
        });

        let envelope = Envelope::new("/tmp/me.sock", event_type::PING);
        send(&path, &envelope).expect("send");

        let received = server.join().expect("server thread");
        assert_eq!(decode(&received).expect("decode"), envelope);
    }

    #[test]
    fn missing_peer_is_a_connect_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = socket_path(&dir, "absent.sock");

        let error = send(&path, &Envelope::new("", event_type::PING)).expect_err("no peer");

        assert!(matches!(error, SendError::Connect { .. }));
        assert!(error.is_peer_down());
    }
}
