//! Connection handling abstractions for the listener.

use std::io::{self, Read};
use std::os::unix::net::UnixStream;

use tracing::warn;

use super::TRANSPORT_TARGET;

/// Upper bound on the size of one inbound message.
///
/// Messages carry no length prefix; whatever a single read returns, up to
/// this many bytes, is the whole message. Longer messages are truncated and
/// then fail to decode.
pub const MAX_MESSAGE_BYTES: usize = 4096;

/// Handles accepted socket connections.
pub trait ConnectionHandler: Send + Sync + 'static {
    /// Handles a single connection on its own thread. Implementations should
    /// avoid panicking.
    fn handle(&self, stream: UnixStream);

    /// Called from the accept loop when `accept` fails. The loop keeps
    /// running afterwards.
    fn accept_failed(&self, error: &io::Error) {
        warn!(
            target: TRANSPORT_TARGET,
            error = %error,
            "socket accept error"
        );
    }
}

/// Reads one message with a single bounded read.
///
/// Returns `Ok(None)` when the peer hung up without writing anything.
pub fn read_message(stream: &mut impl Read, max_bytes: usize) -> io::Result<Option<Vec<u8>>> {
    let mut buffer = vec![0_u8; max_bytes];
    let bytes_read = read_with_retry(stream, &mut buffer)?;
    if bytes_read == 0 {
        return Ok(None);
    }
    buffer.truncate(bytes_read);
    Ok(Some(buffer))
}

fn read_with_retry(stream: &mut impl Read, buf: &mut [u8]) -> io::Result<usize> {
    loop {
        match stream.read(buf) {
            Ok(read) => return Ok(read),
            Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
            Err(error) => return Err(error),
        }
    }
}
