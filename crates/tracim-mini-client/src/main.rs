//! Entrypoint for the Tracim mini client.

use std::io;
use std::process::ExitCode;

fn main() -> ExitCode {
    // Not locked: connection threads log to stderr while `run` is blocked.
    tracim_mini_client::run(std::env::args_os(), &mut io::stderr())
}
