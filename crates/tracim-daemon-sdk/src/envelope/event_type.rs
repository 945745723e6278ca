//! Reserved envelope type tags.
//!
//! Values match the tags the Tracim master daemon puts on the wire. Any other
//! string is still a valid type; it simply has no reserved meaning.

// Client to master.

/// Registers the sending client with the master.
pub const CLIENT_ADD: &str = "daemon_client_add";
/// Removes the sending client from the master's subscriber set.
pub const CLIENT_DELETE: &str = "daemon_client_delete";
/// Asks the master for the currently registered clients.
pub const GET_CLIENTS: &str = "daemon_get_clients";
/// Asks the master which Tracim account it is logged in as.
pub const GET_ACCOUNT_INFO: &str = "daemon_get_account_info";
/// Asks the master to perform a Tracim API request on the client's behalf.
pub const DO_REQUEST: &str = "daemon_do_request";

// Either direction.

/// Acknowledges the previous message.
pub const ACK: &str = "daemon_ack";
/// Liveness probe; the receiver answers with [`PONG`].
pub const PING: &str = "daemon_ping";
/// Answer to [`PING`].
pub const PONG: &str = "daemon_pong";

// Master to client.

/// Result of a [`DO_REQUEST`].
pub const REQUEST_RESULT: &str = "daemon_request_result";
/// Identity of the account the master uses.
pub const ACCOUNT_INFO: &str = "daemon_account_info";
/// Answer to [`GET_CLIENTS`].
pub const CLIENTS: &str = "daemon_clients";

// Master to every client.

/// Relayed Tracim notification, carried as a JSON string.
pub const TRACIM_EVENT: &str = "daemon_tracim_event";
/// Broadcast when a client registers.
pub const CLIENT_ADDED: &str = "daemon_client_added";
/// Broadcast when a client unregisters.
pub const CLIENT_DELETED: &str = "daemon_client_deleted";

// Internal only, never sent.

/// Handler slot invoked for every inbound envelope.
pub const GENERIC: &str = "custom_message";
/// Handler slot receiving read, decode and accept failures.
pub const ERROR: &str = "custom_error";

/// Every tag with a reserved meaning.
pub const RESERVED: &[&str] = &[
    CLIENT_ADD,
    CLIENT_DELETE,
    GET_CLIENTS,
    GET_ACCOUNT_INFO,
    DO_REQUEST,
    ACK,
    PING,
    PONG,
    REQUEST_RESULT,
    ACCOUNT_INFO,
    CLIENTS,
    TRACIM_EVENT,
    CLIENT_ADDED,
    CLIENT_DELETED,
    GENERIC,
    ERROR,
];

/// Returns `true` when `event_type` has a reserved meaning.
#[must_use]
pub fn is_reserved(event_type: &str) -> bool {
    RESERVED.contains(&event_type)
}

/// Returns `true` for tags that only exist inside a client process.
#[must_use]
pub fn is_internal(event_type: &str) -> bool {
    event_type == GENERIC || event_type == ERROR
}
