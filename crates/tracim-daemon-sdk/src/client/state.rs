//! Client lifecycle states.

use std::fmt;

/// Where a [`Client`](super::Client) is in its lifecycle.
///
/// ```text
/// Created -> Listening -> Registered -> Running -> Closed
///                  \______________________/
/// ```
///
/// Listening may go straight to Running when the caller never registers.
/// Every state may move to `Closed`, which is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    /// Handlers may be registered; no socket is bound yet.
    Created,
    /// The inbound socket is bound but not accepting.
    Listening,
    /// The master has been told about this client.
    Registered,
    /// The accept loop is running.
    Running,
    /// The client has released its socket and stopped.
    Closed,
}

impl ClientState {
    /// Returns `true` when the accept loop may be entered from this state.
    #[must_use]
    pub fn can_listen(self) -> bool {
        matches!(self, Self::Listening | Self::Registered)
    }

    /// Returns `true` once a socket has been bound for this client.
    #[must_use]
    pub fn has_socket(self) -> bool {
        matches!(self, Self::Listening | Self::Registered | Self::Running)
    }
}

impl fmt::Display for ClientState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Created => "created",
            Self::Listening => "listening",
            Self::Registered => "registered",
            Self::Running => "running",
            Self::Closed => "closed",
        };
        f.write_str(label)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(ClientState::Created, false)]
    #[case(ClientState::Listening, true)]
    #[case(ClientState::Registered, true)]
    #[case(ClientState::Running, false)]
    #[case(ClientState::Closed, false)]
    fn only_bound_idle_clients_can_listen(#[case] state: ClientState, #[case] expected: bool) {
        assert_eq!(state.can_listen(), expected);
    }

    #[test]
    fn displays_lowercase_labels() {
        assert_eq!(ClientState::Registered.to_string(), "registered");
    }
}
