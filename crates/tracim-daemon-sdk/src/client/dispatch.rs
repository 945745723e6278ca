//! Connection handler that turns inbound messages into handler calls.

use std::io;
use std::os::unix::net::UnixStream;

use tracing::{debug, trace};

use super::errors::DispatchError;
use super::{CLIENT_TARGET, Client};
use crate::envelope::{Envelope, decode, event_type};
use crate::payload::Notification;
use crate::transport::{ConnectionHandler, MAX_MESSAGE_BYTES, read_message};

/// Reads one envelope per connection and dispatches it on the client.
pub(crate) struct Dispatcher {
    client: Client,
}

impl Dispatcher {
    pub(crate) fn new(client: Client) -> Self {
        Self { client }
    }
}

impl ConnectionHandler for Dispatcher {
    fn handle(&self, mut stream: UnixStream) {
        let bytes = match read_message(&mut stream, MAX_MESSAGE_BYTES) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                debug!(target: CLIENT_TARGET, "peer closed without sending a message");
                return;
            }
            Err(error) => {
                self.client.report_error(&DispatchError::Read(error));
                return;
            }
        };
        drop(stream);

        match decode(&bytes) {
            Ok(envelope) => self.client.dispatch(envelope),
            Err(error) => self.client.report_error(&DispatchError::Decode(error)),
        }
    }

    fn accept_failed(&self, error: &io::Error) {
        let error = io::Error::new(error.kind(), error.to_string());
        self.client.report_error(&DispatchError::Accept(error));
    }
}

impl Client {
    /// Runs the handlers for one inbound envelope.
    ///
    /// The generic handler runs first, then the handler for the envelope's
    /// own type. A relayed notification additionally runs the handler for
    /// the notification's inner type, with the outer envelope.
    pub(crate) fn dispatch(&self, mut envelope: Envelope) {
        let outer_type = envelope.event_type.clone();
        // Read the relay before any handler gets to project the payload.
        let relayed = if outer_type == event_type::TRACIM_EVENT {
            envelope.text_payload().map(Notification::parse)
        } else {
            None
        };
        trace!(
            target: CLIENT_TARGET,
            event_type = %outer_type,
            from = %envelope.path,
            "dispatching envelope"
        );

        if let Some(handler) = self.inner.handlers.get(event_type::GENERIC) {
            handler.handle(self, &mut envelope);
        }
        if let Some(handler) = self.inner.handlers.get(&outer_type) {
            handler.handle(self, &mut envelope);
        }

        match relayed {
            Some(Ok(notification)) => {
                if let Some(handler) = self.inner.handlers.get(&notification.event_type) {
                    handler.handle(self, &mut envelope);
                }
            }
            Some(Err(error)) => self.report_error(&DispatchError::Relay(error)),
            None => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use serde_json::{Value, json};

    use super::*;
    use crate::client::ClientConfig;
    use crate::envelope::EventData;

    type Calls = Arc<Mutex<Vec<(String, String)>>>;

    fn client() -> Client {
        Client::new(ClientConfig::new("/tmp/master.sock", "/tmp/client.sock"))
    }

    fn record(client: &Client, slot: &str, calls: &Calls) {
        let calls = Arc::clone(calls);
        let label = slot.to_owned();
        client.register_handler(slot, move |_: &Client, envelope: &mut Envelope| {
            calls
                .lock()
                .expect("calls lock")
                .push((label.clone(), envelope.path.clone()));
        });
    }

    fn relay(inner: Value) -> Envelope {
        Envelope {
            path: "/tmp/master.sock".to_owned(),
            event_type: event_type::TRACIM_EVENT.to_owned(),
            data: Some(EventData::Opaque(Value::String(inner.to_string()))),
        }
    }

    #[test]
    fn generic_runs_before_type_handler() {
        let client = client();
        let calls = Calls::default();
        record(&client, event_type::GENERIC, &calls);
        record(&client, "foo", &calls);

        client.dispatch(Envelope::new("/tmp/peer.sock", "foo"));

        let calls = calls.lock().expect("calls lock");
        let order: Vec<_> = calls.iter().map(|(slot, _)| slot.as_str()).collect();
        assert_eq!(order, ["custom_message", "foo"]);
    }

    #[test]
    fn relay_reaches_inner_type_with_outer_envelope() {
        let client = client();
        let calls = Calls::default();
        record(&client, event_type::TRACIM_EVENT, &calls);
        record(&client, "content.modified.html-document", &calls);

        client.dispatch(relay(json!({
            "event_id": 1,
            "event_type": "content.modified.html-document",
        })));

        let calls = calls.lock().expect("calls lock");
        assert_eq!(
            *calls,
            [
                ("daemon_tracim_event".to_owned(), "/tmp/master.sock".to_owned()),
                (
                    "content.modified.html-document".to_owned(),
                    "/tmp/master.sock".to_owned()
                ),
            ]
        );
    }

    #[test]
    fn malformed_relay_is_reported_not_dispatched() {
        let client = client();
        let calls = Calls::default();
        record(&client, event_type::ERROR, &calls);
        record(&client, event_type::TRACIM_EVENT, &calls);

        client.dispatch(Envelope {
            data: Some(EventData::Opaque(Value::String("{not json".to_owned()))),
            ..relay(json!({}))
        });

        let calls = calls.lock().expect("calls lock");
        let slots: Vec<_> = calls.iter().map(|(slot, path)| (slot.as_str(), path.as_str())).collect();
        assert_eq!(slots, [("daemon_tracim_event", "/tmp/master.sock"), ("custom_error", "")]);
    }

    #[test]
    fn relay_with_object_payload_only_runs_outer_handlers() {
        let client = client();
        let calls = Calls::default();
        record(&client, event_type::ERROR, &calls);
        record(&client, "workspace.created", &calls);

        client.dispatch(Envelope {
            data: Some(EventData::Opaque(json!({"event_type": "workspace.created"}))),
            ..relay(json!({}))
        });

        assert!(calls.lock().expect("calls lock").is_empty());
    }

    #[test]
    fn unknown_types_run_nothing() {
        let client = client();
        let calls = Calls::default();
        record(&client, event_type::ERROR, &calls);
        record(&client, "foo", &calls);

        client.dispatch(Envelope::new("/tmp/peer.sock", "bar"));

        assert!(calls.lock().expect("calls lock").is_empty());
    }

    #[test]
    fn handlers_may_register_handlers() {
        let client = client();
        let calls = Calls::default();
        let inner_calls = Arc::clone(&calls);
        client.register_handler("install", move |client: &Client, _: &mut Envelope| {
            record(client, "late", &inner_calls);
        });

        client.dispatch(Envelope::new("/tmp/peer.sock", "install"));
        client.dispatch(Envelope::new("/tmp/peer.sock", "late"));

        assert_eq!(calls.lock().expect("calls lock").len(), 1);
    }

    #[test]
    fn account_info_from_master_sets_user_id() {
        let client = client();
        client.dispatch(
            Envelope::with_payload(
                "/tmp/master.sock",
                event_type::ACCOUNT_INFO,
                &json!({"user_id": "17"}),
            )
            .expect("envelope"),
        );
        assert_eq!(client.user_id().as_deref(), Some("17"));
    }

    #[test]
    fn account_info_from_other_peers_is_ignored() {
        let client = client();
        client.dispatch(
            Envelope::with_payload(
                "/tmp/impostor.sock",
                event_type::ACCOUNT_INFO,
                &json!({"user_id": "666"}),
            )
            .expect("envelope"),
        );
        assert_eq!(client.user_id(), None);
    }
}
