//! Tracim live messages relayed by the master.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

/// A Tracim live message (TLM) as relayed inside a `daemon_tracim_event`
/// envelope.
///
/// The envelope payload is a JSON string containing this record, not the
/// record itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    /// Tracim event id.
    #[serde(default)]
    pub event_id: i64,
    /// Dotted event type such as `content.modified.html-document`; used as a
    /// second-level routing key.
    pub event_type: String,
    /// Read marker, left uninterpreted.
    #[serde(default)]
    pub read: Value,
    /// Creation time of the event.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub created: Option<OffsetDateTime>,
    /// Event-specific fields, left uninterpreted.
    #[serde(default)]
    pub fields: Value,
}

impl Notification {
    /// Parses the inner record of a relay envelope.
    ///
    /// # Errors
    ///
    /// Returns the JSON error when `text` is not a notification object.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Entity part of the event type (`content` in `content.modified.file`).
    #[must_use]
    pub fn entity(&self) -> &str {
        self.event_type
            .split('.')
            .next()
            .unwrap_or(self.event_type.as_str())
    }

    /// Operation part of the event type (`modified` in
    /// `content.modified.file`), if present.
    #[must_use]
    pub fn operation(&self) -> Option<&str> {
        self.event_type.split('.').nth(1)
    }

    /// Looks up a top-level entry of `fields`.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use time::macros::datetime;

    use super::*;

    const SAMPLE: &str = r#"{
        "event_id": 3141,
        "event_type": "content.modified.html-document",
        "read": null,
        "created": "2024-03-05T10:15:30Z",
        "fields": {"author": {"user_id": 1}, "content": {"label": "Notes"}}
    }"#;

    #[test]
    fn parses_relayed_record() {
        let notification = Notification::parse(SAMPLE).expect("parse");
        assert_eq!(notification.event_id, 3141);
        assert_eq!(notification.created, Some(datetime!(2024-03-05 10:15:30 UTC)));
        assert_eq!(
            notification.field("content"),
            Some(&json!({"label": "Notes"}))
        );
    }

    #[test]
    fn splits_event_type() {
        let notification = Notification::parse(SAMPLE).expect("parse");
        assert_eq!(notification.entity(), "content");
        assert_eq!(notification.operation(), Some("modified"));
    }

    #[test]
    fn optional_members_default() {
        let notification = Notification::parse(r#"{"event_type":"user.created"}"#)
            .expect("parse minimal");
        assert_eq!(notification.event_id, 0);
        assert_eq!(notification.created, None);
        assert_eq!(notification.fields, Value::Null);
    }

    #[test]
    fn requires_event_type() {
        assert!(Notification::parse(r#"{"event_id":1}"#).is_err());
    }

    #[test]
    fn rejects_invalid_timestamp() {
        assert!(
            Notification::parse(r#"{"event_type":"x","created":"yesterday"}"#).is_err()
        );
    }
}
