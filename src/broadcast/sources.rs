//! Freshness sources and the push events derived from them.

use serde::Serialize;
use serde_json::Value;

use crate::cache::Fingerprint;

/// Event emitted when new log records exist.
pub const EVENT_NEW_LOGS: &str = "new_logs";
pub const FIELD_LAST_LOGID: &str = "last_logid";

/// Event emitted when the service table changed.
pub const EVENT_UPDATE_SERVICES: &str = "update_services";
pub const FIELD_LAST_TIMESTAMP: &str = "last_timestamp";

/// A named, zero-argument accessor for the current fingerprint of one kind
/// of data. The same accessors drive cache invalidation and change
/// broadcasting.
pub struct FreshnessSource {
    event: &'static str,
    field: &'static str,
    read: Box<dyn Fn() -> Fingerprint + Send + Sync>,
}

impl FreshnessSource {
    pub fn new<F>(event: &'static str, field: &'static str, read: F) -> Self
    where
        F: Fn() -> Fingerprint + Send + Sync + 'static,
    {
        Self {
            event,
            field,
            read: Box::new(read),
        }
    }

    /// Event name broadcast when this source changes.
    pub fn event(&self) -> &'static str {
        self.event
    }

    /// Read the current fingerprint.
    pub fn current(&self) -> Fingerprint {
        (self.read)()
    }

    /// Build the push event for a newly observed fingerprint.
    pub fn push_event(&self, fingerprint: &Fingerprint) -> PushEvent {
        let mut data = serde_json::Map::new();
        data.insert(
            self.field.to_string(),
            serde_json::to_value(fingerprint).unwrap_or(Value::Null),
        );
        PushEvent {
            event: self.event.to_string(),
            data: Value::Object(data),
        }
    }
}

impl std::fmt::Debug for FreshnessSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FreshnessSource")
            .field("event", &self.event)
            .field("field", &self.field)
            .finish()
    }
}

/// One "something changed" notification, sent to every live connection as a
/// single JSON text frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PushEvent {
    pub event: String,
    pub data: Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_push_event_shape() {
        let source = FreshnessSource::new(EVENT_NEW_LOGS, FIELD_LAST_LOGID, || Fingerprint::Int(7));
        assert_eq!(source.current(), Fingerprint::Int(7));

        let event = source.push_event(&source.current());
        assert_eq!(event.event, "new_logs");
        assert_eq!(event.data, json!({ "last_logid": 7 }));

        let frame = serde_json::to_string(&event).unwrap();
        assert_eq!(frame, r#"{"event":"new_logs","data":{"last_logid":7}}"#);
    }

    #[test]
    fn test_timestamp_source_shape() {
        let source = FreshnessSource::new(EVENT_UPDATE_SERVICES, FIELD_LAST_TIMESTAMP, || {
            Fingerprint::Text("2024-01-01T00:00:00Z".into())
        });
        let event = source.push_event(&source.current());
        assert_eq!(
            event.data,
            json!({ "last_timestamp": "2024-01-01T00:00:00Z" })
        );
    }
}
