//! Raw event envelope as delivered by the event bus.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::EventError;

/// A single event as received, before classification.
///
/// The envelope is kept as the raw JSON object; the fields the engine needs
/// are read through accessors that tolerate absence. Typed payloads are
/// produced by [`Event::parse_as`](super::Event::parse_as).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventEnvelope {
    fields: Map<String, Value>,
}

impl EventEnvelope {
    /// Accept a JSON value as an envelope. Only objects are envelopes.
    pub fn from_value(value: Value) -> Result<Self, EventError> {
        match value {
            Value::Object(fields) => Ok(Self { fields }),
            _ => Err(EventError::NotAnObject),
        }
    }

    pub fn source(&self) -> Option<&str> {
        self.field("source")
    }

    pub fn detail_type(&self) -> Option<&str> {
        self.field("detail-type")
    }

    pub fn detail(&self) -> Option<&Value> {
        self.fields.get("detail")
    }

    /// String field of the nested `detail` object.
    pub fn detail_str(&self, key: &str) -> Option<&str> {
        self.detail()?.get(key)?.as_str()
    }

    /// Pretty JSON rendering used when logging the received event.
    pub fn to_pretty_json(&self) -> String {
        serde_json::to_string_pretty(&self.fields).unwrap_or_else(|_| format!("{:?}", self.fields))
    }

    pub(crate) fn require(&self, key: &str) -> Result<&str, EventError> {
        self.field(key)
            .ok_or_else(|| EventError::MissingField(key.to_string()))
    }

    pub(crate) fn require_detail(&self, key: &str) -> Result<&str, EventError> {
        self.detail_str(key)
            .ok_or_else(|| EventError::MissingField(format!("detail.{key}")))
    }

    pub(crate) fn require_detail_value(&self) -> Result<&Value, EventError> {
        self.detail()
            .ok_or_else(|| EventError::MissingField("detail".to_string()))
    }

    pub(crate) fn field(&self, key: &str) -> Option<&str> {
        self.fields.get(key)?.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn non_object_values_are_rejected() {
        assert!(matches!(
            EventEnvelope::from_value(json!(["not", "an", "event"])),
            Err(EventError::NotAnObject)
        ));
        assert!(matches!(
            EventEnvelope::from_value(json!("text")),
            Err(EventError::NotAnObject)
        ));
    }

    #[test]
    fn accessors_tolerate_missing_and_mistyped_fields() {
        let envelope = EventEnvelope::from_value(json!({
            "source": 42,
            "detail": { "event": "pullRequestCreated" }
        }))
        .unwrap();

        assert_eq!(envelope.source(), None);
        assert_eq!(envelope.detail_type(), None);
        assert_eq!(envelope.detail_str("event"), Some("pullRequestCreated"));
        assert_eq!(envelope.detail_str("referenceType"), None);
    }

    #[test]
    fn missing_detail_key_reports_its_path() {
        let envelope = EventEnvelope::from_value(json!({ "detail": {} })).unwrap();

        let err = envelope.require_detail("referenceType").unwrap_err();
        assert_eq!(err.to_string(), "missing field `detail.referenceType`");
    }
}
