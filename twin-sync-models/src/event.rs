use crate::constants::UPDATE_TWIN_PROPERTY;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::collections::HashMap;
use twin_sync_error::event::EventError;

/// One inbound device event with its out-of-band metadata.
///
/// The body stays opaque bytes until the pipeline decodes it; the device
/// identity and application properties travel outside the body, the way the
/// delivery transport carries them.
#[derive(Debug, Clone)]
pub struct DeviceEvent {
    /// Target device identity, taken from transport metadata
    pub device_id: String,
    /// Application properties attached to the event
    pub properties: HashMap<String, String>,
    /// Raw event body
    pub payload: Vec<u8>,
    /// When this process picked the event up
    pub enqueued_at: DateTime<Utc>,
}

impl DeviceEvent {
    pub fn new(
        device_id: impl Into<String>,
        properties: HashMap<String, String>,
        payload: Vec<u8>,
    ) -> Self {
        Self {
            device_id: device_id.into(),
            properties,
            payload,
            enqueued_at: Utc::now(),
        }
    }

    /// Whether this event is flagged for twin reconciliation.
    ///
    /// The marker gates the whole pipeline: events without it never reach
    /// the registry. Presence is enough, the value is not inspected.
    #[inline]
    pub fn wants_twin_update(&self) -> bool {
        self.properties.contains_key(UPDATE_TWIN_PROPERTY)
    }

    /// Decode the body into a JSON object, rejecting anything else.
    pub fn decode_payload(&self) -> Result<Map<String, Value>, EventError> {
        let value: Value =
            serde_json::from_slice(&self.payload).map_err(|e| EventError::InvalidJson {
                reason: e.to_string(),
            })?;
        match value {
            Value::Object(map) => Ok(map),
            other => Err(EventError::NotAnObject {
                kind: json_kind(&other),
            }),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event_with(properties: &[(&str, &str)], payload: &[u8]) -> DeviceEvent {
        let properties = properties
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        DeviceEvent::new("dev-1", properties, payload.to_vec())
    }

    #[test]
    fn marker_property_gates_update() {
        let flagged = event_with(&[(UPDATE_TWIN_PROPERTY, "")], b"{}");
        assert!(flagged.wants_twin_update());

        let unflagged = event_with(&[("SomethingElse", "1")], b"{}");
        assert!(!unflagged.wants_twin_update());
    }

    #[test]
    fn decode_accepts_objects_only() {
        let obj = event_with(&[], br#"{"temp": 21}"#);
        assert_eq!(obj.decode_payload().unwrap().len(), 1);

        let arr = event_with(&[], b"[1, 2]");
        assert!(matches!(
            arr.decode_payload(),
            Err(EventError::NotAnObject { kind: "array" })
        ));

        let garbage = event_with(&[], b"not json");
        assert!(matches!(
            garbage.decode_payload(),
            Err(EventError::InvalidJson { .. })
        ));
    }
}
