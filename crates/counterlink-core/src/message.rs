//! Real-time channel wire types.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

/// Well-known message types.
pub mod kinds {
    pub const ADD: &str = "add";
    pub const HEALTH: &str = "health";
}

/// A real-time channel message.
///
/// On the wire this is a JSON object with a required `type` and optional
/// `data` and `timestamp` (epoch milliseconds) fields. Peers may send any
/// JSON number as the timestamp, fractional or in exponent form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Number>,
}

impl Message {
    /// Create a bare message of the given type.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            data: None,
            timestamp: None,
        }
    }

    /// Attach a payload.
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Stamp the message with the current wall-clock time.
    pub fn stamped(mut self) -> Self {
        self.timestamp = Some(now_millis());
        self
    }

    /// `{"type":"add","data":{"a":a,"b":b},"timestamp":now}`
    pub fn add(a: impl Into<Number>, b: impl Into<Number>) -> Self {
        let mut data = serde_json::Map::new();
        data.insert("a".into(), Value::Number(a.into()));
        data.insert("b".into(), Value::Number(b.into()));
        Self::new(kinds::ADD).with_data(Value::Object(data)).stamped()
    }

    /// `{"type":"health","timestamp":now}`
    pub fn health() -> Self {
        Self::new(kinds::HEALTH).stamped()
    }

    /// Returns `true` if this message has the given type.
    pub fn is(&self, kind: &str) -> bool {
        self.kind == kind
    }
}

fn now_millis() -> Number {
    let ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0);
    Number::from(ms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn add_message_shape() {
        let msg = Message::add(5, 3);
        let val = serde_json::to_value(&msg).unwrap();
        assert_eq!(val["type"], "add");
        assert_eq!(val["data"], json!({"a": 5, "b": 3}));
        assert!(val["timestamp"].is_u64());
    }

    #[test]
    fn health_message_has_no_data() {
        let json = serde_json::to_string(&Message::health()).unwrap();
        assert!(json.contains("\"type\":\"health\""));
        assert!(json.contains("\"timestamp\""));
        assert!(!json.contains("\"data\""));
    }

    #[test]
    fn inbound_without_optional_fields() {
        let msg: Message = serde_json::from_str(r#"{"type":"add","data":{"result":8}}"#).unwrap();
        assert!(msg.is(kinds::ADD));
        assert_eq!(msg.data, Some(json!({"result": 8})));
        assert_eq!(msg.timestamp, None);
    }

    #[test]
    fn non_integer_timestamps_are_accepted() {
        for raw in ["1700000000000.5", "1.7e12", "1700000000000"] {
            let text = format!(r#"{{"type":"add","data":{{"result":10}},"timestamp":{raw}}}"#);
            let msg: Message = serde_json::from_str(&text).unwrap();
            assert!(msg.timestamp.is_some(), "timestamp {raw}");
        }
    }

    #[test]
    fn missing_type_is_rejected() {
        assert!(serde_json::from_str::<Message>(r#"{"data":1}"#).is_err());
    }
}
