//! Payload values crossing the sandbox boundary.
//!
//! The bridge never interprets payloads. Everything that moves between a
//! capability object and a host operation is a [`Value`], and the serde
//! representation of `Value` is the wire contract for hosts that marshal
//! calls out of process.

use std::fmt;

use serde::{Deserialize, Serialize};

/// An opaque payload passed to or returned from a host operation.
///
/// Serialized adjacently tagged, e.g. `{"type":"text","value":"hello"}`.
/// [`Value::Absent`] serializes as `{"type":"absent"}` and doubles as the
/// "not found" sentinel for lookups.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    /// No value. Returned by operations with nothing to report and by
    /// lookups that found nothing.
    #[default]
    Absent,
    /// Raw bytes.
    Bytes(Vec<u8>),
    /// UTF-8 text.
    Text(String),
    /// Structured JSON data.
    Json(serde_json::Value),
}

impl Value {
    /// Create a text value.
    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }

    /// Create a bytes value.
    pub fn bytes(b: impl Into<Vec<u8>>) -> Self {
        Value::Bytes(b.into())
    }

    /// Returns true for [`Value::Absent`].
    pub fn is_absent(&self) -> bool {
        matches!(self, Value::Absent)
    }

    /// Borrow the value as text, if it is text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Borrow the value as raw bytes.
    ///
    /// Text is exposed as its UTF-8 encoding; JSON and absent values have
    /// no byte view.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            Value::Text(s) => Some(s.as_bytes()),
            _ => None,
        }
    }

    /// Name of the variant, as used in the serialized tag.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Absent => "absent",
            Value::Bytes(_) => "bytes",
            Value::Text(_) => "text",
            Value::Json(_) => "json",
        }
    }

    /// Stable byte encoding of the value, suitable as a map key.
    ///
    /// Two values produce the same key exactly when they are equal.
    pub fn to_key_bytes(&self) -> Vec<u8> {
        // Serializing a Value cannot fail: every variant maps to plain JSON.
        serde_json::to_vec(self).unwrap_or_default()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Absent => f.write_str("undefined"),
            Value::Text(s) => f.write_str(s),
            Value::Json(v) => write!(f, "{v}"),
            Value::Bytes(b) => {
                write!(f, "Uint8Array({}) [", b.len())?;
                for (i, byte) in b.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, " {byte}")?;
                }
                if b.is_empty() {
                    f.write_str("]")
                } else {
                    f.write_str(" ]")
                }
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Bytes(b)
    }
}

impl From<&[u8]> for Value {
    fn from(b: &[u8]) -> Self {
        Value::Bytes(b.to_vec())
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Value::Json(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Absent, Into::into)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_serialization_format() {
        let json = serde_json::to_string(&Value::text("hello")).unwrap();
        assert_eq!(json, r#"{"type":"text","value":"hello"}"#);

        let json = serde_json::to_string(&Value::Absent).unwrap();
        assert_eq!(json, r#"{"type":"absent"}"#);

        let json = serde_json::to_string(&Value::bytes(vec![1, 2])).unwrap();
        assert_eq!(json, r#"{"type":"bytes","value":[1,2]}"#);
    }

    #[test]
    fn test_deserialize_json_variant() {
        let value: Value =
            serde_json::from_str(r#"{"type":"json","value":{"a":[1,2]}}"#).unwrap();
        assert_eq!(value, Value::Json(json!({"a": [1, 2]})));
    }

    #[test]
    fn test_default_is_absent() {
        assert!(Value::default().is_absent());
        assert_eq!(Value::from(None::<String>), Value::Absent);
        assert_eq!(Value::from(Some("x")), Value::text("x"));
    }

    #[test]
    fn test_key_bytes_distinguish_variants() {
        // The text "1" and the JSON number 1 are different keys.
        assert_ne!(
            Value::text("1").to_key_bytes(),
            Value::Json(json!(1)).to_key_bytes()
        );
        assert_eq!(
            Value::text("a").to_key_bytes(),
            Value::from("a").to_key_bytes()
        );
    }

    #[test]
    fn test_as_bytes() {
        assert_eq!(Value::text("hi").as_bytes(), Some(&b"hi"[..]));
        assert_eq!(Value::bytes(vec![7]).as_bytes(), Some(&[7u8][..]));
        assert_eq!(Value::Json(json!(null)).as_bytes(), None);
        assert_eq!(Value::Absent.as_bytes(), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Absent.to_string(), "undefined");
        assert_eq!(Value::text("plain").to_string(), "plain");
        assert_eq!(Value::Json(json!({"k": 1})).to_string(), r#"{"k":1}"#);
        assert_eq!(Value::bytes(vec![1, 2]).to_string(), "Uint8Array(2) [ 1, 2 ]");
        assert_eq!(Value::bytes(Vec::new()).to_string(), "Uint8Array(0) []");
    }
}
