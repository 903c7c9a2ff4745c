//! JSON envelope codec
//!
//! Every payload on the wire is a JSON object. Some servers answer with a
//! bare top-level array instead; such a response is wrapped as
//! `{"data": [...]}` so callers always get a [`Packet`].

use crate::error::CodecError;
use crate::packet::{Packet, DATA_KEY};
use serde_json::Value;

/// Encode a packet as JSON bytes
pub fn encode(packet: &Packet) -> Result<Vec<u8>, CodecError> {
    serde_json::to_vec(packet).map_err(|e| CodecError::Encode(e.to_string()))
}

/// Encode a packet as a JSON string (one WebSocket text frame)
pub fn encode_text(packet: &Packet) -> Result<String, CodecError> {
    serde_json::to_string(packet).map_err(|e| CodecError::Encode(e.to_string()))
}

/// Decode JSON bytes into a packet
///
/// Objects are returned as-is, arrays are wrapped under `data`, anything
/// else is rejected.
pub fn decode(bytes: &[u8]) -> Result<Packet, CodecError> {
    let value: Value =
        serde_json::from_slice(bytes).map_err(|e| CodecError::Decode(e.to_string()))?;
    into_packet(value)
}

/// Decode a JSON string into a packet
pub fn decode_text(text: &str) -> Result<Packet, CodecError> {
    decode(text.as_bytes())
}

fn into_packet(value: Value) -> Result<Packet, CodecError> {
    match value {
        Value::Object(map) => Ok(map),
        Value::Array(items) => {
            let mut packet = Packet::new();
            packet.insert(DATA_KEY.to_string(), Value::Array(items));
            Ok(packet)
        }
        Value::Null => Err(CodecError::UnexpectedShape("null")),
        Value::Bool(_) => Err(CodecError::UnexpectedShape("boolean")),
        Value::Number(_) => Err(CodecError::UnexpectedShape("number")),
        Value::String(_) => Err(CodecError::UnexpectedShape("string")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn packet(value: Value) -> Packet {
        match value {
            Value::Object(map) => map,
            other => panic!("not an object: {}", other),
        }
    }

    #[test]
    fn test_round_trip_nested_packet() {
        let original = packet(json!({
            "type": "message",
            "data": {"content": "héllo", "tags": ["a", "b"], "count": 3, "ratio": 0.5},
            "flag": true,
            "nothing": null
        }));

        let bytes = encode(&original).unwrap();
        assert_eq!(decode(&bytes).unwrap(), original);

        let text = encode_text(&original).unwrap();
        assert_eq!(decode_text(&text).unwrap(), original);
    }

    #[test]
    fn test_empty_object() {
        assert_eq!(decode(b"{}").unwrap(), Packet::new());
    }

    #[test]
    fn test_bare_array_wrapped_under_data() {
        let decoded = decode(br#"[{"id": 1}, {"id": 2}]"#).unwrap();
        assert_eq!(Value::Object(decoded), json!({"data": [{"id": 1}, {"id": 2}]}));

        let decoded = decode(b"[1, \"two\"]").unwrap();
        assert_eq!(Value::Object(decoded), json!({"data": [1, "two"]}));
    }

    #[test]
    fn test_scalars_rejected() {
        assert_eq!(decode(b"42"), Err(CodecError::UnexpectedShape("number")));
        assert_eq!(decode(b"\"pong\""), Err(CodecError::UnexpectedShape("string")));
        assert_eq!(decode(b"null"), Err(CodecError::UnexpectedShape("null")));
        assert_eq!(decode(b"true"), Err(CodecError::UnexpectedShape("boolean")));
    }

    #[test]
    fn test_malformed_rejected() {
        assert!(matches!(decode(b"{\"type\":"), Err(CodecError::Decode(_))));
        assert!(matches!(decode(b""), Err(CodecError::Decode(_))));
        assert!(matches!(decode_text("not json"), Err(CodecError::Decode(_))));
    }
}
