//! Wire frames exchanged with the customer event channel.
//!
//! Inbound text is decoded once at the boundary into an [`InboundFrame`],
//! which keeps the raw JSON object alongside a typed [`ServerEvent`].
//! Typed decoding never rejects a frame: an unrecognised `type` or a known
//! `type` with unexpected field shapes becomes [`ServerEvent::Unknown`].
//! Only non-JSON or non-object text is a decode error.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::{CoreError, Result};

/// JSON field carrying the frame discriminator.
pub const TYPE_FIELD: &str = "type";

// ─────────────────────────────────────────────────────────────────────────────
// ServerEvent: typed view of known frames
// ─────────────────────────────────────────────────────────────────────────────

/// Typed payload of a frame pushed by the server.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Greeting sent right after the socket is accepted.
    Connected {
        /// Human-readable greeting.
        message: Option<String>,
        /// Customer the channel is bound to.
        customer_id: Option<String>,
        /// Connections currently watching this customer.
        connection_count: Option<u32>,
    },

    /// Another client started watching the same customer.
    UserJoined {
        /// Customer the channel is bound to.
        customer_id: Option<String>,
        /// Connections currently watching this customer.
        connection_count: Option<u32>,
    },

    /// Another client stopped watching the same customer.
    UserLeft {
        /// Customer the channel is bound to.
        customer_id: Option<String>,
        /// Connections currently watching this customer.
        connection_count: Option<u32>,
    },

    /// A peer's message relayed by the server.
    #[serde(rename = "message")]
    Relay {
        /// Whatever the peer sent.
        #[serde(default)]
        data: Value,
        /// Customer the channel is bound to.
        customer_id: Option<String>,
    },

    /// A document was uploaded for the customer.
    DocumentUploaded {
        /// Customer the document belongs to.
        customer_id: Option<String>,
        /// Document record as returned by the API.
        #[serde(default)]
        data: Value,
    },

    /// A document was deleted.
    DocumentDeleted {
        /// Customer the document belonged to.
        customer_id: Option<String>,
        /// Deleted document id.
        document_id: String,
    },

    /// Customer master data changed.
    CustomerUpdated {
        /// Customer that changed.
        customer_id: Option<String>,
        /// Updated customer record.
        #[serde(default)]
        data: Value,
    },

    /// Any frame without a recognised shape.
    #[serde(skip)]
    Unknown,
}

// ─────────────────────────────────────────────────────────────────────────────
// InboundFrame
// ─────────────────────────────────────────────────────────────────────────────

/// A decoded inbound frame.
#[derive(Clone, Debug, PartialEq)]
pub struct InboundFrame {
    event_type: Option<String>,
    event: ServerEvent,
    raw: Value,
}

impl InboundFrame {
    /// Decode one text frame.
    ///
    /// The text must be a JSON object. A string `type` field becomes the
    /// dispatch key; a missing or non-string `type` leaves it unset.
    pub fn decode(text: &str) -> Result<Self> {
        let raw: Value = serde_json::from_str(text)?;
        Self::from_value(raw)
    }

    /// Build a frame from an already parsed JSON value.
    pub fn from_value(raw: Value) -> Result<Self> {
        if !raw.is_object() {
            return Err(CoreError::FrameNotObject {
                found: json_kind(&raw),
            });
        }
        let event_type = raw
            .get(TYPE_FIELD)
            .and_then(Value::as_str)
            .map(str::to_owned);
        let event = ServerEvent::deserialize(&raw).unwrap_or(ServerEvent::Unknown);
        Ok(Self {
            event_type,
            event,
            raw,
        })
    }

    /// The frame's `type` discriminator, if it carried a string one.
    #[must_use]
    pub fn event_type(&self) -> Option<&str> {
        self.event_type.as_deref()
    }

    /// Typed view of the frame.
    #[must_use]
    pub fn event(&self) -> &ServerEvent {
        &self.event
    }

    /// The full JSON object as received.
    #[must_use]
    pub fn raw(&self) -> &Value {
        &self.raw
    }

    /// Look up a top-level field of the raw object.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.raw.get(field)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// OutboundFrame
// ─────────────────────────────────────────────────────────────────────────────

/// A client-to-server message: `{"type": ..., "data": ...}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OutboundFrame {
    /// Message type.
    #[serde(rename = "type")]
    pub event_type: String,
    /// Message payload.
    pub data: Value,
}

impl OutboundFrame {
    /// Create a frame with an explicit payload.
    #[must_use]
    pub fn new(event_type: impl Into<String>, data: Value) -> Self {
        Self {
            event_type: event_type.into(),
            data,
        }
    }

    /// Create a frame with an empty object payload.
    #[must_use]
    pub fn empty(event_type: impl Into<String>) -> Self {
        Self::new(event_type, Value::Object(Map::new()))
    }

    /// Serialize to the single-line JSON text sent on the wire.
    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;

    #[test]
    fn decode_connected_greeting() {
        let frame = InboundFrame::decode(
            r#"{"type":"connected","message":"Connected to customer c1","customer_id":"c1","connection_count":2}"#,
        )
        .unwrap();
        assert_eq!(frame.event_type(), Some("connected"));
        assert_eq!(
            frame.event(),
            &ServerEvent::Connected {
                message: Some("Connected to customer c1".into()),
                customer_id: Some("c1".into()),
                connection_count: Some(2),
            }
        );
    }

    #[test]
    fn decode_document_deleted() {
        let frame =
            InboundFrame::decode(r#"{"type":"document_deleted","customer_id":"c1","document_id":"d9"}"#)
                .unwrap();
        assert_matches!(
            frame.event(),
            ServerEvent::DocumentDeleted { document_id, .. } if document_id == "d9"
        );
    }

    #[test]
    fn decode_relay_keeps_nested_data() {
        let frame =
            InboundFrame::decode(r#"{"type":"message","data":{"type":"ping","data":{}},"customer_id":"c1"}"#)
                .unwrap();
        assert_matches!(frame.event(), ServerEvent::Relay { data, .. } if data["type"] == "ping");
    }

    #[test]
    fn unknown_type_falls_back() {
        let frame = InboundFrame::decode(r#"{"type":"approved","doc_id":"d1"}"#).unwrap();
        assert_eq!(frame.event_type(), Some("approved"));
        assert_eq!(frame.event(), &ServerEvent::Unknown);
        assert_eq!(frame.raw(), &json!({"type": "approved", "doc_id": "d1"}));
        assert_eq!(frame.get("doc_id"), Some(&json!("d1")));
    }

    #[test]
    fn known_type_with_bad_fields_falls_back() {
        // document_id is required for document_deleted
        let frame = InboundFrame::decode(r#"{"type":"document_deleted"}"#).unwrap();
        assert_eq!(frame.event_type(), Some("document_deleted"));
        assert_eq!(frame.event(), &ServerEvent::Unknown);
    }

    #[test]
    fn missing_type_has_no_dispatch_key() {
        let frame = InboundFrame::decode(r#"{"x":1}"#).unwrap();
        assert_eq!(frame.event_type(), None);
        assert_eq!(frame.event(), &ServerEvent::Unknown);
    }

    #[test]
    fn non_string_type_has_no_dispatch_key() {
        let frame = InboundFrame::decode(r#"{"type":7}"#).unwrap();
        assert_eq!(frame.event_type(), None);
    }

    #[test]
    fn invalid_json_is_error() {
        assert_matches!(InboundFrame::decode("not json"), Err(CoreError::FrameJson(_)));
    }

    #[test]
    fn non_object_is_error() {
        assert_matches!(
            InboundFrame::decode("[1,2]"),
            Err(CoreError::FrameNotObject { found: "array" })
        );
        assert_matches!(
            InboundFrame::decode("\"hi\""),
            Err(CoreError::FrameNotObject { found: "string" })
        );
    }

    #[test]
    fn outbound_wire_shape() {
        let text = OutboundFrame::new("ping", json!({"n": 1})).encode().unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value, json!({"type": "ping", "data": {"n": 1}}));
    }

    #[test]
    fn outbound_empty_payload_is_object() {
        let frame = OutboundFrame::empty("refresh");
        assert_eq!(frame.data, json!({}));
    }
}
