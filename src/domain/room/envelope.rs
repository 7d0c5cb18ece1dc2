//! Wire envelope exchanged with room clients.
//!
//! Every frame in both directions is one JSON object:
//!
//! ```text
//! {"type": "vote", "value": "{\"points\":\"5\"}", "userId": ""}
//! ```
//!
//! `value` is itself a JSON document encoded as a string; only the
//! handler selected by `type` knows its shape.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DomainError, UserId};

/// Encoded frame shared between every subscriber of a broadcast.
pub type Payload = Arc<str>;

/// Sent to a newly admitted connection with the full room state.
pub const INIT: &str = "init";
/// Broadcast after a member is admitted, carrying the member list.
pub const MEMBER_JOINED: &str = "member_joined";
/// Broadcast after a member's connection is torn down.
pub const MEMBER_LEFT: &str = "member_left";
/// Sent before admission when the room is gated by a join code.
pub const JOIN_CODE_REQUIRED: &str = "join_code_required";
/// Sent when a join-code attempt does not match.
pub const JOIN_CODE_INCORRECT: &str = "join_code_incorrect";

/// `{type, value, userId}` message unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    #[serde(rename = "type")]
    pub event_type: String,

    #[serde(default)]
    pub value: String,

    /// Acting user on outbound envelopes; ignored on inbound ones.
    #[serde(default)]
    pub user_id: String,
}

impl Envelope {
    /// Creates an envelope with a raw string value and no acting user.
    pub fn new(event_type: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            value: value.into(),
            user_id: String::new(),
        }
    }

    /// Creates an envelope whose value is the JSON encoding of `value`.
    pub fn with_json<T: Serialize>(
        event_type: impl Into<String>,
        value: &T,
    ) -> Result<Self, DomainError> {
        Ok(Self::new(event_type, serde_json::to_string(value)?))
    }

    /// Tags the envelope with the acting user.
    pub fn from_user(mut self, user_id: &UserId) -> Self {
        self.user_id = user_id.to_string();
        self
    }

    /// Parses an inbound text frame.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Encodes the envelope for the outbound queues.
    pub fn encode(&self) -> Result<Payload, DomainError> {
        Ok(Arc::from(serde_json::to_string(self)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_serializes_wire_field_names() {
        let envelope = Envelope::new("vote_activity", "{}").from_user(&UserId::new("u1").unwrap());
        let json = envelope.encode().unwrap();
        assert!(json.contains(r#""type":"vote_activity""#));
        assert!(json.contains(r#""userId":"u1""#));
        assert!(json.contains(r#""value":"{}""#));
    }

    #[test]
    fn encode_uses_derived_wire_form() {
        let envelope = Envelope::new("member_left", "[]").from_user(&UserId::new("bob").unwrap());
        assert_eq!(
            &*envelope.encode().unwrap(),
            r#"{"type":"member_left","value":"[]","userId":"bob"}"#
        );
        assert_eq!(Envelope::parse(&envelope.encode().unwrap()).unwrap(), envelope);
    }

    #[test]
    fn inbound_envelope_without_user_id_parses() {
        let envelope = Envelope::parse(r#"{"type":"auth_poker","value":"ABC"}"#).unwrap();
        assert_eq!(envelope.event_type, "auth_poker");
        assert_eq!(envelope.value, "ABC");
        assert!(envelope.user_id.is_empty());
    }

    #[test]
    fn inbound_envelope_without_value_defaults_to_empty() {
        let envelope = Envelope::parse(r#"{"type":"end_voting"}"#).unwrap();
        assert!(envelope.value.is_empty());
    }

    #[test]
    fn inbound_envelope_without_type_is_rejected() {
        assert!(Envelope::parse(r#"{"value":"x"}"#).is_err());
        assert!(Envelope::parse("not json").is_err());
    }

    #[test]
    fn with_json_nests_value_as_string() {
        let envelope = Envelope::with_json("init", &serde_json::json!({"a": 1})).unwrap();
        assert_eq!(envelope.value, r#"{"a":1}"#);
    }
}
