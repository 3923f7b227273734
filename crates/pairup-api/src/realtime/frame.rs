//! Wire frames for the chat socket.
//!
//! Every frame in either direction is a JSON object whose `type` field
//! names the event or command; the remaining fields are its payload.
//! Outbound frames are built from [`Command`]; inbound frames parse into an
//! untyped [`InboundFrame`] (used for handler dispatch by name) and decode
//! into a typed [`ServerEvent`] with an `Unknown` fallback.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Event payload: every field of a frame except `type`.
pub type Payload = serde_json::Map<String, Value>;

/// Discriminant field carried by every frame.
pub const TYPE_FIELD: &str = "type";

/// Event name synthesized locally when the socket drops.
pub const DISCONNECTED: &str = "disconnected";

// ── Event names the server emits ─────────────────────────────────────

pub const QUEUE_JOINED: &str = "queue_joined";
pub const MATCH_FOUND: &str = "match_found";
pub const MESSAGE: &str = "message";
pub const PARTNER_LEFT: &str = "partner_left";
pub const CHAT_ENDED: &str = "chat_ended";
pub const SERVER_ERROR: &str = "error";

// ── Outbound ─────────────────────────────────────────────────────────

/// Partner filter for `join_queue` / `next_match`. Opaque to the client;
/// defaults to `"any"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LookingFor(String);

impl LookingFor {
    pub fn new(filter: impl Into<String>) -> Self {
        Self(filter.into())
    }

    pub fn any() -> Self {
        Self("any".into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for LookingFor {
    fn default() -> Self {
        Self::any()
    }
}

impl fmt::Display for LookingFor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LookingFor {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Commands the client sends over the chat socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    JoinQueue { looking_for: LookingFor },
    LeaveQueue,
    SendMessage { content: String },
    LeaveChat,
    NextMatch { looking_for: LookingFor },
}

impl Command {
    /// Wire `type` tag.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::JoinQueue { .. } => "join_queue",
            Self::LeaveQueue => "leave_queue",
            Self::SendMessage { .. } => "send_message",
            Self::LeaveChat => "leave_chat",
            Self::NextMatch { .. } => "next_match",
        }
    }

    /// Fields sent alongside the tag.
    pub fn payload(&self) -> Payload {
        let mut payload = Payload::new();
        match self {
            Self::JoinQueue { looking_for } | Self::NextMatch { looking_for } => {
                payload.insert("looking_for".into(), Value::from(looking_for.as_str()));
            }
            Self::SendMessage { content } => {
                payload.insert("content".into(), Value::from(content.as_str()));
            }
            Self::LeaveQueue | Self::LeaveChat => {}
        }
        payload
    }
}

/// Serialize `{type, ...payload}`. The tag comes first; a `type` key inside
/// the payload is ignored so it cannot override the tag.
pub fn encode(kind: &str, payload: &Payload) -> String {
    let mut frame = Payload::new();
    frame.insert(TYPE_FIELD.into(), Value::from(kind));
    for (key, value) in payload {
        if key != TYPE_FIELD {
            frame.insert(key.clone(), value.clone());
        }
    }
    Value::Object(frame).to_string()
}

// ── Inbound ──────────────────────────────────────────────────────────

/// Reasons an inbound text frame is dropped.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("frame is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("frame is not a JSON object")]
    NotAnObject,

    #[error("frame has no string `type` field")]
    MissingType,
}

/// A received frame split into its tag and payload.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundFrame {
    pub kind: String,
    pub payload: Payload,
}

impl InboundFrame {
    pub fn new(kind: impl Into<String>, payload: Payload) -> Self {
        Self {
            kind: kind.into(),
            payload,
        }
    }

    pub fn parse(text: &str) -> Result<Self, FrameError> {
        let Value::Object(mut payload) = serde_json::from_str::<Value>(text)? else {
            return Err(FrameError::NotAnObject);
        };
        match payload.remove(TYPE_FIELD) {
            Some(Value::String(kind)) => Ok(Self { kind, payload }),
            _ => Err(FrameError::MissingType),
        }
    }
}

// ── Typed events ─────────────────────────────────────────────────────

/// Close code and reason of a dropped connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloseInfo {
    pub code: u16,
    #[serde(default)]
    pub reason: String,
}

impl CloseInfo {
    /// Close code for a connection lost without a close frame.
    pub const ABNORMAL: u16 = 1006;

    pub fn new(code: u16, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }

    pub fn abnormal(reason: impl Into<String>) -> Self {
        Self::new(Self::ABNORMAL, reason)
    }

    pub fn to_payload(&self) -> Payload {
        let mut payload = Payload::new();
        payload.insert("code".into(), Value::from(self.code));
        payload.insert("reason".into(), Value::from(self.reason.as_str()));
        payload
    }
}

/// Position in the matching queue.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueueStatus {
    #[serde(default)]
    pub position: Option<u64>,
    #[serde(flatten)]
    pub extra: Payload,
}

/// The partner assigned by the server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchInfo {
    #[serde(default)]
    pub partner_id: Option<String>,
    #[serde(default)]
    pub partner_nickname: Option<String>,
    #[serde(default)]
    pub partner_bio: Option<String>,
    #[serde(flatten)]
    pub extra: Payload,
}

/// A chat line relayed from the partner.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(flatten)]
    pub extra: Payload,
}

/// Error notice from the server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerNotice {
    #[serde(default, alias = "detail")]
    pub message: Option<String>,
    #[serde(flatten)]
    pub extra: Payload,
}

/// Typed view of an inbound frame.
///
/// Payload fields are lenient: every field is optional, and a frame whose
/// payload still fails to decode is surfaced as `Unknown` rather than lost.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    QueueJoined(QueueStatus),
    MatchFound(MatchInfo),
    Message(ChatMessage),
    PartnerLeft(Payload),
    ChatEnded(Payload),
    Error(ServerNotice),
    Disconnected(CloseInfo),
    Unknown(InboundFrame),
}

impl ServerEvent {
    pub fn from_frame(frame: InboundFrame) -> Self {
        let decoded = match frame.kind.as_str() {
            QUEUE_JOINED => decode(&frame.payload).map(Self::QueueJoined),
            MATCH_FOUND => decode(&frame.payload).map(Self::MatchFound),
            MESSAGE => decode(&frame.payload).map(Self::Message),
            PARTNER_LEFT => Some(Self::PartnerLeft(frame.payload.clone())),
            CHAT_ENDED => Some(Self::ChatEnded(frame.payload.clone())),
            SERVER_ERROR => decode(&frame.payload).map(Self::Error),
            DISCONNECTED => decode(&frame.payload).map(Self::Disconnected),
            _ => None,
        };
        decoded.unwrap_or(Self::Unknown(frame))
    }

    /// Event name this variant was decoded from.
    pub fn name(&self) -> &str {
        match self {
            Self::QueueJoined(_) => QUEUE_JOINED,
            Self::MatchFound(_) => MATCH_FOUND,
            Self::Message(_) => MESSAGE,
            Self::PartnerLeft(_) => PARTNER_LEFT,
            Self::ChatEnded(_) => CHAT_ENDED,
            Self::Error(_) => SERVER_ERROR,
            Self::Disconnected(_) => DISCONNECTED,
            Self::Unknown(frame) => &frame.kind,
        }
    }
}

/// Decode a payload into one of the typed bodies.
pub fn decode<T: DeserializeOwned>(payload: &Payload) -> Option<T> {
    match serde_json::from_value(Value::Object(payload.clone())) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::debug!(error = %e, "payload does not match typed event");
            None
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn join_queue_wire_shape() {
        let cmd = Command::JoinQueue {
            looking_for: LookingFor::default(),
        };
        assert_eq!(
            encode(cmd.kind(), &cmd.payload()),
            r#"{"type":"join_queue","looking_for":"any"}"#
        );
    }

    #[test]
    fn command_tags_and_fields() {
        let msg = Command::SendMessage {
            content: "hi".into(),
        };
        assert_eq!(encode(msg.kind(), &msg.payload()), r#"{"type":"send_message","content":"hi"}"#);
        assert_eq!(
            encode(Command::LeaveChat.kind(), &Command::LeaveChat.payload()),
            r#"{"type":"leave_chat"}"#
        );
        assert_eq!(Command::LeaveQueue.kind(), "leave_queue");
        let next = Command::NextMatch {
            looking_for: "woman".into(),
        };
        assert_eq!(
            encode(next.kind(), &next.payload()),
            r#"{"type":"next_match","looking_for":"woman"}"#
        );
    }

    #[test]
    fn payload_cannot_override_tag() {
        let mut payload = Payload::new();
        payload.insert("type".into(), json!("spoofed"));
        payload.insert("x".into(), json!(1));
        assert_eq!(encode("leave_chat", &payload), r#"{"type":"leave_chat","x":1}"#);
    }

    #[test]
    fn parse_splits_type_from_payload() {
        let frame = InboundFrame::parse(r#"{"type":"message","content":"hello"}"#).unwrap();
        assert_eq!(frame.kind, "message");
        assert_eq!(frame.payload.get("content"), Some(&json!("hello")));
        assert!(!frame.payload.contains_key("type"));
    }

    #[test]
    fn parse_rejects_malformed_frames() {
        assert!(matches!(InboundFrame::parse("not json"), Err(FrameError::Json(_))));
        assert!(matches!(InboundFrame::parse("[1,2]"), Err(FrameError::NotAnObject)));
        assert!(matches!(InboundFrame::parse(r#"{"x":1}"#), Err(FrameError::MissingType)));
        assert!(matches!(InboundFrame::parse(r#"{"type":7}"#), Err(FrameError::MissingType)));
    }

    #[test]
    fn typed_decode_of_known_events() {
        let frame = InboundFrame::parse(
            r#"{"type":"match_found","partner_id":"p1","partner_nickname":"owl","room":"r9"}"#,
        )
        .unwrap();
        let ServerEvent::MatchFound(info) = ServerEvent::from_frame(frame) else {
            panic!("expected MatchFound");
        };
        assert_eq!(info.partner_id.as_deref(), Some("p1"));
        assert_eq!(info.partner_nickname.as_deref(), Some("owl"));
        assert_eq!(info.extra.get("room"), Some(&json!("r9")));
    }

    #[test]
    fn unknown_types_are_kept() {
        let frame = InboundFrame::parse(r#"{"type":"typing","on":true}"#).unwrap();
        let event = ServerEvent::from_frame(frame.clone());
        assert_eq!(event, ServerEvent::Unknown(frame));
        assert_eq!(event.name(), "typing");
    }

    #[test]
    fn ill_typed_payload_falls_back_to_unknown() {
        let frame = InboundFrame::parse(r#"{"type":"message","content":42}"#).unwrap();
        assert!(matches!(ServerEvent::from_frame(frame), ServerEvent::Unknown(_)));
    }

    #[test]
    fn disconnected_round_trips_through_payload() {
        let info = CloseInfo::abnormal("gone");
        let event = ServerEvent::from_frame(InboundFrame::new(DISCONNECTED, info.to_payload()));
        assert_eq!(event, ServerEvent::Disconnected(CloseInfo::new(1006, "gone")));
    }
}
