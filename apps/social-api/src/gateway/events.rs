//! Gateway opcodes, event names, and wire-format messages.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Opcodes
// ---------------------------------------------------------------------------

pub const OP_DISPATCH: u8 = 0;
pub const OP_HEARTBEAT: u8 = 1;
pub const OP_IDENTIFY: u8 = 2;
pub const OP_HEARTBEAT_ACK: u8 = 6;
pub const OP_REQUEST: u8 = 8;

// ---------------------------------------------------------------------------
// Close codes
// ---------------------------------------------------------------------------

pub const CLOSE_POLICY_VIOLATION: u16 = 1008;
pub const CLOSE_UNKNOWN_ERROR: u16 = 4000;
pub const CLOSE_UNKNOWN_OPCODE: u16 = 4001;
pub const CLOSE_NOT_AUTHENTICATED: u16 = 4003;
pub const CLOSE_SESSION_SUPERSEDED: u16 = 4008;
pub const CLOSE_SESSION_TIMEOUT: u16 = 4009;
pub const CLOSE_DELIVERY_FAILED: u16 = 4010;

// ---------------------------------------------------------------------------
// Server → Client message
// ---------------------------------------------------------------------------

/// A message sent from the server to the client over WebSocket.
#[derive(Debug, Clone, Serialize)]
pub struct GatewayMessage {
    pub op: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub t: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub s: Option<u64>,
    /// Echo of the client's request nonce on replies.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
    pub d: Value,
}

impl GatewayMessage {
    /// Build a DISPATCH message (op=0).
    pub fn dispatch(event_name: &str, seq: u64, data: Value) -> Self {
        Self {
            op: OP_DISPATCH,
            t: Some(event_name.to_string()),
            s: Some(seq),
            nonce: None,
            d: data,
        }
    }

    /// Build a DISPATCH reply to a client REQUEST.
    pub fn reply(event_name: &str, seq: u64, nonce: Option<String>, data: Value) -> Self {
        Self {
            nonce,
            ..Self::dispatch(event_name, seq, data)
        }
    }

    /// Build a HEARTBEAT_ACK message (op=6).
    pub fn heartbeat_ack(seq: u64) -> Self {
        Self {
            op: OP_HEARTBEAT_ACK,
            t: None,
            s: None,
            nonce: None,
            d: serde_json::json!({ "ack": seq }),
        }
    }
}

// ---------------------------------------------------------------------------
// Client → Server message
// ---------------------------------------------------------------------------

/// A message received from the client over WebSocket.
#[derive(Debug, Deserialize)]
pub struct ClientMessage {
    pub op: u8,
    #[serde(default)]
    pub t: Option<String>,
    #[serde(default)]
    pub nonce: Option<String>,
    #[serde(default)]
    pub d: Value,
}

#[derive(Debug, Deserialize)]
pub struct IdentifyPayload {
    pub ticket: String,
}

#[derive(Debug, Deserialize)]
pub struct HeartbeatPayload {
    #[serde(default)]
    pub seq: u64,
}

#[derive(Debug, Deserialize)]
pub struct MarkReadPayload {
    /// Accepts the id either as a JSON string or a number.
    pub notification_id: Value,
}

impl MarkReadPayload {
    pub fn id(&self) -> Option<i64> {
        match &self.notification_id {
            Value::String(s) => s.parse().ok(),
            Value::Number(n) => n.as_i64(),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Event and request names
// ---------------------------------------------------------------------------

/// Event names dispatched to clients.
pub struct EventName;

impl EventName {
    pub const READY: &'static str = "READY";
    pub const ERROR: &'static str = "ERROR";
    pub const NOTIFICATION_CREATE: &'static str = "NOTIFICATION_CREATE";
    pub const NOTIFICATION_UPDATE: &'static str = "NOTIFICATION_UPDATE";
    pub const NOTIFICATIONS_ALL_READ: &'static str = "NOTIFICATIONS_ALL_READ";
    pub const NOTIFICATIONS_UNREAD: &'static str = "NOTIFICATIONS_UNREAD";
    pub const NOTIFICATION_MARKED: &'static str = "NOTIFICATION_MARKED";
    pub const NOTIFICATIONS_COUNT: &'static str = "NOTIFICATIONS_COUNT";
}

/// Pull requests a bound client may send with `op = 8`.
pub struct RequestName;

impl RequestName {
    pub const UNREAD: &'static str = "NOTIFICATIONS_UNREAD";
    pub const MARK_READ: &'static str = "NOTIFICATION_MARK_READ";
    pub const COUNT: &'static str = "NOTIFICATIONS_COUNT";
}
