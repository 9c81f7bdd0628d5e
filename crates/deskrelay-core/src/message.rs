//! Typed inbound message model.
//!
//! Chat-class bodies carry a discriminating `type` tag and decode into
//! [`ChatEvent`]; unknown tags are rejected at the dispatch boundary rather
//! than passed through. Notification bodies have no fixed schema beyond a
//! few well-known fields, so [`Notification`] keeps the remainder in `extra`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A chat-room event, discriminated by the wire-level `type` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ChatEvent {
    /// A chat message from a participant.
    #[serde(rename = "CHAT", rename_all = "camelCase")]
    Chat {
        sender: String,
        content: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<String>,
    },

    /// A participant joined the room.
    #[serde(rename = "JOIN", rename_all = "camelCase")]
    Join { sender: String },

    /// A participant left the room.
    #[serde(rename = "LEAVE", rename_all = "camelCase")]
    Leave { sender: String },

    /// Ticket status changed (broadcast on the ticket's status topic).
    #[serde(rename = "STATUS", rename_all = "camelCase")]
    Status {
        status: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        ticket_id: Option<i64>,
    },
}

/// A notification payload.
///
/// Fields not modelled here (the shape varies per notification kind) land in
/// `extra` untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    /// Notification kind tag, e.g. `NEW_TICKET`.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticket_id: Option<i64>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// Decoded body of an inbound MESSAGE frame.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageBody {
    Chat(ChatEvent),
    Notification(Notification),
}

/// An inbound message as delivered to a destination handler.
///
/// Transient — exists only for the duration of dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    pub destination: String,
    pub body: MessageBody,
}
