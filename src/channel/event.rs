//! Wire protocol for the realtime channel.
//!
//! Frames are single JSON objects discriminated by a `type` field, with
//! camelCase payload fields for client compatibility.

use serde::{Deserialize, Serialize};

use crate::storage::MessageRow;

// ─── Server → client ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    /// Sent immediately on connect.
    ConnectionStatus { status: String },
    /// Acknowledges a subscription request.
    Subscribed { email_address: String },
    /// Push of a newly stored message.
    NewMessage {
        message: MessageRow,
        email_address: String,
    },
    /// The client sent a payload the server could not process.
    Error { message: String },
}

impl ServerEvent {
    pub fn connection_status(status: &str) -> Self {
        ServerEvent::ConnectionStatus {
            status: status.to_string(),
        }
    }

    pub fn subscribed(email_address: String) -> Self {
        ServerEvent::Subscribed { email_address }
    }

    pub fn new_message(message: MessageRow, email_address: String) -> Self {
        ServerEvent::NewMessage {
            message,
            email_address,
        }
    }

    pub fn error(message: &str) -> Self {
        ServerEvent::Error {
            message: message.to_string(),
        }
    }

    /// Serialize to one wire frame.
    pub fn to_frame(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

// ─── Client → server ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE", rename_all_fields = "camelCase")]
pub enum ClientEvent {
    /// Declare interest in one address, replacing any prior interest.
    SubscribeEmail { email_address: String },
}

impl ClientEvent {
    pub fn subscribe(email_address: &str) -> Self {
        ClientEvent::SubscribeEmail {
            email_address: email_address.to_string(),
        }
    }

    pub fn to_frame(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
