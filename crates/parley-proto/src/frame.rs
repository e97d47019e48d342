//! Text frames exchanged over the real-time connection.
//!
//! Outbound frames are internally tagged by `type`. Inbound chat frames are
//! the server's bare chat object with no tag; anything carrying a `type`
//! field is a presence or control frame.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{ChatDraft, ChatMessage, ProtocolError, Result};

/// Frames the client writes to the server.
///
/// # Invariants
///
/// - Encoding is deterministic: the same value always produces the same text,
///   so a write carries exactly the frame the caller handed in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Outbound {
    /// Presence announcement. Maps this connection to `user` on the server.
    Bootup {
        /// Username being announced.
        user: String,
    },
    /// Chat message for the server to stamp and relay.
    Chat {
        /// Composed chat body.
        chat: ChatDraft,
    },
}

impl Outbound {
    /// Presence announcement for `user`.
    pub fn bootup(user: impl Into<String>) -> Self {
        Self::Bootup { user: user.into() }
    }

    /// Chat frame carrying `draft`.
    pub fn chat(draft: ChatDraft) -> Self {
        Self::Chat { chat: draft }
    }

    /// Serialize to the JSON text written on the wire.
    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Frames the server delivers to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// A chat message stamped by the server.
    Chat(ChatMessage),
    /// A presence frame (`type: bootup`) echoed back by the server.
    Presence {
        /// Announced username. Empty if absent.
        user: String,
    },
    /// Any other tagged frame. Kept so callers can log it.
    Control {
        /// Value of the `type` field.
        kind: String,
    },
}

impl Inbound {
    /// Decode a text frame.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::Json` if the text is not JSON or a chat frame lacks
    ///   required fields
    /// - `ProtocolError::NotAnObject` for JSON arrays, strings, numbers
    /// - `ProtocolError::MissingChatBody` for `type: chat` without `chat`
    pub fn decode(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        let Value::Object(mut fields) = value else {
            return Err(ProtocolError::NotAnObject);
        };

        let kind = fields.get("type").and_then(Value::as_str).map(str::to_owned);
        match kind.as_deref() {
            None => Ok(Self::Chat(serde_json::from_value(Value::Object(fields))?)),
            Some("chat") => {
                let body = fields.remove("chat").ok_or(ProtocolError::MissingChatBody)?;
                Ok(Self::Chat(serde_json::from_value(body)?))
            },
            Some("bootup") => {
                let user =
                    fields.get("user").and_then(Value::as_str).unwrap_or_default().to_owned();
                Ok(Self::Presence { user })
            },
            Some(other) => Ok(Self::Control { kind: other.to_owned() }),
        }
    }

    /// The chat message, if this is a chat frame.
    pub fn as_chat(&self) -> Option<&ChatMessage> {
        match self {
            Self::Chat(msg) => Some(msg),
            Self::Presence { .. } | Self::Control { .. } => None,
        }
    }
}
