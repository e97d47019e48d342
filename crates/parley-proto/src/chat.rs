//! Chat message types.
//!
//! A [`ChatDraft`] is what the client composes; the server stamps it with an
//! id and a timestamp and broadcasts the resulting [`ChatMessage`] to both
//! participants.

use serde::{Deserialize, Deserializer, Serialize};

/// Chat body as composed by the sender, before the server assigns an id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatDraft {
    /// Sender username.
    pub from: String,
    /// Recipient username.
    pub to: String,
    /// Message text.
    pub message: String,
}

impl ChatDraft {
    /// Compose a chat from `from` to `to`.
    pub fn new(from: impl Into<String>, to: impl Into<String>, message: impl Into<String>) -> Self {
        Self { from: from.into(), to: to.into(), message: message.into() }
    }
}

/// A chat message delivered by the server.
///
/// # Invariants
///
/// - Immutable once received. Transcript order is arrival order, not
///   `timestamp` order.
/// - `timestamp` is whole seconds since the Unix epoch. The server may encode
///   it as a float; fractional seconds are truncated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Server-assigned identifier. Empty if the server omitted it.
    #[serde(default)]
    pub id: String,
    /// Sender username.
    pub from: String,
    /// Recipient username.
    pub to: String,
    /// Message text.
    pub message: String,
    /// Server-assigned send time, seconds since epoch.
    #[serde(default, deserialize_with = "epoch_secs")]
    pub timestamp: u64,
}

/// Accept integer or float seconds. Negative and non-finite values are
/// rejected.
pub(crate) fn epoch_secs<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let number = serde_json::Number::deserialize(deserializer)?;
    if let Some(secs) = number.as_u64() {
        return Ok(secs);
    }
    match number.as_f64() {
        Some(secs) if secs.is_finite() && secs >= 0.0 => Ok(secs as u64),
        _ => Err(serde::de::Error::custom(format!("invalid timestamp: {number}"))),
    }
}
