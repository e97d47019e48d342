//! Protocol error types.

use thiserror::Error;

/// Result alias for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors raised while encoding or decoding wire frames.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Frame text is not valid JSON or does not match the expected shape.
    #[error("malformed frame: {0}")]
    Json(#[from] serde_json::Error),

    /// Frame is valid JSON but not an object.
    #[error("frame is not a JSON object")]
    NotAnObject,

    /// Frame is tagged `chat` but carries no `chat` body.
    #[error("chat frame missing body")]
    MissingChatBody,
}
