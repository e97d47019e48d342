//! HTTP API schema.
//!
//! Every endpoint answers with an [`ApiEnvelope`]. `status: false` means the
//! request was rejected and `message` says why; `data` is omitted in that
//! case and on success responses that carry no payload.

use serde::{Deserialize, Serialize};

use crate::chat::epoch_secs;

/// Response envelope shared by all HTTP endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    /// Whether the server accepted the request.
    pub status: bool,
    /// Human-readable outcome.
    #[serde(default)]
    pub message: String,
    /// Payload, present only on success for endpoints that return one.
    pub data: Option<T>,
    /// Number of items in `data` for list endpoints.
    #[serde(default)]
    pub total: u64,
}

impl<T> ApiEnvelope<T> {
    /// Split into the payload or the server's rejection message.
    pub fn into_result(self) -> Result<Option<T>, String> {
        if self.status { Ok(self.data) } else { Err(self.message) }
    }
}

/// Body for `/login` and `/register`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Account name.
    pub username: String,
    /// Plaintext password, sent over the API transport.
    pub password: String,
}

/// Body for `/verify-contact`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsernameRequest {
    /// Username to check.
    pub username: String,
}

/// `data` payload of a successful `/login`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginData {
    /// Bearer token for subsequent requests.
    pub token: String,
}

/// A contact-list entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    /// Contact's username.
    pub username: String,
    /// Time of the last message exchanged, seconds since epoch.
    #[serde(default, deserialize_with = "epoch_secs")]
    pub last_activity: u64,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::ChatMessage;

    #[test]
    fn rejection_without_data() {
        let json = r#"{"status":false,"message":"Invalid username(s)"}"#;
        let envelope: ApiEnvelope<Vec<ChatMessage>> = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.into_result(), Err("Invalid username(s)".to_string()));
    }

    #[test]
    fn history_payload() {
        let json = r#"{
            "status": true,
            "message": "Chat history fetched successfully",
            "data": [
                {"id":"2","from":"bob","to":"alice","message":"second","timestamp":20},
                {"id":"1","from":"alice","to":"bob","message":"first","timestamp":10}
            ],
            "total": 2
        }"#;
        let envelope: ApiEnvelope<Vec<ChatMessage>> = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.total, 2);
        let data = envelope.into_result().unwrap().unwrap();
        assert_eq!(data[0].message, "second");
    }

    #[test]
    fn login_token() {
        let json = r#"{"status":true,"message":"Login successful","data":{"token":"abc"}}"#;
        let envelope: ApiEnvelope<LoginData> = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.into_result().unwrap().unwrap().token, "abc");
    }

    #[test]
    fn contact_float_activity() {
        let json = r#"{"username":"carol","last_activity":1700000123.9}"#;
        let contact: Contact = serde_json::from_str(json).unwrap();
        assert_eq!(contact.last_activity, 1_700_000_123);
    }
}
