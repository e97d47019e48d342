//! Protocol
//!
//! Wire schema shared by the Parley client crates. Frames travel as JSON text
//! over a WebSocket; history and contacts come from a JSON HTTP API.
//!
//! # Components
//!
//! - [`Outbound`]: frames the client writes (presence bootup, chat)
//! - [`Inbound`]: decoded frames the server delivers
//! - [`ChatMessage`]: a delivered chat with server-assigned id and timestamp
//! - [`api`]: HTTP response envelopes and request bodies

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod api;
mod chat;
pub mod errors;
mod frame;

pub use api::{ApiEnvelope, Contact, Credentials, LoginData, UsernameRequest};
pub use chat::{ChatDraft, ChatMessage};
pub use errors::{ProtocolError, Result};
pub use frame::{Inbound, Outbound};
