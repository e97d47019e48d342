//! Application layer for Parley
//!
//! Pure state machines and generic runtime for UI and connection
//! orchestration, enabling deterministic simulation testing with the same
//! code that runs in production.
//!
//! # Components
//!
//! - [`App`]: UI state machine (conversation, contacts, status)
//! - [`router`]: decides which inbound chats belong on screen
//! - [`Bridge`]: connection bridge (translates App actions to connection calls)
//! - [`Driver`]: Trait for platform-specific I/O abstraction
//! - [`Runtime`]: Generic orchestration loop using Driver

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod action;
mod app;
mod bridge;
mod driver;
mod event;
pub mod router;
mod runtime;
mod session;

pub use action::AppAction;
pub use app::App;
pub use bridge::Bridge;
pub use driver::{Driver, DriverEvent, TransportEvent};
pub use event::AppEvent;
pub use router::RouteOutcome;
pub use runtime::Runtime;
pub use session::ConversationSession;
