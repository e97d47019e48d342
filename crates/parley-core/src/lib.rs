//! Core
//!
//! Pure state machines for the Parley real-time connection. Nothing here
//! performs I/O: methods take the current time and return actions for a
//! driver to execute, so the same code runs against real sockets and against
//! the deterministic simulation harness.
//!
//! # Components
//!
//! - [`Connection`]: transport lifecycle, reconnect timer, presence
//! - [`ReconnectPolicy`]: delay between reconnect attempts
//! - [`presence`]: bootup announcements
//! - [`Environment`]: time source for drivers

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod connection;
pub mod env;
pub mod error;
pub mod policy;
pub mod presence;

pub use connection::{
    Connection, ConnectionAction, ConnectionConfig, ConnectionState, TransportId,
};
pub use env::{Environment, Timestamp};
pub use error::ConnectionError;
pub use policy::ReconnectPolicy;
pub use presence::AnnounceTrigger;
