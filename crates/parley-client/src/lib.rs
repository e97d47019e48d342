//! Parley Client
//!
//! I/O adapters around the Sans-IO connection: the WebSocket transport that
//! carries chat frames, the HTTP client for history and contacts, and the
//! system clock.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  TransportEvent   ┌──────────────────┐
//! │  transport   │ ────────────────> │ parley_app       │
//! │ (tungstenite)│ <──────────────── │ Runtime + Driver │
//! └──────────────┘    write/close    └──────────────────┘
//!                                          │ fetch
//!                                          v
//!                                    ┌───────────┐
//!                                    │ ApiClient │ (reqwest)
//!                                    └───────────┘
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod api;
pub mod system_env;
pub mod transport;

pub use api::{ApiClient, ApiError, HistoryWindow};
pub use system_env::SystemEnv;
pub use transport::{TransportError, TransportEvents, TransportHandle};
