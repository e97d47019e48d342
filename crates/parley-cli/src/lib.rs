//! Line terminal client for Parley
//!
//! A thin shell over [`parley_app::Driver`] that provides terminal-specific
//! I/O. All orchestration logic lives in the generic [`parley_app::Runtime`].
//!
//! This crate only handles line input, printing and wiring the transport and
//! API client into the driver.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod driver;
pub mod input;
pub mod render;

pub use driver::{LineDriver, LineDriverError};
pub use parley_app::{App, AppEvent, Driver, Runtime};
pub use render::Renderer;
