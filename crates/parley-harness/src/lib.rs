//! Deterministic simulation harness for Parley client testing.
//!
//! Virtual-clock implementations of the Environment and Driver traits for
//! deterministic, reproducible testing of reconnects, presence and routing
//! without sockets or wall-clock waits.
//!
//! # Invariants
//!
//! [`run_checked`] drives a [`parley_app::Runtime`] over a [`SimDriver`] and
//! asserts [`InvariantRegistry::standard()`] after the start and after every
//! step, so scripted scenarios and generated scripts fail on the first step
//! that breaks a property.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod invariants;
pub mod sim_driver;
pub mod sim_env;

pub use invariants::{
    ConnectionStateAgreement, IdentityRetained, Invariant, InvariantRegistry, InvariantResult,
    LiveTransportWhenActive, SystemSnapshot, TimerOnlyWhenDisconnected,
    TranscriptMatchesConversation, Violation,
};
pub use sim_driver::{SimDriver, SimDriverError, SimStep, run_checked};
pub use sim_env::{SimEnv, SimInstant};
