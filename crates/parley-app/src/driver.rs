//! Driver trait for abstracting I/O operations.
//!
//! The [`Driver`] trait decouples the application runtime from specific I/O
//! implementations. Each frontend implements the trait to provide
//! platform-specific I/O, while the generic [`crate::Runtime`] handles all
//! orchestration.

use std::future::Future;

use parley_core::{Timestamp, TransportId};
use parley_proto::{ChatMessage, Contact};

use crate::{App, AppEvent};

/// What happened on a transport socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Handshake completed; writes are possible.
    Opened,
    /// Text frame received.
    Frame(String),
    /// Peer closed the socket.
    Closed {
        /// Close reason, possibly empty.
        reason: String,
    },
    /// Socket could not be opened or broke.
    Failed {
        /// Error description.
        error: String,
    },
}

/// Input surfaced by [`Driver::poll_event`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverEvent {
    /// User input or other application-level event.
    App(AppEvent),
    /// Event on the transport opened under `transport`.
    Transport {
        /// Transport the event belongs to.
        transport: TransportId,
        /// What happened.
        event: TransportEvent,
    },
}

/// Abstracts I/O operations for the application runtime.
///
/// Implementations provide platform-specific I/O while the generic
/// [`Runtime`](crate::Runtime) handles orchestration logic. This ensures
/// the same orchestration code runs in the terminal front end and simulation.
///
/// # Implementations
///
/// - **CLI**: tokio stdin for commands, tokio-tungstenite for the socket,
///   reqwest for history and contacts
/// - **Simulation**: scripted events against a virtual clock
///
/// # Errors
///
/// Errors from [`poll_event`](Driver::poll_event),
/// [`open_transport`](Driver::open_transport) and [`render`](Driver::render)
/// end the run. Errors from writes and fetches are reported to the App and
/// the run continues.
pub trait Driver: Send {
    /// Platform-specific error type.
    type Error: std::error::Error + Send + 'static;

    /// Time instant type. Enables virtual time in simulation.
    type Instant: Timestamp;

    /// Wait for the next event.
    ///
    /// Returns `None` once `deadline` passes with nothing to report, so the
    /// runtime can fire the reconnect timer. With no deadline, waits until an
    /// event arrives.
    fn poll_event(
        &mut self,
        deadline: Option<Self::Instant>,
    ) -> impl Future<Output = Result<Option<DriverEvent>, Self::Error>> + Send;

    /// Start opening a transport. Completion and failure are reported later
    /// through [`DriverEvent::Transport`] tagged with `transport`.
    fn open_transport(
        &mut self,
        transport: TransportId,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Write a text frame without waiting.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport is already gone. Nothing is queued.
    fn write(&mut self, transport: TransportId, payload: String) -> Result<(), Self::Error>;

    /// Close and release a transport.
    fn close_transport(&mut self, transport: TransportId, reason: &str);

    /// Fetch the history between `user` and `peer`, newest first.
    fn fetch_history(
        &mut self,
        user: &str,
        peer: &str,
    ) -> impl Future<Output = Result<Vec<ChatMessage>, Self::Error>> + Send;

    /// Fetch the contact list of `user`.
    fn fetch_contacts(
        &mut self,
        user: &str,
    ) -> impl Future<Output = Result<Vec<Contact>, Self::Error>> + Send;

    /// Check with the server that `username` can be added as a contact.
    fn verify_contact(
        &mut self,
        username: &str,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Current time instant.
    fn now(&self) -> Self::Instant;

    /// Render the application state.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails.
    fn render(&mut self, app: &App) -> Result<(), Self::Error>;

    /// Stop all I/O and clean up resources.
    fn stop(&mut self);
}
