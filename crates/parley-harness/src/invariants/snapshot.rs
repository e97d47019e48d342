//! Observable state snapshots for invariant checking.
//!
//! Snapshots capture the observable state of the client at a point in time.
//! Invariants operate on snapshots rather than live state to ensure
//! consistent, atomic checks.

use parley_app::{App, Bridge};
use parley_core::{ConnectionState, Timestamp, TransportId};

/// Snapshot of one client: App, Bridge and the connection behind it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemSnapshot {
    /// Logged-in username.
    pub local: String,
    /// Active peer. `None` if no conversation is selected.
    pub peer: Option<String>,
    /// Sender of every transcript entry, in order.
    pub transcript_senders: Vec<String>,
    /// Connection state as last reported to the App.
    pub app_state: ConnectionState,
    /// Connection state held by the state machine.
    pub connection_state: ConnectionState,
    /// Live transport id.
    pub transport: Option<TransportId>,
    /// Whether a reconnect timer is armed.
    pub reconnect_pending: bool,
    /// Identity the connection announces on open.
    pub identity: Option<String>,
}

impl SystemSnapshot {
    /// Capture the observable state of `app` and `bridge`.
    pub fn capture<I: Timestamp>(app: &App, bridge: &Bridge<I>) -> Self {
        let session = app.session();
        let connection = bridge.connection();

        Self {
            local: session.local().to_string(),
            peer: session.peer().map(str::to_string),
            transcript_senders: session.transcript().iter().map(|m| m.from.clone()).collect(),
            app_state: app.connection_state(),
            connection_state: connection.state(),
            transport: connection.transport(),
            reconnect_pending: connection.next_deadline().is_some(),
            identity: connection.identity().map(str::to_string),
        }
    }

    /// Snapshot of a freshly created client for `local`.
    pub fn initial(local: impl Into<String>) -> Self {
        let local = local.into();
        Self {
            identity: Some(local.clone()),
            local,
            peer: None,
            transcript_senders: Vec::new(),
            app_state: ConnectionState::Disconnected,
            connection_state: ConnectionState::Disconnected,
            transport: None,
            reconnect_pending: false,
        }
    }
}
