//! Connection-to-Application translation layer.
//!
//! The [`Bridge`] wraps the sans-IO [`parley_core::Connection`] and adapts it
//! to the high-level application lifecycle.
//!
//! # Responsibilities
//!
//! - Converts [`crate::AppAction`] send and announce intents into connection
//!   calls.
//! - Accumulates transport I/O ([`ConnectionAction`] `Open`, `Write`, `Close`)
//!   to be executed by the driver in the next I/O cycle.
//! - Turns delivered frames and connection state changes into
//!   [`crate::AppEvent`]s to update the UI.
//! - Manages time ticks generically to support both real-time execution and
//!   deterministic simulation.

use parley_core::{
    AnnounceTrigger, Connection, ConnectionAction, ConnectionConfig, ConnectionState,
    Timestamp, TransportId,
};
use parley_proto::{ChatDraft, Outbound};

use crate::{AppAction, AppEvent, TransportEvent};

/// Bridge between App and the connection state machine.
///
/// Generic over the instant type to support both production and simulation.
pub struct Bridge<I: Timestamp> {
    connection: Connection<I>,
    local: String,
    outgoing: Vec<ConnectionAction>,
}

impl<I: Timestamp> Bridge<I> {
    /// Create a bridge for `local`. The identity is announced on every open.
    pub fn new(local: impl Into<String>, config: ConnectionConfig) -> Self {
        let local = local.into();
        let mut connection = Connection::new(config);
        let actions = connection.register_identity(local.clone());
        debug_assert!(actions.is_empty());
        Self { connection, local, outgoing: Vec::new() }
    }

    /// Logged-in username.
    pub fn local(&self) -> &str {
        &self.local
    }

    /// Underlying connection, for inspection.
    pub fn connection(&self) -> &Connection<I> {
        &self.connection
    }

    /// Current connection state.
    pub fn connection_state(&self) -> ConnectionState {
        self.connection.state()
    }

    /// Pending reconnect deadline.
    pub fn next_deadline(&self) -> Option<I> {
        self.connection.next_deadline()
    }

    /// Open the first transport.
    pub fn connect(&mut self, now: I) -> Vec<AppEvent> {
        let mut failure = None;
        let mut events = self.observe(|connection| {
            connection.connect(now).unwrap_or_else(|e| {
                failure = Some(e);
                Vec::new()
            })
        });
        if let Some(e) = failure {
            events.push(AppEvent::Error { message: e.to_string() });
        }
        events
    }

    /// Process an App action and return resulting App events.
    pub fn process_app_action(&mut self, action: AppAction) -> Vec<AppEvent> {
        match action {
            AppAction::SendChat { to, message } => {
                let frame = Outbound::chat(ChatDraft::new(self.local.clone(), to, message));
                match self.connection.send(&frame) {
                    Ok(actions) => self.process_connection_actions(actions),
                    Err(e) => {
                        let retryable = e.is_transient();
                        if retryable {
                            tracing::debug!(error = %e, "chat not sent while reconnecting");
                        } else {
                            tracing::warn!(error = %e, "chat not sent");
                        }
                        vec![AppEvent::SendFailed { message: e.to_string(), retryable }]
                    },
                }
            },
            AppAction::Announce => {
                let actions = self.connection.announce(AnnounceTrigger::PeerSwitched);
                self.process_connection_actions(actions)
            },
            AppAction::Render
            | AppAction::Quit
            | AppAction::FetchContacts { .. }
            | AppAction::VerifyContact { .. }
            | AppAction::FetchHistory { .. } => vec![],
        }
    }

    /// Handle an event reported by the driver for `transport`.
    pub fn handle_transport(
        &mut self,
        transport: TransportId,
        event: TransportEvent,
        now: I,
    ) -> Vec<AppEvent> {
        self.observe(|connection| match event {
            TransportEvent::Opened => connection.handle_opened(transport, now),
            TransportEvent::Frame(text) => connection.handle_frame(transport, &text),
            TransportEvent::Closed { reason } => connection.handle_closed(transport, &reason, now),
            TransportEvent::Failed { error } => connection.handle_failed(transport, &error, now),
        })
    }

    /// Process a time tick.
    pub fn handle_tick(&mut self, now: I) -> Vec<AppEvent> {
        self.observe(|connection| connection.tick(now))
    }

    /// Tear the connection down. Terminal.
    pub fn teardown(&mut self) -> Vec<AppEvent> {
        let actions = self.connection.teardown();
        self.process_connection_actions(actions)
    }

    /// Take pending transport I/O.
    pub fn take_outgoing(&mut self) -> Vec<ConnectionAction> {
        std::mem::take(&mut self.outgoing)
    }

    /// Run `step` against the connection and report any state change.
    fn observe<F>(&mut self, step: F) -> Vec<AppEvent>
    where
        F: FnOnce(&mut Connection<I>) -> Vec<ConnectionAction>,
    {
        let before = self.connection.state();
        let actions = step(&mut self.connection);
        let after = self.connection.state();

        let mut events = Vec::new();
        if before != after {
            match after {
                ConnectionState::Connecting => events.push(AppEvent::Connecting),
                ConnectionState::Open => events.push(AppEvent::Connected),
                ConnectionState::Disconnected => events.push(AppEvent::Disconnected),
                ConnectionState::Closed => {},
            }
        }
        events.extend(self.process_connection_actions(actions));
        events
    }

    fn process_connection_actions(&mut self, actions: Vec<ConnectionAction>) -> Vec<AppEvent> {
        let mut events = Vec::new();

        for action in actions {
            match action {
                ConnectionAction::Deliver(inbound) => {
                    events.push(AppEvent::MessageReceived(inbound));
                },
                ConnectionAction::Open { .. }
                | ConnectionAction::Write { .. }
                | ConnectionAction::Close { .. } => {
                    self.outgoing.push(action);
                },
            }
        }

        events
    }
}
