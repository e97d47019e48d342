//! Real-time connection state machine.
//!
//! Owns the transport lifecycle: opening, presence announcement, failure
//! detection and reconnect scheduling. Uses the action pattern: methods take
//! time as input and return actions for the driver to execute. The driver owns
//! the actual socket, keyed by [`TransportId`].
//!
//! # State Machine
//!
//! ```text
//! ┌──────────────┐ connect ┌────────────┐  opened  ┌──────┐
//! │ Disconnected │────────>│ Connecting │─────────>│ Open │
//! └──────────────┘         └────────────┘          └──────┘
//!     ^      │ tick (timer due)   │ closed/failed      │ closed/failed
//!     │      └───────────────────>│                    │
//!     └───────────────────────────┴────────────────────┘
//!                                           (arms reconnect timer)
//!
//!  any state ── teardown ──> Closed (terminal)
//! ```

use std::{fmt, time::Instant};

use parley_proto::{Inbound, Outbound};

use crate::{
    env::Timestamp,
    error::ConnectionError,
    policy::ReconnectPolicy,
    presence::{AnnounceTrigger, announcement},
};

/// Generation number of a transport.
///
/// Every open attempt gets a fresh id. Events tagged with any id other than
/// the live one come from a socket the connection has already given up on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransportId(u64);

impl TransportId {
    /// Wrap a raw generation number.
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw generation number.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TransportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// Actions returned by the connection state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionAction {
    /// Open a new transport under this id
    Open {
        /// Id that all events for the new socket must carry
        transport: TransportId,
    },

    /// Write a text frame on the transport
    Write {
        /// Target transport
        transport: TransportId,
        /// Encoded frame
        payload: String,
    },

    /// Close the transport and release it
    Close {
        /// Transport to close
        transport: TransportId,
        /// Reason for closing the connection
        reason: String,
    },

    /// Hand a decoded frame to the application
    Deliver(Inbound),
}

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No live transport. A reconnect timer may be pending.
    Disconnected,
    /// Transport opening
    Connecting,
    /// Transport open, writes allowed
    Open,
    /// Torn down. Terminal.
    Closed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Connection configuration
#[derive(Debug, Clone, Default)]
pub struct ConnectionConfig {
    /// Delay schedule for reconnect attempts
    pub policy: ReconnectPolicy,
}

/// Connection state machine
///
/// Manages one logical connection across any number of underlying
/// transports. Pure state machine: no I/O, no clock. Time is passed as
/// parameters to methods that need it.
///
/// # Invariants
///
/// - At most one transport id is live. A new one is allocated only after the
///   previous one left Open/Connecting.
/// - At most one reconnect timer is pending. Close and failure events that
///   arrive while one is pending change nothing.
/// - Exactly one presence announcement per transition into Open, when an
///   identity is known.
#[derive(Debug, Clone)]
pub struct Connection<I = Instant>
where
    I: Timestamp,
{
    state: ConnectionState,
    config: ConnectionConfig,
    /// Live transport. `None` unless Connecting or Open.
    transport: Option<TransportId>,
    /// Last generation handed out
    generation: u64,
    /// Pending reconnect deadline
    reconnect_at: Option<I>,
    /// Consecutive failed attempts since the last successful open
    attempt: u32,
    /// Remembered username, kept across reconnects
    identity: Option<String>,
    /// When the current state was entered
    since: Option<I>,
}

impl<I> Connection<I>
where
    I: Timestamp,
{
    /// Create a new connection in [`ConnectionState::Disconnected`] state
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            config,
            transport: None,
            generation: 0,
            reconnect_at: None,
            attempt: 0,
            identity: None,
            since: None,
        }
    }

    /// Current connection state
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Live transport, if any.
    #[must_use]
    pub fn transport(&self) -> Option<TransportId> {
        self.transport
    }

    /// Remembered identity.
    #[must_use]
    pub fn identity(&self) -> Option<&str> {
        self.identity.as_deref()
    }

    /// Consecutive failed attempts since the last open.
    #[must_use]
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Pending reconnect deadline. Drivers sleep until this instant.
    #[must_use]
    pub fn next_deadline(&self) -> Option<I> {
        self.reconnect_at
    }

    /// Start the first transport.
    ///
    /// Transport failures surface later through [`Self::handle_failed`].
    ///
    /// # Errors
    ///
    /// - `ConnectionError::InvalidState` unless this is the first call on a
    ///   fresh connection
    pub fn connect(&mut self, now: I) -> Result<Vec<ConnectionAction>, ConnectionError> {
        if self.state != ConnectionState::Disconnected || self.generation != 0 {
            return Err(ConnectionError::InvalidState {
                state: self.state,
                operation: "connect".to_string(),
            });
        }

        Ok(vec![self.open_transport(now)])
    }

    /// Transport finished opening.
    ///
    /// Announces the remembered identity, if any. Stale ids are ignored.
    pub fn handle_opened(&mut self, transport: TransportId, now: I) -> Vec<ConnectionAction> {
        if !self.is_live(transport) || self.state != ConnectionState::Connecting {
            tracing::debug!(%transport, state = %self.state, "ignoring open for stale transport");
            return Vec::new();
        }

        self.enter(ConnectionState::Open, now);
        self.attempt = 0;
        tracing::info!(%transport, "connection open");

        self.announce(AnnounceTrigger::Opened)
    }

    /// Text frame received on `transport`.
    ///
    /// Malformed frames are logged and dropped.
    pub fn handle_frame(&mut self, transport: TransportId, text: &str) -> Vec<ConnectionAction> {
        if !self.is_live(transport) {
            tracing::debug!(%transport, "ignoring frame from stale transport");
            return Vec::new();
        }

        match Inbound::decode(text) {
            Ok(inbound) => vec![ConnectionAction::Deliver(inbound)],
            Err(e) => {
                tracing::warn!(%transport, error = %e, "dropping malformed frame");
                Vec::new()
            },
        }
    }

    /// Transport closed by the peer.
    pub fn handle_closed(
        &mut self,
        transport: TransportId,
        reason: &str,
        now: I,
    ) -> Vec<ConnectionAction> {
        if self.is_live(transport) {
            tracing::info!(%transport, %reason, "transport closed");
        }
        self.transport_down(transport, now)
    }

    /// Transport failed to open or broke mid-session.
    pub fn handle_failed(
        &mut self,
        transport: TransportId,
        error: &str,
        now: I,
    ) -> Vec<ConnectionAction> {
        if self.is_live(transport) {
            tracing::warn!(%transport, %error, "transport failed");
        }
        self.transport_down(transport, now)
    }

    /// Process periodic maintenance.
    ///
    /// Opens a new transport once the reconnect timer is due.
    pub fn tick(&mut self, now: I) -> Vec<ConnectionAction> {
        match self.reconnect_at {
            Some(at) if now >= at && self.state == ConnectionState::Disconnected => {
                self.reconnect_at = None;
                tracing::info!(attempt = self.attempt, "reconnecting");
                vec![self.open_transport(now)]
            },
            _ => Vec::new(),
        }
    }

    /// Write `frame` on the open transport.
    ///
    /// The write payload is exactly `frame.encode()`. Nothing is queued.
    ///
    /// # Errors
    ///
    /// - `ConnectionError::NotOpen` if not in Open state
    /// - `ConnectionError::Protocol` if the frame cannot be encoded
    pub fn send(&self, frame: &Outbound) -> Result<Vec<ConnectionAction>, ConnectionError> {
        let (ConnectionState::Open, Some(transport)) = (self.state, self.transport) else {
            return Err(ConnectionError::NotOpen { state: self.state });
        };

        let payload = frame.encode()?;
        Ok(vec![ConnectionAction::Write { transport, payload }])
    }

    /// Remember the identity to announce on every open.
    ///
    /// Announces immediately when already open.
    pub fn register_identity(&mut self, user: impl Into<String>) -> Vec<ConnectionAction> {
        self.identity = Some(user.into());
        self.announce(AnnounceTrigger::IdentityRegistered)
    }

    /// Send one presence announcement for the remembered identity.
    ///
    /// Emits nothing when not open or when no identity is known.
    pub fn announce(&self, trigger: AnnounceTrigger) -> Vec<ConnectionAction> {
        let Some(user) = self.identity.as_deref() else {
            return Vec::new();
        };
        if self.state != ConnectionState::Open {
            return Vec::new();
        }

        match self.send(&announcement(user)) {
            Ok(actions) => {
                tracing::debug!(%trigger, "presence announced");
                actions
            },
            Err(e) => {
                tracing::warn!(%trigger, error = %e, "failed to announce presence");
                Vec::new()
            },
        }
    }

    /// Cancel everything. Terminal.
    ///
    /// Clears the reconnect timer and closes the live transport. Later events
    /// are ignored and `send` fails.
    pub fn teardown(&mut self) -> Vec<ConnectionAction> {
        if self.state == ConnectionState::Closed {
            return Vec::new();
        }

        self.state = ConnectionState::Closed;
        self.reconnect_at = None;

        match self.transport.take() {
            Some(transport) => {
                vec![ConnectionAction::Close { transport, reason: "teardown".to_string() }]
            },
            None => Vec::new(),
        }
    }

    fn is_live(&self, transport: TransportId) -> bool {
        self.transport == Some(transport)
    }

    fn enter(&mut self, state: ConnectionState, now: I) {
        self.state = state;
        self.since = Some(now);
    }

    fn open_transport(&mut self, now: I) -> ConnectionAction {
        self.generation += 1;
        let transport = TransportId(self.generation);
        self.transport = Some(transport);
        self.enter(ConnectionState::Connecting, now);
        ConnectionAction::Open { transport }
    }

    fn transport_down(&mut self, transport: TransportId, now: I) -> Vec<ConnectionAction> {
        if self.state == ConnectionState::Closed || !self.is_live(transport) {
            return Vec::new();
        }
        if self.reconnect_at.is_some() {
            return Vec::new();
        }

        let held = self.since.map(|since| now - since);
        self.transport = None;
        self.enter(ConnectionState::Disconnected, now);

        let delay = self.config.policy.delay(self.attempt);
        self.attempt = self.attempt.saturating_add(1);
        self.reconnect_at = Some(now.saturating_add(delay));
        tracing::info!(?delay, ?held, attempt = self.attempt, "reconnect scheduled");

        Vec::new()
    }
}
