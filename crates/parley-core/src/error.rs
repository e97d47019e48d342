//! Error types for the connection state machine.
//!
//! Transport failures are not errors here: they drive the reconnect timer.
//! What remains are caller mistakes (wrong state) and frames that cannot be
//! encoded.

use thiserror::Error;

use crate::connection::ConnectionState;

/// Errors that can occur during connection state machine operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    /// Invalid state transition attempted
    #[error("invalid state transition: cannot {operation} from {state:?}")]
    InvalidState {
        /// Current state when error occurred
        state: ConnectionState,
        /// Operation that was attempted
        operation: String,
    },

    /// Send attempted while the transport is not open. Nothing was written.
    #[error("connection not open (state {state:?})")]
    NotOpen {
        /// State at the time of the send
        state: ConnectionState,
    },

    /// Outbound frame could not be encoded
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl ConnectionError {
    /// Returns true if this error is transient and may succeed on retry.
    ///
    /// A send refused while disconnected succeeds once the reconnect timer
    /// reopens the transport. Wrong-state calls and encode failures never do.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::NotOpen { state } => *state != ConnectionState::Closed,
            Self::InvalidState { .. } | Self::Protocol(_) => false,
        }
    }
}

impl From<parley_proto::ProtocolError> for ConnectionError {
    fn from(err: parley_proto::ProtocolError) -> Self {
        Self::Protocol(err.to_string())
    }
}
