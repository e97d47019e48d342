//! The checks behind [`InvariantRegistry::standard`](super::InvariantRegistry::standard).
//!
//! Two cover the reconnect state machine, one the router, and two the way
//! connection state and identity reach the App.

use parley_core::ConnectionState;

use super::{Invariant, InvariantResult, SystemSnapshot, Violation};

/// A reconnect timer may only be armed while disconnected.
///
/// A timer alongside a live or opening transport would open a second socket.
pub struct TimerOnlyWhenDisconnected;

impl Invariant for TimerOnlyWhenDisconnected {
    fn name(&self) -> &'static str {
        "timer_only_when_disconnected"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        if state.reconnect_pending && state.connection_state != ConnectionState::Disconnected {
            return Err(Violation {
                invariant: self.name(),
                message: format!("reconnect timer armed in state {}", state.connection_state),
            });
        }
        Ok(())
    }
}

/// Connecting and Open always have a transport to act on.
pub struct LiveTransportWhenActive;

impl Invariant for LiveTransportWhenActive {
    fn name(&self) -> &'static str {
        "live_transport_when_active"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        let active = matches!(
            state.connection_state,
            ConnectionState::Connecting | ConnectionState::Open
        );
        if active && state.transport.is_none() {
            return Err(Violation {
                invariant: self.name(),
                message: format!("{} without a transport", state.connection_state),
            });
        }
        Ok(())
    }
}

/// The transcript only holds messages of the active conversation.
///
/// Every entry was sent by the local user or by the active peer.
pub struct TranscriptMatchesConversation;

impl Invariant for TranscriptMatchesConversation {
    fn name(&self) -> &'static str {
        "transcript_matches_conversation"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        let foreign = state.transcript_senders.iter().find(|from| {
            from.as_str() != state.local && Some(from.as_str()) != state.peer.as_deref()
        });

        match foreign {
            Some(from) => Err(Violation {
                invariant: self.name(),
                message: format!(
                    "message from {from} in conversation {} <-> {:?}",
                    state.local, state.peer
                ),
            }),
            None => Ok(()),
        }
    }
}

/// The App shows the state the connection is actually in.
pub struct ConnectionStateAgreement;

impl Invariant for ConnectionStateAgreement {
    fn name(&self) -> &'static str {
        "connection_state_agreement"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        if state.app_state != state.connection_state {
            return Err(Violation {
                invariant: self.name(),
                message: format!(
                    "app shows {} but connection is {}",
                    state.app_state, state.connection_state
                ),
            });
        }
        Ok(())
    }
}

/// The logged-in identity survives reconnects.
pub struct IdentityRetained;

impl Invariant for IdentityRetained {
    fn name(&self) -> &'static str {
        "identity_retained"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        if state.identity.as_deref() != Some(state.local.as_str()) {
            return Err(Violation {
                invariant: self.name(),
                message: format!("identity {:?} for user {}", state.identity, state.local),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use parley_core::TransportId;

    use super::*;

    #[test]
    fn timer_while_open_violates() {
        let mut state = SystemSnapshot::initial("alice");
        state.connection_state = ConnectionState::Open;
        state.transport = Some(TransportId::new(1));
        state.reconnect_pending = true;

        assert!(TimerOnlyWhenDisconnected.check(&state).is_err());

        state.connection_state = ConnectionState::Disconnected;
        assert!(TimerOnlyWhenDisconnected.check(&state).is_ok());
    }

    #[test]
    fn connecting_without_transport_violates() {
        let mut state = SystemSnapshot::initial("alice");
        state.connection_state = ConnectionState::Connecting;

        assert!(LiveTransportWhenActive.check(&state).is_err());
    }

    #[test]
    fn foreign_sender_violates() {
        let mut state = SystemSnapshot::initial("alice");
        state.peer = Some("bob".into());
        state.transcript_senders = vec!["alice".into(), "bob".into()];
        assert!(TranscriptMatchesConversation.check(&state).is_ok());

        state.transcript_senders.push("carol".into());
        let violation = TranscriptMatchesConversation.check(&state).unwrap_err();
        assert!(violation.message.contains("carol"));
    }

    #[test]
    fn own_messages_without_peer_pass() {
        let mut state = SystemSnapshot::initial("alice");
        state.transcript_senders = vec!["alice".into()];

        assert!(TranscriptMatchesConversation.check(&state).is_ok());
    }

    #[test]
    fn stale_app_state_violates() {
        let mut state = SystemSnapshot::initial("alice");
        state.connection_state = ConnectionState::Connecting;

        assert!(ConnectionStateAgreement.check(&state).is_err());
    }

    #[test]
    fn lost_identity_violates() {
        let mut state = SystemSnapshot::initial("alice");
        state.identity = None;

        assert!(IdentityRetained.check(&state).is_err());
    }
}
