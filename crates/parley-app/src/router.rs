//! Conversation routing.
//!
//! Every chat the server relays to this user arrives on the single socket,
//! whichever conversation it belongs to. The router keeps only those that
//! belong on screen: messages from the active peer, and the server's echo of
//! messages the local user sent.
//!
//! Ordering is arrival order for live messages and reversed server order for
//! history (the server returns newest first). Nothing is re-sorted by
//! timestamp.

use parley_proto::{ChatMessage, Inbound};

use crate::{AppAction, ConversationSession};

/// What the router did with an inbound frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    /// Appended to the transcript.
    Appended,
    /// A chat for some other conversation. Dropped.
    Discarded,
    /// Not a chat message.
    Ignored,
}

/// Route one inbound frame into `session`.
///
/// A chat is appended iff its sender is the active peer or the local user.
pub fn route(inbound: Inbound, session: &mut ConversationSession) -> RouteOutcome {
    let Inbound::Chat(message) = inbound else {
        return RouteOutcome::Ignored;
    };

    if belongs(&message, session) {
        session.push(message);
        RouteOutcome::Appended
    } else {
        tracing::debug!(from = %message.from, to = %message.to, "discarding chat for inactive conversation");
        RouteOutcome::Discarded
    }
}

/// Switch the active conversation to `peer`.
///
/// Clears the transcript before anything else can land in it, then asks for
/// the history and a fresh presence announcement. Selecting the active peer
/// again reloads its history.
pub fn select_peer(peer: &str, session: &mut ConversationSession) -> Vec<AppAction> {
    session.set_peer(peer);
    vec![
        AppAction::FetchHistory { user: session.local().to_string(), peer: peer.to_string() },
        AppAction::Announce,
    ]
}

/// Install history fetched for `peer`.
///
/// Returns `false` and leaves the session untouched if the user has since
/// switched to a different peer.
pub fn load_history(
    peer: &str,
    mut messages: Vec<ChatMessage>,
    session: &mut ConversationSession,
) -> bool {
    if !session.is_active(peer) {
        tracing::debug!(%peer, active = ?session.peer(), "dropping stale history");
        return false;
    }

    messages.reverse();
    session.replace(messages);
    true
}

fn belongs(message: &ChatMessage, session: &ConversationSession) -> bool {
    message.from == session.local() || session.peer() == Some(message.from.as_str())
}
