//! Application input events.
//!
//! This module defines [`AppEvent`], the set of inputs that drive the
//! [`crate::App`] state machine.
//!
//! Events originate from three sources:
//! - User commands from the front end.
//! - Connection notifications translated by the [`crate::Bridge`].
//! - Results of HTTP fetches performed by the [`crate::Runtime`].

use parley_proto::{ChatMessage, Contact, Inbound};

/// Events processed by the App state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// User typed a message for the active peer.
    Compose {
        /// Message text.
        text: String,
    },

    /// User switched conversation.
    SelectPeer {
        /// Username of the new peer.
        peer: String,
    },

    /// User asked for the contact list.
    RequestContacts,

    /// User asked to reload the active conversation's history.
    ReloadHistory,

    /// User asked to add `username` to the contact list.
    AddContact {
        /// Username to add.
        username: String,
    },

    /// User asked to quit.
    Quit,

    /// Periodic tick.
    Tick,

    /// Transport opening.
    Connecting,

    /// Transport open.
    Connected,

    /// Transport lost. A reconnect is scheduled.
    Disconnected,

    /// Frame delivered by the connection.
    MessageReceived(Inbound),

    /// History fetched for `peer`, newest first as the server returns it.
    HistoryLoaded {
        /// Peer the history was requested for.
        peer: String,
        /// Messages between the local user and `peer`.
        messages: Vec<ChatMessage>,
    },

    /// History fetch failed.
    HistoryFailed {
        /// Peer the history was requested for.
        peer: String,
        /// Error description.
        message: String,
    },

    /// Contact list fetched.
    ContactsLoaded {
        /// Contacts, in server order.
        contacts: Vec<Contact>,
    },

    /// Contact list fetch failed.
    ContactsFailed {
        /// Error description.
        message: String,
    },

    /// The server confirmed `username` exists.
    ContactVerified {
        /// Verified username.
        username: String,
    },

    /// The server refused `username` or could not be reached.
    ContactRejected {
        /// Username that was checked.
        username: String,
        /// Error description.
        message: String,
    },

    /// A chat could not be sent.
    SendFailed {
        /// Error description.
        message: String,
        /// The connection is reconnecting and a later send may succeed.
        retryable: bool,
    },

    /// Error occurred.
    Error {
        /// Error description.
        message: String,
    },
}
