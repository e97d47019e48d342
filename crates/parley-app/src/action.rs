//! Application side-effects and intents.
//!
//! This module defines the [`AppAction`] enum, which represents instructions
//! produced by the [`crate::App`] state machine for the runtime to execute.

/// Actions produced by the App state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppAction {
    /// Render the UI.
    Render,

    /// Quit the application.
    Quit,

    /// Fetch the contact list for `user`.
    FetchContacts {
        /// Logged-in username.
        user: String,
    },

    /// Fetch the history between `user` and `peer`.
    FetchHistory {
        /// Logged-in username.
        user: String,
        /// Conversation peer.
        peer: String,
    },

    /// Ask the server whether `username` can be added as a contact.
    VerifyContact {
        /// Username to check.
        username: String,
    },

    /// Send a chat to `to` over the connection.
    SendChat {
        /// Recipient username.
        to: String,
        /// Message text.
        message: String,
    },

    /// Re-announce presence on the open connection.
    Announce,
}
