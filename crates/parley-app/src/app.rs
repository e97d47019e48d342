//! Application state machine.
//!
//! This module defines the [`App`] state machine, which manages the interactive
//! state of the application completely decoupled from I/O and the connection.
//!
//! This is a pure state machine: it consumes [`crate::AppEvent`] inputs and
//! produces [`crate::AppAction`] instructions for the runtime to execute.
//!
//! # Responsibilities
//!
//! - Owns the [`ConversationSession`] and routes inbound chats into it.
//! - Holds the last fetched contact list plus contacts verified since.
//! - Tracks the connection state reported by the bridge for UI feedback.

use parley_core::ConnectionState;
use parley_proto::Contact;

use crate::{
    AppAction, AppEvent, ConversationSession,
    router::{self, RouteOutcome},
};

/// Application state machine.
///
/// Pure state machine that processes events and produces actions.
/// No I/O dependencies - fully testable in simulation.
#[derive(Debug, Clone)]
pub struct App {
    /// Connection state as last reported by the bridge.
    connection: ConnectionState,
    /// Active conversation.
    session: ConversationSession,
    /// Last fetched contact list.
    contacts: Vec<Contact>,
    /// Transient status message. `None` if no message.
    status_message: Option<String>,
}

impl App {
    /// Create a new App for the logged-in user `local`.
    pub fn new(local: impl Into<String>) -> Self {
        Self {
            connection: ConnectionState::Disconnected,
            session: ConversationSession::new(local),
            contacts: Vec::new(),
            status_message: None,
        }
    }

    /// Process an event and return actions.
    pub fn handle(&mut self, event: AppEvent) -> Vec<AppAction> {
        match event {
            AppEvent::Tick => vec![],
            AppEvent::Quit => self.quit(),
            AppEvent::Compose { text } => self.send_message(text),
            AppEvent::SelectPeer { peer } => self.select_peer(&peer),
            AppEvent::RequestContacts => {
                vec![AppAction::FetchContacts { user: self.session.local().to_string() }]
            },
            AppEvent::AddContact { username } => self.add_contact(username),
            AppEvent::ReloadHistory => match self.session.peer() {
                Some(peer) => vec![AppAction::FetchHistory {
                    user: self.session.local().to_string(),
                    peer: peer.to_string(),
                }],
                None => {
                    self.status_message = Some("No conversation selected".to_string());
                    vec![AppAction::Render]
                },
            },
            AppEvent::Connecting => {
                self.connection = ConnectionState::Connecting;
                vec![AppAction::Render]
            },
            AppEvent::Connected => {
                self.connection = ConnectionState::Open;
                self.status_message = Some("Connected".to_string());
                vec![AppAction::Render]
            },
            AppEvent::Disconnected => {
                self.connection = ConnectionState::Disconnected;
                self.status_message = Some("Disconnected, reconnecting".to_string());
                vec![AppAction::Render]
            },
            AppEvent::MessageReceived(inbound) => match router::route(inbound, &mut self.session) {
                RouteOutcome::Appended => vec![AppAction::Render],
                RouteOutcome::Discarded | RouteOutcome::Ignored => vec![],
            },
            AppEvent::HistoryLoaded { peer, messages } => {
                if router::load_history(&peer, messages, &mut self.session) {
                    vec![AppAction::Render]
                } else {
                    vec![]
                }
            },
            AppEvent::HistoryFailed { peer, message } => {
                if !self.session.is_active(&peer) {
                    return vec![];
                }
                self.session.clear_transcript();
                self.status_message = Some(format!("Could not load history: {message}"));
                vec![AppAction::Render]
            },
            AppEvent::ContactsLoaded { contacts } => {
                self.contacts = contacts;
                vec![AppAction::Render]
            },
            AppEvent::ContactsFailed { message } => {
                self.contacts.clear();
                self.status_message = Some(format!("Could not load contacts: {message}"));
                vec![AppAction::Render]
            },
            AppEvent::ContactVerified { username } => {
                if !self.is_contact(&username) {
                    self.contacts.push(Contact { username: username.clone(), last_activity: 0 });
                }
                self.status_message = Some(format!("Added {username}"));
                vec![AppAction::Render]
            },
            AppEvent::ContactRejected { username, message } => {
                self.status_message = Some(format!("Could not add {username}: {message}"));
                vec![AppAction::Render]
            },
            AppEvent::SendFailed { message, retryable } => {
                let status = if retryable {
                    format!("Message not sent, reconnecting: {message}")
                } else {
                    format!("Message not sent: {message}")
                };
                self.status_message = Some(status);
                vec![AppAction::Render]
            },
            AppEvent::Error { message } => {
                self.status_message = Some(format!("Error: {message}"));
                vec![AppAction::Render]
            },
        }
    }

    /// Set a status message to display to the user.
    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status_message = Some(message.into());
    }

    /// Switch the active conversation to `peer`.
    pub fn select_peer(&mut self, peer: &str) -> Vec<AppAction> {
        self.status_message = Some(format!("Chatting with {peer}"));
        let mut actions = router::select_peer(peer, &mut self.session);
        actions.push(AppAction::Render);
        actions
    }

    /// Send `text` to the active peer.
    pub fn send_message(&mut self, text: String) -> Vec<AppAction> {
        if text.trim().is_empty() {
            return vec![];
        }
        match self.session.peer() {
            Some(peer) => vec![AppAction::SendChat { to: peer.to_string(), message: text }],
            None => {
                self.status_message = Some("No conversation selected".to_string());
                vec![AppAction::Render]
            },
        }
    }

    /// Start adding `username` as a contact.
    ///
    /// Yourself and existing contacts are refused locally. Anyone else is
    /// checked with the server first and only appended once verified.
    pub fn add_contact(&mut self, username: String) -> Vec<AppAction> {
        let username = username.trim().to_string();
        if username.is_empty() {
            return vec![];
        }
        if username == self.session.local() {
            self.status_message = Some("Cannot add yourself".to_string());
            return vec![AppAction::Render];
        }
        if self.is_contact(&username) {
            self.status_message = Some(format!("{username} is already a contact"));
            return vec![AppAction::Render];
        }
        vec![AppAction::VerifyContact { username }]
    }

    /// Quit the application.
    pub fn quit(&self) -> Vec<AppAction> {
        vec![AppAction::Quit]
    }

    /// Forget the conversation and contacts. Called on logout and teardown.
    pub fn reset(&mut self) {
        self.session.reset();
        self.contacts.clear();
        self.connection = ConnectionState::Closed;
    }

    /// Current conversation.
    pub fn session(&self) -> &ConversationSession {
        &self.session
    }

    /// Last fetched contacts.
    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    fn is_contact(&self, username: &str) -> bool {
        self.contacts.iter().any(|c| c.username == username)
    }

    /// Connection state as last reported.
    pub fn connection_state(&self) -> ConnectionState {
        self.connection
    }

    /// Transient status message. `None` if no message.
    pub fn status_message(&self) -> Option<&str> {
        self.status_message.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use parley_proto::{ChatMessage, Inbound};

    use super::*;

    fn chat(id: &str, from: &str, to: &str) -> ChatMessage {
        ChatMessage {
            id: id.into(),
            from: from.into(),
            to: to.into(),
            message: "hi".into(),
            timestamp: 1,
        }
    }

    fn chatting(local: &str, peer: &str) -> App {
        let mut app = App::new(local);
        let _ = app.select_peer(peer);
        app
    }

    #[test]
    fn api_select_peer() {
        let mut app = App::new("alice");
        let actions = app.select_peer("bob");

        assert!(matches!(actions.as_slice(), [
            AppAction::FetchHistory { .. },
            AppAction::Announce,
            AppAction::Render
        ]));
        assert_eq!(app.session().peer(), Some("bob"));
    }

    #[test]
    fn compose_targets_active_peer() {
        let mut app = chatting("alice", "bob");
        let actions = app.handle(AppEvent::Compose { text: "hello".into() });

        assert_eq!(actions, vec![AppAction::SendChat { to: "bob".into(), message: "hello".into() }]);
    }

    #[test]
    fn compose_without_peer_sets_status() {
        let mut app = App::new("alice");
        let actions = app.handle(AppEvent::Compose { text: "hello".into() });

        assert_eq!(actions, vec![AppAction::Render]);
        assert!(app.status_message().is_some());
    }

    #[test]
    fn blank_compose_ignored() {
        let mut app = chatting("alice", "bob");
        assert!(app.handle(AppEvent::Compose { text: "   ".into() }).is_empty());
    }

    #[test]
    fn routed_message_renders() {
        let mut app = chatting("alice", "bob");

        let actions = app.handle(AppEvent::MessageReceived(Inbound::Chat(chat("1", "bob", "alice"))));
        assert_eq!(actions, vec![AppAction::Render]);

        let actions = app.handle(AppEvent::MessageReceived(Inbound::Chat(chat("2", "carol", "alice"))));
        assert!(actions.is_empty());
        assert_eq!(app.session().transcript().len(), 1);
    }

    #[test]
    fn history_failure_empties_transcript() {
        let mut app = chatting("alice", "bob");
        let _ = app.handle(AppEvent::MessageReceived(Inbound::Chat(chat("1", "bob", "alice"))));

        let actions =
            app.handle(AppEvent::HistoryFailed { peer: "bob".into(), message: "timeout".into() });
        assert_eq!(actions, vec![AppAction::Render]);
        assert!(app.session().transcript().is_empty());
        assert_eq!(app.session().peer(), Some("bob"));
    }

    #[test]
    fn stale_history_failure_ignored() {
        let mut app = chatting("alice", "bob");
        let _ = app.select_peer("carol");
        let _ = app.handle(AppEvent::MessageReceived(Inbound::Chat(chat("1", "carol", "alice"))));

        let actions =
            app.handle(AppEvent::HistoryFailed { peer: "bob".into(), message: "timeout".into() });
        assert!(actions.is_empty());
        assert_eq!(app.session().transcript().len(), 1);
    }

    #[test]
    fn contacts_replace_and_clear() {
        let mut app = App::new("alice");
        let contacts = vec![Contact { username: "bob".into(), last_activity: 10 }];

        let _ = app.handle(AppEvent::ContactsLoaded { contacts });
        assert_eq!(app.contacts().len(), 1);

        let _ = app.handle(AppEvent::ContactsFailed { message: "rejected".into() });
        assert!(app.contacts().is_empty());
    }

    #[test]
    fn add_contact_verifies_before_listing() {
        let mut app = App::new("alice");
        let actions = app.handle(AppEvent::AddContact { username: " bob ".into() });
        assert_eq!(actions, vec![AppAction::VerifyContact { username: "bob".into() }]);
        assert!(app.contacts().is_empty());

        let _ = app.handle(AppEvent::ContactVerified { username: "bob".into() });
        assert_eq!(app.contacts(), &[Contact { username: "bob".into(), last_activity: 0 }]);
        assert_eq!(app.status_message(), Some("Added bob"));

        // A second verification never duplicates the entry
        let _ = app.handle(AppEvent::ContactVerified { username: "bob".into() });
        assert_eq!(app.contacts().len(), 1);
    }

    #[test]
    fn add_contact_refuses_self_and_duplicates() {
        let mut app = App::new("alice");
        assert_eq!(app.handle(AppEvent::AddContact { username: "alice".into() }), vec![
            AppAction::Render
        ]);
        assert_eq!(app.status_message(), Some("Cannot add yourself"));

        let contacts = vec![Contact { username: "bob".into(), last_activity: 10 }];
        let _ = app.handle(AppEvent::ContactsLoaded { contacts });
        assert_eq!(app.handle(AppEvent::AddContact { username: "bob".into() }), vec![
            AppAction::Render
        ]);
        assert_eq!(app.status_message(), Some("bob is already a contact"));
    }

    #[test]
    fn rejected_contact_leaves_list_untouched() {
        let mut app = App::new("alice");
        let _ = app.handle(AppEvent::ContactRejected {
            username: "ghost".into(),
            message: "Invalid username".into(),
        });
        assert!(app.contacts().is_empty());
        assert_eq!(app.status_message(), Some("Could not add ghost: Invalid username"));
    }

    #[test]
    fn send_failure_status_reflects_retryability() {
        let mut app = chatting("alice", "bob");
        let _ = app.handle(AppEvent::SendFailed { message: "not open".into(), retryable: true });
        assert_eq!(app.status_message(), Some("Message not sent, reconnecting: not open"));

        let _ = app.handle(AppEvent::SendFailed { message: "closed".into(), retryable: false });
        assert_eq!(app.status_message(), Some("Message not sent: closed"));
    }

    #[test]
    fn connection_events_update_state() {
        let mut app = App::new("alice");
        let _ = app.handle(AppEvent::Connecting);
        assert_eq!(app.connection_state(), ConnectionState::Connecting);
        let _ = app.handle(AppEvent::Connected);
        assert_eq!(app.connection_state(), ConnectionState::Open);
        let _ = app.handle(AppEvent::Disconnected);
        assert_eq!(app.connection_state(), ConnectionState::Disconnected);
    }

    #[test]
    fn reload_history_requests_active_peer() {
        let mut app = chatting("alice", "bob");
        let actions = app.handle(AppEvent::ReloadHistory);
        assert_eq!(actions, vec![AppAction::FetchHistory { user: "alice".into(), peer: "bob".into() }]);
    }

    #[test]
    fn reset_forgets_everything() {
        let mut app = chatting("alice", "bob");
        let _ = app.handle(AppEvent::MessageReceived(Inbound::Chat(chat("1", "bob", "alice"))));
        app.reset();

        assert_eq!(app.session().peer(), None);
        assert!(app.session().transcript().is_empty());
        assert_eq!(app.connection_state(), ConnectionState::Closed);
    }
}
