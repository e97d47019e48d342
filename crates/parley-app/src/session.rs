//! The conversation currently on display.

use parley_proto::ChatMessage;

/// Local user, active peer and the transcript between them.
///
/// # Invariants
///
/// - Selecting a peer always starts from an empty transcript.
/// - Mutated only by appending a routed message or by replacing the whole
///   transcript with loaded history. Every mutator is crate-private, so
///   outside the App a session is read-only:
///
/// ```compile_fail
/// let mut session = parley_app::ConversationSession::new("alice");
/// session.set_peer("bob");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationSession {
    local: String,
    peer: Option<String>,
    transcript: Vec<ChatMessage>,
}

impl ConversationSession {
    /// Empty session for `local` with no peer selected.
    pub fn new(local: impl Into<String>) -> Self {
        Self { local: local.into(), peer: None, transcript: Vec::new() }
    }

    /// Logged-in username.
    pub fn local(&self) -> &str {
        &self.local
    }

    /// Active peer. `None` until one is selected.
    pub fn peer(&self) -> Option<&str> {
        self.peer.as_deref()
    }

    /// Whether `peer` is the active peer.
    pub fn is_active(&self, peer: &str) -> bool {
        self.peer.as_deref() == Some(peer)
    }

    /// Messages in arrival order.
    pub fn transcript(&self) -> &[ChatMessage] {
        &self.transcript
    }

    /// Switch to `peer` and clear the transcript.
    pub(crate) fn set_peer(&mut self, peer: impl Into<String>) {
        self.peer = Some(peer.into());
        self.transcript.clear();
    }

    /// Drop the peer and the transcript.
    pub(crate) fn reset(&mut self) {
        self.peer = None;
        self.transcript.clear();
    }

    /// Empty the transcript, keeping the peer.
    pub(crate) fn clear_transcript(&mut self) {
        self.transcript.clear();
    }

    pub(crate) fn push(&mut self, message: ChatMessage) {
        self.transcript.push(message);
    }

    pub(crate) fn replace(&mut self, messages: Vec<ChatMessage>) {
        self.transcript = messages;
    }
}
