//! Presence announcements.
//!
//! The server maps a socket to a username only after it sees a `bootup`
//! frame on that socket. Every fresh transport therefore needs one, and so
//! does switching conversations, where the server expects the mapping to be
//! refreshed.

use std::fmt;

use parley_proto::Outbound;

/// Why an announcement is being sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnounceTrigger {
    /// A transport just opened.
    Opened,
    /// The identity was set while already open.
    IdentityRegistered,
    /// The user switched to a different conversation.
    PeerSwitched,
}

impl fmt::Display for AnnounceTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Opened => "opened",
            Self::IdentityRegistered => "identity-registered",
            Self::PeerSwitched => "peer-switched",
        };
        f.write_str(name)
    }
}

/// The bootup frame announcing `user`.
pub fn announcement(user: &str) -> Outbound {
    Outbound::bootup(user)
}
