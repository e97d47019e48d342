//! Line input parsing.
//!
//! Each line typed by the user becomes one [`AppEvent`]. Lines starting with
//! `/` are commands; anything else is a message for the active peer.

use parley_app::AppEvent;

/// Help text listing the commands.
pub const HELP: &str = "commands: /peer <name>, /add <name>, /contacts, /history, /quit";

/// Parse one input line.
///
/// Unknown commands and missing arguments become [`AppEvent::Error`] so the
/// App can show them. A leading `//` sends the rest of the line literally,
/// starting with `/`.
pub fn parse(line: &str) -> AppEvent {
    let line = line.trim_end_matches(['\r', '\n']);

    if let Some(literal) = line.strip_prefix("//") {
        return AppEvent::Compose { text: format!("/{literal}") };
    }
    let Some(command) = line.strip_prefix('/') else {
        return AppEvent::Compose { text: line.to_string() };
    };

    let mut parts = command.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some("peer"), Some(peer), None) => AppEvent::SelectPeer { peer: peer.to_string() },
        (Some("peer"), ..) => AppEvent::Error { message: "usage: /peer <name>".to_string() },
        (Some("add"), Some(username), None) => {
            AppEvent::AddContact { username: username.to_string() }
        },
        (Some("add"), ..) => AppEvent::Error { message: "usage: /add <name>".to_string() },
        (Some("contacts"), None, None) => AppEvent::RequestContacts,
        (Some("history"), None, None) => AppEvent::ReloadHistory,
        (Some("quit" | "exit"), None, None) => AppEvent::Quit,
        (Some(other), ..) => AppEvent::Error { message: format!("unknown command /{other}; {HELP}") },
        (None, ..) => AppEvent::Error { message: HELP.to_string() },
    }
}
