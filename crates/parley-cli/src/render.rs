//! Transcript rendering for a line terminal.
//!
//! The App is redrawn incrementally: only transcript entries, status
//! messages and contact lists that changed since the last render are
//! printed. When the transcript is replaced (peer switch, history reload)
//! the whole conversation is printed again under a header.
//!
//! Own messages are marked `>` and the peer's `<`, with local wall-clock
//! times.

use std::io::{self, Write};

use chrono::{DateTime, Local};
use parley_app::App;
use parley_proto::{ChatMessage, Contact};

/// Local time of `secs` since epoch as `HH:MM`. `--:--` when unknown.
pub fn clock(secs: u64) -> String {
    format_local(secs, "%H:%M").unwrap_or_else(|| "--:--".to_string())
}

fn format_local(secs: u64, pattern: &str) -> Option<String> {
    if secs == 0 {
        return None;
    }
    let utc = DateTime::from_timestamp(i64::try_from(secs).ok()?, 0)?;
    Some(utc.with_timezone(&Local).format(pattern).to_string())
}

/// One transcript line, marked by direction.
pub fn message_line(local: &str, message: &ChatMessage, stamp: &str) -> String {
    if message.from == local {
        format!("[{stamp}] > {}", message.message)
    } else {
        format!("[{stamp}] < {}: {}", message.from, message.message)
    }
}

/// One contact line with its last activity.
pub fn contact_line(contact: &Contact) -> String {
    match format_local(contact.last_activity, "%Y-%m-%d %H:%M") {
        Some(when) => format!("  {} (last active {when})", contact.username),
        None => format!("  {}", contact.username),
    }
}

/// Incremental renderer. Remembers what is already on screen.
#[derive(Debug, Default)]
pub struct Renderer {
    peer: Option<String>,
    shown: Vec<ChatMessage>,
    status: Option<String>,
    contacts: Vec<Contact>,
}

impl Renderer {
    /// Renderer with nothing on screen.
    pub fn new() -> Self {
        Self::default()
    }

    /// Print what changed in `app` since the last call.
    pub fn render(&mut self, app: &App, out: &mut impl Write) -> io::Result<()> {
        let session = app.session();
        let transcript = session.transcript();
        let peer = session.peer().map(str::to_string);

        let continues = peer == self.peer && transcript.starts_with(&self.shown);
        if !continues {
            if let Some(peer) = &peer {
                writeln!(out, "--- {} <-> {peer} ---", session.local())?;
            }
            self.shown.clear();
        }
        for message in &transcript[self.shown.len()..] {
            writeln!(out, "{}", message_line(session.local(), message, &clock(message.timestamp)))?;
        }
        self.peer = peer;
        self.shown = transcript.to_vec();

        if app.contacts() != self.contacts.as_slice() {
            self.contacts = app.contacts().to_vec();
            if !self.contacts.is_empty() {
                writeln!(out, "contacts:")?;
                for contact in &self.contacts {
                    writeln!(out, "{}", contact_line(contact))?;
                }
            }
        }

        let status = app.status_message().map(str::to_string);
        if status != self.status {
            if let Some(status) = &status {
                writeln!(out, "* {status}")?;
            }
            self.status = status;
        }

        out.flush()
    }
}
