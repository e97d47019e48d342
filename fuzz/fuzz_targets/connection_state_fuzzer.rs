//! Fuzz target for the Connection state machine
//!
//! # Strategy
//!
//! - Random interleavings of opens, closes, failures, frames and ticks
//! - Events for the live transport, stale transports and never-issued ids
//! - Time advancing by arbitrary steps, including zero
//!
//! # Invariants
//!
//! - At most one reconnect timer, and only while Disconnected
//! - Connecting and Open always own a transport
//! - Transport ids only ever increase
//! - `send` writes only while Open, and exactly the encoded frame
//! - Exactly one announcement per transition into Open

#![no_main]

use std::time::{Duration, Instant};

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use parley_core::{Connection, ConnectionAction, ConnectionConfig, ConnectionState, TransportId};
use parley_proto::{ChatDraft, Outbound};

#[derive(Debug, Clone, Arbitrary)]
enum Target {
    Live,
    Previous,
    Unknown(u8),
}

#[derive(Debug, Clone, Arbitrary)]
enum Op {
    Opened(Target),
    Closed(Target),
    Failed(Target),
    Frame(Target, String),
    Send(String),
    Advance(u16),
    Tick,
}

fuzz_target!(|ops: Vec<Op>| {
    let start = Instant::now();
    let mut now = start;
    let mut conn: Connection = Connection::new(ConnectionConfig::default());
    let _ = conn.register_identity("alice");
    let bootup = Outbound::bootup("alice").encode().unwrap();

    let mut highest = 0u64;
    let mut previous: Option<TransportId> = None;
    let mut live = track(conn.connect(now).unwrap(), &mut highest);

    for op in ops {
        let before = conn.state();
        let pick = |target: &Target| match target {
            Target::Live => live,
            Target::Previous => previous,
            Target::Unknown(n) => Some(TransportId::new(u64::from(*n) + 1_000)),
        };

        let actions = match op {
            Op::Opened(t) => pick(&t).map(|t| conn.handle_opened(t, now)).unwrap_or_default(),
            Op::Closed(t) => pick(&t).map(|t| conn.handle_closed(t, "closed", now)).unwrap_or_default(),
            Op::Failed(t) => pick(&t).map(|t| conn.handle_failed(t, "failed", now)).unwrap_or_default(),
            Op::Frame(t, text) => pick(&t).map(|t| conn.handle_frame(t, &text)).unwrap_or_default(),
            Op::Send(text) => {
                let frame = Outbound::chat(ChatDraft::new("alice", "bob", text));
                match conn.send(&frame) {
                    Ok(actions) => {
                        assert_eq!(conn.state(), ConnectionState::Open);
                        assert!(matches!(
                            actions.as_slice(),
                            [ConnectionAction::Write { payload, .. }] if *payload == frame.encode().unwrap()
                        ));
                        actions
                    },
                    Err(_) => {
                        assert_ne!(conn.state(), ConnectionState::Open);
                        Vec::new()
                    },
                }
            },
            Op::Advance(ms) => {
                now += Duration::from_millis(u64::from(ms));
                Vec::new()
            },
            Op::Tick => conn.tick(now),
        };

        let announcements = actions
            .iter()
            .filter(|a| matches!(a, ConnectionAction::Write { payload, .. } if *payload == bootup))
            .count();
        if before != ConnectionState::Open && conn.state() == ConnectionState::Open {
            assert_eq!(announcements, 1, "open without exactly one announcement");
        }

        if let Some(opened) = track(actions, &mut highest) {
            previous = live;
            live = Some(opened);
        }

        if conn.next_deadline().is_some() {
            assert_eq!(conn.state(), ConnectionState::Disconnected);
        }
        if matches!(conn.state(), ConnectionState::Connecting | ConnectionState::Open) {
            assert!(conn.transport().is_some());
        }
    }

    let _ = conn.teardown();
    assert_eq!(conn.state(), ConnectionState::Closed);
    assert!(conn.next_deadline().is_none());
});

/// Record the transport opened by `actions`, checking ids only increase.
fn track(actions: Vec<ConnectionAction>, highest: &mut u64) -> Option<TransportId> {
    let mut opened = None;
    for action in actions {
        if let ConnectionAction::Open { transport } = action {
            assert!(transport.get() > *highest, "transport id reused");
            *highest = transport.get();
            opened = Some(transport);
        }
    }
    opened
}
