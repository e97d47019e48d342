//! End-to-end scenarios through the generic Runtime on a virtual clock.
//!
//! # Oracle Pattern
//!
//! Each scenario scripts the server side, runs the same Runtime the terminal
//! client uses, and ends with oracle checks on:
//! - what was written to which transport
//! - what the App shows
//! - how many transports were opened and closed

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use parley_app::{AppEvent, Runtime};
use parley_core::{ConnectionConfig, ConnectionState, Environment, TransportId};
use parley_harness::{
    InvariantRegistry, SimDriver, SimInstant, SimStep, SystemSnapshot, run_checked,
};
use parley_proto::{ChatDraft, ChatMessage, Contact, Outbound};

fn chat(id: &str, from: &str, to: &str, text: &str, timestamp: u64) -> ChatMessage {
    ChatMessage {
        id: id.into(),
        from: from.into(),
        to: to.into(),
        message: text.into(),
        timestamp,
    }
}

/// Frame as the server relays it: a bare chat object.
fn relayed(message: &ChatMessage) -> SimStep {
    SimStep::Frame(
        format!(
            r#"{{"id":"{}","from":"{}","to":"{}","message":"{}","timestamp":{}}}"#,
            message.id, message.from, message.to, message.message, message.timestamp
        ),
    )
}

fn select(peer: &str) -> SimStep {
    SimStep::App(AppEvent::SelectPeer { peer: peer.into() })
}

fn compose(text: &str) -> SimStep {
    SimStep::App(AppEvent::Compose { text: text.into() })
}

fn bootup(user: &str) -> String {
    Outbound::bootup(user).encode().unwrap()
}

fn chat_frame(from: &str, to: &str, text: &str) -> String {
    Outbound::chat(ChatDraft::new(from, to, text)).encode().unwrap()
}

fn runtime(driver: &SimDriver, local: &str) -> Runtime<SimDriver> {
    Runtime::new(driver.clone(), local, ConnectionConfig::default())
}

fn senders_and_text(runtime: &Runtime<SimDriver>) -> Vec<(String, String)> {
    runtime
        .app()
        .session()
        .transcript()
        .iter()
        .map(|m| (m.from.clone(), m.message.clone()))
        .collect()
}

#[tokio::test]
async fn only_the_active_conversation_is_shown() {
    let driver = SimDriver::new();
    driver.set_history("bob", vec![
        chat("2", "bob", "alice", "second", 20),
        chat("1", "alice", "bob", "first", 10),
    ]);
    driver.script([
        select("bob"),
        relayed(&chat("3", "bob", "alice", "hey", 30)),
        relayed(&chat("4", "carol", "alice", "psst", 31)),
        compose("hi bob"),
        relayed(&chat("5", "alice", "bob", "hi bob", 32)),
    ]);

    let mut rt = runtime(&driver, "alice");
    let registry = InvariantRegistry::standard();
    let mut steps = 0;
    assert!(!rt.start().await.unwrap());
    while !rt.step().await.unwrap() {
        steps += 1;
        registry.assert_all(&SystemSnapshot::capture(rt.app(), rt.bridge()), "alice/bob/carol");
    }
    assert_eq!(steps, 6, "open + five scripted steps");

    // Oracle: history oldest first, then live messages, carol dropped
    assert_eq!(senders_and_text(&rt), vec![
        ("alice".to_string(), "first".to_string()),
        ("bob".to_string(), "second".to_string()),
        ("bob".to_string(), "hey".to_string()),
        ("alice".to_string(), "hi bob".to_string()),
    ]);

    // Oracle: announce on open, announce once on peer switch, then the chat
    let t1 = TransportId::new(1);
    assert_eq!(driver.take_writes(), vec![
        (t1, bootup("alice")),
        (t1, bootup("alice")),
        (t1, chat_frame("alice", "bob", "hi bob")),
    ]);
}

#[tokio::test]
async fn reconnect_after_fixed_delay_announces_once() {
    let driver = SimDriver::new();
    driver.script([
        select("bob"),
        SimStep::Close("server restart".into()),
        SimStep::Advance(Duration::from_millis(4_999)),
        SimStep::Advance(Duration::from_millis(1)),
        compose("back again"),
    ]);

    let mut rt = runtime(&driver, "alice");
    assert!(!rt.start().await.unwrap());

    // Open, then peer switch
    assert!(!rt.step().await.unwrap());
    assert!(!rt.step().await.unwrap());
    let t1 = TransportId::new(1);
    assert_eq!(driver.take_writes(), vec![(t1, bootup("alice")), (t1, bootup("alice"))]);

    // Server goes away
    assert!(!rt.step().await.unwrap());
    assert_eq!(rt.app().connection_state(), ConnectionState::Disconnected);
    assert_eq!(
        rt.bridge().next_deadline(),
        Some(SimInstant::from_start(Duration::from_secs(5)))
    );

    // Just short of the delay nothing happens
    assert!(!rt.step().await.unwrap());
    assert_eq!(driver.opens(), vec![t1]);
    assert_eq!(rt.bridge().connection_state(), ConnectionState::Disconnected);

    // Delay elapsed: a fresh transport is opened
    assert!(!rt.step().await.unwrap());
    let t2 = TransportId::new(2);
    assert_eq!(driver.opens(), vec![t1, t2]);
    assert_eq!(rt.app().connection_state(), ConnectionState::Connecting);

    // Handshake completes: exactly one announcement, on the new transport
    assert!(!rt.step().await.unwrap());
    assert_eq!(rt.app().connection_state(), ConnectionState::Open);
    assert_eq!(driver.take_writes(), vec![(t2, bootup("alice"))]);

    // The conversation survived the reconnect and sending works again
    assert!(!rt.step().await.unwrap());
    assert_eq!(rt.app().session().peer(), Some("bob"));
    assert_eq!(driver.take_writes(), vec![(t2, chat_frame("alice", "bob", "back again"))]);

    // Script exhausted
    assert!(rt.step().await.unwrap());
    rt.shutdown();
    assert_eq!(driver.closes(), vec![(t2, "teardown".to_string())]);
}

#[tokio::test]
async fn close_and_error_storm_schedules_one_reconnect() {
    let driver = SimDriver::new();
    driver.script([
        SimStep::Fail("connection reset".into()),
        SimStep::Close("going away".into()),
        SimStep::Fail("broken pipe".into()),
        SimStep::Advance(Duration::from_secs(5)),
    ]);

    let mut rt = runtime(&driver, "alice");
    run_checked(&mut rt, &InvariantRegistry::standard()).await.unwrap();

    assert_eq!(driver.opens(), vec![TransportId::new(1), TransportId::new(2)]);
    let bootups: Vec<_> = driver.take_writes().into_iter().map(|(t, _)| t).collect();
    assert_eq!(bootups, vec![TransportId::new(1), TransportId::new(2)]);
}

#[tokio::test]
async fn failed_handshakes_keep_retrying() {
    let driver = SimDriver::new().manual_open();
    let retry = SimStep::Advance(Duration::from_secs(5));
    driver.script([
        SimStep::Fail("refused".into()),
        retry.clone(),
        SimStep::Fail("refused".into()),
        retry.clone(),
        SimStep::Fail("refused".into()),
        retry,
        SimStep::Open,
        compose("ignored, no peer"),
    ]);

    let mut rt = runtime(&driver, "alice");
    run_checked(&mut rt, &InvariantRegistry::standard()).await.unwrap();

    // Every attempt after a failure came one fixed delay later
    assert_eq!(driver.opens().len(), 4);
    assert_eq!(driver.env().now(), SimInstant::from_start(Duration::from_secs(15)));
    assert_eq!(driver.take_writes(), vec![(TransportId::new(4), bootup("alice"))]);
}

#[tokio::test]
async fn send_while_disconnected_is_refused() {
    let driver = SimDriver::new();
    driver.script([select("bob"), SimStep::Close("bye".into()), compose("anyone there?")]);

    let mut rt = runtime(&driver, "alice");
    assert!(!rt.start().await.unwrap());
    for _ in 0..4 {
        assert!(!rt.step().await.unwrap());
    }

    let writes = driver.take_writes();
    assert!(writes.iter().all(|(_, payload)| !payload.contains("anyone there?")));
    let status = rt.app().status_message().unwrap();
    assert!(status.starts_with("Message not sent"), "status: {status}");
}

#[tokio::test]
async fn peer_switch_starts_clean() {
    let driver = SimDriver::new();
    driver.script([
        select("bob"),
        relayed(&chat("1", "bob", "alice", "from bob", 1)),
        select("carol"),
        relayed(&chat("2", "bob", "alice", "late bob", 2)),
        relayed(&chat("3", "carol", "alice", "from carol", 3)),
    ]);

    let mut rt = runtime(&driver, "alice");
    assert!(!rt.start().await.unwrap());
    for _ in 0..3 {
        assert!(!rt.step().await.unwrap());
    }
    assert_eq!(senders_and_text(&rt), vec![("bob".to_string(), "from bob".to_string())]);

    assert!(!rt.step().await.unwrap());
    assert!(rt.app().session().transcript().is_empty());

    assert!(!rt.step().await.unwrap());
    assert!(!rt.step().await.unwrap());
    assert_eq!(senders_and_text(&rt), vec![("carol".to_string(), "from carol".to_string())]);
}

#[tokio::test]
async fn history_failure_leaves_empty_transcript() {
    let driver = SimDriver::new();
    driver.fail_history("bob", "Invalid username(s)");
    driver.script([select("bob")]);

    let mut rt = runtime(&driver, "alice");
    assert!(!rt.start().await.unwrap());
    assert!(!rt.step().await.unwrap());
    assert!(!rt.step().await.unwrap());

    assert_eq!(rt.app().session().peer(), Some("bob"));
    assert!(rt.app().session().transcript().is_empty());
    assert!(rt.app().status_message().unwrap().contains("Invalid username(s)"));
}

#[tokio::test]
async fn contacts_are_loaded_on_request() {
    let driver = SimDriver::new();
    driver.set_contacts(vec![
        Contact { username: "bob".into(), last_activity: 1_700_000_000 },
        Contact { username: "carol".into(), last_activity: 1_600_000_000 },
    ]);
    driver.script([SimStep::App(AppEvent::RequestContacts)]);

    let mut rt = runtime(&driver, "alice");
    assert!(!rt.start().await.unwrap());
    assert!(!rt.step().await.unwrap());
    assert!(!rt.step().await.unwrap());

    let names: Vec<_> = rt.app().contacts().iter().map(|c| c.username.as_str()).collect();
    assert_eq!(names, vec!["bob", "carol"]);
}

#[tokio::test]
async fn added_contacts_are_verified_first() {
    let driver = SimDriver::new();
    driver.reject_contact("ghost", "Invalid username");
    let add = |name: &str| SimStep::App(AppEvent::AddContact { username: name.into() });
    driver.script([add("bob"), add("ghost"), add("bob")]);

    let mut rt = runtime(&driver, "alice");
    assert!(!rt.start().await.unwrap());
    for _ in 0..4 {
        assert!(!rt.step().await.unwrap());
    }

    // The duplicate never reaches the server
    assert_eq!(driver.verifications(), vec!["bob".to_string(), "ghost".to_string()]);
    assert_eq!(rt.app().contacts(), &[Contact { username: "bob".into(), last_activity: 0 }]);
    assert_eq!(rt.app().status_message(), Some("bob is already a contact"));
}

#[tokio::test]
async fn malformed_frames_change_nothing() {
    let driver = SimDriver::new();
    driver.script([
        select("bob"),
        SimStep::Frame("not json".into()),
        SimStep::Frame("[1,2,3]".into()),
        SimStep::Frame(r#"{"type":"chat"}"#.into()),
        SimStep::Frame(r#"{"type":"bootup","user":"bob"}"#.into()),
    ]);

    let mut rt = runtime(&driver, "alice");
    run_checked(&mut rt, &InvariantRegistry::standard()).await.unwrap();

    assert_eq!(driver.opens().len(), 1);
    assert!(driver.closes().iter().all(|(_, reason)| reason == "teardown"));
}

#[tokio::test]
async fn run_tears_everything_down() {
    let driver = SimDriver::new();
    driver.script([select("bob"), relayed(&chat("1", "bob", "alice", "hi", 1))]);

    let mut rt = runtime(&driver, "alice");
    rt.run().await.unwrap();

    assert!(driver.is_stopped());
    assert_eq!(driver.closes(), vec![(TransportId::new(1), "teardown".to_string())]);
    assert_eq!(rt.app().connection_state(), ConnectionState::Closed);
    assert_eq!(rt.bridge().connection_state(), ConnectionState::Closed);
    assert_eq!(rt.app().session().peer(), None);
    assert!(rt.app().session().transcript().is_empty());
}

#[tokio::test]
async fn quit_while_reconnecting_cancels_timer() {
    let driver = SimDriver::new();
    driver.script([SimStep::Close("bye".into()), SimStep::App(AppEvent::Quit)]);

    let mut rt = runtime(&driver, "alice");
    rt.run().await.unwrap();

    assert_eq!(driver.opens().len(), 1);
    assert!(driver.closes().is_empty(), "no live transport to close");
    assert_eq!(rt.bridge().next_deadline(), None);
}
