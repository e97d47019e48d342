//! Property-based tests for conversation routing.
//!
//! Tests verify that routing invariants hold under arbitrary interleavings of
//! inbound chats, peer switches and history loads.

use parley_app::{App, AppAction, AppEvent};
use parley_proto::{ChatMessage, Inbound};
use proptest::prelude::*;

const USERS: [&str; 4] = ["alice", "bob", "carol", "dave"];

fn user() -> impl Strategy<Value = String> {
    prop::sample::select(USERS.to_vec()).prop_map(str::to_string)
}

fn chat() -> impl Strategy<Value = ChatMessage> {
    (user(), user(), "[a-z ]{0,20}", 0u64..1_000_000).prop_map(|(from, to, message, timestamp)| {
        ChatMessage { id: format!("{timestamp}-0"), from, to, message, timestamp }
    })
}

#[derive(Debug, Clone)]
enum Step {
    Receive(ChatMessage),
    Presence(String),
    Select(String),
    History { peer: String, messages: Vec<ChatMessage> },
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        6 => chat().prop_map(Step::Receive),
        1 => user().prop_map(Step::Presence),
        2 => user().prop_map(Step::Select),
        1 => (user(), prop::collection::vec(chat(), 0..5))
            .prop_map(|(peer, messages)| Step::History { peer, messages }),
    ]
}

#[test]
fn prop_append_iff_sender_is_peer_or_local() {
    proptest!(|(steps in prop::collection::vec(step(), 1..80))| {
        let mut app = App::new("alice");

        for step in steps {
            match step {
                Step::Receive(message) => {
                    let before = app.session().transcript().len();
                    let belongs = message.from == "alice"
                        || app.session().peer() == Some(message.from.as_str());
                    let actions = app.handle(AppEvent::MessageReceived(Inbound::Chat(message.clone())));
                    let after = app.session().transcript();

                    // PROPERTY: Appended exactly when the sender is the peer or the local user
                    if belongs {
                        prop_assert_eq!(after.len(), before + 1);
                        prop_assert_eq!(after.last(), Some(&message));
                        prop_assert_eq!(actions, vec![AppAction::Render]);
                    } else {
                        prop_assert_eq!(after.len(), before);
                        prop_assert!(actions.is_empty());
                    }
                },
                Step::Presence(user) => {
                    let before = app.session().transcript().to_vec();
                    let _ = app.handle(AppEvent::MessageReceived(Inbound::Presence { user }));

                    // PROPERTY: Presence never touches the transcript
                    prop_assert_eq!(app.session().transcript(), before.as_slice());
                },
                Step::Select(peer) => {
                    let actions = app.handle(AppEvent::SelectPeer { peer: peer.clone() });

                    // PROPERTY: Switching peers starts from an empty transcript
                    prop_assert!(app.session().transcript().is_empty());
                    prop_assert_eq!(app.session().peer(), Some(peer.as_str()));
                    prop_assert!(actions.contains(&AppAction::Announce));
                },
                Step::History { peer, messages } => {
                    let before = app.session().transcript().to_vec();
                    let active = app.session().peer() == Some(peer.as_str());
                    let mut expected = messages.clone();
                    expected.reverse();
                    let _ = app.handle(AppEvent::HistoryLoaded { peer, messages });

                    // PROPERTY: History replaces the active transcript, reversed; stale loads are dropped
                    if active {
                        prop_assert_eq!(app.session().transcript(), expected.as_slice());
                    } else {
                        prop_assert_eq!(app.session().transcript(), before.as_slice());
                    }
                },
            }
        }
    });
}

#[test]
fn prop_select_peer_requests_history_for_that_peer() {
    proptest!(|(peers in prop::collection::vec(user(), 1..10))| {
        let mut app = App::new("alice");
        for peer in peers {
            let actions = app.handle(AppEvent::SelectPeer { peer: peer.clone() });

            // PROPERTY: Exactly one history request per selection, for the new peer
            let requests: Vec<_> = actions
                .iter()
                .filter_map(|a| match a {
                    AppAction::FetchHistory { user, peer } => Some((user.as_str(), peer.as_str())),
                    _ => None,
                })
                .collect();
            prop_assert_eq!(requests, vec![("alice", peer.as_str())]);
        }
    });
}
