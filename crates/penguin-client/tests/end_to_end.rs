mod support;

use std::sync::atomic::Ordering;
use std::time::Duration;

use penguin_client::commands::{auth, chats, messaging, participants};
use penguin_client::{ClientError, MessageSyncLoop, SyncHealth, SyncHandle};
use penguin_shared::protocol::Message;
use penguin_shared::ChatId;
use serde_json::json;
use tokio::time::timeout;

use support::FakeBackend;

const WAIT: Duration = Duration::from_secs(5);

async fn wait_for_messages(handle: &SyncHandle, want: impl Fn(&[Message]) -> bool) -> Vec<Message> {
    let mut rx = handle.subscribe();
    timeout(WAIT, async {
        loop {
            let current = rx.borrow_and_update().clone();
            if want(&current) {
                return current;
            }
            rx.changed().await.unwrap();
        }
    })
    .await
    .expect("messages did not arrive in time")
}

async fn wait_for_health(handle: &SyncHandle, want: SyncHealth) {
    let mut rx = handle.subscribe_health();
    timeout(WAIT, rx.wait_for(|h| *h == want))
        .await
        .expect("health did not change in time")
        .unwrap();
}

#[tokio::test]
async fn login_token_is_sent_on_chat_list_mount() {
    let server = FakeBackend::start().await;
    let state = server.app_state();

    auth::login(&state, "ana", "secret").await.unwrap();
    chats::load_chats(&state).await.unwrap();

    let access = server.backend.requests_to("/api/accessChat");
    assert_eq!(access.len(), 1);
    assert_eq!(access[0].authorization.as_deref(), Some("Bearer jwt-ana"));
}

#[tokio::test]
async fn protected_screens_after_logout_make_no_requests() {
    let server = FakeBackend::start().await;
    let state = server.app_state();

    auth::login(&state, "ana", "secret").await.unwrap();
    auth::logout(&state);
    let before = server.backend.requests().len();

    let err = chats::load_chats(&state).await.unwrap_err();
    assert!(matches!(err, ClientError::Unauthenticated));
    assert!(participants::load_participants(&state, ChatId(7)).await.is_err());
    assert!(chats::open_chat(&state, ChatId(7)).is_err());

    assert_eq!(server.backend.requests().len(), before);
}

#[tokio::test]
async fn open_chat_shows_only_its_messages_in_order() {
    let server = FakeBackend::start().await;
    *server.backend.chats.lock().unwrap() = json!([
        { "id": 7, "chat_name": "seven", "owner_id": 1 },
        { "id": 9, "chat_name": "nine", "owner_id": 1 },
    ]);
    server.backend.add_message(4, 7, "d");
    server.backend.add_message(2, 9, "b");
    server.backend.add_message(1, 7, "a");
    server.backend.add_message(3, 7, "c");

    let state = server.app_state();
    auth::login(&state, "ana", "secret").await.unwrap();
    chats::load_chats(&state).await.unwrap();
    chats::open_chat(&state, ChatId(7)).unwrap();

    let handle = MessageSyncLoop::start(
        &state.session,
        state.api.clone(),
        ChatId(7),
        state.config.sync_config(),
    )
    .unwrap();

    let shown = wait_for_messages(&handle, |m| !m.is_empty()).await;
    let texts: Vec<&str> = shown.iter().map(|m| m.message_text.as_str()).collect();
    assert_eq!(texts, vec!["a", "c", "d"]);
    assert!(shown.iter().all(|m| m.chat_id == ChatId(7)));

    // A message from someone else shows up on a later poll.
    server.backend.add_message(5, 7, "e");
    let shown = wait_for_messages(&handle, |m| m.len() == 4).await;
    assert_eq!(shown.last().unwrap().message_text, "e");

    handle.stop().await;
    let polls = server.backend.requests_to("/api/getMessagesGroupedByChat").len();
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(
        server.backend.requests_to("/api/getMessagesGroupedByChat").len(),
        polls,
        "no polling after stop"
    );
}

#[tokio::test]
async fn sent_message_arrives_through_sync() {
    let server = FakeBackend::start().await;
    *server.backend.chats.lock().unwrap() = json!([{ "id": 7, "chat_name": "seven" }]);

    let state = server.app_state();
    auth::login(&state, "ana", "secret").await.unwrap();
    chats::load_chats(&state).await.unwrap();
    chats::open_chat(&state, ChatId(7)).unwrap();
    let handle = MessageSyncLoop::start(
        &state.session,
        state.api.clone(),
        ChatId(7),
        state.config.sync_config(),
    )
    .unwrap();
    wait_for_health(&handle, SyncHealth::Live).await;

    let mut composer = messaging::Composer::new();
    composer.set_text("   ");
    let outcome = messaging::send_message(&state, &mut composer, Some(&handle))
        .await
        .unwrap();
    assert_eq!(outcome, messaging::SendOutcome::Skipped);
    assert!(server.backend.requests_to("/api/sendMessage").is_empty());
    assert_eq!(composer.text(), "   ");

    composer.set_text("hello penguins");
    let outcome = messaging::send_message(&state, &mut composer, Some(&handle))
        .await
        .unwrap();
    assert_eq!(outcome, messaging::SendOutcome::Sent);
    assert_eq!(composer.text(), "");

    let shown = wait_for_messages(&handle, |m| !m.is_empty()).await;
    assert_eq!(shown.len(), 1);
    assert_eq!(shown[0].message_text, "hello penguins");

    handle.stop().await;
}

#[tokio::test]
async fn revoked_token_stops_sync_and_logs_out() {
    let server = FakeBackend::start().await;
    *server.backend.chats.lock().unwrap() = json!([{ "id": 7, "chat_name": "seven" }]);

    let state = server.app_state();
    auth::login(&state, "ana", "secret").await.unwrap();
    chats::load_chats(&state).await.unwrap();
    let handle = MessageSyncLoop::start(
        &state.session,
        state.api.clone(),
        ChatId(7),
        state.config.sync_config(),
    )
    .unwrap();
    wait_for_health(&handle, SyncHealth::Live).await;

    server.backend.tokens_revoked.store(true, Ordering::SeqCst);
    wait_for_health(&handle, SyncHealth::Unauthorized).await;

    assert!(!state.session.is_authenticated());
    assert!(state.session.chats().is_empty());
    timeout(WAIT, async {
        while !handle.is_finished() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn participants_flow() {
    let server = FakeBackend::start().await;
    let state = server.app_state();
    auth::login(&state, "ana", "secret").await.unwrap();

    let members = participants::load_participants(&state, ChatId(7)).await.unwrap();
    assert_eq!(members.owner_username, "ana");

    let candidates = participants::available_users(&state, ChatId(7), "").await.unwrap();
    assert_eq!(candidates, vec!["cy"]);

    participants::add_participant(&state, ChatId(7), "cy").await.unwrap();
    let err = participants::add_participant(&state, ChatId(9), "cy")
        .await
        .unwrap_err();
    assert_eq!(err.redirect(), None);
    assert!(state.session.is_authenticated(), "403 must not log out");
}
