//! Conversation client integration tests
//!
//! File-backed persistence across restarts, and the send workflow against a
//! relay served by wiremock.

use pacechat::conversation::store::{
    CONNECTION_ERROR_REPLY, DEFAULT_WPM, PROCESSING_ERROR_REPLY, WELCOME_MESSAGE,
};
use pacechat::conversation::{
    ChatController, ConversationStore, FileStore, HttpRelayClient, KeyValueStore, Message,
    SubmitOutcome,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn open_store(dir: &std::path::Path) -> ConversationStore {
    ConversationStore::initialize(Arc::new(FileStore::new(dir)), None, DEFAULT_WPM)
}

fn controller(dir: &std::path::Path, relay_url: &str) -> ChatController {
    let relay = Arc::new(HttpRelayClient::new(relay_url).unwrap());
    ChatController::new(open_store(dir), relay, Duration::ZERO)
}

#[test]
fn test_file_store_survives_restart() {
    let dir = tempfile::tempdir().unwrap();

    let mut store = open_store(dir.path());
    assert_eq!(store.messages(), &[Message::assistant(WELCOME_MESSAGE, None)]);
    let pending = match store.append_user_message("what is chunking?") {
        SubmitOutcome::Sent(pending) => pending,
        other => panic!("expected Sent, got {:?}", other),
    };
    store.complete_request(pending.token, Err(anyhow::anyhow!("offline")));
    let before = store.messages().to_vec();
    let session_id = store.session_id().to_string();
    drop(store);

    let store = open_store(dir.path());
    assert_eq!(store.messages(), before.as_slice());
    assert_eq!(store.session_count(), 2);
    assert_eq!(store.session_id(), session_id);

    let raw = FileStore::new(dir.path())
        .get("chatMessages")
        .unwrap()
        .unwrap();
    let persisted: Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(persisted["version"], 1);
    assert_eq!(
        persisted["messages"][1],
        json!({"sender": "user", "content": "what is chunking?", "wpm": null})
    );
}

#[test]
fn test_corrupt_file_reseeds() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("chatMessages.json"), "{ truncated").unwrap();
    std::fs::write(dir.path().join("sessionCount.json"), "7").unwrap();

    let store = open_store(dir.path());
    assert_eq!(store.messages(), &[Message::assistant(WELCOME_MESSAGE, None)]);
    assert_eq!(store.session_count(), 8);
}

#[tokio::test]
async fn test_submit_through_http_relay() {
    let relay = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/server"))
        .and(body_partial_json(json!({"message": "give me a drill"})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"message": "Read **one page** in 60s.", "wpm": 310})),
        )
        .expect(1)
        .mount(&relay)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let chat = controller(dir.path(), &relay.uri());

    let index = chat.submit("  give me a drill ").await.unwrap();

    let store = chat.store().lock().await;
    let reply = &store.messages()[index];
    assert!(reply.content.contains("<strong>one page</strong>"));
    assert_eq!(reply.wpm, Some(310.0));
    assert_eq!(store.current_wpm(), 310.0);
    assert!(!store.is_loading());

    let requests = relay.received_requests().await.unwrap();
    let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["session_id"], store.session_id());
}

#[tokio::test]
async fn test_error_body_becomes_processing_error() {
    let relay = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/server"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(json!({"error": "Missing 'message' in request body"})),
        )
        .mount(&relay)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let chat = controller(dir.path(), &relay.uri());
    chat.submit("hello").await;

    let store = chat.store().lock().await;
    let last = store.messages().last().unwrap();
    assert_eq!(last.content, PROCESSING_ERROR_REPLY);
    assert_eq!(last.wpm, Some(DEFAULT_WPM));
}

#[tokio::test]
async fn test_non_json_reply_becomes_connection_error() {
    let relay = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/server"))
        .respond_with(ResponseTemplate::new(502).set_body_string("<html>Bad Gateway</html>"))
        .mount(&relay)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let chat = controller(dir.path(), &relay.uri());
    chat.submit("hello").await;

    let store = chat.store().lock().await;
    assert_eq!(store.messages().last().unwrap().content, CONNECTION_ERROR_REPLY);
}

#[tokio::test]
async fn test_unreachable_relay_becomes_connection_error() {
    // Reserve a port, then close it so nothing is listening
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let dir = tempfile::tempdir().unwrap();
    let chat = controller(dir.path(), &url);
    chat.submit("anyone there?").await;

    let store = chat.store().lock().await;
    let contents: Vec<&str> = store.messages().iter().map(|m| m.content.as_str()).collect();
    assert_eq!(
        contents,
        [WELCOME_MESSAGE, "anyone there?", CONNECTION_ERROR_REPLY]
    );
    assert!(!store.is_loading());
}
