//! End-to-end conversation session flow.
//!
//! The headline scenario: identities 5 and 12 connect, history holds one
//! message, a live frame arrives, and the merged view preserves
//! history-then-live order. Plus the send gating table and the
//! server-loopback echo path.

mod support;

use support::{StompServer, canned_http, eventually, http_response};
use wirechat_client::{
    ClientConfig, ConnectionManager, ConversationSession, HistoryLoader, Identity, MessageType,
    SendOutcome,
};
use wirechat_proto::{ChatMessage, Command, Frame};

const HISTORY: &str = r#"[
    {"id":1,"senderId":5,"receiverId":12,"content":"hi",
     "sentAt":"2026-08-07T09:00:00","messageType":"TEXT","seen":true}
]"#;

/// MESSAGE frame as the server pushes it to identity 5's topic.
fn pushed(sender: u64, receiver: u64, content: &str) -> Frame {
    let message = ChatMessage::outbound(sender, receiver, content, MessageType::Text);
    Frame::message("/topic/chat/5", "sub-5", message.to_json().unwrap())
}

/// Connected manager and mounted session for the (5, 12) pair.
async fn mounted(
    server: &StompServer,
    history_body: &str,
) -> (ConnectionManager, ConversationSession) {
    let http = canned_http(http_response("200 OK", history_body)).await;
    let config = ClientConfig::new(server.url(), format!("http://{http}"));
    let manager = ConnectionManager::new(config.clone());
    manager.initialize(Identity::new(5)).await.unwrap();

    let history = HistoryLoader::new(config.http_base_url);
    let session = ConversationSession::open(manager.clone(), &history, 5, 12).await;
    (manager, session)
}

#[tokio::test]
async fn merged_view_orders_history_then_live() {
    let server = StompServer::start().await;
    let (_manager, session) = mounted(&server, HISTORY).await;

    assert_eq!(session.messages().len(), 1);

    server.push(pushed(12, 5, "hello back"));
    eventually("live arrival", || session.messages().len() == 2).await;

    let view = session.messages();
    assert_eq!(view[0].content, "hi");
    assert_eq!(view[0].sender_id, 5);
    assert!(view[0].sent_at.is_some());
    assert_eq!(view[1].content, "hello back");
    assert_eq!(view[1].sender_id, 12);
    assert!(view[1].sent_at.is_none());
}

#[tokio::test]
async fn send_writes_one_frame_and_refusals_write_none() {
    let server = StompServer::start().await;
    let (_manager, session) = mounted(&server, "[]").await;

    assert_eq!(session.send("   ", MessageType::Text).await, SendOutcome::EmptyContent);
    assert_eq!(
        session.send(&"x".repeat(5001), MessageType::Text).await,
        SendOutcome::TooLong
    );
    assert_eq!(session.send("  hello  ", MessageType::Text).await, SendOutcome::Sent);

    let frame = server.wait_for(|f| f.command == Command::Send).await;
    assert_eq!(frame.header("destination"), Some("/app/chat"));

    let sent = ChatMessage::from_json(&frame.body).unwrap();
    assert_eq!(sent.sender_id, 5);
    assert_eq!(sent.receiver_id, 12);
    assert_eq!(sent.content, "hello");
    assert!(sent.id.is_none());
    assert!(sent.sent_at.is_none());

    // Only the accepted send reached the wire.
    assert_eq!(server.count_of(Command::Send), 1);
}

#[tokio::test]
async fn sender_sees_own_message_via_server_loopback() {
    let server = StompServer::start().await;
    let (_manager, session) = mounted(&server, "[]").await;

    assert!(session.send("anyone there?", MessageType::Text).await.is_sent());
    let frame = server.wait_for(|f| f.command == Command::Send).await;

    // No local echo is stored until the server loops the saved copy back.
    assert!(session.messages().is_empty());

    server.push(Frame::message("/topic/chat/5", "sub-5", frame.body));
    eventually("loopback echo", || {
        session.messages().iter().any(|m| m.content == "anyone there?")
    })
    .await;
}

#[tokio::test]
async fn send_after_disconnect_is_refused_without_a_write() {
    let server = StompServer::start().await;
    let (manager, session) = mounted(&server, "[]").await;

    manager.disconnect().await;
    assert_eq!(
        session.send("too late", MessageType::Text).await,
        SendOutcome::NotConnected
    );
    assert_eq!(server.count_of(Command::Send), 0);
}

#[tokio::test]
async fn self_addressed_send_is_refused() {
    let server = StompServer::start().await;
    let http = canned_http(http_response("200 OK", "[]")).await;
    let config = ClientConfig::new(server.url(), format!("http://{http}"));
    let manager = ConnectionManager::new(config.clone());
    manager.initialize(Identity::new(5)).await.unwrap();

    let history = HistoryLoader::new(config.http_base_url);
    let session = ConversationSession::open(manager, &history, 5, 5).await;

    assert_eq!(
        session.send("note to self", MessageType::Text).await,
        SendOutcome::SelfAddressed
    );
    assert_eq!(server.count_of(Command::Send), 0);
}

#[tokio::test]
async fn session_appends_unfiltered_by_conversation() {
    // The router does not scope by conversation; with one mounted session
    // (the documented invariant) everything delivered is appended.
    let server = StompServer::start().await;
    let (_manager, session) = mounted(&server, "[]").await;

    server.push(pushed(99, 5, "from another conversation"));
    eventually("unfiltered append", || session.messages().len() == 1).await;
    assert_eq!(session.messages()[0].sender_id, 99);
}
