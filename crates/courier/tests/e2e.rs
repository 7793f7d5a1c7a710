// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests over a real listener.
//!
//! Each test serves an isolated TestHarness on an ephemeral port and talks
//! to it with a WebSocket client and plain HTTP.

use std::net::SocketAddr;
use std::time::Duration;

use courier_config::model::SessionConfig;
use courier_core::{CallId, CallInfo, CallState, UserId};
use courier_gateway::{build_router, GatewayState, HealthState, SessionSettings};
use courier_test_utils::TestHarness;
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type Ws = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn serve(harness: &TestHarness) -> SocketAddr {
    let state = GatewayState {
        hub: harness.hub.clone(),
        sequencer: harness.sequencer.clone(),
        identity: harness.identity.clone(),
        calls: harness.calls.clone(),
        session: SessionSettings::from(&SessionConfig::default()),
        health: HealthState::new(None),
    };
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, build_router(state)).await.unwrap();
    });
    addr
}

async fn connect(addr: SocketAddr, token: &str) -> Ws {
    let (ws, _) = connect_async(format!("ws://{addr}/ws?token={token}"))
        .await
        .unwrap();
    ws
}

async fn wait_online(harness: &TestHarness, user: i64, count: usize) {
    for _ in 0..200 {
        if harness.hub.connection_count(UserId(user)) == count {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("user {user} never reached {count} connections");
}

/// Next JSON record, splitting coalesced frames on newlines.
async fn next_records(ws: &mut Ws) -> Vec<Value> {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("stream ended")
            .unwrap();
        if let Message::Text(text) = frame {
            return text
                .as_str()
                .split('\n')
                .map(|line| serde_json::from_str(line).unwrap())
                .collect();
        }
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn committed_message_arrives_live() {
    let harness = TestHarness::builder()
        .with_token("a", UserId(1))
        .with_token("b", UserId(2))
        .build()
        .await
        .unwrap();
    let addr = serve(&harness).await;

    let mut bob = connect(addr, "b").await;
    wait_online(&harness, 2, 1).await;

    let sent = harness
        .sequencer
        .send(courier_sequencer::SendMessage::text(
            UserId(1),
            courier_core::Peer::user(UserId(2)),
            "over the wire",
        ))
        .await
        .unwrap();

    let records = next_records(&mut bob).await;
    let update = &records[0];
    assert_eq!(update["type"], "new_message");
    assert_eq!(update["message"]["id"], sent.id);
    assert_eq!(update["message"]["is_out"], false);
    assert!(update["pts"].as_i64().unwrap() >= 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn ping_and_signaling_over_websocket() {
    let harness = TestHarness::builder()
        .with_token("a", UserId(1))
        .with_token("b", UserId(2))
        .with_token("m", UserId(3))
        .with_call(CallInfo {
            call_id: CallId(5),
            caller_id: UserId(1),
            callee_id: UserId(2),
            state: CallState::Ringing,
        })
        .build()
        .await
        .unwrap();
    let addr = serve(&harness).await;

    let mut alice = connect(addr, "a").await;
    let mut bob_phone = connect(addr, "b").await;
    let mut bob_laptop = connect(addr, "b").await;
    let mut mallory = connect(addr, "m").await;
    wait_online(&harness, 2, 2).await;

    alice.send(Message::text(r#"{"type":"ping"}"#)).await.unwrap();
    assert_eq!(next_records(&mut alice).await[0]["type"], "pong");

    mallory
        .send(Message::text(r#"{"type":"signaling","call_id":5,"data":"x"}"#))
        .await
        .unwrap();
    assert_eq!(
        next_records(&mut mallory).await[0],
        json!({"type": "error", "error": "not authorized"})
    );

    alice
        .send(Message::text(r#"{"type":"signaling","call_id":5,"data":"offer"}"#))
        .await
        .unwrap();
    let expected = json!({"type": "signaling", "call_id": 5, "from_user_id": 1, "data": "offer"});
    assert_eq!(next_records(&mut bob_phone).await, vec![expected.clone()]);
    assert_eq!(next_records(&mut bob_laptop).await, vec![expected]);
}

#[tokio::test(flavor = "multi_thread")]
async fn closing_the_socket_unregisters_the_session() {
    let harness = TestHarness::builder()
        .with_token("a", UserId(1))
        .build()
        .await
        .unwrap();
    let addr = serve(&harness).await;

    let mut alice = connect(addr, "a").await;
    wait_online(&harness, 1, 1).await;

    alice.close(None).await.unwrap();
    wait_online(&harness, 1, 0).await;
    assert!(!harness.hub.is_online(UserId(1)));
}

#[tokio::test(flavor = "multi_thread")]
async fn websocket_with_unknown_token_is_refused() {
    let harness = TestHarness::new().await.unwrap();
    let addr = serve(&harness).await;
    assert!(connect_async(format!("ws://{addr}/ws?token=nope")).await.is_err());
    assert_eq!(harness.hub.total_connections(), 0);
}
