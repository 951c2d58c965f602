//! WebSocket integration tests: subscription filtering of ledger events.

#![allow(clippy::panic)]

mod common;

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio_tungstenite::tungstenite::Message;

type Socket =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

async fn next_json(socket: &mut Socket) -> Value {
    loop {
        let Ok(Some(Ok(msg))) = tokio::time::timeout(Duration::from_secs(5), socket.next()).await
        else {
            panic!("no message within timeout");
        };
        if let Message::Text(text) = msg {
            return serde_json::from_str(text.as_str()).unwrap_or(Value::Null);
        }
    }
}

#[tokio::test]
async fn subscriber_receives_only_its_users_events() {
    let server = common::spawn().await;
    let client = &server.client;

    let Ok((mut socket, _)) = tokio_tungstenite::connect_async(server.ws_url()).await else {
        panic!("ws connect failed");
    };
    let subscribe = json!({
        "id": "sub-1",
        "type": "command",
        "payload": {"command": "subscribe", "user_ids": [42]}
    });
    let Ok(()) = socket.send(Message::text(subscribe.to_string())).await else {
        panic!("ws send failed");
    };
    let ack = next_json(&mut socket).await;
    assert_eq!(ack["type"], "response");
    assert_eq!(ack["payload"]["count"], 1);

    for user in [43, 42] {
        let Ok(_) = client
            .put(server.url(&format!("/api/v1/users/{user}")))
            .json(&json!({}))
            .send()
            .await
        else {
            panic!("upsert failed");
        };
        let Ok(_) = client
            .post(server.url(&format!("/api/v1/users/{user}/credits")))
            .json(&json!({"amount": 5}))
            .send()
            .await
        else {
            panic!("top-up failed");
        };
    }

    let created = next_json(&mut socket).await;
    assert_eq!(created["type"], "event");
    assert_eq!(created["payload"]["event_type"], "account_created");
    assert_eq!(created["payload"]["user_id"], 42);

    let added = next_json(&mut socket).await;
    assert_eq!(added["payload"]["event_type"], "credits_added");
    assert_eq!(added["payload"]["user_id"], 42);
    assert_eq!(added["payload"]["balance"], 5);
    assert_eq!(added["payload"]["reason"], "top_up");
}

#[tokio::test]
async fn unknown_command_gets_error_reply() {
    let server = common::spawn().await;
    let Ok((mut socket, _)) = tokio_tungstenite::connect_async(server.ws_url()).await else {
        panic!("ws connect failed");
    };
    let command = json!({"id": "x", "type": "command", "payload": {"command": "swap"}});
    let Ok(()) = socket.send(Message::text(command.to_string())).await else {
        panic!("ws send failed");
    };
    let reply = next_json(&mut socket).await;
    assert_eq!(reply["type"], "error");
    assert_eq!(reply["id"], "x");
}
