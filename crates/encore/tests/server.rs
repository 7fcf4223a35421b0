//! Integration tests for the server, handler, and full connection flow.

use std::time::Duration;

use encore::prelude::*;
use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio_tungstenite::tungstenite::Message;

type ClientWs =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// Starts a server on a random port and returns the address.
async fn start_server() -> String {
    let server = EncoreServerBuilder::new()
        .bind("127.0.0.1:0")
        .build(PlaceholderProvider::new())
        .await
        .expect("server should build");

    let addr = server.local_addr().expect("should have local addr").to_string();

    tokio::spawn(async move {
        let _ = server.run().await;
    });

    addr
}

async fn connect(addr: &str) -> ClientWs {
    let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
        .await
        .expect("should connect");
    ws
}

async fn send(ws: &mut ClientWs, value: Value) {
    ws.send(Message::Text(value.to_string().into()))
        .await
        .expect("send");
}

/// Receives the next JSON event.
async fn recv(ws: &mut ClientWs) -> Value {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timed out")
            .expect("stream ended")
            .expect("recv");
        if let Message::Text(text) = msg {
            return serde_json::from_str(&text).expect("server sends JSON");
        }
    }
}

/// Receives events until one of type `kind` arrives.
async fn recv_type(ws: &mut ClientWs, kind: &str) -> Value {
    loop {
        let event = recv(ws).await;
        if event["type"] == kind {
            return event;
        }
    }
}

#[tokio::test]
async fn test_join_room_returns_snapshot() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;

    send(&mut ws, json!({"type": "joinRoom", "roomCode": "ab12"})).await;

    let joined = recv(&mut ws).await;
    assert_eq!(joined["type"], "roomJoined");
    assert_eq!(joined["roomCode"], "AB12");
    assert_eq!(joined["player"]["isHost"], true);
    assert_eq!(joined["player"]["name"], "Player 1");
    assert_eq!(joined["game"]["phase"], "lobby");
    assert_eq!(joined["players"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn test_second_client_announced_to_first() {
    let addr = start_server().await;
    let mut first = connect(&addr).await;
    let mut second = connect(&addr).await;

    send(&mut first, json!({"type": "joinRoom", "roomCode": "AB12"})).await;
    recv_type(&mut first, "roomJoined").await;
    send(&mut second, json!({"type": "joinRoom", "roomCode": "AB12"})).await;

    let joined = recv_type(&mut second, "roomJoined").await;
    assert_eq!(joined["player"]["isHost"], false);

    let announced = recv_type(&mut first, "userJoined").await;
    assert_eq!(announced["player"]["id"], joined["player"]["id"]);
    assert_eq!(announced["players"].as_array().map(Vec::len), Some(2));
}

#[tokio::test]
async fn test_malformed_frame_gets_error() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;

    ws.send(Message::Text("definitely not json".into()))
        .await
        .expect("send");

    let error = recv(&mut ws).await;
    assert_eq!(error["type"], "error");
    assert!(error["message"].as_str().unwrap().starts_with("invalid message"));
}

#[tokio::test]
async fn test_bad_room_code_gets_error() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;

    send(&mut ws, json!({"type": "joinRoom", "roomCode": "A-1"})).await;

    assert_eq!(recv(&mut ws).await["type"], "error");
}

#[tokio::test]
async fn test_action_on_unknown_room_gets_not_found() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;

    send(&mut ws, json!({"type": "startGame", "roomCode": "ZZZZ"})).await;

    let error = recv(&mut ws).await;
    assert_eq!(error, json!({"type": "error", "message": "Room not found"}));
}

#[tokio::test]
async fn test_closed_connection_leaves_room() {
    let addr = start_server().await;
    let mut first = connect(&addr).await;
    let mut second = connect(&addr).await;

    send(&mut first, json!({"type": "joinRoom", "roomCode": "AB12"})).await;
    recv_type(&mut first, "roomJoined").await;
    send(&mut second, json!({"type": "joinRoom", "roomCode": "AB12"})).await;
    let joined = recv_type(&mut second, "roomJoined").await;
    recv_type(&mut first, "userJoined").await;

    second.close(None).await.expect("close");

    let left = recv_type(&mut first, "userLeft").await;
    assert_eq!(left["playerId"], joined["player"]["id"]);
    assert_eq!(left["players"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn test_binary_frames_are_accepted() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;

    let frame = json!({"type": "joinRoom", "roomCode": "BIN1"}).to_string();
    ws.send(Message::Binary(frame.into_bytes().into()))
        .await
        .expect("send");

    assert_eq!(recv(&mut ws).await["type"], "roomJoined");
}
