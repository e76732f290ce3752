//! WebSocket integration tests against a live server.
//!
//! Each test binds the real router to an ephemeral port and talks to it with
//! `tokio-tungstenite` clients.

use futures_util::{SinkExt, StreamExt};
use sb_server::api::{AppState, create_router};
use serde_json::{Value, json};
use setback::{TableActor, TableConfig};
use std::collections::HashSet;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Helper to start a server on an ephemeral port
async fn start_server() -> SocketAddr {
    let config = TableConfig::default();
    let outbound_capacity = config.outbound_capacity;
    let (actor, table) = TableActor::new(config);
    tokio::spawn(actor.run());
    let app = create_router(AppState {
        table,
        outbound_capacity,
    });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// Connects and consumes the initial spectator view.
async fn connect(addr: SocketAddr) -> Client {
    let (mut ws, _) = connect_async(format!("ws://{addr}/ws")).await.unwrap();
    let first = next_json(&mut ws).await;
    assert_eq!(first["type"], "state_update");
    ws
}

async fn next_json(ws: &mut Client) -> Value {
    loop {
        let msg = timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timed out waiting for frame")
            .expect("stream ended")
            .expect("websocket error");
        if let Message::Text(text) = msg {
            return serde_json::from_str(text.as_str()).unwrap();
        }
    }
}

async fn send(ws: &mut Client, value: Value) {
    ws.send(Message::text(value.to_string())).await.unwrap();
}

#[tokio::test]
async fn test_join_fans_out_personalized_views() {
    let addr = start_server().await;
    let mut ann = connect(addr).await;
    let mut watcher = connect(addr).await;

    send(&mut ann, json!({"type": "join_seat", "seat": 0, "name": "Ann"})).await;

    let mine = next_json(&mut ann).await;
    assert_eq!(mine["type"], "state_update");
    assert_eq!(mine["view"]["seat"], 0);
    assert!(mine["view"]["credential"].is_string());

    let theirs = next_json(&mut watcher).await;
    assert_eq!(theirs["type"], "state_update");
    assert_eq!(theirs["view"]["state"]["seats"][0]["name"], "Ann");
    assert!(theirs["view"].get("seat").is_none());
    assert!(theirs["view"].get("credential").is_none());
}

#[tokio::test]
async fn test_malformed_frame_gets_bad_request() {
    let addr = start_server().await;
    let mut client = connect(addr).await;

    ws_send_raw(&mut client, "{not json").await;
    let reply = next_json(&mut client).await;
    assert_eq!(reply["type"], "error");
    assert_eq!(reply["code"], "bad_request");

    send(&mut client, json!({"type": "shuffle_up"})).await;
    let reply = next_json(&mut client).await;
    assert_eq!(reply["code"], "bad_request");

    // The connection stays usable afterwards.
    send(&mut client, json!({"type": "join_seat", "seat": 1, "name": "Bo"})).await;
    let view = next_json(&mut client).await;
    assert_eq!(view["view"]["seat"], 1);
}

async fn ws_send_raw(ws: &mut Client, text: &str) {
    ws.send(Message::text(text)).await.unwrap();
}

#[tokio::test]
async fn test_rule_violation_goes_to_sender_only() {
    let addr = start_server().await;
    let mut spectator = connect(addr).await;
    let mut ann = connect(addr).await;
    send(&mut ann, json!({"type": "join_seat", "seat": 0, "name": "Ann"})).await;
    next_json(&mut ann).await;
    next_json(&mut spectator).await;

    send(&mut spectator, json!({"type": "start_game"})).await;
    let error = next_json(&mut spectator).await;
    assert_eq!(error["type"], "error");
    assert_eq!(error["code"], "turn_violation");
    let resync = next_json(&mut spectator).await;
    assert_eq!(resync["type"], "state_update");

    // Ann's next frame is the one caused by her own rename, not the error.
    send(&mut ann, json!({"type": "change_name", "name": "Annie"})).await;
    let view = next_json(&mut ann).await;
    assert_eq!(view["type"], "state_update");
    assert_eq!(view["view"]["state"]["seats"][0]["name"], "Annie");
}

#[tokio::test]
async fn test_start_game_deals_private_hands() {
    let addr = start_server().await;
    let mut clients = Vec::new();
    for seat in 0..4 {
        let mut ws = connect(addr).await;
        send(&mut ws, json!({"type": "join_seat", "seat": seat, "name": format!("p{seat}")}))
            .await;
        assert_eq!(next_json(&mut ws).await["view"]["seat"], seat);
        clients.push(ws);
    }
    // Drain the later joins: client i saw seats i+1..=3 arrive.
    for (i, ws) in clients.iter_mut().enumerate() {
        for _ in i + 1..4 {
            next_json(ws).await;
        }
    }

    send(&mut clients[0], json!({"type": "start_game"})).await;

    let mut seen = HashSet::new();
    for (seat, ws) in clients.iter_mut().enumerate() {
        let view = next_json(ws).await;
        assert_eq!(view["view"]["state"]["phase"], "bidding");
        assert_eq!(view["view"]["state"]["seat_to_act"], 1);
        assert_eq!(view["view"]["seat"], seat);
        let hand = view["view"]["hand"].as_array().unwrap();
        assert_eq!(hand.len(), 6);
        for card in hand {
            assert!(seen.insert(card["id"].as_str().unwrap().to_string()));
        }
        assert!(view["view"].get("kitty").is_none());
    }
    assert_eq!(seen.len(), 24);
}

#[tokio::test]
async fn test_disconnect_is_broadcast_and_rejoin_restores_seat() {
    let addr = start_server().await;
    let mut watcher = connect(addr).await;
    let mut ann = connect(addr).await;
    send(&mut ann, json!({"type": "join_seat", "seat": 2, "name": "Ann"})).await;
    let credential = next_json(&mut ann).await["view"]["credential"]
        .as_str()
        .unwrap()
        .to_string();
    next_json(&mut watcher).await;

    ann.close(None).await.unwrap();
    let view = next_json(&mut watcher).await;
    assert_eq!(view["view"]["state"]["seats"][2]["connected"], false);
    assert_eq!(view["view"]["state"]["seats"][2]["name"], "Ann");

    let mut again = connect(addr).await;
    send(&mut again, json!({"type": "rejoin", "credential": credential})).await;
    let view = next_json(&mut again).await;
    assert_eq!(view["view"]["seat"], 2);
    assert_eq!(view["view"]["state"]["seats"][2]["connected"], true);
}
