//! Integration tests for the `WebSocket` listener.
//!
//! Each test binds a real listener on an ephemeral port and talks to it
//! with a `tokio-tungstenite` client, so the full upgrade, request, and
//! disconnect path is exercised.

#![allow(clippy::unwrap_used, clippy::panic)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use eew2sock_core::config::ListenerConfig;
use eew2sock_core::protocol::{decode_packet, PACKET_LEN};
use eew2sock_core::registry::EventRegistry;
use eew2sock_server::router::build_router;
use eew2sock_server::{spawn_listener, AppState};
use eew2sock_types::{EewEvent, EewRecord, MapCoordinates, MapPoint};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tower::ServiceExt;

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const REPLY_TIMEOUT: Duration = Duration::from_secs(5);

async fn start() -> (Arc<AppState>, String) {
    let registry = Arc::new(EventRegistry::new(600));
    let state = Arc::new(AppState::new(registry));
    let config = ListenerConfig {
        host: String::from("127.0.0.1"),
        port: 0,
    };
    let running = spawn_listener(&config, Arc::clone(&state)).await.unwrap();
    (state, format!("ws://{}/", running.addr))
}

async fn connect(url: &str) -> Client {
    let (client, _) = connect_async(url).await.unwrap();
    client
}

async fn poll(client: &mut Client, text: &str) -> Vec<EewRecord> {
    client.send(Message::Text(text.to_owned().into())).await.unwrap();
    let reply = tokio::time::timeout(REPLY_TIMEOUT, client.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    match reply {
        Message::Binary(bytes) => {
            assert_eq!(bytes.len(), PACKET_LEN);
            decode_packet(&bytes).unwrap()
        }
        other => panic!("expected binary reply, got {other:?}"),
    }
}

fn scenario_record(magnitude: f64) -> EewRecord {
    let event = EewEvent {
        event_id: 101,
        origin_time: 1000,
        latitude: 23.5,
        longitude: 121.0,
        magnitude,
    };
    EewRecord::new(
        &event,
        MapCoordinates {
            small: MapPoint { x: 10.0, y: 20.0 },
            large: MapPoint { x: 100.0, y: 200.0 },
        },
    )
}

async fn wait_for_live(state: &AppState, expected: usize) {
    for _ in 0..100 {
        if state.connections.len() == expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(state.connections.len(), expected);
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test]
async fn test_poll_on_empty_registry_returns_zero_count() {
    let (_state, url) = start().await;
    let mut client = connect(&url).await;

    let records = poll(&mut client, "poll").await;
    assert!(records.is_empty());
}

#[tokio::test]
async fn test_poll_returns_registry_contents() {
    let (state, url) = start().await;
    state.registry.upsert(scenario_record(5.2)).await;

    let mut client = connect(&url).await;
    let records = poll(&mut client, "poll").await;
    assert_eq!(records, vec![scenario_record(5.2)]);
}

#[tokio::test]
async fn test_each_poll_sees_current_registry() {
    let (state, url) = start().await;
    let mut client = connect(&url).await;

    assert!(poll(&mut client, "poll").await.is_empty());

    state.registry.upsert(scenario_record(5.2)).await;
    state.registry.upsert(scenario_record(6.0)).await;
    let records = poll(&mut client, "again").await;
    assert_eq!(records, vec![scenario_record(6.0)]);

    state.registry.evict_older_than(1_700).await;
    assert!(poll(&mut client, "").await.is_empty());
}

#[tokio::test]
async fn test_handshake_gets_no_reply() {
    let (state, url) = start().await;
    state.registry.upsert(scenario_record(5.2)).await;
    let mut client = connect(&url).await;

    client.send(Message::Text(String::from("Hello").into())).await.unwrap();
    let silent = tokio::time::timeout(Duration::from_millis(300), client.next()).await;
    assert!(silent.is_err(), "handshake must not be answered");

    // The connection is still usable afterwards.
    assert_eq!(poll(&mut client, "poll").await.len(), 1);
}

#[tokio::test]
async fn test_no_unsolicited_packets() {
    let (state, url) = start().await;
    let mut client = connect(&url).await;
    wait_for_live(&state, 1).await;

    state.registry.upsert(scenario_record(5.2)).await;
    let silent = tokio::time::timeout(Duration::from_millis(300), client.next()).await;
    assert!(silent.is_err(), "server must not push without a request");
}

#[tokio::test]
async fn test_connections_are_tracked_and_released() {
    let (state, url) = start().await;

    let first = connect(&url).await;
    let mut second = connect(&url).await;
    wait_for_live(&state, 2).await;

    drop(first);
    wait_for_live(&state, 1).await;

    second.close(None).await.unwrap();
    wait_for_live(&state, 0).await;
}

#[tokio::test]
async fn test_any_path_accepts_upgrade() {
    let (_state, url) = start().await;
    let mut client = connect(&format!("{url}eew")).await;
    assert!(poll(&mut client, "poll").await.is_empty());
}

#[tokio::test]
async fn test_plain_http_is_rejected() {
    let state = Arc::new(AppState::new(Arc::new(EventRegistry::new(600))));
    let router = build_router(state);

    let response = router
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert!(response.status().is_client_error());

    let state = Arc::new(AppState::new(Arc::new(EventRegistry::new(600))));
    let response = build_router(state)
        .oneshot(Request::post("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_bind_conflict_is_reported() {
    let (_state, url) = start().await;
    let port: u16 = url
        .trim_start_matches("ws://127.0.0.1:")
        .trim_end_matches('/')
        .parse()
        .unwrap();

    let state = Arc::new(AppState::new(Arc::new(EventRegistry::new(600))));
    let config = ListenerConfig {
        host: String::from("127.0.0.1"),
        port,
    };
    assert!(spawn_listener(&config, state).await.is_err());
}
