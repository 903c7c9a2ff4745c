//! Integration tests for connection establishment
//!
//! These tests run the real transports against the in-process mock server.

mod common;

use common::{next_event, MockJocketServer, ServerOptions, SESSION_ID};
use jocket::{
    data_packet, CloseCode, ConnectionState, JocketError, JocketEvent, StaticHeaders,
    TransportKind,
};
use serde_json::json;
use std::collections::HashMap;
use std::time::Duration;

async fn client_for(server: &MockJocketServer) -> jocket::Jocket {
    jocket::builder()
        .url(server.base_url())
        .handshake_timeout(Duration::from_secs(2))
        .poll_timeout(Duration::from_secs(5))
        .build()
        .await
        .unwrap()
}

#[tokio::test]
async fn test_websocket_session_round_trip() {
    verbose_println!("Testing websocket session...");

    let server = MockJocketServer::start(ServerOptions::default()).await;
    let client = client_for(&server).await;

    client.open().unwrap();
    assert_eq!(next_event(&client).await, JocketEvent::Open);
    assert!(client.is_open());
    assert_eq!(client.metrics().transport_attempts, 1);

    client.send_packet(data_packet(json!({"content": "hello"})));
    assert_eq!(
        next_event(&client).await,
        JocketEvent::Packet(data_packet(json!({"content": "hello"})))
    );

    client.close().unwrap();
    assert_eq!(
        next_event(&client).await,
        JocketEvent::Close(Some(JocketError::Closed(CloseCode::Normal)))
    );
    assert_eq!(client.connection_state(), ConnectionState::Closed);

    // Only the prepare request went over plain HTTP
    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, "POST");
    assert_eq!(
        requests[0].json(),
        Some(json!({"transports": ["websocket", "polling"]}))
    );
    assert_eq!(
        requests[0].headers.get("content-type").map(String::as_str),
        Some("application/json")
    );

    client.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_fallback_to_polling() {
    verbose_println!("Testing websocket to polling fallback...");

    let server = MockJocketServer::start(ServerOptions {
        websocket: false,
        ..ServerOptions::default()
    })
    .await;
    let client = client_for(&server).await;

    client.open().unwrap();
    assert_eq!(next_event(&client).await, JocketEvent::Open);
    assert_eq!(client.metrics().transport_attempts, 2);

    client.send_packet(data_packet(json!({"content": "via polling"})));
    assert_eq!(
        next_event(&client).await,
        JocketEvent::Packet(data_packet(json!({"content": "via polling"})))
    );

    let polls: Vec<_> = server
        .requests()
        .into_iter()
        .filter(|r| r.target.contains(".jocket_polling"))
        .collect();
    assert!(polls
        .iter()
        .all(|r| r.target.ends_with(&format!("?jocket_sid={}", SESSION_ID))));
    assert!(polls.iter().any(|r| r.method == "GET"));
    assert!(polls
        .iter()
        .any(|r| r.method == "POST" && r.json() == Some(json!({"type": "ping"}))));

    client.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_polling_close_sends_close_packet() {
    let server = MockJocketServer::start(ServerOptions {
        transports: vec!["polling"],
        ..ServerOptions::default()
    })
    .await;
    let client = client_for(&server).await;

    client.open().unwrap();
    assert_eq!(next_event(&client).await, JocketEvent::Open);
    client.close().unwrap();
    next_event(&client).await;

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(server
        .requests()
        .iter()
        .any(|r| r.method == "POST" && r.json() == Some(json!({"type": "close"}))));
}

#[tokio::test]
async fn test_server_close_packet() {
    verbose_println!("Testing server initiated close...");

    let server = MockJocketServer::start(ServerOptions {
        transports: vec!["polling"],
        ..ServerOptions::default()
    })
    .await;
    let client = client_for(&server).await;

    client.open().unwrap();
    assert_eq!(next_event(&client).await, JocketEvent::Open);

    server.push(json!({"type": "chat", "data": "first"}));
    assert_eq!(
        next_event(&client).await,
        JocketEvent::Packet(json!({"type": "chat", "data": "first"}).as_object().cloned().unwrap())
    );

    server.push(json!({"type": "close"}));
    assert_eq!(next_event(&client).await, JocketEvent::Close(None));
    assert!(!client.is_open());
}

#[tokio::test]
async fn test_websocket_loss_after_open() {
    let server = MockJocketServer::start(ServerOptions {
        transports: vec!["websocket"],
        ..ServerOptions::default()
    })
    .await;
    let client = client_for(&server).await;

    client.open().unwrap();
    assert_eq!(next_event(&client).await, JocketEvent::Open);

    server.shutdown();
    match next_event(&client).await {
        JocketEvent::Close(Some(error)) => {
            verbose_println!("  closed with: {}", error);
            assert!(matches!(
                error,
                JocketError::Socket(_) | JocketError::Closed(CloseCode::Abnormal)
            ));
        }
        other => panic!("unexpected event {:?}", other),
    }
}

#[tokio::test]
async fn test_headers_reach_server() {
    let server = MockJocketServer::start(ServerOptions {
        transports: vec!["polling"],
        ..ServerOptions::default()
    })
    .await;

    let mut headers = HashMap::new();
    headers.insert("X-Jocket-User".to_string(), "alice".to_string());
    let client = jocket::builder()
        .url(server.base_url())
        .transports([TransportKind::Polling])
        .headers(StaticHeaders::new(headers))
        .build()
        .await
        .unwrap();

    client.open().unwrap();
    assert_eq!(next_event(&client).await, JocketEvent::Open);

    let requests = server.requests();
    assert!(!requests.is_empty());
    for request in &requests {
        assert_eq!(
            request.headers.get("x-jocket-user").map(String::as_str),
            Some("alice")
        );
        assert_eq!(
            request.headers.get("cache-control").map(String::as_str),
            Some("no-store, no-cache")
        );
    }
    assert_eq!(
        requests[0].json(),
        Some(json!({"transports": ["polling"]}))
    );
}

#[tokio::test]
async fn test_unreachable_server() {
    // Bind and immediately drop to get a free port nobody listens on
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let client = jocket::builder()
        .url(format!("http://127.0.0.1:{}/jocket/chat/simple", port))
        .build()
        .await
        .unwrap();

    client.open().unwrap();
    assert!(matches!(
        next_event(&client).await,
        JocketEvent::Close(Some(JocketError::Network(_)))
    ));
    assert_eq!(client.metrics().transport_attempts, 0);
}
