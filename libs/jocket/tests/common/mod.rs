//! Common test utilities for Jocket integration tests
//!
//! A minimal in-process Jocket server on axum: prepare endpoint, long-polling
//! endpoint and WebSocket endpoint on one port.

#![allow(dead_code)]

use axum::body::Bytes;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{FromRequest, Request, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::{SinkExt, StreamExt};
use jocket::{Jocket, JocketEvent};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, watch, Notify};

/// Macro for verbose test output (controlled by TEST_VERBOSE env var)
#[macro_export]
macro_rules! verbose_println {
    ($($arg:tt)*) => {
        if std::env::var("TEST_VERBOSE").is_ok() {
            println!($($arg)*);
        }
    };
}

pub const BASE_PATH: &str = "/jocket/chat/simple";
pub const SESSION_ID: &str = "sid-1";

/// One request as seen by the mock server
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    /// Path and query
    pub target: String,
    /// Lowercased header names
    pub headers: HashMap<String, String>,
    pub body: Bytes,
}

impl RecordedRequest {
    pub fn json(&self) -> Option<Value> {
        serde_json::from_slice(&self.body).ok()
    }
}

impl<S> FromRequest<S> for RecordedRequest
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request(request: Request, _state: &S) -> Result<Self, Self::Rejection> {
        let (parts, body) = request.into_parts();
        let body = axum::body::to_bytes(body, usize::MAX)
            .await
            .map_err(|_| StatusCode::BAD_REQUEST)?;

        let headers = parts
            .headers
            .iter()
            .filter_map(|(name, value)| {
                Some((name.as_str().to_string(), value.to_str().ok()?.to_string()))
            })
            .collect();
        let target = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| parts.uri.path().to_string());

        Ok(Self {
            method: parts.method.to_string(),
            target,
            headers,
            body,
        })
    }
}

/// Behaviour of a [`MockJocketServer`]
#[derive(Debug, Clone)]
pub struct ServerOptions {
    /// Transports returned by the prepare endpoint
    pub transports: Vec<&'static str>,
    /// Accept WebSocket upgrades; when false the socket route does not exist
    pub websocket: bool,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            transports: vec!["websocket", "polling"],
            websocket: true,
        }
    }
}

struct ServerState {
    options: ServerOptions,
    requests: Mutex<Vec<RecordedRequest>>,
    poll_queue: Mutex<VecDeque<Value>>,
    queued: Notify,
    push_tx: broadcast::Sender<Value>,
    kick: Notify,
    shutdown: watch::Sender<bool>,
}

type Shared = Arc<ServerState>;

impl ServerState {
    fn record(&self, request: &RecordedRequest) {
        self.requests.lock().push(request.clone());
    }

    fn enqueue(&self, packet: Value) {
        self.poll_queue.lock().push_back(packet);
        self.queued.notify_one();
    }
}

/// Resolves once the server is shutting down
async fn stopped(mut rx: watch::Receiver<bool>) {
    loop {
        let stop = *rx.borrow_and_update();
        if stop || rx.changed().await.is_err() {
            return;
        }
    }
}

/// Server side of the protocol: pong for ping, echo for data
fn respond_to(packet: Value, mut reply: impl FnMut(Value)) {
    match packet.get("type").and_then(Value::as_str) {
        Some("ping") => reply(json!({"type": "pong"})),
        Some("open") | Some("close") => {}
        _ => reply(packet),
    }
}

async fn prepare(State(state): State<Shared>, request: RecordedRequest) -> Json<Value> {
    state.record(&request);
    Json(json!({
        "sessionId": SESSION_ID,
        "transports": state.options.transports,
    }))
}

async fn poll(State(state): State<Shared>, request: RecordedRequest) -> Response {
    state.record(&request);
    let shutdown = stopped(state.shutdown.subscribe());
    tokio::pin!(shutdown);

    loop {
        if let Some(packet) = state.poll_queue.lock().pop_front() {
            return Json(packet).into_response();
        }
        tokio::select! {
            _ = state.queued.notified() => {}
            _ = &mut shutdown => return StatusCode::SERVICE_UNAVAILABLE.into_response(),
        }
    }
}

async fn poll_send(State(state): State<Shared>, request: RecordedRequest) -> Json<Value> {
    state.record(&request);
    if let Some(packet) = request.json() {
        respond_to(packet, |reply| state.enqueue(reply));
    }
    Json(json!({}))
}

async fn socket(State(state): State<Shared>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Shared) {
    let (mut write, mut read) = socket.split();
    let mut pushes = state.push_tx.subscribe();
    let shutdown = stopped(state.shutdown.subscribe());
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let Ok(packet) = serde_json::from_str::<Value>(text.as_str()) else {
                            continue;
                        };
                        let mut replies = Vec::new();
                        respond_to(packet, |reply| replies.push(reply));
                        for reply in replies {
                            if write.send(Message::Text(reply.to_string().into())).await.is_err() {
                                return;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {}
                }
            }
            pushed = pushes.recv() => {
                let Ok(packet) = pushed else { break };
                if write.send(Message::Text(packet.to_string().into())).await.is_err() {
                    break;
                }
            }
            // Drop without a close frame
            _ = state.kick.notified() => return,
            _ = &mut shutdown => return,
        }
    }
}

/// In-process Jocket server
///
/// Answers pings with pongs and echoes application packets on both
/// transports.
pub struct MockJocketServer {
    pub addr: SocketAddr,
    state: Shared,
}

impl MockJocketServer {
    /// Create and start a new mock server
    pub async fn start(options: ServerOptions) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (push_tx, _) = broadcast::channel(64);
        let (shutdown, _) = watch::channel(false);
        let websocket = options.websocket;

        let state = Arc::new(ServerState {
            options,
            requests: Mutex::new(Vec::new()),
            poll_queue: Mutex::new(VecDeque::new()),
            queued: Notify::new(),
            push_tx,
            kick: Notify::new(),
            shutdown,
        });

        let mut router = Router::new()
            .route(&format!("{}.jocket_prepare", BASE_PATH), post(prepare))
            .route(
                &format!("{}.jocket_polling", BASE_PATH),
                get(poll).post(poll_send),
            );
        if websocket {
            router = router.route(BASE_PATH, get(socket));
        }
        let router = router.with_state(Arc::clone(&state));

        let shutdown = stopped(state.shutdown.subscribe());
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router)
                .with_graceful_shutdown(shutdown)
                .await
            {
                eprintln!("Mock server error: {}", e);
            }
        });

        Self { addr, state }
    }

    /// Base URL for a client of this server
    pub fn base_url(&self) -> String {
        format!("http://{}{}", self.addr, BASE_PATH)
    }

    /// Push a packet to connected clients
    ///
    /// Goes to open WebSockets if there are any, otherwise to the polling
    /// queue.
    pub fn push(&self, packet: Value) {
        if self.state.push_tx.receiver_count() > 0 {
            let _ = self.state.push_tx.send(packet);
        } else {
            self.state.enqueue(packet);
        }
    }

    /// Requests recorded so far (WebSocket upgrades excluded)
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().clone()
    }

    /// Drop open WebSockets without a close frame; keeps accepting
    pub fn disconnect_sockets(&self) {
        self.state.kick.notify_waiters();
    }

    /// Shutdown the server, dropping open connections
    pub fn shutdown(&self) {
        self.state.shutdown.send_replace(true);
    }
}

impl Drop for MockJocketServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Wait for the next client event without blocking the runtime
pub async fn next_event(client: &Jocket) -> JocketEvent {
    for _ in 0..1000 {
        if let Some(event) = client.try_recv_event() {
            verbose_println!("  event: {:?}", event);
            return event;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("no client event within 10s");
}
