//! WebSocket transport
//!
//! The socket lives in its own task. The transport object only keeps a
//! command sender into that task and the guard that aborts it.

use crate::codec;
use crate::error::{CloseCode, JocketError};
use crate::headers::{HeaderProvider, Headers};
use crate::packet::Packet;
use crate::timer::TaskGuard;
use crate::transport::{Transport, TransportKind, TransportSink};
use futures::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::http;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};
use url::Url;

/// Upper bound for the close handshake after `close()`
const CLOSE_GRACE: Duration = Duration::from_secs(2);

#[derive(Debug)]
enum SocketCommand {
    Text(String),
    Disconnect,
}

pub struct WebSocketTransport {
    url: Url,
    sink: TransportSink,
    headers: Arc<dyn HeaderProvider>,
    connected: Arc<AtomicBool>,
    outbound: Option<mpsc::UnboundedSender<SocketCommand>>,
    task: Option<TaskGuard>,
}

impl WebSocketTransport {
    pub fn new(url: Url, sink: TransportSink, headers: Arc<dyn HeaderProvider>) -> Self {
        Self {
            url,
            sink,
            headers,
            connected: Arc::new(AtomicBool::new(false)),
            outbound: None,
            task: None,
        }
    }
}

impl Transport for WebSocketTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::WebSocket
    }

    fn open(&mut self) {
        if self.task.is_some() {
            warn!("WebSocket transport opened twice");
            return;
        }

        let (tx, rx) = mpsc::unbounded_channel();
        self.outbound = Some(tx);
        self.task = Some(TaskGuard::spawn(run_socket(
            self.url.clone(),
            self.sink.clone(),
            Arc::clone(&self.headers),
            Arc::clone(&self.connected),
            rx,
        )));
    }

    fn close(&mut self) {
        self.sink.silence();
        let was_connected = self.connected.swap(false, Ordering::AcqRel);

        let Some(task) = self.task.take() else {
            return;
        };

        match self.outbound.take() {
            // Let the task finish the close handshake on its own
            Some(outbound) if was_connected && outbound.send(SocketCommand::Disconnect).is_ok() => {
                task.detach();
            }
            _ => drop(task),
        }
        debug!("WebSocket transport closed: {}", self.url);
    }

    fn is_open(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    fn send_packet(&mut self, packet: Packet) {
        let text = match codec::encode_text(&packet) {
            Ok(text) => text,
            Err(e) => {
                debug!("Dropping unencodable packet: {}", e);
                return;
            }
        };

        match &self.outbound {
            Some(outbound) => {
                let _ = outbound.send(SocketCommand::Text(text));
            }
            None => debug!("WebSocket not open, dropping packet"),
        }
    }
}

impl Drop for WebSocketTransport {
    fn drop(&mut self) {
        self.close();
    }
}

/// Build the upgrade request with the provider's headers applied
fn upgrade_request(url: &Url, headers: Headers) -> Result<Request, JocketError> {
    let mut request = url
        .as_str()
        .into_client_request()
        .map_err(|e| JocketError::Socket(format!("Failed to create request: {}", e)))?;

    for (key, value) in headers {
        match key.parse::<http::header::HeaderName>() {
            Ok(header_name) => match value.parse::<http::header::HeaderValue>() {
                Ok(header_value) => {
                    request.headers_mut().insert(header_name, header_value);
                }
                Err(_) => {
                    warn!("Invalid header value for key '{}': {}", key, value);
                }
            },
            Err(_) => {
                warn!("Invalid header name: {}", key);
            }
        }
    }

    Ok(request)
}

/// Close reason carried by a close frame; a normal or empty frame is clean
fn close_reason(frame: Option<CloseFrame<'_>>) -> Option<JocketError> {
    let frame = frame?;
    let code = u16::from(frame.code);
    if code == CloseCode::Normal.code() {
        return None;
    }
    Some(JocketError::Closed(
        CloseCode::from_code(code).unwrap_or(CloseCode::Abnormal),
    ))
}

async fn run_socket(
    url: Url,
    sink: TransportSink,
    headers: Arc<dyn HeaderProvider>,
    connected: Arc<AtomicBool>,
    mut commands: mpsc::UnboundedReceiver<SocketCommand>,
) {
    let request = match upgrade_request(&url, headers.get_headers().await) {
        Ok(request) => request,
        Err(e) => {
            error!("{}", e);
            sink.close(Some(e));
            return;
        }
    };

    let (ws_stream, _) = match connect_async(request).await {
        Ok(connection) => connection,
        Err(e) => {
            warn!("Failed to connect to {}: {}", url, e);
            sink.close(Some(JocketError::Socket(e.to_string())));
            return;
        }
    };

    info!("WebSocket connected to {}", url);
    connected.store(true, Ordering::Release);
    sink.open();

    let (mut write, mut read) = ws_stream.split();

    let reason = loop {
        tokio::select! {
            cmd = commands.recv() => {
                match cmd {
                    Some(SocketCommand::Text(text)) => {
                        if let Err(e) = write.send(Message::Text(text)).await {
                            error!("WebSocket send failed: {}", e);
                            break Some(JocketError::Socket(e.to_string()));
                        }
                    }
                    // Owner closed us; the sink is already silenced
                    Some(SocketCommand::Disconnect) | None => {
                        let _ = tokio::time::timeout(CLOSE_GRACE, write.close()).await;
                        return;
                    }
                }
            }

            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => match codec::decode_text(&text) {
                        Ok(packet) => sink.packet(packet),
                        Err(e) => debug!("Dropping undecodable frame: {}", e),
                    },
                    Some(Ok(Message::Close(frame))) => {
                        debug!("WebSocket close frame: {:?}", frame);
                        break close_reason(frame);
                    }
                    // Binary and control frames carry no packets
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        error!("WebSocket error: {}", e);
                        break Some(JocketError::Socket(e.to_string()));
                    }
                    None => {
                        warn!("WebSocket stream closed");
                        break Some(JocketError::Closed(CloseCode::Abnormal));
                    }
                }
            }
        }
    };

    connected.store(false, Ordering::Release);
    sink.close(reason);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headers::NoHeaders;
    use crate::transport::{TransportEvent, TransportId};
    use std::collections::HashMap;
    use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode as WsCloseCode;

    #[test]
    fn test_upgrade_request_applies_headers() {
        let url = Url::parse("ws://localhost:9000/chat?jocket_sid=abc").unwrap();
        let mut headers = HashMap::new();
        headers.insert("X-Token".to_string(), "secret".to_string());
        headers.insert("bad header".to_string(), "ignored".to_string());

        let request = upgrade_request(&url, headers).unwrap();
        assert_eq!(request.headers().get("x-token").unwrap(), "secret");
        assert!(request.headers().get("bad header").is_none());
    }

    #[test]
    fn test_close_reason_mapping() {
        assert_eq!(close_reason(None), None);

        let normal = CloseFrame {
            code: WsCloseCode::Normal,
            reason: "".into(),
        };
        assert_eq!(close_reason(Some(normal)), None);

        let missing = CloseFrame {
            code: WsCloseCode::from(3601),
            reason: "no session".into(),
        };
        assert_eq!(
            close_reason(Some(missing)),
            Some(JocketError::Closed(CloseCode::SessionNotFound))
        );

        let unknown = CloseFrame {
            code: WsCloseCode::from(4999),
            reason: "".into(),
        };
        assert_eq!(
            close_reason(Some(unknown)),
            Some(JocketError::Closed(CloseCode::Abnormal))
        );
    }

    #[tokio::test]
    async fn test_refused_connection_reports_close() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sink = TransportSink::new(TransportId(7), tx);
        // Port 9 (discard) is not listening on test machines
        let url = Url::parse("ws://127.0.0.1:9/chat?jocket_sid=abc").unwrap();
        let mut transport = WebSocketTransport::new(url, sink, Arc::new(NoHeaders));

        transport.open();
        let signal = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(signal.id, TransportId(7));
        assert!(matches!(
            signal.event,
            TransportEvent::Close(Some(JocketError::Socket(_)))
        ));
        assert!(!transport.is_open());
    }

    #[tokio::test]
    async fn test_close_before_connect_is_silent() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sink = TransportSink::new(TransportId(1), tx);
        let url = Url::parse("ws://127.0.0.1:9/chat").unwrap();
        let mut transport = WebSocketTransport::new(url, sink, Arc::new(NoHeaders));

        transport.open();
        transport.close();
        transport.close();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(rx.try_recv().is_err());
    }
}
