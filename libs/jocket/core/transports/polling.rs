//! HTTP long-polling transport
//!
//! While open, exactly one long-poll GET is outstanding. Each completed poll
//! is followed immediately by the next one:
//!
//! ```text
//! open() ──> Open ──> GET ──┬─ packet ────> Packet, GET again
//!                           ├─ timeout ───> GET again
//!                           └─ failure ───> Close(Abnormal), stop
//! ```
//!
//! Outbound packets are POSTed to the same URL, fire-and-forget.

use crate::codec;
use crate::config::PollingOptions;
use crate::error::{CloseCode, JocketError};
use crate::executor::{HttpExecutor, HttpRequest};
use crate::headers::HeaderProvider;
use crate::packet::{ControlType, Packet};
use crate::timer::TaskGuard;
use crate::transport::{Transport, TransportKind, TransportSink};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

pub struct PollingTransport {
    url: Url,
    sink: TransportSink,
    executor: Arc<dyn HttpExecutor>,
    headers: Arc<dyn HeaderProvider>,
    options: PollingOptions,
    polling: Arc<AtomicBool>,
    poll_task: Option<TaskGuard>,
}

impl PollingTransport {
    pub fn new(
        url: Url,
        sink: TransportSink,
        executor: Arc<dyn HttpExecutor>,
        headers: Arc<dyn HeaderProvider>,
        options: PollingOptions,
    ) -> Self {
        Self {
            url,
            sink,
            executor,
            headers,
            options,
            polling: Arc::new(AtomicBool::new(false)),
            poll_task: None,
        }
    }

    fn post(&self, packet: &Packet) {
        let body = match codec::encode(packet) {
            Ok(body) => body,
            Err(e) => {
                debug!("Dropping unencodable packet: {}", e);
                return;
            }
        };

        let request = HttpRequest::post(self.url.clone(), body, self.options.send_timeout);
        let executor = Arc::clone(&self.executor);
        let headers = Arc::clone(&self.headers);

        TaskGuard::spawn(async move {
            let request = request.with_headers(headers.get_headers().await);
            if let Err(e) = executor.execute(request).await {
                debug!("Polling send failed: {}", e);
            }
        })
        .detach();
    }
}

impl Transport for PollingTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Polling
    }

    fn open(&mut self) {
        if self.poll_task.is_some() {
            warn!("Polling transport opened twice");
            return;
        }

        self.polling.store(true, Ordering::Release);
        // Open goes out before the loop can deliver any packet
        self.sink.open();

        self.poll_task = Some(TaskGuard::spawn(poll_loop(
            self.url.clone(),
            self.sink.clone(),
            Arc::clone(&self.executor),
            Arc::clone(&self.headers),
            self.options.clone(),
            Arc::clone(&self.polling),
        )));
    }

    fn close(&mut self) {
        self.sink.silence();
        self.polling.store(false, Ordering::Release);

        if let Some(task) = self.poll_task.take() {
            if self.options.send_close_packet {
                self.post(&ControlType::Close.packet());
            }
            drop(task);
            debug!("Polling transport closed: {}", self.url);
        }
    }

    fn is_open(&self) -> bool {
        self.polling.load(Ordering::Acquire)
    }

    fn send_packet(&mut self, packet: Packet) {
        self.post(&packet);
    }
}

impl Drop for PollingTransport {
    fn drop(&mut self) {
        self.close();
    }
}

async fn poll_loop(
    url: Url,
    sink: TransportSink,
    executor: Arc<dyn HttpExecutor>,
    headers: Arc<dyn HeaderProvider>,
    options: PollingOptions,
    polling: Arc<AtomicBool>,
) {
    loop {
        let request = HttpRequest::get(url.clone(), options.poll_timeout)
            .with_headers(headers.get_headers().await);

        match executor.execute(request).await {
            Ok(packet) => sink.packet(packet),
            Err(e) if e.is_timeout() => {
                debug!("Poll timed out, re-polling");
            }
            Err(e) => {
                warn!("Polling failed: {}", e);
                polling.store(false, Ordering::Release);
                sink.close(Some(JocketError::Closed(CloseCode::Abnormal)));
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HttpError;
    use crate::executor::HttpMethod;
    use crate::headers::NoHeaders;
    use crate::transport::{TransportEvent, TransportId, TransportSignal};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::{json, Value};
    use std::collections::VecDeque;
    use std::time::Duration;
    use tokio::sync::mpsc;

    /// Scripted GET results; an empty script parks the poll forever
    struct ScriptedExecutor {
        polls: Mutex<VecDeque<Result<Packet, HttpError>>>,
        posts: Mutex<Vec<(HttpMethod, Value)>>,
        get_count: Mutex<usize>,
    }

    impl ScriptedExecutor {
        fn new(polls: Vec<Result<Packet, HttpError>>) -> Arc<Self> {
            Arc::new(Self {
                polls: Mutex::new(polls.into()),
                posts: Mutex::new(Vec::new()),
                get_count: Mutex::new(0),
            })
        }
    }

    #[async_trait]
    impl HttpExecutor for ScriptedExecutor {
        async fn execute(&self, request: HttpRequest) -> Result<Packet, HttpError> {
            match request.method {
                HttpMethod::Post => {
                    let body: Value = serde_json::from_slice(&request.body.unwrap()).unwrap();
                    self.posts.lock().push((request.method, body));
                    Ok(Packet::new())
                }
                HttpMethod::Get => {
                    *self.get_count.lock() += 1;
                    let next = self.polls.lock().pop_front();
                    match next {
                        Some(result) => result,
                        None => std::future::pending().await,
                    }
                }
            }
        }
    }

    fn transport(executor: Arc<ScriptedExecutor>) -> (PollingTransport, mpsc::UnboundedReceiver<TransportSignal>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let sink = TransportSink::new(TransportId(1), tx);
        let url = Url::parse("http://localhost/chat.jocket_polling?jocket_sid=abc").unwrap();
        let transport = PollingTransport::new(
            url,
            sink,
            executor,
            Arc::new(NoHeaders),
            PollingOptions::default(),
        );
        (transport, rx)
    }

    async fn next_event(rx: &mut mpsc::UnboundedReceiver<TransportSignal>) -> TransportEvent {
        tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("no transport event")
            .expect("channel closed")
            .event
    }

    fn pong() -> Packet {
        ControlType::Pong.packet()
    }

    #[tokio::test]
    async fn test_open_emits_before_packets() {
        let executor = ScriptedExecutor::new(vec![Ok(pong())]);
        let (mut transport, mut rx) = transport(executor);

        transport.open();
        assert!(transport.is_open());

        assert_eq!(next_event(&mut rx).await, TransportEvent::Open);
        assert_eq!(next_event(&mut rx).await, TransportEvent::Packet(pong()));
    }

    #[tokio::test]
    async fn test_timeout_repolls_without_close() {
        let executor = ScriptedExecutor::new(vec![
            Err(HttpError::RequestTimeout),
            Err(HttpError::RequestTimeout),
            Ok(pong()),
        ]);
        let (mut transport, mut rx) = transport(Arc::clone(&executor));

        transport.open();
        assert_eq!(next_event(&mut rx).await, TransportEvent::Open);
        assert_eq!(next_event(&mut rx).await, TransportEvent::Packet(pong()));

        // Fourth GET is parked, still polling
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(*executor.get_count.lock(), 4);
        assert!(transport.is_open());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_network_failure_closes_abnormal() {
        let executor = ScriptedExecutor::new(vec![Err(HttpError::Transport("connection reset".into()))]);
        let (mut transport, mut rx) = transport(Arc::clone(&executor));

        transport.open();
        assert_eq!(next_event(&mut rx).await, TransportEvent::Open);
        assert_eq!(
            next_event(&mut rx).await,
            TransportEvent::Close(Some(JocketError::Closed(CloseCode::Abnormal)))
        );
        assert!(!transport.is_open());

        // No re-poll after a failure
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(*executor.get_count.lock(), 1);
    }

    #[tokio::test]
    async fn test_status_error_closes_abnormal() {
        let executor = ScriptedExecutor::new(vec![Err(HttpError::Status(404))]);
        let (mut transport, mut rx) = transport(executor);

        transport.open();
        assert_eq!(next_event(&mut rx).await, TransportEvent::Open);
        assert_eq!(
            next_event(&mut rx).await,
            TransportEvent::Close(Some(JocketError::Closed(CloseCode::Abnormal)))
        );
    }

    #[tokio::test]
    async fn test_send_packet_posts_json() {
        let executor = ScriptedExecutor::new(Vec::new());
        let (mut transport, _rx) = transport(Arc::clone(&executor));

        transport.send_packet(json!({"data": {"content": "hi"}}).as_object().cloned().unwrap());
        tokio::time::sleep(Duration::from_millis(20)).await;

        let posts = executor.posts.lock().clone();
        assert_eq!(posts, vec![(HttpMethod::Post, json!({"data": {"content": "hi"}}))]);
    }

    #[tokio::test]
    async fn test_close_sends_close_packet_and_stops() {
        let executor = ScriptedExecutor::new(Vec::new());
        let (mut transport, mut rx) = transport(Arc::clone(&executor));

        transport.open();
        assert_eq!(next_event(&mut rx).await, TransportEvent::Open);

        transport.close();
        transport.close();
        assert!(!transport.is_open());

        tokio::time::sleep(Duration::from_millis(20)).await;
        let posts = executor.posts.lock().clone();
        assert_eq!(posts, vec![(HttpMethod::Post, json!({"type": "close"}))]);
        assert!(rx.try_recv().is_err());
    }
}
