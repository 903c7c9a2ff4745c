use crate::codec;
use crate::config::{ClientConfig, ProtocolProfile};
use crate::connection_state::{AtomicConnectionState, AtomicMetrics, ConnectionState};
use crate::endpoints;
use crate::heartbeat::spawn_heartbeat;
use crate::pong_tracker::PongTracker;
use crate::session::Session;
use crate::timer::TaskGuard;
use crate::traits::*;
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn, Instrument};

/// Internal command messages for client control
#[derive(Debug)]
enum Command {
    /// Start a prepare cycle
    Open,
    /// User initiated close
    Close,
    /// Send a packet through the current transport
    Send(Packet),
    /// Stop the actor
    Shutdown,
}

/// Events delivered to the user of the client
#[derive(Debug, Clone, PartialEq)]
pub enum JocketEvent {
    /// Handshake completed, packets can flow
    Open,
    /// The connection ended; `None` means the server closed it
    Close(Option<JocketError>),
    /// Application packet from the server
    Packet(Packet),
}

/// Client metrics snapshot
#[derive(Debug, Clone)]
pub struct Metrics {
    pub packets_sent: u64,
    pub packets_received: u64,
    pub transport_attempts: u64,
    pub reconnect_count: u64,
    pub connection_state: ConnectionState,
}

/// Completions and timer ticks fed back into the actor
#[derive(Debug, Clone)]
enum Internal {
    Prepared {
        cycle: u64,
        result: std::result::Result<Packet, HttpError>,
    },
    HandshakeExpired {
        transport: TransportId,
    },
    HeartbeatTick {
        generation: u64,
    },
    ReconnectDue {
        generation: u64,
    },
}

/// Jocket client handle
///
/// All connection state lives in a single actor task; this handle only sends
/// commands to it and reads the lock-free state and metrics it publishes.
/// Events arrive on an unbounded channel, or on the configured
/// [`EventHandler`] thread.
///
/// ```rust,ignore
/// let client = jocket::builder()
///     .url("http://localhost:8080/jocket/chat/simple")
///     .build()
///     .await?;
///
/// client.open()?;
/// while let Ok(event) = client.recv_event() {
///     println!("{:?}", event);
/// }
/// ```
pub struct Jocket {
    state: Arc<AtomicConnectionState>,
    metrics: Arc<AtomicMetrics>,
    command_tx: mpsc::UnboundedSender<Command>,
    /// `None` when events go to an event handler thread
    event_rx: Option<Receiver<JocketEvent>>,
    task_handle: Option<tokio::task::JoinHandle<()>>,
    handler_handle: Option<std::thread::JoinHandle<()>>,
}

impl Jocket {
    /// Spawn the client actor
    ///
    /// Called by the builder's `build()`; must run inside a tokio runtime.
    pub(crate) fn new(config: ClientConfig, handler: Option<Box<dyn EventHandler>>) -> Self {
        let state = Arc::new(AtomicConnectionState::new(ConnectionState::Idle));
        let metrics = Arc::new(AtomicMetrics::new());

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = unbounded();

        let (event_rx, handler_handle) = match handler {
            Some(handler) => (None, Some(spawn_handler_thread(handler, event_rx))),
            None => (Some(event_rx), None),
        };

        let span = config.span.clone();
        let actor = ClientActor::new(config, Arc::clone(&state), Arc::clone(&metrics), event_tx);
        let task_handle = tokio::spawn(actor.run(command_rx).instrument(span));

        Self {
            state,
            metrics,
            command_tx,
            event_rx,
            task_handle: Some(task_handle),
            handler_handle,
        }
    }

    /// Open the connection
    ///
    /// Ignored while a connection is already being established or open.
    pub fn open(&self) -> Result<()> {
        self.command(Command::Open)
    }

    /// Close the connection
    ///
    /// Emits `Close(Closed(Normal))` when something was open or opening. A
    /// no-op without any event while idle or already closed.
    pub fn close(&self) -> Result<()> {
        self.command(Command::Close)
    }

    /// Send a packet, fire-and-forget
    pub fn send_packet(&self, packet: Packet) {
        let _ = self.command_tx.send(Command::Send(packet));
    }

    /// Check if the handshake has completed
    #[inline]
    pub fn is_open(&self) -> bool {
        self.state.is_open()
    }

    /// Get current connection state
    #[inline]
    pub fn connection_state(&self) -> ConnectionState {
        self.state.get()
    }

    /// Get current metrics
    pub fn metrics(&self) -> Metrics {
        Metrics {
            packets_sent: self.metrics.packets_sent(),
            packets_received: self.metrics.packets_received(),
            transport_attempts: self.metrics.transport_attempts(),
            reconnect_count: self.metrics.reconnect_count(),
            connection_state: self.state.get(),
        }
    }

    /// Try to receive an event (non-blocking)
    pub fn try_recv_event(&self) -> Option<JocketEvent> {
        self.event_rx.as_ref()?.try_recv().ok()
    }

    /// Receive an event (blocking)
    pub fn recv_event(&self) -> Result<JocketEvent> {
        self.events()?
            .recv()
            .map_err(|e| JocketError::ChannelReceive(e.to_string()))
    }

    /// Receive an event, waiting at most `timeout`
    ///
    /// Returns `Ok(None)` when the timeout elapsed.
    pub fn recv_event_timeout(&self, timeout: Duration) -> Result<Option<JocketEvent>> {
        match self.events()?.recv_timeout(timeout) {
            Ok(event) => Ok(Some(event)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(e @ RecvTimeoutError::Disconnected) => {
                Err(JocketError::ChannelReceive(e.to_string()))
            }
        }
    }

    /// Shutdown the client
    ///
    /// Closes any open connection, stops the actor and joins the event
    /// handler thread.
    pub async fn shutdown(mut self) -> Result<()> {
        info!("Shutting down Jocket client");
        let _ = self.command_tx.send(Command::Shutdown);

        if let Some(handle) = self.task_handle.take() {
            let _ = handle.await;
        }

        // The actor dropped its event sender, so the handler thread drains and exits
        if let Some(handle) = self.handler_handle.take() {
            let _ = tokio::task::spawn_blocking(move || handle.join()).await;
        }

        Ok(())
    }

    fn command(&self, command: Command) -> Result<()> {
        self.command_tx
            .send(command)
            .map_err(|e| JocketError::ChannelSend(e.to_string()))
    }

    fn events(&self) -> Result<&Receiver<JocketEvent>> {
        self.event_rx.as_ref().ok_or_else(|| {
            JocketError::ChannelReceive("events are delivered to the event handler".into())
        })
    }
}

impl Drop for Jocket {
    fn drop(&mut self) {
        let _ = self.command_tx.send(Command::Shutdown);
    }
}

fn spawn_handler_thread(
    mut handler: Box<dyn EventHandler>,
    events: Receiver<JocketEvent>,
) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || {
        for event in events.iter() {
            match event {
                JocketEvent::Open => handler.on_open(),
                JocketEvent::Close(error) => handler.on_close(error),
                JocketEvent::Packet(packet) => handler.on_packet(packet),
            }
        }
        debug!("Event channel closed, handler thread exiting");
    })
}

/// The transport currently owned by the actor
struct LiveTransport {
    id: TransportId,
    kind: TransportKind,
    inner: Box<dyn Transport>,
}

/// Single owner of session, cursor, timers and transport
struct ClientActor {
    config: ClientConfig,
    state: Arc<AtomicConnectionState>,
    metrics: Arc<AtomicMetrics>,
    event_tx: Sender<JocketEvent>,

    signal_tx: mpsc::UnboundedSender<TransportSignal>,
    signal_rx: mpsc::UnboundedReceiver<TransportSignal>,
    internal_tx: mpsc::UnboundedSender<Internal>,
    internal_rx: mpsc::UnboundedReceiver<Internal>,

    session: Option<Session>,
    transport: Option<LiveTransport>,

    prepare: Option<TaskGuard>,
    /// Armed from transport construction until the first pong
    handshake: Option<TaskGuard>,
    heartbeat: Option<TaskGuard>,
    reconnect: Option<TaskGuard>,
    pong_tracker: Option<PongTracker>,

    cycle: u64,
    next_transport_id: u64,
    heartbeat_generation: u64,
    reconnect_generation: u64,
    reconnect_attempt: usize,
    /// Current cycle was started by the reconnect timer
    retrying: bool,

    /// Effective timings; a legacy server overrides the configured ones
    heartbeat_interval: Duration,
    handshake_timeout: Duration,
}

impl ClientActor {
    fn new(
        config: ClientConfig,
        state: Arc<AtomicConnectionState>,
        metrics: Arc<AtomicMetrics>,
        event_tx: Sender<JocketEvent>,
    ) -> Self {
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        let (internal_tx, internal_rx) = mpsc::unbounded_channel();
        let heartbeat_interval = config.heartbeat_interval;
        let handshake_timeout = config.handshake_timeout;

        Self {
            config,
            state,
            metrics,
            event_tx,
            signal_tx,
            signal_rx,
            internal_tx,
            internal_rx,
            session: None,
            transport: None,
            prepare: None,
            handshake: None,
            heartbeat: None,
            reconnect: None,
            pong_tracker: None,
            cycle: 0,
            next_transport_id: 0,
            heartbeat_generation: 0,
            reconnect_generation: 0,
            reconnect_attempt: 0,
            retrying: false,
            heartbeat_interval,
            handshake_timeout,
        }
    }

    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        debug!("Client actor started for {}", self.config.base_url);

        loop {
            tokio::select! {
                cmd = commands.recv() => {
                    match cmd {
                        Some(Command::Open) => self.handle_open(),
                        Some(Command::Close) => self.handle_close(),
                        Some(Command::Send(packet)) => self.handle_send(packet),
                        Some(Command::Shutdown) | None => break,
                    }
                }

                Some(signal) = self.signal_rx.recv() => self.handle_signal(signal),

                Some(message) = self.internal_rx.recv() => self.handle_internal(message),
            }
        }

        self.reconnect = None;
        if !self.state.get().is_inactive() {
            self.finish(Some(JocketError::Closed(CloseCode::Normal)));
        }
        info!("Client actor exiting");
    }

    // ---- commands ----

    fn handle_open(&mut self) {
        let phase = self.state.get();
        if !phase.is_inactive() {
            debug!("open() ignored while {:?}", phase);
            return;
        }

        self.reconnect = None;
        self.retrying = false;
        self.reconnect_attempt = 0;
        self.begin_prepare();
    }

    fn handle_close(&mut self) {
        self.reconnect = None;
        self.retrying = false;

        if self.state.get().is_inactive() {
            debug!("close() while not connected, nothing to do");
            return;
        }

        info!("Closing connection");
        self.finish(Some(JocketError::Closed(CloseCode::Normal)));
    }

    fn handle_send(&mut self, packet: Packet) {
        if self.transport.is_none() {
            debug!("No transport, dropping outbound packet");
            return;
        }
        self.transmit(packet);
    }

    // ---- prepare ----

    fn begin_prepare(&mut self) {
        self.cycle += 1;
        self.session = None;
        self.heartbeat_interval = self.config.heartbeat_interval;
        self.handshake_timeout = self.config.handshake_timeout;
        self.state.set(ConnectionState::Preparing);

        let url = endpoints::create_url(&self.config.base_url, self.config.profile);
        let request = match self.config.profile {
            ProtocolProfile::Multi => {
                let names = self
                    .config
                    .transports
                    .iter()
                    .map(|kind| Value::String(kind.name().to_string()))
                    .collect();
                let mut body = Packet::new();
                body.insert("transports".to_string(), Value::Array(names));

                match codec::encode(&body) {
                    Ok(body) => HttpRequest::post(url.clone(), body, self.config.prepare_timeout),
                    Err(e) => {
                        error!("Failed to encode prepare body: {}", e);
                        self.finish(Some(JocketError::Protocol(e.to_string())));
                        return;
                    }
                }
            }
            ProtocolProfile::Legacy => HttpRequest::get(url.clone(), self.config.prepare_timeout),
        };

        info!("Preparing session at {}", url);

        let cycle = self.cycle;
        let executor = Arc::clone(&self.config.executor);
        let headers = Arc::clone(&self.config.headers);
        let tx = self.internal_tx.clone();

        self.prepare = Some(TaskGuard::spawn(async move {
            let request = request.with_headers(headers.get_headers().await);
            let result = executor.execute(request).await;
            let _ = tx.send(Internal::Prepared { cycle, result });
        }));
    }

    fn on_prepared(&mut self, cycle: u64, result: std::result::Result<Packet, HttpError>) {
        if cycle != self.cycle || self.state.get() != ConnectionState::Preparing {
            debug!("Ignoring stale prepare response (cycle {})", cycle);
            return;
        }
        self.prepare = None;

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                warn!("Prepare request failed: {}", e);
                self.lose(JocketError::Network(e));
                return;
            }
        };

        let session = match self.config.profile {
            ProtocolProfile::Multi => Session::from_prepare_response(&response),
            ProtocolProfile::Legacy => Session::from_legacy_response(&response),
        };

        match session {
            Ok(session) => {
                if let Some(timing) = session.timing() {
                    self.heartbeat_interval = timing.ping_interval;
                    self.handshake_timeout = timing.ping_timeout;
                }
                info!(
                    "Session {} prepared, candidates {:?}",
                    session.session_id(),
                    session.candidates()
                );
                self.session = Some(session);
                self.try_next_transport();
            }
            Err(e) => {
                error!("{}", e);
                self.lose(e);
            }
        }
    }

    // ---- transports ----

    fn try_next_transport(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };

        let Some(name) = session.advance().map(str::to_string) else {
            warn!("All transports failed");
            self.lose(JocketError::Closed(CloseCode::ConnectFailed));
            return;
        };
        let session_id = session.session_id().to_string();

        let kind = match name.parse::<TransportKind>() {
            Ok(kind) => kind,
            Err(e) => {
                error!("Server offered an unusable transport: {}", e);
                self.finish(Some(e));
                return;
            }
        };

        let url = match endpoints::transport_url(
            &self.config.base_url,
            kind,
            &session_id,
            self.config.profile,
        ) {
            Ok(url) => url,
            Err(e) => {
                error!("{}", e);
                self.finish(Some(e));
                return;
            }
        };

        self.next_transport_id += 1;
        let id = TransportId(self.next_transport_id);
        let sink = TransportSink::new(id, self.signal_tx.clone());
        let mut inner = self.config.transport_factory.create(kind, url.clone(), sink);
        self.metrics.increment_attempts();

        info!("Connecting {} transport to {}", kind, url);
        self.state.set(ConnectionState::Connecting);
        self.handshake = Some(TaskGuard::after(
            self.handshake_timeout,
            self.internal_tx.clone(),
            Internal::HandshakeExpired { transport: id },
        ));

        inner.open();
        self.transport = Some(LiveTransport { id, kind, inner });
    }

    /// Pre-handshake failure: discard the transport and fall back
    fn fail_attempt(&mut self) {
        self.handshake = None;
        self.drop_transport();
        self.try_next_transport();
    }

    fn drop_transport(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            debug!("Tearing down {} transport {:?}", transport.kind, transport.id);
            transport.inner.close();
        }
    }

    fn transmit(&mut self, packet: Packet) {
        if let Some(transport) = self.transport.as_mut() {
            transport.inner.send_packet(packet);
            self.metrics.increment_sent();
        }
    }

    fn handle_signal(&mut self, signal: TransportSignal) {
        let current = self.transport.as_ref().map(|t| t.id);
        if current != Some(signal.id) {
            debug!("Ignoring event from discarded transport {:?}", signal.id);
            return;
        }

        match signal.event {
            TransportEvent::Open => self.on_transport_open(),
            TransportEvent::Close(error) => self.on_transport_close(error),
            TransportEvent::Packet(packet) => {
                self.metrics.increment_received();
                self.on_packet(packet);
            }
        }
    }

    fn on_transport_open(&mut self) {
        if self.handshake.is_none() {
            debug!("Transport reported open outside the handshake");
            return;
        }

        debug!("Transport open, sending handshake ping");
        self.state.set(ConnectionState::AwaitingPong);
        self.transmit(ControlType::Ping.packet());
    }

    fn on_transport_close(&mut self, error: Option<JocketError>) {
        if self.handshake.is_some() {
            if let Some(transport) = &self.transport {
                warn!(
                    "{} transport closed before handshake: {:?}",
                    transport.kind, error
                );
            }
            self.fail_attempt();
            return;
        }

        match error {
            Some(error) => {
                warn!("Connection lost: {}", error);
                self.lose(error);
            }
            None => {
                info!("Transport closed cleanly");
                self.finish(None);
            }
        }
    }

    fn on_packet(&mut self, packet: Packet) {
        match control_type(&packet) {
            Some(ControlType::Pong) => self.on_pong(),
            Some(ControlType::Close) => {
                info!("Server closed the session");
                self.finish(None);
            }
            Some(ControlType::Ping) if self.config.profile.answers_server_ping() => {
                debug!("Answering server ping");
                self.transmit(ControlType::Pong.packet());
            }
            _ => self.emit(JocketEvent::Packet(packet)),
        }
    }

    fn on_pong(&mut self) {
        if let Some(tracker) = self.pong_tracker.as_mut() {
            tracker.record_pong_received();
        }

        if self.handshake.take().is_none() {
            debug!("Keepalive pong");
            return;
        }

        if self.config.send_open_ack {
            self.transmit(ControlType::Open.packet());
        }

        self.start_heartbeat();
        self.state.set(ConnectionState::Open);
        self.retrying = false;
        self.reconnect_attempt = 0;
        self.config.reconnect_strategy.reset();

        if let Some(transport) = &self.transport {
            info!("Connection open via {}", transport.kind);
        }
        self.emit(JocketEvent::Open);
    }

    // ---- timers ----

    fn handle_internal(&mut self, message: Internal) {
        match message {
            Internal::Prepared { cycle, result } => self.on_prepared(cycle, result),
            Internal::HandshakeExpired { transport } => self.on_handshake_expired(transport),
            Internal::HeartbeatTick { generation } => self.on_heartbeat(generation),
            Internal::ReconnectDue { generation } => self.on_reconnect_due(generation),
        }
    }

    fn on_handshake_expired(&mut self, transport: TransportId) {
        let current = self.transport.as_ref().map(|t| t.id);
        if self.handshake.is_none() || current != Some(transport) {
            return;
        }

        warn!(
            "{}",
            JocketError::HandshakeTimeout(self.handshake_timeout)
        );
        self.fail_attempt();
    }

    fn start_heartbeat(&mut self) {
        self.heartbeat_generation += 1;
        self.pong_tracker = self.config.pong_timeout.map(PongTracker::new);
        self.heartbeat = Some(spawn_heartbeat(
            self.heartbeat_interval,
            Internal::HeartbeatTick {
                generation: self.heartbeat_generation,
            },
            self.internal_tx.clone(),
        ));
    }

    fn on_heartbeat(&mut self, generation: u64) {
        if generation != self.heartbeat_generation || self.heartbeat.is_none() {
            return;
        }

        if let Some(tracker) = &self.pong_tracker {
            if !tracker.is_healthy() {
                warn!(
                    "No pong within {:?}, last pong {:?} ago",
                    tracker.timeout(),
                    tracker.time_since_last_pong()
                );
                self.lose(JocketError::Closed(CloseCode::PingTimeout));
                return;
            }
        }

        debug!("Heartbeat ping");
        self.transmit(ControlType::Ping.packet());
        if let Some(tracker) = self.pong_tracker.as_mut() {
            tracker.record_ping_sent();
        }
    }

    fn schedule_reconnect(&mut self) {
        if !self.config.auto_reconnect {
            return;
        }

        let attempt = self.reconnect_attempt;
        let strategy = &self.config.reconnect_strategy;
        let delay = match strategy.next_delay(attempt) {
            Some(delay) if strategy.should_reconnect(attempt) => delay,
            _ => {
                warn!("Reconnection strategy exhausted, stopping");
                return;
            }
        };

        self.reconnect_attempt += 1;
        self.reconnect_generation += 1;
        info!("Reconnecting in {:?} (attempt {})", delay, attempt + 1);

        self.reconnect = Some(TaskGuard::after(
            delay,
            self.internal_tx.clone(),
            Internal::ReconnectDue {
                generation: self.reconnect_generation,
            },
        ));
    }

    fn on_reconnect_due(&mut self, generation: u64) {
        if generation != self.reconnect_generation || self.reconnect.take().is_none() {
            return;
        }
        if !self.state.get().is_inactive() {
            return;
        }

        self.metrics.increment_reconnects();
        self.retrying = true;
        self.begin_prepare();
    }

    // ---- termination ----

    /// Terminal failure that may be retried by the reconnection strategy
    fn lose(&mut self, error: JocketError) {
        let retry = self.retrying || self.state.get() == ConnectionState::Open;
        self.finish(Some(error));
        if retry {
            self.schedule_reconnect();
        }
    }

    /// Tear everything down and emit the single terminal `Close`
    fn finish(&mut self, reason: Option<JocketError>) {
        self.prepare = None;
        self.handshake = None;
        self.heartbeat = None;
        self.pong_tracker = None;
        self.drop_transport();
        self.session = None;
        self.state.set(ConnectionState::Closed);

        match &reason {
            Some(e) => info!("Connection closed: {}", e),
            None => info!("Connection closed by server"),
        }
        self.emit(JocketEvent::Close(reason));
    }

    fn emit(&self, event: JocketEvent) {
        if self.event_tx.send(event).is_err() {
            debug!("Event receiver dropped");
        }
    }
}
