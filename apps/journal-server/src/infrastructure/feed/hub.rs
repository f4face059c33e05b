//! Market Data Hub
//!
//! One shared WebSocket connection to the upstream price feed, fanned out to
//! every listener registered for a symbol. Consumers attach and detach
//! through [`MarketDataPort`] and never observe the connection lifecycle:
//! transport failures are retried forever at a fixed delay, and the desired
//! subscription set is replayed to the feed on every successful connect.
//!
//! All registry and connection state lives behind one mutex. Public methods
//! lock, mutate, and return without awaiting; outbound control messages
//! travel over a channel to the writer half of the socket.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;

use crate::application::ports::MarketDataPort;
use crate::domain::market::{ConnectionState, Tick, TickListener};
use crate::domain::subscription::{Detach, SubscriptionRegistry};
use crate::infrastructure::config::ApiToken;
use crate::infrastructure::feed::codec::{CodecError, JsonCodec};
use crate::infrastructure::feed::messages::{ControlRequest, FeedMessage};
use crate::infrastructure::metrics::{
    record_control_sent, record_feed_message, record_malformed_payload, record_reconnect,
    record_tick_dropped, record_ticks_delivered, set_feed_connected, set_subscribed_symbols,
};

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for the market data hub.
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// WebSocket URL of the feed, without the token query parameter.
    pub stream_url: String,

    /// API token appended to the connection URL.
    pub api_token: ApiToken,

    /// Fixed delay between a transport failure and the next connection
    /// attempt. No backoff is applied.
    pub reconnect_delay: Duration,
}

impl HubConfig {
    /// Full connection URL with the token attached. Never logged.
    fn connect_url(&self) -> String {
        format!("{}?token={}", self.stream_url, self.api_token.expose())
    }
}

// =============================================================================
// Snapshot
// =============================================================================

/// Point-in-time view of the feed client, for health reporting.
#[derive(Debug, Clone)]
pub struct FeedSnapshot {
    /// Connection lifecycle state.
    pub connection: ConnectionState,
    /// When the current or most recent connection opened.
    pub last_connected_at: Option<DateTime<Utc>>,
    /// Symbols with a registry entry.
    pub subscribed_symbols: usize,
    /// Text frames received from the feed.
    pub messages_received: u64,
    /// Reconnect attempts scheduled after transport failures.
    pub reconnects: u64,
    /// Listener invocations across all delivered ticks.
    pub ticks_delivered: u64,
    /// Ticks dropped because their symbol had no registry entry.
    pub ticks_dropped: u64,
}

// =============================================================================
// Hub
// =============================================================================

/// Registry and connection state, guarded by one lock so no listener change
/// can interleave with a dispatch turn or a connection flip.
#[derive(Default)]
struct HubState {
    connection: ConnectionState,
    registry: SubscriptionRegistry,
    upstream: Option<mpsc::UnboundedSender<ControlRequest>>,
    reconnect_pending: bool,
    last_connected_at: Option<DateTime<Utc>>,
}

/// Shared client for the upstream price feed.
///
/// One instance serves the whole process, constructed explicitly and handed
/// to consumers as an `Arc`.
pub struct MarketDataHub {
    config: HubConfig,
    codec: JsonCodec,
    cancel: CancellationToken,
    state: Mutex<HubState>,
    connect_attempts: AtomicU64,
    messages_received: AtomicU64,
    reconnects: AtomicU64,
    ticks_delivered: AtomicU64,
    ticks_dropped: AtomicU64,
    malformed_payloads: AtomicU64,
}

impl MarketDataHub {
    /// Create a hub. No connection is made until [`connect`](Self::connect).
    #[must_use]
    pub fn new(config: HubConfig, cancel: CancellationToken) -> Self {
        Self {
            config,
            codec: JsonCodec::new(),
            cancel,
            state: Mutex::new(HubState::default()),
            connect_attempts: AtomicU64::new(0),
            messages_received: AtomicU64::new(0),
            reconnects: AtomicU64::new(0),
            ticks_delivered: AtomicU64::new(0),
            ticks_dropped: AtomicU64::new(0),
            malformed_payloads: AtomicU64::new(0),
        }
    }

    /// Start the upstream connection.
    ///
    /// Idempotent: if a connection is open or an attempt is in flight this
    /// is a no-op. Returns without waiting for the handshake; on success the
    /// hub re-subscribes every symbol currently in the registry.
    pub fn connect(self: Arc<Self>) {
        {
            let mut state = self.state.lock();
            if state.connection != ConnectionState::Disconnected {
                tracing::debug!(
                    state = state.connection.as_str(),
                    "connect ignored, connection already active"
                );
                return;
            }
            state.connection = ConnectionState::Connecting;
        }
        self.connect_attempts.fetch_add(1, Ordering::Relaxed);
        tokio::spawn(self.run_connection());
    }

    /// Register upstream interest in a symbol.
    ///
    /// Creates an empty registry entry if the symbol has none, and sends a
    /// subscribe request when connected. While disconnected the send is
    /// skipped; the next successful connect replays it.
    pub fn subscribe(&self, symbol: &str) {
        let mut state = self.state.lock();
        state.registry.ensure(symbol);
        self.send_control(&mut state, ControlRequest::subscribe(symbol));
        set_subscribed_symbols(state.registry.symbol_count());
    }

    /// Drop upstream interest in a symbol.
    ///
    /// Sends an unsubscribe request when connected, then removes the
    /// symbol's registry entry entirely. Listeners still attached are
    /// discarded with it and never hear another tick.
    pub fn unsubscribe(&self, symbol: &str) {
        let mut state = self.state.lock();
        self.send_control(&mut state, ControlRequest::unsubscribe(symbol));
        if state.registry.remove(symbol) {
            tracing::debug!(symbol = %symbol, "symbol interest dropped");
        }
        set_subscribed_symbols(state.registry.symbol_count());
    }

    /// Register a listener for a symbol's ticks.
    ///
    /// The first listener on a symbol triggers an upstream subscribe. The
    /// same handle attaches at most once per symbol.
    pub fn add_listener(&self, symbol: &str, listener: &TickListener) {
        let mut state = self.state.lock();
        let created = state.registry.attach(symbol, listener);
        if created {
            tracing::debug!(symbol = %symbol, "first listener attached, subscribing");
            self.send_control(&mut state, ControlRequest::subscribe(symbol));
        }
        set_subscribed_symbols(state.registry.symbol_count());
    }

    /// Remove a previously registered listener by handle identity.
    ///
    /// Removing a handle that was never attached is a silent no-op. When the
    /// last listener leaves a symbol, its upstream subscription is dropped.
    pub fn remove_listener(&self, symbol: &str, listener: &TickListener) {
        let mut state = self.state.lock();
        match state.registry.detach(symbol, listener) {
            Detach::Empty => {
                tracing::debug!(symbol = %symbol, "last listener removed, unsubscribing");
                self.send_control(&mut state, ControlRequest::unsubscribe(symbol));
            }
            Detach::Remaining(_) | Detach::NotFound => {}
        }
        set_subscribed_symbols(state.registry.symbol_count());
    }

    /// Current feed state for health reporting.
    #[must_use]
    pub fn snapshot(&self) -> FeedSnapshot {
        let state = self.state.lock();
        FeedSnapshot {
            connection: state.connection,
            last_connected_at: state.last_connected_at,
            subscribed_symbols: state.registry.symbol_count(),
            messages_received: self.messages_received.load(Ordering::Relaxed),
            reconnects: self.reconnects.load(Ordering::Relaxed),
            ticks_delivered: self.ticks_delivered.load(Ordering::Relaxed),
            ticks_dropped: self.ticks_dropped.load(Ordering::Relaxed),
        }
    }

    /// Queue a control message for the writer task, or skip it silently
    /// while the connection is not open.
    fn send_control(&self, state: &mut HubState, request: ControlRequest) {
        if !state.connection.is_open() {
            tracing::debug!(
                symbol = %request.symbol,
                action = request.action.as_str(),
                "not connected, control message skipped"
            );
            return;
        }
        if let Some(upstream) = &state.upstream {
            if upstream.send(request).is_err() {
                tracing::debug!("feed writer gone, control message skipped");
            }
        }
    }

    /// Deliver a tick to every listener registered for its symbol.
    ///
    /// The listener set is snapshotted under the lock and invoked outside
    /// it, so a listener may re-enter the hub. A panicking listener is
    /// contained and does not stop delivery to the rest.
    fn dispatch(&self, tick: &Tick) {
        let listeners = {
            let state = self.state.lock();
            state.registry.listeners(&tick.symbol)
        };

        let Some(listeners) = listeners else {
            self.ticks_dropped.fetch_add(1, Ordering::Relaxed);
            record_tick_dropped();
            tracing::trace!(symbol = %tick.symbol, "tick without listeners dropped");
            return;
        };

        for listener in &listeners {
            if panic::catch_unwind(AssertUnwindSafe(|| listener.invoke(tick))).is_err() {
                tracing::warn!(symbol = %tick.symbol, "tick listener panicked");
            }
        }
        self.ticks_delivered
            .fetch_add(listeners.len() as u64, Ordering::Relaxed);
        record_ticks_delivered(listeners.len() as u64);
    }

    /// Decode one inbound text frame and act on it.
    ///
    /// Only trade payloads are consumed, and only the first record of a
    /// payload. Unknown message types and malformed payloads are discarded.
    fn handle_frame(&self, text: &str) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
        record_feed_message();

        match self.codec.decode(text) {
            Ok(FeedMessage::Trade(payload)) => {
                if let Some(tick) = payload.first_tick() {
                    self.dispatch(&tick);
                }
            }
            Ok(FeedMessage::Ping) => {}
            Err(CodecError::UnknownMessageType(message_type)) => {
                tracing::trace!(message_type = %message_type, "ignoring feed message");
            }
            Err(error) => {
                self.malformed_payloads.fetch_add(1, Ordering::Relaxed);
                record_malformed_payload();
                tracing::debug!(error = %error, "discarding malformed feed payload");
            }
        }
    }

    /// One connection attempt: dial, run until the transport drops, then
    /// hand off to the reconnect path.
    async fn run_connection(self: Arc<Self>) {
        tracing::info!(url = %self.config.stream_url, "connecting to feed");

        match tokio_tungstenite::connect_async(self.config.connect_url()).await {
            Ok((ws_stream, _response)) => self.drive(ws_stream).await,
            Err(error) => {
                tracing::warn!(error = %error, "feed connection failed");
            }
        }

        self.finish();
    }

    /// Run an established socket until close, error, or cancellation.
    async fn drive(&self, ws_stream: WebSocketStream<MaybeTlsStream<TcpStream>>) {
        let (mut write, mut read) = ws_stream.split();
        let (tx, mut rx) = mpsc::unbounded_channel::<ControlRequest>();

        // Flip to Open and snapshot the desired symbols under one lock, so
        // listener changes racing the flip either land in the snapshot or
        // queue an upstream send, never both.
        let symbols = {
            let mut state = self.state.lock();
            state.connection = ConnectionState::Open;
            state.upstream = Some(tx);
            state.last_connected_at = Some(Utc::now());
            state.registry.symbols()
        };
        tracing::info!(symbols = symbols.len(), "feed connected");
        set_feed_connected(true);

        // The feed forgets subscriptions across connections; replay them.
        for symbol in symbols {
            let request = ControlRequest::subscribe(symbol);
            match self.codec.encode(&request) {
                Ok(json) => {
                    if let Err(error) = write.send(Message::Text(json.into())).await {
                        tracing::warn!(error = %error, "resubscribe failed");
                        return;
                    }
                    record_control_sent(request.action);
                }
                Err(error) => tracing::warn!(error = %error, "control message encode failed"),
            }
        }

        loop {
            tokio::select! {
                () = self.cancel.cancelled() => {
                    let _ = write.send(Message::Close(None)).await;
                    return;
                }
                request = rx.recv() => {
                    let Some(request) = request else { return };
                    match self.codec.encode(&request) {
                        Ok(json) => {
                            if let Err(error) = write.send(Message::Text(json.into())).await {
                                tracing::warn!(error = %error, "feed send failed");
                                return;
                            }
                            record_control_sent(request.action);
                        }
                        Err(error) => {
                            tracing::warn!(error = %error, "control message encode failed");
                        }
                    }
                }
                frame = read.next() => {
                    match frame {
                        Some(Ok(Message::Text(text))) => self.handle_frame(&text),
                        Some(Ok(Message::Ping(data))) => {
                            if write.send(Message::Pong(data)).await.is_err() {
                                return;
                            }
                        }
                        Some(Ok(Message::Close(_))) => {
                            tracing::info!("feed sent close frame");
                            return;
                        }
                        Some(Ok(_)) => {}
                        Some(Err(error)) => {
                            tracing::warn!(error = %error, "feed socket error");
                            return;
                        }
                        None => {
                            tracing::info!("feed stream ended");
                            return;
                        }
                    }
                }
            }
        }
    }

    /// Tear down connection state and schedule the next attempt unless the
    /// hub was cancelled.
    fn finish(self: Arc<Self>) {
        {
            let mut state = self.state.lock();
            state.connection = ConnectionState::Disconnected;
            state.upstream = None;
        }
        set_feed_connected(false);

        if self.cancel.is_cancelled() {
            tracing::info!("feed client stopped");
            return;
        }
        self.schedule_reconnect();
    }

    /// Arm the single reconnect timer.
    ///
    /// A second failure observing an armed timer changes nothing: exactly
    /// one attempt follows per disconnection, after the fixed delay.
    fn schedule_reconnect(self: Arc<Self>) {
        {
            let mut state = self.state.lock();
            if state.reconnect_pending {
                tracing::debug!("reconnect already pending");
                return;
            }
            state.reconnect_pending = true;
        }
        let delay = self.config.reconnect_delay;
        self.reconnects.fetch_add(1, Ordering::Relaxed);
        record_reconnect();
        tracing::warn!(delay_ms = delay.as_millis(), "feed disconnected, reconnect scheduled");

        tokio::spawn(async move {
            tokio::select! {
                () = self.cancel.cancelled() => {
                    self.state.lock().reconnect_pending = false;
                }
                () = tokio::time::sleep(delay) => {
                    self.state.lock().reconnect_pending = false;
                    self.connect();
                }
            }
        });
    }
}

impl MarketDataPort for MarketDataHub {
    fn add_listener(&self, symbol: &str, listener: &TickListener) {
        Self::add_listener(self, symbol, listener);
    }

    fn remove_listener(&self, symbol: &str, listener: &TickListener) {
        Self::remove_listener(self, symbol, listener);
    }
}
