//! Alarm Channel
//!
//! WebSocket client for push-delivered alarms.
//!
//! ```text
//! Idle ──connect──▶ Connecting ──open──▶ Open ──close──▶ Backoff ──timer──▶ Connecting
//!                        │                                  │
//!                        └──────────failure────────────────▶│
//!                                                           └─attempts exhausted─▶ GaveUp
//! ```
//!
//! Each connect cycle runs in one spawned task that owns the socket, the
//! heartbeat interval and the backoff timer. `disconnect` cancels the task's
//! token; a generation counter keeps a superseded task from touching state.

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval_at, Instant};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;

use super::listeners::{ListenerRegistry, Subscription};
use super::messages::{decode_frame, ChannelEvent, ClientMessage, EventKind};
use crate::config::RealtimeConfig;
use crate::session::SessionScoped;

/// Close reason sent on an explicit disconnect
pub const MANUAL_DISCONNECT_REASON: &str = "Manual disconnect";

type Socket = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// Connection and retry settings
#[derive(Debug, Clone)]
pub struct ChannelOptions {
    pub url: String,
    /// Base delay; attempt `k` waits `base * 2^(k-1)`
    pub reconnect_interval: Duration,
    pub max_reconnect_attempts: u32,
    pub heartbeat_interval: Duration,
}

impl ChannelOptions {
    /// Options from configuration, resolving the URL against the API base
    pub fn from_config(config: &RealtimeConfig, api_base_url: &str) -> Self {
        Self {
            url: config.alarm_url(api_base_url),
            reconnect_interval: Duration::from_millis(config.reconnect_interval_ms),
            max_reconnect_attempts: config.max_reconnect_attempts,
            heartbeat_interval: Duration::from_millis(config.heartbeat_interval_ms),
        }
    }
}

/// Delay before reconnect attempt `attempt` (1-based)
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    match 1u32.checked_shl(attempt.saturating_sub(1)) {
        Some(factor) => base.saturating_mul(factor),
        None => Duration::MAX,
    }
}

/// Snapshot of the connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelStatus {
    pub connected: bool,
    pub connecting: bool,
    pub reconnect_attempts: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Connecting,
    Open,
    Backoff,
    GaveUp,
}

struct ChannelState {
    phase: Phase,
    attempts: u32,
    generation: u64,
    cancel: Option<CancellationToken>,
}

enum Retry {
    After { attempt: u32, delay: Duration },
    GaveUp { attempts: u32 },
    Superseded,
}

enum SessionEnd {
    Closed { code: Option<u16>, reason: String },
    Cancelled,
}

/// Cloneable handle to the alarm channel
#[derive(Clone)]
pub struct AlarmChannel {
    inner: Arc<ChannelInner>,
}

struct ChannelInner {
    options: ChannelOptions,
    listeners: ListenerRegistry,
    state: Mutex<ChannelState>,
}

impl AlarmChannel {
    pub fn new(options: ChannelOptions) -> Self {
        Self {
            inner: Arc::new(ChannelInner {
                options,
                listeners: ListenerRegistry::new(),
                state: Mutex::new(ChannelState {
                    phase: Phase::Idle,
                    attempts: 0,
                    generation: 0,
                    cancel: None,
                }),
            }),
        }
    }

    pub fn url(&self) -> &str {
        &self.inner.options.url
    }

    /// Start connecting; no-op while connecting or connected.
    ///
    /// A pending reconnect or a previous give-up is replaced by a fresh cycle
    /// with the attempt counter reset. Must be called within a Tokio runtime.
    pub fn connect(&self) {
        let (generation, token) = {
            let mut state = self.inner.state.lock();
            if matches!(state.phase, Phase::Connecting | Phase::Open) {
                tracing::debug!(phase = ?state.phase, "Alarm channel already active");
                return;
            }

            if let Some(previous) = state.cancel.take() {
                previous.cancel();
            }

            let token = CancellationToken::new();
            state.generation += 1;
            state.attempts = 0;
            state.phase = Phase::Connecting;
            state.cancel = Some(token.clone());
            (state.generation, token)
        };

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move { inner.run(generation, token).await });
    }

    /// Close the socket (1000, "Manual disconnect") and cancel any pending
    /// reconnect
    pub fn disconnect(&self) {
        let token = {
            let mut state = self.inner.state.lock();
            state.generation += 1;
            state.phase = Phase::Idle;
            state.attempts = 0;
            state.cancel.take()
        };

        if let Some(token) = token {
            tracing::info!(url = %self.inner.options.url, "Disconnecting alarm channel");
            token.cancel();
        }
    }

    pub fn is_connected(&self) -> bool {
        self.inner.state.lock().phase == Phase::Open
    }

    pub fn status(&self) -> ChannelStatus {
        let state = self.inner.state.lock();
        ChannelStatus {
            connected: state.phase == Phase::Open,
            connecting: state.phase == Phase::Connecting,
            reconnect_attempts: state.attempts,
        }
    }

    pub fn subscribe<F>(&self, kind: EventKind, listener: F) -> Subscription
    where
        F: Fn(&ChannelEvent) + Send + Sync + 'static,
    {
        self.inner.listeners.subscribe(kind, listener)
    }

    pub fn unsubscribe(&self, subscription: Subscription) -> bool {
        self.inner.listeners.unsubscribe(subscription)
    }

    pub fn unsubscribe_all(&self, kind: EventKind) {
        self.inner.listeners.unsubscribe_all(kind)
    }
}

impl SessionScoped for AlarmChannel {
    fn reset(&self) {
        self.disconnect();
    }
}

impl ChannelInner {
    async fn run(self: Arc<Self>, generation: u64, cancel: CancellationToken) {
        loop {
            tracing::info!(url = %self.options.url, "Connecting to alarm channel");

            let connected = tokio::select! {
                _ = cancel.cancelled() => return,
                result = connect_async(self.options.url.as_str()) => result,
            };

            match connected {
                Ok((socket, _)) => {
                    if !self.transition(generation, Phase::Open) {
                        return;
                    }
                    tracing::info!(url = %self.options.url, "Alarm channel connected");
                    self.emit(ChannelEvent::Connected);

                    match self.pump(socket, &cancel).await {
                        SessionEnd::Cancelled => {
                            self.emit(ChannelEvent::Disconnected {
                                code: Some(u16::from(CloseCode::Normal)),
                                reason: MANUAL_DISCONNECT_REASON.to_string(),
                            });
                            return;
                        }
                        SessionEnd::Closed { code, reason } => {
                            tracing::info!(code = ?code, reason = %reason, "Alarm channel closed");
                            self.emit(ChannelEvent::Disconnected { code, reason });
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(url = %self.options.url, error = %e, "Alarm channel connection failed");
                    self.emit(ChannelEvent::Error {
                        message: e.to_string(),
                    });
                }
            }

            let delay = match self.schedule_retry(generation) {
                Retry::After { attempt, delay } => {
                    tracing::info!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "Scheduling alarm channel reconnect"
                    );
                    delay
                }
                Retry::GaveUp { attempts } => {
                    tracing::warn!(
                        attempts,
                        "Max reconnect attempts reached, alarm channel disabled until manual reconnect"
                    );
                    self.emit(ChannelEvent::GaveUp { attempts });
                    return;
                }
                Retry::Superseded => return,
            };

            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep(delay) => {}
            }

            if !self.transition(generation, Phase::Connecting) {
                return;
            }
        }
    }

    /// Drive one open socket until it closes or the cycle is cancelled
    async fn pump(&self, socket: Socket, cancel: &CancellationToken) -> SessionEnd {
        let (mut sink, mut source) = socket.split();
        let period = self.options.heartbeat_interval;
        let mut heartbeat = interval_at(Instant::now() + period, period);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    let frame = CloseFrame {
                        code: CloseCode::Normal,
                        reason: MANUAL_DISCONNECT_REASON.into(),
                    };
                    if let Err(e) = sink.send(Message::Close(Some(frame))).await {
                        tracing::debug!(error = %e, "Failed to send close frame");
                    }
                    return SessionEnd::Cancelled;
                }
                _ = heartbeat.tick() => {
                    match ClientMessage::Ping.to_text() {
                        Ok(text) => {
                            if let Err(e) = sink.send(Message::text(text)).await {
                                tracing::error!(error = %e, "Failed to send heartbeat");
                            }
                        }
                        Err(e) => tracing::error!(error = %e, "Failed to encode heartbeat"),
                    }
                }
                frame = source.next() => match frame {
                    Some(Ok(Message::Text(text))) => self.handle_text(text.as_str()),
                    Some(Ok(Message::Close(frame))) => {
                        let (code, reason) = match frame {
                            Some(frame) => (Some(u16::from(frame.code)), frame.reason.as_str().to_string()),
                            None => (None, String::new()),
                        };
                        return SessionEnd::Closed { code, reason };
                    }
                    Some(Ok(Message::Binary(data))) => {
                        tracing::debug!(bytes = data.len(), "Ignoring binary alarm frame");
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::warn!(error = %e, "Alarm channel read failed");
                        self.emit(ChannelEvent::Error { message: e.to_string() });
                        return SessionEnd::Closed { code: None, reason: e.to_string() };
                    }
                    None => {
                        return SessionEnd::Closed {
                            code: None,
                            reason: "connection closed".to_string(),
                        };
                    }
                },
            }
        }
    }

    fn handle_text(&self, text: &str) {
        match decode_frame(text) {
            Ok(events) => {
                tracing::debug!(events = events.len(), "Alarm message received");
                for event in events {
                    self.emit(event);
                }
            }
            Err(e) => tracing::error!(error = %e, "Failed to parse alarm message"),
        }
    }

    fn emit(&self, event: ChannelEvent) {
        self.listeners.emit(&event);
    }

    /// Move to `phase` if `generation` is still current
    fn transition(&self, generation: u64, phase: Phase) -> bool {
        let mut state = self.state.lock();
        if state.generation != generation {
            return false;
        }
        state.phase = phase;
        if phase == Phase::Open {
            state.attempts = 0;
        }
        true
    }

    fn schedule_retry(&self, generation: u64) -> Retry {
        let mut state = self.state.lock();
        if state.generation != generation {
            return Retry::Superseded;
        }

        if state.attempts >= self.options.max_reconnect_attempts {
            state.phase = Phase::GaveUp;
            state.cancel = None;
            return Retry::GaveUp {
                attempts: state.attempts,
            };
        }

        state.attempts += 1;
        state.phase = Phase::Backoff;
        Retry::After {
            attempt: state.attempts,
            delay: backoff_delay(self.options.reconnect_interval, state.attempts),
        }
    }
}
