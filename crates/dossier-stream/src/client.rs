//! The event-stream client.
//!
//! [`EventStreamClient`] is a cheap `Clone` handle. State lives behind a
//! `parking_lot::Mutex`; public operations only mutate that state or spawn
//! tasks, so none of them block on I/O.
//!
//! Each connection attempt gets a generation number. Tasks spawned for an
//! older generation (a torn-down connection, or anything started before
//! [`EventStreamClient::disconnect`]) find a newer generation in the state
//! and stay silent. At most one reconnect timer is pending; timers carry an
//! id so a timer that lost a race with a newer one does nothing.
//!
//! Listeners are invoked outside the state lock, so they may call back into
//! the client. A panicking listener is logged and skipped.

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Weak};

use dossier_core::{
    AuthToken, InboundFrame, OutboundFrame, ReadyState, ReconnectPolicy, SessionId,
};
use dossier_settings::{DEFAULT_API_BASE_URL, StreamSettings};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::endpoint::{endpoint_url, redact_token};
use crate::errors::StreamError;
use crate::events::{ABNORMAL_CLOSURE, StreamEvent, names};
use crate::registry::{Listener, ListenerRegistry};
use crate::transport::{Connector, Outgoing, TransportEvent, WsConnector};

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Client configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
    /// HTTP(S) or WS(S) base address; `/ws/{session}` is appended.
    pub base_url: String,
    /// Reconnect ceiling and base delay.
    pub reconnect: ReconnectPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            reconnect: ReconnectPolicy::default(),
        }
    }
}

impl From<&StreamSettings> for ClientConfig {
    fn from(settings: &StreamSettings) -> Self {
        Self {
            base_url: settings.api_base_url.clone(),
            reconnect: settings.reconnect_policy(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Internal state
// ─────────────────────────────────────────────────────────────────────────────

struct Inner {
    config: ClientConfig,
    connector: Arc<dyn Connector>,
    state: Mutex<State>,
    listeners: Mutex<ListenerRegistry>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        if let Some(timer) = state.reconnect.timer.take() {
            timer.handle.abort();
        }
        if let Some(connection) = state.connection.take() {
            connection.shutdown();
        }
    }
}

#[derive(Default)]
struct State {
    /// Stored by `connect` for reconnects; cleared by `disconnect`.
    target: Option<(SessionId, AuthToken)>,
    connection: Option<LiveConnection>,
    reconnect: ReconnectState,
    generation: u64,
}

struct LiveConnection {
    generation: u64,
    ready: ReadyState,
    /// Present once the transport reported open.
    outbound: Option<mpsc::UnboundedSender<Outgoing>>,
    driver: JoinHandle<()>,
}

impl LiveConnection {
    fn shutdown(self) {
        if let Some(tx) = self.outbound {
            let _ = tx.send(Outgoing::Close);
        }
        self.driver.abort();
    }
}

#[derive(Default)]
struct ReconnectState {
    attempts: u32,
    timer: Option<PendingTimer>,
    next_timer_id: u64,
}

struct PendingTimer {
    id: u64,
    handle: JoinHandle<()>,
}

enum CloseOutcome {
    Scheduled { attempt: u32, delay_ms: u64 },
    Exhausted { attempts: u32 },
    Idle,
}

// ─────────────────────────────────────────────────────────────────────────────
// EventStreamClient
// ─────────────────────────────────────────────────────────────────────────────

/// Reconnecting client for one customer event channel.
#[derive(Clone)]
pub struct EventStreamClient {
    inner: Arc<Inner>,
}

impl EventStreamClient {
    /// Create a client that dials real WebSockets.
    #[must_use]
    pub fn new(config: ClientConfig) -> Self {
        Self::with_connector(config, Arc::new(WsConnector))
    }

    /// Create a client with a custom transport.
    #[must_use]
    pub fn with_connector(config: ClientConfig, connector: Arc<dyn Connector>) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                connector,
                state: Mutex::new(State::default()),
                listeners: Mutex::new(ListenerRegistry::new()),
            }),
        }
    }

    fn upgrade(weak: &Weak<Inner>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }

    /// Client configuration.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    // ─── Public contract ────────────────────────────────────────────────

    /// Connect to the channel for `session_id`.
    ///
    /// No-op while a connection is open or being established. Otherwise the
    /// target is remembered for reconnects and a connection is opened in the
    /// background. Failures arrive as `error`/`disconnected` events.
    pub fn connect(&self, session_id: SessionId, token: AuthToken) {
        let mut state = self.inner.state.lock();
        if let Some(conn) = &state.connection {
            if conn.ready.is_active() {
                debug!(session_id = %session_id, ready = %conn.ready, "event stream already connected");
                return;
            }
        }
        state.target = Some((session_id, token));
        self.open_locked(&mut state);
    }

    /// Tear everything down: pending timer, live connection, stored target,
    /// attempt counter, and every listener. Safe to call repeatedly.
    pub fn disconnect(&self) {
        let (connection, timer, had_target) = {
            let mut state = self.inner.state.lock();
            state.generation += 1;
            state.reconnect.attempts = 0;
            (
                state.connection.take(),
                state.reconnect.timer.take(),
                state.target.take().is_some(),
            )
        };
        if let Some(timer) = timer {
            timer.handle.abort();
        }
        if let Some(connection) = connection {
            connection.shutdown();
        }
        self.inner.listeners.lock().clear();
        if had_target {
            info!("event stream disconnected");
        }
    }

    /// Send `{"type": event_type, "data": payload}` if the connection is open.
    ///
    /// Returns whether the frame was handed to the transport. Nothing is
    /// queued while disconnected.
    pub fn send(&self, event_type: &str, payload: Value) -> bool {
        let outbound = {
            let state = self.inner.state.lock();
            state
                .connection
                .as_ref()
                .filter(|c| c.ready == ReadyState::Open)
                .and_then(|c| c.outbound.clone())
        };
        let Some(tx) = outbound else {
            warn!(event_type, "event stream is not connected, dropping outbound message");
            return false;
        };
        let text = match OutboundFrame::new(event_type, payload).encode() {
            Ok(text) => text,
            Err(e) => {
                warn!(event_type, error = %e, "failed to encode outbound message");
                return false;
            }
        };
        if tx.send(Outgoing::Text(text)).is_err() {
            warn!(event_type, "event stream transport is gone, dropping outbound message");
            return false;
        }
        true
    }

    /// [`send`](Self::send) with an empty object payload.
    pub fn send_empty(&self, event_type: &str) -> bool {
        self.send(event_type, Value::Object(serde_json::Map::new()))
    }

    /// Register `listener` for `event_type`. Registering the same handle
    /// twice keeps one registration.
    pub fn on(&self, event_type: &str, listener: &Listener) {
        let _ = self.inner.listeners.lock().add(event_type, listener);
    }

    /// Unregister `listener` from `event_type`. Unknown handles are ignored.
    pub fn off(&self, event_type: &str, listener: &Listener) {
        let _ = self.inner.listeners.lock().remove(event_type, listener);
    }

    /// Register a channel-backed listener and return its handle and receiver.
    pub fn subscribe(&self, event_type: &str) -> (Listener, mpsc::UnboundedReceiver<StreamEvent>) {
        let (listener, rx) = Listener::channel();
        self.on(event_type, &listener);
        (listener, rx)
    }

    /// Whether the connection is open.
    pub fn is_connected(&self) -> bool {
        self.ready_state() == ReadyState::Open
    }

    /// Lifecycle state of the current connection, `Closed` if there is none.
    pub fn ready_state(&self) -> ReadyState {
        self.inner
            .state
            .lock()
            .connection
            .as_ref()
            .map_or(ReadyState::Closed, |c| c.ready)
    }

    /// Reconnect attempts made in the current disconnect episode.
    pub fn reconnect_attempts(&self) -> u32 {
        self.inner.state.lock().reconnect.attempts
    }

    /// Session the client is (or will reconnect) connected to.
    pub fn session_id(&self) -> Option<SessionId> {
        self.inner
            .state
            .lock()
            .target
            .as_ref()
            .map(|(id, _)| id.clone())
    }

    /// Number of registered listeners across all event types.
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.lock().count()
    }

    // ─── Connection lifecycle ───────────────────────────────────────────

    fn open_locked(&self, state: &mut State) {
        let Some((session_id, token)) = state.target.clone() else {
            return;
        };
        if let Some(previous) = state.connection.take() {
            previous.shutdown();
        }
        state.generation += 1;
        let generation = state.generation;
        let weak = Arc::downgrade(&self.inner);
        let driver = tokio::spawn(drive_connection(weak, generation, session_id, token));
        state.connection = Some(LiveConnection {
            generation,
            ready: ReadyState::Connecting,
            outbound: None,
            driver,
        });
    }

    fn handle_open(
        &self,
        generation: u64,
        outbound: mpsc::UnboundedSender<Outgoing>,
        session_id: SessionId,
    ) -> bool {
        {
            let mut state = self.inner.state.lock();
            let Some(conn) = current_mut(&mut state, generation) else {
                return false;
            };
            conn.ready = ReadyState::Open;
            conn.outbound = Some(outbound);
            state.reconnect.attempts = 0;
        }
        info!(session_id = %session_id, "event stream connected");
        self.emit_lifecycle(&StreamEvent::Connected { session_id });
        true
    }

    fn handle_transport_event(&self, generation: u64, event: TransportEvent) {
        match event {
            TransportEvent::Text(text) => {
                if !self.is_current(generation) {
                    return;
                }
                match InboundFrame::decode(&text) {
                    Ok(frame) => self.dispatch_frame(frame),
                    Err(e) => warn!(error = %e, "dropping undecodable inbound frame"),
                }
            }
            TransportEvent::Error(message) => {
                if !self.is_current(generation) {
                    return;
                }
                warn!(error = %message, "event stream transport error");
                self.emit_lifecycle(&StreamEvent::Error { message });
            }
            TransportEvent::Closing => {
                let mut state = self.inner.state.lock();
                if let Some(conn) = current_mut(&mut state, generation) {
                    conn.ready = ReadyState::Closing;
                }
            }
            TransportEvent::Closed { code, reason } => self.handle_close(generation, code, reason),
        }
    }

    fn handle_open_failure(&self, generation: u64, err: &StreamError) {
        if !self.is_current(generation) {
            return;
        }
        error!(error = %err, "failed to open event stream");
        let message = err.to_string();
        self.emit_lifecycle(&StreamEvent::Error {
            message: message.clone(),
        });
        self.handle_close(generation, ABNORMAL_CLOSURE, message);
    }

    fn handle_close(&self, generation: u64, code: u16, reason: String) {
        let outcome = {
            let mut state = self.inner.state.lock();
            let Some(conn) = current_mut(&mut state, generation) else {
                return;
            };
            conn.ready = ReadyState::Closed;
            conn.outbound = None;
            self.after_close_locked(&mut state)
        };

        info!(code, reason = %reason, "event stream closed");
        self.emit_lifecycle(&StreamEvent::Disconnected { code, reason });

        match outcome {
            CloseOutcome::Scheduled { attempt, delay_ms } => {
                info!(attempt, delay_ms, "scheduling event stream reconnect");
            }
            CloseOutcome::Exhausted { attempts } => {
                warn!(attempts, "max reconnect attempts reached");
                self.emit_lifecycle(&StreamEvent::MaxReconnectAttempts { attempts });
            }
            CloseOutcome::Idle => {}
        }
    }

    fn after_close_locked(&self, state: &mut State) -> CloseOutcome {
        if state.target.is_none() {
            return CloseOutcome::Idle;
        }
        let policy = &self.inner.config.reconnect;
        if !policy.allows(state.reconnect.attempts) {
            return CloseOutcome::Exhausted {
                attempts: state.reconnect.attempts,
            };
        }

        if let Some(previous) = state.reconnect.timer.take() {
            previous.handle.abort();
        }
        state.reconnect.attempts += 1;
        let attempt = state.reconnect.attempts;
        let delay = policy.delay_for(attempt);
        state.reconnect.next_timer_id += 1;
        let id = state.reconnect.next_timer_id;

        let weak = Arc::downgrade(&self.inner);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(client) = Self::upgrade(&weak) {
                client.fire_reconnect(id);
            }
        });
        state.reconnect.timer = Some(PendingTimer { id, handle });

        CloseOutcome::Scheduled {
            attempt,
            delay_ms: u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
        }
    }

    fn fire_reconnect(&self, timer_id: u64) {
        let mut state = self.inner.state.lock();
        if state.reconnect.timer.as_ref().map(|t| t.id) != Some(timer_id) {
            return;
        }
        state.reconnect.timer = None;
        if state
            .connection
            .as_ref()
            .is_some_and(|c| c.ready.is_active())
        {
            return;
        }
        debug!(attempt = state.reconnect.attempts, "reconnecting event stream");
        self.open_locked(&mut state);
    }

    // ─── Dispatch ───────────────────────────────────────────────────────

    fn is_current(&self, generation: u64) -> bool {
        self.inner.state.lock().generation == generation
    }

    fn dispatch_frame(&self, frame: InboundFrame) {
        let event_type = frame.event_type().map(str::to_owned);
        let event = StreamEvent::Frame(frame);
        if let Some(event_type) = event_type {
            self.emit(&event_type, &event);
        }
        self.emit(names::MESSAGE, &event);
    }

    fn emit_lifecycle(&self, event: &StreamEvent) {
        if let Some(name) = event.lifecycle_name() {
            self.emit(name, event);
        }
    }

    fn emit(&self, event_type: &str, event: &StreamEvent) {
        let listeners = self.inner.listeners.lock().snapshot(event_type);
        for listener in listeners {
            if let Err(panic) = catch_unwind(AssertUnwindSafe(|| listener.call(event))) {
                error!(
                    event_type,
                    panic = %panic_message(panic.as_ref()),
                    "event listener panicked"
                );
            }
        }
    }
}

impl std::fmt::Debug for EventStreamClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventStreamClient")
            .field("base_url", &self.inner.config.base_url)
            .field("ready_state", &self.ready_state())
            .field("reconnect_attempts", &self.reconnect_attempts())
            .finish_non_exhaustive()
    }
}

fn current_mut(state: &mut State, generation: u64) -> Option<&mut LiveConnection> {
    state
        .connection
        .as_mut()
        .filter(|c| c.generation == generation)
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}

/// Open one connection and pump its events into the client.
async fn drive_connection(
    weak: Weak<Inner>,
    generation: u64,
    session_id: SessionId,
    token: AuthToken,
) {
    let Some((connector, base_url)) = weak
        .upgrade()
        .map(|inner| (Arc::clone(&inner.connector), inner.config.base_url.clone()))
    else {
        return;
    };

    let opened = match endpoint_url(&base_url, &session_id, &token) {
        Ok(url) => {
            info!(session_id = %session_id, url = %redact_token(&url), "connecting event stream");
            connector.open(&url).await
        }
        Err(e) => Err(e),
    };

    let mut link = match opened {
        Ok(link) => link,
        Err(err) => {
            if let Some(client) = EventStreamClient::upgrade(&weak) {
                client.handle_open_failure(generation, &err);
            }
            return;
        }
    };

    let accepted = EventStreamClient::upgrade(&weak)
        .is_some_and(|client| client.handle_open(generation, link.outbound.clone(), session_id));
    if !accepted {
        let _ = link.outbound.send(Outgoing::Close);
        return;
    }

    while let Some(event) = link.inbound.recv().await {
        let Some(client) = EventStreamClient::upgrade(&weak) else {
            let _ = link.outbound.send(Outgoing::Close);
            return;
        };
        let closed = matches!(event, TransportEvent::Closed { .. });
        client.handle_transport_event(generation, event);
        if closed {
            return;
        }
    }

    // transport went away without a Closed event
    if let Some(client) = EventStreamClient::upgrade(&weak) {
        client.handle_close(generation, ABNORMAL_CLOSURE, String::new());
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
