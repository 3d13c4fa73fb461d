//! Realtime Transport Link
//!
//! WebSocket client with a small state machine: Disconnected -> Connecting
//! -> Connected, falling back to Disconnected on any failure. Reconnection
//! is bounded (fixed attempt ceiling, fixed backoff) and only happens after
//! at least one successful connection; a first-connection failure means the
//! transport is unavailable and the game continues without it.
//!
//! No operation here returns an error to the caller. `connect` resolves once
//! the first attempt settles either way, `send` queues while offline, and
//! `disconnect` stops delivery permanently. Correctness never depends on
//! this channel.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

use crate::net::messages::{MessageKind, NetMessage};

/// How long a connection attempt may take before counting as failed.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Backoff between reconnection attempts.
pub const RECONNECT_DELAY: Duration = Duration::from_secs(3);

/// Reconnection attempt ceiling.
pub const MAX_RECONNECT_ATTEMPTS: u32 = 5;

/// Heartbeat cadence while connected.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Link state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LinkState {
    /// No link
    #[default]
    Disconnected,
    /// Attempt in flight
    Connecting,
    /// Frames are flowing
    Connected,
}

type MessageHandler = Arc<dyn Fn(&NetMessage) + Send + Sync>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

struct TransportShared {
    state: Mutex<LinkState>,
    handlers: Mutex<HashMap<MessageKind, Vec<(u64, MessageHandler)>>>,
    next_handler_id: AtomicU64,
    queue: Mutex<VecDeque<NetMessage>>,
    outgoing: Mutex<Option<mpsc::UnboundedSender<Message>>>,
    ever_connected: AtomicBool,
    attempts: AtomicU32,
    alive: AtomicBool,
}

/// Handle deregistering one message handler.
pub struct MessageSubscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl MessageSubscription {
    /// Deregister the handler.
    pub fn unsubscribe(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

/// Optional low-latency channel. With no endpoint configured every
/// operation is a no-op and the system runs in ledger-event-only mode.
pub struct RealtimeTransport {
    endpoint: Option<String>,
    shared: Arc<TransportShared>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl RealtimeTransport {
    /// Create a transport. `endpoint` of `None` disables it entirely.
    pub fn new(endpoint: Option<String>) -> Self {
        Self {
            endpoint,
            shared: Arc::new(TransportShared {
                state: Mutex::new(LinkState::Disconnected),
                handlers: Mutex::new(HashMap::new()),
                next_handler_id: AtomicU64::new(0),
                queue: Mutex::new(VecDeque::new()),
                outgoing: Mutex::new(None),
                ever_connected: AtomicBool::new(false),
                attempts: AtomicU32::new(0),
                alive: AtomicBool::new(false),
            }),
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Whether an endpoint is configured at all.
    pub fn is_enabled(&self) -> bool {
        self.endpoint.is_some()
    }

    /// Current link state.
    pub fn state(&self) -> LinkState {
        *lock(&self.shared.state)
    }

    /// Whether frames are currently flowing.
    pub fn is_connected(&self) -> bool {
        self.state() == LinkState::Connected
    }

    /// Messages waiting for a connection.
    pub fn queued_len(&self) -> usize {
        lock(&self.shared.queue).len()
    }

    /// Open the link. Resolves once the first attempt settles; a timeout or
    /// refusal is not an error, the transport just stays disconnected.
    /// Without a configured endpoint this resolves immediately.
    pub async fn connect(&self, player_id: &str, game_id: &str) {
        let Some(url) = self.endpoint.clone() else {
            debug!("no realtime endpoint configured; skipping connection");
            return;
        };
        if self.state() != LinkState::Disconnected {
            debug!("transport already connecting or connected");
            return;
        }

        self.shared.alive.store(true, Ordering::SeqCst);
        self.shared.ever_connected.store(false, Ordering::SeqCst);
        self.shared.attempts.store(0, Ordering::SeqCst);

        let (settled_tx, settled_rx) = oneshot::channel();
        let shared = Arc::clone(&self.shared);
        let player_id = player_id.to_string();
        let game_id = game_id.to_string();
        let handle = tokio::spawn(run_link(shared, url, player_id, game_id, settled_tx));
        lock(&self.tasks).push(handle);

        let _ = settled_rx.await;
    }

    /// Send a message, queueing it when not currently connected. The queue
    /// is flushed on the next (re)connection. Never errors.
    pub fn send(&self, message: &NetMessage) {
        if self.endpoint.is_none() {
            return;
        }
        if self.is_connected() {
            if let Some(tx) = lock(&self.shared.outgoing).as_ref() {
                if let Ok(text) = serde_json::to_string(message) {
                    if tx.send(Message::Text(text)).is_ok() {
                        return;
                    }
                }
            }
        }
        lock(&self.shared.queue).push_back(message.clone());
    }

    /// Register a handler for one message kind.
    pub fn on(
        &self,
        kind: MessageKind,
        handler: impl Fn(&NetMessage) + Send + Sync + 'static,
    ) -> MessageSubscription {
        let id = self.shared.next_handler_id.fetch_add(1, Ordering::Relaxed);
        lock(&self.shared.handlers)
            .entry(kind)
            .or_default()
            .push((id, Arc::new(handler)));

        let shared = Arc::clone(&self.shared);
        MessageSubscription {
            cancel: Some(Box::new(move || {
                if let Some(handlers) = lock(&shared.handlers).get_mut(&kind) {
                    handlers.retain(|(handler_id, _)| *handler_id != id);
                }
            })),
        }
    }

    /// Close the link and stop all delivery. Handlers stay registered but
    /// never fire again; subsequent `send` calls queue silently.
    pub fn disconnect(&self) {
        self.shared.alive.store(false, Ordering::SeqCst);
        *lock(&self.shared.outgoing) = None;
        *lock(&self.shared.state) = LinkState::Disconnected;
        for task in lock(&self.tasks).drain(..) {
            task.abort();
        }
        info!("realtime transport disconnected");
    }
}

fn set_state(shared: &TransportShared, state: LinkState) {
    *lock(&shared.state) = state;
}

fn dispatch(shared: &TransportShared, message: &NetMessage) {
    if !shared.alive.load(Ordering::SeqCst) {
        return;
    }
    let handlers: Vec<MessageHandler> = lock(&shared.handlers)
        .get(&message.kind)
        .map(|hs| hs.iter().map(|(_, h)| Arc::clone(h)).collect())
        .unwrap_or_default();
    for handler in handlers {
        handler(message);
    }
}

async fn run_link(
    shared: Arc<TransportShared>,
    url: String,
    player_id: String,
    game_id: String,
    settled: oneshot::Sender<()>,
) {
    let mut settled = Some(settled);

    loop {
        if !shared.alive.load(Ordering::SeqCst) {
            break;
        }
        set_state(&shared, LinkState::Connecting);

        match tokio::time::timeout(CONNECT_TIMEOUT, connect_async(url.as_str())).await {
            Ok(Ok((stream, _))) => {
                info!(url = %url, "realtime transport connected");
                set_state(&shared, LinkState::Connected);
                shared.ever_connected.store(true, Ordering::SeqCst);
                shared.attempts.store(0, Ordering::SeqCst);
                if let Some(tx) = settled.take() {
                    let _ = tx.send(());
                }

                let (mut ws_tx, mut ws_rx) = stream.split();
                let (out_tx, mut out_rx) = mpsc::unbounded_channel::<Message>();
                *lock(&shared.outgoing) = Some(out_tx.clone());

                // Announce ourselves, then flush anything queued while
                // offline.
                if let Ok(text) =
                    serde_json::to_string(&NetMessage::sync_request(&player_id, &game_id, now_ms()))
                {
                    let _ = out_tx.send(Message::Text(text));
                }
                let queued: Vec<NetMessage> = lock(&shared.queue).drain(..).collect();
                for message in queued {
                    if let Ok(text) = serde_json::to_string(&message) {
                        let _ = out_tx.send(Message::Text(text));
                    }
                }

                let writer = tokio::spawn(async move {
                    while let Some(frame) = out_rx.recv().await {
                        if ws_tx.send(frame).await.is_err() {
                            break;
                        }
                    }
                });

                let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
                heartbeat.tick().await;

                loop {
                    tokio::select! {
                        frame = ws_rx.next() => match frame {
                            Some(Ok(Message::Text(text))) => {
                                match serde_json::from_str::<NetMessage>(&text) {
                                    Ok(message) => dispatch(&shared, &message),
                                    Err(err) => {
                                        warn!(error = %err, "dropping unparseable transport frame");
                                    }
                                }
                            }
                            Some(Ok(Message::Ping(payload))) => {
                                if let Some(tx) = lock(&shared.outgoing).as_ref() {
                                    let _ = tx.send(Message::Pong(payload));
                                }
                            }
                            Some(Ok(Message::Close(_))) | None => {
                                info!("realtime transport closed by peer");
                                break;
                            }
                            Some(Ok(_)) => {}
                            Some(Err(err)) => {
                                warn!(error = %err, "realtime transport read error");
                                break;
                            }
                        },
                        _ = heartbeat.tick() => {
                            if let Some(tx) = lock(&shared.outgoing).as_ref() {
                                let _ = tx.send(Message::Text(r#"{"type":"ping"}"#.to_string()));
                            }
                        }
                    }
                }

                writer.abort();
                *lock(&shared.outgoing) = None;
                set_state(&shared, LinkState::Disconnected);
            }
            // Timeout or refused connection: not an error to the caller.
            _ => {
                set_state(&shared, LinkState::Disconnected);
                if let Some(tx) = settled.take() {
                    let _ = tx.send(());
                }
            }
        }

        if !shared.alive.load(Ordering::SeqCst) {
            break;
        }
        if !shared.ever_connected.load(Ordering::SeqCst) {
            // First connection never succeeded: no automatic retry.
            info!("realtime transport unavailable; continuing in ledger-only mode");
            break;
        }
        let attempts = shared.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if attempts >= MAX_RECONNECT_ATTEMPTS {
            warn!("realtime transport reconnect attempts exhausted; degrading to ledger-only mode");
            break;
        }
        info!(
            attempt = attempts,
            max = MAX_RECONNECT_ATTEMPTS,
            "reconnecting realtime transport"
        );
        tokio::time::sleep(RECONNECT_DELAY).await;
    }
}
