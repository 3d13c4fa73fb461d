//! Ledger Event Stream
//!
//! Poll-then-fanout delivery of domain events. This is deliberately not a
//! push abstraction: the ledger is polled on a fixed interval and each batch
//! is dispatched to subscribers in ascending cursor order. Delivery is
//! at-least-once; duplicates across polls are tolerated downstream.
//!
//! Cursor discipline: the stored cursor is "last confirmed position", not
//! "last poll time". It advances only when a poll returned at least one
//! event, and never on a failed poll.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::chain::events::{self, ArenaEvent, EventKind};
use crate::chain::rpc::{EventCursor, EventFilter, LedgerReader};

/// Fixed polling interval.
pub const POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Maximum events fetched per poll.
pub const POLL_LIMIT: usize = 100;

type EventHandler = Arc<dyn Fn(&ArenaEvent) + Send + Sync>;

#[derive(Default)]
struct Registry {
    handlers: HashMap<EventKind, Vec<(u64, EventHandler)>>,
}

struct StreamShared<R> {
    reader: R,
    filter: EventFilter,
    registry: Mutex<Registry>,
    cursor: Mutex<Option<EventCursor>>,
    listening: AtomicBool,
    next_handler_id: AtomicU64,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// Handle deregistering one subscribed handler.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// Deregister the handler. Dropping the handle without calling this
    /// leaves the handler registered for the stream's lifetime.
    pub fn unsubscribe(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

/// Cursor-based polling client for ledger domain events.
pub struct LedgerEventStream<R> {
    shared: Arc<StreamShared<R>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl<R: LedgerReader + 'static> LedgerEventStream<R> {
    /// Create a stream scoped to one package + module.
    pub fn new(reader: R, filter: EventFilter) -> Self {
        Self {
            shared: Arc::new(StreamShared {
                reader,
                filter,
                registry: Mutex::new(Registry::default()),
                cursor: Mutex::new(None),
                listening: AtomicBool::new(false),
                next_handler_id: AtomicU64::new(0),
            }),
            task: Mutex::new(None),
        }
    }

    /// Register a handler for one event kind. Multiple handlers per kind
    /// are allowed; each sees every event of its kind.
    pub fn subscribe(
        &self,
        kind: EventKind,
        handler: impl Fn(&ArenaEvent) + Send + Sync + 'static,
    ) -> Subscription {
        let id = self.shared.next_handler_id.fetch_add(1, Ordering::Relaxed);
        lock(&self.shared.registry)
            .handlers
            .entry(kind)
            .or_default()
            .push((id, Arc::new(handler)));

        let shared = Arc::clone(&self.shared);
        Subscription {
            cancel: Some(Box::new(move || {
                if let Some(handlers) = lock(&shared.registry).handlers.get_mut(&kind) {
                    handlers.retain(|(handler_id, _)| *handler_id != id);
                }
            })),
        }
    }

    /// Number of handlers registered for a kind.
    pub fn handler_count(&self, kind: EventKind) -> usize {
        lock(&self.shared.registry)
            .handlers
            .get(&kind)
            .map_or(0, Vec::len)
    }

    /// Current cursor position.
    pub fn cursor(&self) -> Option<EventCursor> {
        lock(&self.shared.cursor).clone()
    }

    /// Begin periodic polling. Calling while already listening is a no-op.
    pub fn start_listening(&self) {
        if self.shared.listening.swap(true, Ordering::SeqCst) {
            debug!("event stream already listening");
            return;
        }
        info!(
            package = %self.shared.filter.package,
            module = %self.shared.filter.module,
            "starting ledger event listener"
        );

        let shared = Arc::clone(&self.shared);
        let handle = tokio::spawn(async move {
            // Immediate first poll, then the fixed cadence.
            loop {
                if !shared.listening.load(Ordering::SeqCst) {
                    break;
                }
                poll_shared(&shared).await;
                tokio::time::sleep(POLL_INTERVAL).await;
            }
        });
        *lock(&self.task) = Some(handle);
    }

    /// Halt polling. Safe to call repeatedly.
    pub fn stop_listening(&self) {
        if !self.shared.listening.swap(false, Ordering::SeqCst) {
            return;
        }
        if let Some(handle) = lock(&self.task).take() {
            handle.abort();
        }
        info!("stopped ledger event listener");
    }

    /// Run a single fetch-decode-dispatch pass. Returns the number of
    /// handler invocations. A failed poll is logged, leaves the cursor
    /// unchanged, and returns 0; it never propagates.
    pub async fn poll_once(&self) -> usize {
        poll_shared(&self.shared).await
    }
}

async fn poll_shared<R: LedgerReader>(shared: &StreamShared<R>) -> usize {
    let cursor = lock(&shared.cursor).clone();

    let page = match shared
        .reader
        .query_events(&shared.filter, cursor.as_ref(), POLL_LIMIT, true)
        .await
    {
        Ok(page) => page,
        Err(err) => {
            warn!(error = %err, "event poll failed; retrying next interval");
            return 0;
        }
    };

    if page.data.is_empty() {
        // An empty batch must not advance the cursor.
        return 0;
    }

    debug!(count = page.data.len(), "received ledger events");

    let mut dispatched = 0;
    for raw in &page.data {
        let Some(event) = events::decode(raw) else {
            continue;
        };

        // Snapshot the handler list so handlers run without holding the
        // registry lock (a handler may subscribe or unsubscribe).
        let handlers: Vec<EventHandler> = lock(&shared.registry)
            .handlers
            .get(&event.kind)
            .map(|hs| hs.iter().map(|(_, h)| Arc::clone(h)).collect())
            .unwrap_or_default();

        for handler in handlers {
            handler(&event);
            dispatched += 1;
        }
    }

    if let Some(next) = page.next_cursor {
        *lock(&shared.cursor) = Some(next);
    }

    dispatched
}
