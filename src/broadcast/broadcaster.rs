//! Live-update change broadcasting.
//!
//! Tracks the number of connected live clients and runs a single background
//! polling worker while at least one is connected. Once per poll interval
//! the worker re-reads every tracked freshness source; each changed
//! fingerprint produces one push event fanned out to all subscribers.
//!
//! The broadcaster is level triggered: a missed push is not replayed, the
//! next interval simply re-evaluates the current fingerprints.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;

use crate::broadcast::sources::{FreshnessSource, PushEvent};
use crate::cache::Fingerprint;
use crate::observability::metrics;

/// Capacity of the fan-out channel. A slow client that lags behind skips
/// ahead; level triggering makes the lost events harmless.
const CHANNEL_CAPACITY: usize = 32;

struct Inner {
    sources: Vec<FreshnessSource>,
    poll_interval: Duration,
    clients: AtomicUsize,
    worker_active: AtomicBool,
    tx: broadcast::Sender<PushEvent>,
}

/// Broadcasts "something changed" events to connected live clients.
///
/// Cheap to clone; all clones share the subscriber count, the worker flag
/// and the fan-out channel.
#[derive(Clone)]
pub struct ChangeBroadcaster {
    inner: Arc<Inner>,
}

impl ChangeBroadcaster {
    pub fn new(sources: Vec<FreshnessSource>, poll_interval: Duration) -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                sources,
                poll_interval,
                clients: AtomicUsize::new(0),
                worker_active: AtomicBool::new(false),
                tx,
            }),
        }
    }

    /// Subscribe to push events. Call before `on_connect` so the first poll
    /// cannot fall between counting the client and listening.
    pub fn subscribe(&self) -> broadcast::Receiver<PushEvent> {
        self.inner.tx.subscribe()
    }

    /// Register a newly connected live client and make sure a worker runs.
    /// Idempotent with respect to the worker: if one already runs, only the
    /// count changes.
    pub fn on_connect(&self) {
        let clients = self.inner.clients.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::debug!(clients, "live client connected");
        self.ensure_worker();
    }

    /// Register a disconnect. The count is clamped at zero so an unpaired
    /// disconnect cannot drive it negative and wedge the worker lifecycle.
    pub fn on_disconnect(&self) {
        let before = self
            .inner
            .clients
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        match before {
            Ok(n) => tracing::debug!(clients = n - 1, "live client disconnected"),
            Err(_) => tracing::warn!("disconnect without matching connect ignored"),
        }
    }

    /// Current number of connected clients.
    pub fn client_count(&self) -> usize {
        self.inner.clients.load(Ordering::SeqCst)
    }

    /// Whether a polling worker currently runs.
    pub fn worker_running(&self) -> bool {
        self.inner.worker_active.load(Ordering::SeqCst)
    }

    /// Spawn the polling worker unless one is already active. The CAS on
    /// the active flag is the single-worker guarantee.
    fn ensure_worker(&self) {
        if self
            .inner
            .worker_active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            let inner = Arc::clone(&self.inner);
            tokio::spawn(run_worker(inner));
        }
    }
}

async fn run_worker(inner: Arc<Inner>) {
    tracing::info!(sources = inner.sources.len(), "change broadcaster started");
    let mut seen: Vec<Option<Fingerprint>> = vec![None; inner.sources.len()];

    loop {
        if inner.clients.load(Ordering::SeqCst) == 0 {
            inner.worker_active.store(false, Ordering::SeqCst);
            // A client may have connected between the count check and
            // clearing the flag, in which case its ensure_worker saw the
            // flag still set. Reclaim the slot and keep polling.
            if inner.clients.load(Ordering::SeqCst) > 0
                && inner
                    .worker_active
                    .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                    .is_ok()
            {
                continue;
            }
            break;
        }

        for (index, source) in inner.sources.iter().enumerate() {
            let current = source.current();
            if seen[index].as_ref() != Some(&current) {
                let event = source.push_event(&current);
                tracing::debug!(event = source.event(), "fingerprint changed, broadcasting");
                metrics::record_push_event(source.event());
                // Send only fails when no receiver is listening; the next
                // interval retries naturally.
                if let Err(e) = inner.tx.send(event) {
                    tracing::debug!(event = source.event(), error = %e, "no live receivers");
                }
                seen[index] = Some(current);
            }
        }

        tokio::time::sleep(inner.poll_interval).await;
    }

    tracing::info!("change broadcaster stopped");
}

impl std::fmt::Debug for ChangeBroadcaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeBroadcaster")
            .field("sources", &self.inner.sources)
            .field("poll_interval", &self.inner.poll_interval)
            .field("clients", &self.client_count())
            .field("worker_active", &self.worker_running())
            .finish()
    }
}
