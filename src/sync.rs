use crate::models::PlanEvent;
use crate::store::{EventStore, Snapshot};
use rand::Rng;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Point-in-time view of the mirrored collection plus channel health.
/// `loading` is true until the first successful snapshot (or first error);
/// `online` turns false on transport errors while `events` keeps the
/// last-known-good list.
#[derive(Debug, Clone)]
pub struct SyncState {
    pub events: Vec<PlanEvent>,
    pub online: bool,
    pub loading: bool,
}

impl Default for SyncState {
    fn default() -> Self {
        Self { events: Vec::new(), online: true, loading: true }
    }
}

/// Maintains a read-mostly local mirror of the remote collection.
///
/// The mirror is owned exclusively by this adapter: consumers only ever get
/// cloned snapshots or a watch receiver. Every remote notification replaces
/// the whole list in one send, so partial application is never observable.
pub struct SyncAdapter {
    store: Arc<dyn EventStore>,
    state_tx: watch::Sender<SyncState>,
    task: Mutex<Option<JoinHandle<()>>>,
    backoff: Duration,
}

impl SyncAdapter {
    pub fn new(store: Arc<dyn EventStore>, backoff: Duration) -> Self {
        let (state_tx, _) = watch::channel(SyncState::default());
        Self { store, state_tx, task: Mutex::new(None), backoff }
    }

    /// Register the long-lived observation task. Idempotent: a second call
    /// while the task is alive is a no-op.
    pub fn subscribe(&self) {
        let mut guard = self.task.lock().unwrap();
        if let Some(handle) = guard.as_ref() {
            if !handle.is_finished() {
                debug!("sync already subscribed to {}", self.store.name());
                return;
            }
        }
        let store = self.store.clone();
        let state_tx = self.state_tx.clone();
        let backoff = self.backoff;
        *guard = Some(tokio::spawn(observe(store, state_tx, backoff)));
    }

    /// Tear down the observation task. Safe to call more than once; only the
    /// first call does anything.
    pub fn shutdown(&self) {
        if let Some(handle) = self.task.lock().unwrap().take() {
            handle.abort();
        }
    }

    /// Receiver over the adapter state, for callers that want to await
    /// changes instead of polling.
    pub fn watch_state(&self) -> watch::Receiver<SyncState> {
        self.state_tx.subscribe()
    }

    pub fn state(&self) -> SyncState {
        self.state_tx.borrow().clone()
    }

    /// Immutable snapshot of the current event list.
    pub fn snapshot(&self) -> Vec<PlanEvent> {
        self.state_tx.borrow().events.clone()
    }
}

impl Drop for SyncAdapter {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn decode_snapshot(snapshot: Snapshot) -> Vec<PlanEvent> {
    let mut events = Vec::with_capacity(snapshot.len());
    for (id, rec) in snapshot {
        match PlanEvent::from_stored(id, rec) {
            Ok(ev) => events.push(ev),
            Err(e) => warn!("skipping undecodable record: {}", e),
        }
    }
    events
}

async fn observe(
    store: Arc<dyn EventStore>,
    state_tx: watch::Sender<SyncState>,
    backoff: Duration,
) {
    loop {
        let mut feed = match store.changes().await {
            Ok(f) => f,
            Err(e) => {
                warn!("{}: could not open change feed: {}", store.name(), e);
                mark_offline(&state_tx);
                sleep_backoff(backoff).await;
                continue;
            }
        };

        loop {
            match store.fetch_snapshot().await {
                Ok(snapshot) => {
                    // Decode fully before publishing so consumers only ever
                    // see a complete replacement.
                    let events = decode_snapshot(snapshot);
                    debug!("{}: snapshot with {} events", store.name(), events.len());
                    state_tx.send_modify(|s| {
                        s.events = events;
                        s.online = true;
                        s.loading = false;
                    });
                }
                Err(e) => {
                    warn!("{}: snapshot fetch failed: {}", store.name(), e);
                    mark_offline(&state_tx);
                    break;
                }
            }

            if let Err(e) = feed.next().await {
                warn!("{}: change feed lost: {}", store.name(), e);
                mark_offline(&state_tx);
                break;
            }
        }

        sleep_backoff(backoff).await;
    }
}

/// Connectivity loss keeps the last-known-good event list and only flips the
/// indicator; it also ends the initial loading state.
fn mark_offline(state_tx: &watch::Sender<SyncState>) {
    state_tx.send_modify(|s| {
        s.online = false;
        s.loading = false;
    });
}

async fn sleep_backoff(base: Duration) {
    let jitter = rand::thread_rng().gen_range(0..250);
    tokio::time::sleep(base + Duration::from_millis(jitter)).await;
}
