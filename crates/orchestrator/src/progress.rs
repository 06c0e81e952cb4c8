//! Progress store - in-memory job snapshots keyed by job id

use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::debug;
use uuid::Uuid;

use titan_common::ProgressSnapshot;

const EVENT_CAPACITY: usize = 1024;

/// A snapshot accepted by the store, tagged with its job id.
pub type ProgressEvent = (Uuid, ProgressSnapshot);

/// How long finished jobs stay readable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    /// Terminal entries older than this read as not found.
    pub terminal_ttl: Option<Duration>,
    /// Cap on retained terminal entries; oldest go first.
    pub max_terminal: Option<usize>,
}

impl RetentionPolicy {
    /// Keep everything for the life of the process.
    pub const fn unbounded() -> Self {
        Self {
            terminal_ttl: None,
            max_terminal: None,
        }
    }
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            terminal_ttl: Some(Duration::from_secs(3600)),
            max_terminal: Some(10_000),
        }
    }
}

#[derive(Debug, Clone)]
struct Entry {
    snapshot: ProgressSnapshot,
    terminal_since: Option<Instant>,
}

impl Entry {
    fn expired(&self, ttl: Option<Duration>, now: Instant) -> bool {
        match (self.terminal_since, ttl) {
            (Some(since), Some(ttl)) => now.duration_since(since) >= ttl,
            _ => false,
        }
    }
}

pub struct ProgressStore {
    entries: DashMap<Uuid, Entry>,
    /// Terminal job ids, oldest first.
    finished: Mutex<VecDeque<Uuid>>,
    events: broadcast::Sender<ProgressEvent>,
    retention: RetentionPolicy,
}

impl ProgressStore {
    pub fn new(retention: RetentionPolicy) -> Self {
        Self {
            entries: DashMap::new(),
            finished: Mutex::new(VecDeque::new()),
            events: broadcast::channel(EVENT_CAPACITY).0,
            retention,
        }
    }

    pub fn retention(&self) -> RetentionPolicy {
        self.retention
    }

    /// Every snapshot accepted from now on, in the order it was stored.
    /// Slow receivers lag rather than block writers.
    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.events.subscribe()
    }

    fn emit(&self, id: Uuid, snapshot: &ProgressSnapshot) {
        if self.events.receiver_count() > 0 {
            let _ = self.events.send((id, snapshot.clone()));
        }
    }

    /// Install the `Starting(0)` snapshot for a new job.
    pub fn create(&self, id: Uuid) {
        let snapshot = ProgressSnapshot::starting();
        self.emit(id, &snapshot);
        self.entries.insert(
            id,
            Entry {
                snapshot,
                terminal_since: None,
            },
        );
    }

    /// Replace the snapshot for `id`. A terminal snapshot is final: later
    /// updates are dropped and `false` is returned.
    pub fn update(&self, id: Uuid, snapshot: ProgressSnapshot) -> bool {
        let terminal = snapshot.is_terminal();
        {
            let mut entry = self.entries.entry(id).or_insert_with(|| Entry {
                snapshot: ProgressSnapshot::starting(),
                terminal_since: None,
            });
            if entry.snapshot.is_terminal() {
                debug!(job_id = %id, "ignoring update to finished job");
                return false;
            }
            self.emit(id, &snapshot);
            entry.snapshot = snapshot;
            if terminal {
                entry.terminal_since = Some(Instant::now());
            }
        }
        // shard guard released above; lock order is finished, then entries
        if terminal {
            self.finished.lock().push_back(id);
            self.enforce_cap();
        }
        true
    }

    /// Current snapshot, or `None` when the id is unknown or has expired.
    pub fn read(&self, id: Uuid) -> Option<ProgressSnapshot> {
        let now = Instant::now();
        {
            let entry = self.entries.get(&id)?;
            if !entry.expired(self.retention.terminal_ttl, now) {
                return Some(entry.snapshot.clone());
            }
        }
        self.entries
            .remove_if(&id, |_, e| e.expired(self.retention.terminal_ttl, now));
        None
    }

    /// Drop every expired terminal entry; returns how many were removed.
    pub fn evict_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries
            .retain(|_, e| !e.expired(self.retention.terminal_ttl, now));
        self.finished
            .lock()
            .retain(|id| self.entries.contains_key(id));
        before.saturating_sub(self.entries.len())
    }

    fn enforce_cap(&self) {
        let Some(max) = self.retention.max_terminal else {
            return;
        };
        let mut finished = self.finished.lock();
        let mut evicted = 0usize;
        // ids already dropped by expiry sit at the front and are skipped
        while finished.len() > max {
            let Some(id) = finished.pop_front() else {
                break;
            };
            if self.entries.remove(&id).is_some() {
                evicted += 1;
            }
        }
        if evicted > 0 {
            debug!(evicted, "terminal entry cap reached");
        }
    }

    /// Run [`evict_expired`](Self::evict_expired) every `interval`.
    pub fn spawn_sweeper(self: Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let store = Arc::downgrade(&self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(store) = store.upgrade() else {
                    break;
                };
                let evicted = store.evict_expired();
                if evicted > 0 {
                    debug!(evicted, "swept expired jobs");
                }
            }
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ProgressStore {
    fn default() -> Self {
        Self::new(RetentionPolicy::default())
    }
}
