//! Persistent store seam and the write-behind queue in front of it.
//!
//! The loop never awaits the store. Each step enqueues a full-session
//! snapshot on a bounded channel; a background worker performs the actual
//! writes and swallows failures (logged and counted, never fatal). The
//! in-memory session stays authoritative for the rest of the run, so a lost
//! write is superseded by the next snapshot. Saves are idempotent
//! overwrites keyed by session id, last writer wins.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::StoreError;
use crate::session::SessionId;
use crate::snapshot::SessionSnapshot;

/// Capacity of the write-behind channel. A full queue drops the snapshot
/// (counted as a failure); the next step's snapshot supersedes it anyway.
const QUEUE_CAPACITY: usize = 256;

/// Durable record of session snapshots.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Idempotent overwrite keyed by the snapshot's session id.
    async fn save(&self, snapshot: &SessionSnapshot) -> Result<(), StoreError>;

    /// The durable snapshot for a session, if one was ever written.
    async fn load(&self, id: &str) -> Result<Option<SessionSnapshot>, StoreError>;
}

/// In-memory store — the default for tests and embedded use.
#[derive(Default)]
pub struct MemoryStore {
    sessions: RwLock<HashMap<SessionId, SessionSnapshot>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Number of sessions with a durable snapshot.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn save(&self, snapshot: &SessionSnapshot) -> Result<(), StoreError> {
        let mut sessions = self.sessions.write().await;
        sessions.insert(snapshot.session_id.clone(), snapshot.clone());
        Ok(())
    }

    async fn load(&self, id: &str) -> Result<Option<SessionSnapshot>, StoreError> {
        Ok(self.sessions.read().await.get(id).cloned())
    }
}

/// Sending half of the write-behind channel.
///
/// Cloneable; every running session enqueues through the same queue.
#[derive(Clone)]
pub struct PersistenceQueue {
    tx: mpsc::Sender<SessionSnapshot>,
    failures: Arc<AtomicU64>,
}

impl PersistenceQueue {
    /// Hand a snapshot to the worker without waiting for the write.
    pub fn enqueue(&self, snapshot: SessionSnapshot) -> Result<(), StoreError> {
        self.tx.try_send(snapshot).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => StoreError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => StoreError::ChannelClosed,
        })
    }

    /// Writes that failed, were dropped, or could not be enqueued so far.
    pub fn failure_count(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    /// Record an enqueue failure against the same counter the worker uses.
    pub(crate) fn count_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }
}

/// Spawn the write-behind worker for a store.
///
/// The worker drains the queue until every [`PersistenceQueue`] clone is
/// dropped, then exits; awaiting the returned handle guarantees all accepted
/// snapshots were offered to the store.
pub fn spawn_write_behind(store: Arc<dyn SessionStore>) -> (PersistenceQueue, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::channel::<SessionSnapshot>(QUEUE_CAPACITY);
    let failures = Arc::new(AtomicU64::new(0));
    let counter = failures.clone();

    let worker = tokio::spawn(async move {
        while let Some(snapshot) = rx.recv().await {
            match store.save(&snapshot).await {
                Ok(()) => {
                    debug!(
                        session_id = %snapshot.session_id,
                        status = %snapshot.status,
                        "session snapshot written"
                    );
                }
                Err(e) => {
                    counter.fetch_add(1, Ordering::Relaxed);
                    warn!(
                        session_id = %snapshot.session_id,
                        error = %e,
                        "session snapshot write failed"
                    );
                }
            }
        }
        debug!("persistence worker drained");
    });

    (PersistenceQueue { tx, failures }, worker)
}
