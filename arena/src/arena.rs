//! The arena front — session registry and client surface.
//!
//! `Arena` owns the registry of running and finished sessions. Callers start
//! a negotiation, subscribe to its snapshot stream, read its latest snapshot
//! on demand, or cancel it. The per-session work happens on a spawned task
//! driven by [`NegotiationOrchestrator`]; the registry keeps only what
//! clients need: the snapshot publisher and the cancellation token.
//!
//! Handles are retained after a session ends so late readers still get the
//! final snapshot.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{broadcast, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::ArenaConfig;
use crate::error::{ArenaError, ArenaResult};
use crate::orchestrator::{NegotiationOrchestrator, SessionContext};
use crate::reasoning::ReasoningService;
use crate::session::{NegotiationSession, SessionId};
use crate::snapshot::{SessionSnapshot, SharedSnapshotPublisher};
use crate::store::PersistenceQueue;

/// Shared handle to the arena front.
pub type SharedArena = Arc<Arena>;

/// What the registry keeps per session.
struct SessionHandle {
    publisher: SharedSnapshotPublisher,
    cancel: CancellationToken,
}

/// Client surface over any number of concurrent negotiations.
pub struct Arena {
    orchestrator: Arc<NegotiationOrchestrator>,
    sessions: RwLock<HashMap<SessionId, SessionHandle>>,
}

impl Arena {
    pub fn new(
        service: Arc<dyn ReasoningService>,
        config: ArenaConfig,
        persistence: PersistenceQueue,
    ) -> Self {
        Self {
            orchestrator: Arc::new(NegotiationOrchestrator::new(service, config, persistence)),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Wrap in an `Arc` for sharing across tasks.
    pub fn shared(self) -> SharedArena {
        Arc::new(self)
    }

    /// Create a session for the grievance and spawn its negotiation.
    ///
    /// The session is registered and its pending snapshot readable before
    /// this returns, so `subscribe` and `get_session` never miss a session
    /// whose id they were just handed. Each id runs exactly once; the
    /// spawned loop is the only writer.
    pub async fn start_session(&self, grievance_text: impl Into<String>) -> SessionId {
        let session = NegotiationSession::new(grievance_text);
        let id = session.id.clone();
        let ctx = SessionContext::new();

        ctx.publisher.publish(SessionSnapshot::of(&session)).await;
        self.sessions.write().await.insert(
            id.clone(),
            SessionHandle {
                publisher: ctx.publisher.clone(),
                cancel: ctx.cancel.clone(),
            },
        );

        let orchestrator = self.orchestrator.clone();
        tokio::spawn(async move {
            let finished = orchestrator.run(session, &ctx).await;
            debug!(
                session_id = %finished.id,
                status = %finished.status,
                "session task finished"
            );
        });

        info!(session_id = %id, "session started");
        id
    }

    /// Subscribe to the session's snapshot stream.
    ///
    /// One snapshot arrives per loop step; the last one carries a terminal
    /// status. A receiver that falls behind the channel capacity loses the
    /// oldest snapshots, never the newest.
    pub async fn subscribe(&self, id: &str) -> ArenaResult<broadcast::Receiver<SessionSnapshot>> {
        let sessions = self.sessions.read().await;
        let handle = sessions
            .get(id)
            .ok_or_else(|| ArenaError::UnknownSession(id.to_string()))?;
        Ok(handle.publisher.subscribe())
    }

    /// Latest snapshot of the session, or `None` for an unknown id.
    pub async fn get_session(&self, id: &str) -> Option<SessionSnapshot> {
        let publisher = {
            let sessions = self.sessions.read().await;
            sessions.get(id).map(|handle| handle.publisher.clone())
        }?;
        publisher.latest().await
    }

    /// Trip the session's cancellation token.
    ///
    /// Returns `false` for an unknown id. Cancelling a finished session is a
    /// no-op; the loop only observes the token at suspension points.
    pub async fn cancel_session(&self, id: &str) -> bool {
        match self.sessions.read().await.get(id) {
            Some(handle) => {
                info!(session_id = %id, "cancellation requested");
                handle.cancel.cancel();
                true
            }
            None => false,
        }
    }

    /// Number of sessions the registry knows, finished ones included.
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}
