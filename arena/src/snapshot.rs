//! Session snapshots — the read surface clients consume.
//!
//! The running loop publishes one [`SessionSnapshot`] per step through a
//! [`SnapshotPublisher`]: a Tokio broadcast channel for live subscribers plus
//! a latest-value cell for point-in-time reads. During an active run clients
//! read these snapshots, never the persistent store.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, RwLock};
use tracing::debug;

use crate::session::{NegotiationSession, SessionId, SessionStatus, Transcript};

/// Channel capacity for broadcast. Lagging receivers drop the oldest
/// snapshots; the latest-value cell always has the newest.
const CHANNEL_CAPACITY: usize = 256;

/// Shared reference to a SnapshotPublisher.
pub type SharedSnapshotPublisher = Arc<SnapshotPublisher>;

/// Point-in-time view of one negotiation session.
///
/// Serialized with the portal's camelCase field names; this exact shape is
/// also what the persistent store receives.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub session_id: SessionId,
    pub grievance_text: String,
    pub transcript: Transcript,
    pub sentinel_score: u32,
    pub governor_score: u32,
    pub status: SessionStatus,
    pub final_consensus: Option<String>,
    pub abort_reason: Option<String>,
    /// The round in play, or the last recorded round once terminal.
    pub round: u32,
    /// When this snapshot was taken.
    pub taken_at: DateTime<Utc>,
}

impl SessionSnapshot {
    /// Snapshot the current state of a session.
    pub fn of(session: &NegotiationSession) -> Self {
        Self {
            session_id: session.id.clone(),
            grievance_text: session.grievance_text.clone(),
            transcript: session.transcript.clone(),
            sentinel_score: session.scores.sentinel,
            governor_score: session.scores.governor,
            status: session.status,
            final_consensus: session.final_consensus.clone(),
            abort_reason: session.abort_reason.clone(),
            round: session.current_round(),
            taken_at: Utc::now(),
        }
    }

    /// Whether this is the last snapshot a run will publish.
    ///
    /// Subscribers stop reading at the first terminal snapshot; the channel
    /// itself stays open for late point-in-time reads.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Per-session snapshot fan-out: broadcast to subscribers, retain the latest.
pub struct SnapshotPublisher {
    sender: broadcast::Sender<SessionSnapshot>,
    latest: RwLock<Option<SessionSnapshot>>,
}

impl SnapshotPublisher {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            sender,
            latest: RwLock::new(None),
        }
    }

    /// Create a shared reference to this publisher.
    pub fn shared(self) -> SharedSnapshotPublisher {
        Arc::new(self)
    }

    /// Publish a snapshot: update the latest cell, then broadcast.
    pub async fn publish(&self, snapshot: SessionSnapshot) {
        {
            let mut latest = self.latest.write().await;
            *latest = Some(snapshot.clone());
        }

        // No receivers is OK — the latest cell still serves reads.
        match self.sender.send(snapshot) {
            Ok(count) => {
                debug!(receivers = count, "snapshot published");
            }
            Err(_) => {
                debug!("snapshot published (no receivers)");
            }
        }
    }

    /// Subscribe to snapshots published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionSnapshot> {
        self.sender.subscribe()
    }

    /// The most recently published snapshot.
    pub async fn latest(&self) -> Option<SessionSnapshot> {
        self.latest.read().await.clone()
    }

    /// Number of current subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for SnapshotPublisher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot_of_new_session() -> (NegotiationSession, SessionSnapshot) {
        let session = NegotiationSession::new("cafeteria prices doubled overnight");
        let snapshot = SessionSnapshot::of(&session);
        (session, snapshot)
    }

    #[test]
    fn test_snapshot_mirrors_session() {
        let (session, snapshot) = snapshot_of_new_session();
        assert_eq!(snapshot.session_id, session.id);
        assert_eq!(snapshot.sentinel_score, 50);
        assert_eq!(snapshot.governor_score, 50);
        assert_eq!(snapshot.status, SessionStatus::Pending);
        assert_eq!(snapshot.round, 1);
        assert!(!snapshot.is_terminal());
    }

    #[test]
    fn test_terminal_snapshot() {
        let mut session = NegotiationSession::new("grievance");
        session.start().unwrap();
        session.complete("consensus", "ruling recorded").unwrap();
        let snapshot = SessionSnapshot::of(&session);
        assert!(snapshot.is_terminal());
        assert_eq!(snapshot.final_consensus.as_deref(), Some("consensus"));
    }

    #[test]
    fn test_snapshot_wire_names() {
        let (_, snapshot) = snapshot_of_new_session();
        let raw = serde_json::to_value(&snapshot).unwrap();
        assert!(raw.get("sessionId").is_some());
        assert!(raw.get("sentinelScore").is_some());
        assert!(raw.get("governorScore").is_some());
        assert!(raw.get("finalConsensus").is_some());
    }

    #[tokio::test]
    async fn test_publish_subscribe() {
        let publisher = SnapshotPublisher::new();
        let mut receiver = publisher.subscribe();

        let (_, snapshot) = snapshot_of_new_session();
        publisher.publish(snapshot.clone()).await;

        let received = receiver.recv().await.unwrap();
        assert_eq!(received.session_id, snapshot.session_id);
    }

    #[tokio::test]
    async fn test_latest_without_subscribers() {
        let publisher = SnapshotPublisher::new();
        assert!(publisher.latest().await.is_none());
        assert_eq!(publisher.subscriber_count(), 0);

        let (_, snapshot) = snapshot_of_new_session();
        publisher.publish(snapshot.clone()).await;

        let latest = publisher.latest().await.unwrap();
        assert_eq!(latest.session_id, snapshot.session_id);
    }

    #[tokio::test]
    async fn test_multiple_subscribers() {
        let publisher = SnapshotPublisher::new().shared();
        let mut rx1 = publisher.subscribe();
        let mut rx2 = publisher.subscribe();
        assert_eq!(publisher.subscriber_count(), 2);

        let (_, snapshot) = snapshot_of_new_session();
        publisher.publish(snapshot).await;

        let s1 = rx1.recv().await.unwrap();
        let s2 = rx2.recv().await.unwrap();
        assert_eq!(s1.session_id, s2.session_id);
    }

    #[tokio::test]
    async fn test_latest_tracks_newest() {
        let publisher = SnapshotPublisher::new();
        let mut session = NegotiationSession::new("grievance");
        publisher.publish(SessionSnapshot::of(&session)).await;

        session.start().unwrap();
        publisher.publish(SessionSnapshot::of(&session)).await;

        let latest = publisher.latest().await.unwrap();
        assert_eq!(latest.status, SessionStatus::InProgress);
    }
}
