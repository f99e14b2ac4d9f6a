//! Session state machine — statuses, speakers, entries, and transition records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

use super::scores::ScoreLedger;
use super::transcript::Transcript;

/// Unique identifier for a negotiation session.
pub type SessionId = String;

/// Status of a negotiation session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Session created but no turn recorded yet.
    Pending,
    /// At least one turn recorded, negotiation running.
    InProgress,
    /// A consensus was recorded — negotiation succeeded.
    Completed,
    /// The negotiation was interrupted.
    Aborted,
}

impl SessionStatus {
    /// Whether this is a terminal status.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Aborted)
    }

    /// Whether this status allows transition to a new status.
    pub fn can_transition(self) -> bool {
        !self.is_terminal()
    }

    /// Valid transitions from this status.
    pub fn valid_transitions(self) -> &'static [SessionStatus] {
        match self {
            Self::Pending => &[Self::InProgress, Self::Aborted],
            Self::InProgress => &[Self::Completed, Self::Aborted],
            Self::Completed | Self::Aborted => &[],
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::InProgress => write!(f, "in_progress"),
            Self::Completed => write!(f, "completed"),
            Self::Aborted => write!(f, "aborted"),
        }
    }
}

/// Author of a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    /// Argues the grievance filer's side.
    Sentinel,
    /// Argues the administration's side.
    Governor,
    /// Neutral tie-breaker, speaks at most once and always last.
    Arbiter,
}

impl std::fmt::Display for Speaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sentinel => write!(f, "sentinel"),
            Self::Governor => write!(f, "governor"),
            Self::Arbiter => write!(f, "arbiter"),
        }
    }
}

/// A single transcript entry. Immutable once appended.
///
/// Serialized with the portal's camelCase field names; this shape rides in
/// both the reasoning request transcript and client snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnEntry {
    /// Round this entry belongs to (1-indexed).
    pub round: u32,
    /// Who authored the entry.
    pub speaker: Speaker,
    /// The argument or ruling text.
    pub message: String,
    /// Signed adjustment to the author's own score. Ignored for the arbiter.
    pub score_delta: i32,
    /// The entry dismisses a safety concern on budget grounds.
    #[serde(default)]
    pub ethical_violation: bool,
    /// The entry answers a standing ethical violation.
    #[serde(default)]
    pub escalated_response: bool,
    /// When the orchestrator appended the entry.
    pub created_at: DateTime<Utc>,
}

/// A status transition record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusTransition {
    /// Previous status.
    pub from: SessionStatus,
    /// New status.
    pub to: SessionStatus,
    /// When the transition occurred.
    pub timestamp: DateTime<Utc>,
    /// Reason for the transition.
    pub reason: String,
}

/// Error for invalid status transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionError {
    pub from: SessionStatus,
    pub to: SessionStatus,
    pub reason: String,
}

impl std::fmt::Display for TransitionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid transition {} → {}: {}",
            self.from, self.to, self.reason
        )
    }
}

impl std::error::Error for TransitionError {}

/// A negotiation session tracking transcript, scores, and status.
///
/// The running loop holds exclusive ownership of its session; nothing else
/// writes to it until a terminal status is reached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NegotiationSession {
    /// Unique session identifier, assigned at creation.
    pub id: SessionId,
    /// The grievance under negotiation (immutable input).
    pub grievance_text: String,
    /// Append-only turn log.
    pub transcript: Transcript,
    /// Current strength scores.
    pub scores: ScoreLedger,
    /// Current status.
    pub status: SessionStatus,
    /// Ruling text or synthesized fallback, set on completion only.
    pub final_consensus: Option<String>,
    /// Why the negotiation was interrupted, set on abort only.
    pub abort_reason: Option<String>,
    /// Status transition history.
    pub transitions: Vec<StatusTransition>,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
}

impl NegotiationSession {
    /// Create a new pending session with a fresh id and level scores.
    pub fn new(grievance_text: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            grievance_text: grievance_text.into(),
            transcript: Transcript::new(),
            scores: ScoreLedger::new(),
            status: SessionStatus::Pending,
            final_consensus: None,
            abort_reason: None,
            transitions: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Transition to a new status with a reason.
    pub fn transition(&mut self, to: SessionStatus, reason: &str) -> Result<(), TransitionError> {
        if !self.status.valid_transitions().contains(&to) {
            return Err(TransitionError {
                from: self.status,
                to,
                reason: format!(
                    "not a valid transition (allowed: {:?})",
                    self.status.valid_transitions()
                ),
            });
        }

        self.transitions.push(StatusTransition {
            from: self.status,
            to,
            timestamp: Utc::now(),
            reason: reason.to_string(),
        });
        self.status = to;

        Ok(())
    }

    /// Start the negotiation (Pending → InProgress).
    pub fn start(&mut self) -> Result<(), TransitionError> {
        self.transition(SessionStatus::InProgress, "first turn received")
    }

    /// Record the consensus and complete the session.
    pub fn complete(
        &mut self,
        consensus: impl Into<String>,
        reason: &str,
    ) -> Result<(), TransitionError> {
        self.transition(SessionStatus::Completed, reason)?;
        self.final_consensus = Some(consensus.into());
        Ok(())
    }

    /// Abort the session, keeping the transcript and scores so far.
    pub fn abort(&mut self, reason: &str) -> Result<(), TransitionError> {
        self.transition(SessionStatus::Aborted, reason)?;
        self.abort_reason = Some(reason.to_string());
        Ok(())
    }

    /// Append a validated entry and apply its score effect.
    ///
    /// Scores change only when the append itself succeeds.
    pub fn apply_entry(&mut self, entry: TurnEntry) -> Result<(), ValidationError> {
        let next = self.scores.apply(&entry);
        self.transcript.append(entry)?;
        self.scores = next;
        Ok(())
    }

    /// The round in play, or the last recorded round once terminal.
    pub fn current_round(&self) -> u32 {
        if self.status.is_terminal() {
            return self.transcript.last_round();
        }
        match self.transcript.expected_next() {
            Some((round, _)) => round,
            None => self.transcript.last_round(),
        }
    }

    /// Whether the negotiation has ended.
    pub fn is_complete(&self) -> bool {
        self.status.is_terminal()
    }

    /// Compact status line.
    pub fn status_line(&self) -> String {
        format!(
            "[{}] round {} | {} entries | sentinel {} / governor {}",
            self.status,
            self.current_round(),
            self.transcript.len(),
            self.scores.sentinel,
            self.scores.governor
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(round: u32, speaker: Speaker, delta: i32) -> TurnEntry {
        TurnEntry {
            round,
            speaker,
            message: format!("{speaker} argues in round {round}"),
            score_delta: delta,
            ethical_violation: false,
            escalated_response: false,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_new_session() {
        let session = NegotiationSession::new("the thermostat is locked at 17C");
        assert_eq!(session.status, SessionStatus::Pending);
        assert_eq!(session.scores.sentinel, 50);
        assert_eq!(session.scores.governor, 50);
        assert!(session.transcript.is_empty());
        assert!(session.final_consensus.is_none());
        assert!(session.abort_reason.is_none());
        assert!(!session.is_complete());
        assert!(!session.id.is_empty());
    }

    #[test]
    fn test_fresh_ids_are_unique() {
        let a = NegotiationSession::new("grievance");
        let b = NegotiationSession::new("grievance");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_start() {
        let mut session = NegotiationSession::new("grievance");
        session.start().unwrap();
        assert_eq!(session.status, SessionStatus::InProgress);
        assert_eq!(session.transitions.len(), 1);
        assert_eq!(session.transitions[0].from, SessionStatus::Pending);
        assert_eq!(session.transitions[0].to, SessionStatus::InProgress);
    }

    #[test]
    fn test_complete_sets_consensus() {
        let mut session = NegotiationSession::new("grievance");
        session.start().unwrap();
        session.complete("split the difference", "ruling recorded").unwrap();
        assert_eq!(session.status, SessionStatus::Completed);
        assert_eq!(session.final_consensus.as_deref(), Some("split the difference"));
        assert!(session.abort_reason.is_none());
        assert!(session.is_complete());
    }

    #[test]
    fn test_abort_sets_reason() {
        let mut session = NegotiationSession::new("grievance");
        session.start().unwrap();
        session.abort("transport: connection reset").unwrap();
        assert_eq!(session.status, SessionStatus::Aborted);
        assert_eq!(
            session.abort_reason.as_deref(),
            Some("transport: connection reset")
        );
        assert!(session.final_consensus.is_none());
    }

    #[test]
    fn test_abort_from_pending() {
        let mut session = NegotiationSession::new("grievance");
        session.abort("cancelled before the first turn").unwrap();
        assert_eq!(session.status, SessionStatus::Aborted);
    }

    #[test]
    fn test_pending_cannot_complete() {
        let mut session = NegotiationSession::new("grievance");
        let err = session.complete("nope", "ruling recorded").unwrap_err();
        assert_eq!(err.from, SessionStatus::Pending);
        assert_eq!(err.to, SessionStatus::Completed);
        assert!(session.final_consensus.is_none());
    }

    #[test]
    fn test_terminal_no_transitions() {
        let mut session = NegotiationSession::new("grievance");
        session.start().unwrap();
        session.complete("done", "ruling recorded").unwrap();

        let err = session.start().unwrap_err();
        assert_eq!(err.from, SessionStatus::Completed);

        let err = session.abort("too late").unwrap_err();
        assert_eq!(err.from, SessionStatus::Completed);
    }

    #[test]
    fn test_transition_history() {
        let mut session = NegotiationSession::new("grievance");
        session.start().unwrap();
        session.abort("timeout").unwrap();

        assert_eq!(session.transitions.len(), 2);
        assert_eq!(session.transitions[0].to, SessionStatus::InProgress);
        assert_eq!(session.transitions[1].to, SessionStatus::Aborted);
        assert_eq!(session.transitions[1].reason, "timeout");
    }

    #[test]
    fn test_apply_entry_moves_score() {
        let mut session = NegotiationSession::new("grievance");
        session.start().unwrap();
        session.apply_entry(entry(1, Speaker::Sentinel, 8)).unwrap();
        assert_eq!(session.scores.sentinel, 58);
        assert_eq!(session.scores.governor, 50);
        assert_eq!(session.transcript.len(), 1);
    }

    #[test]
    fn test_apply_entry_rejected_leaves_score() {
        let mut session = NegotiationSession::new("grievance");
        session.start().unwrap();
        // first entry must open round 1 as the sentinel
        let err = session.apply_entry(entry(1, Speaker::Governor, -5)).unwrap_err();
        assert!(matches!(err, ValidationError::SpeakerMismatch { .. }));
        assert_eq!(session.scores.governor, 50);
        assert!(session.transcript.is_empty());
    }

    #[test]
    fn test_current_round_tracks_play() {
        let mut session = NegotiationSession::new("grievance");
        assert_eq!(session.current_round(), 1);
        session.start().unwrap();
        session.apply_entry(entry(1, Speaker::Sentinel, 0)).unwrap();
        assert_eq!(session.current_round(), 1);
        session.apply_entry(entry(1, Speaker::Governor, 0)).unwrap();
        assert_eq!(session.current_round(), 2);
    }

    #[test]
    fn test_current_round_frozen_once_terminal() {
        let mut session = NegotiationSession::new("grievance");
        session.start().unwrap();
        session.apply_entry(entry(1, Speaker::Sentinel, 0)).unwrap();
        session.apply_entry(entry(1, Speaker::Governor, 0)).unwrap();
        session.abort("cancelled").unwrap();
        assert_eq!(session.current_round(), 1);
    }

    #[test]
    fn test_status_line() {
        let mut session = NegotiationSession::new("grievance");
        session.start().unwrap();
        session.apply_entry(entry(1, Speaker::Sentinel, 8)).unwrap();
        let line = session.status_line();
        assert!(line.contains("[in_progress]"));
        assert!(line.contains("1 entries"));
        assert!(line.contains("sentinel 58"));
    }

    #[test]
    fn test_status_display() {
        assert_eq!(SessionStatus::Pending.to_string(), "pending");
        assert_eq!(SessionStatus::InProgress.to_string(), "in_progress");
        assert_eq!(SessionStatus::Completed.to_string(), "completed");
        assert_eq!(SessionStatus::Aborted.to_string(), "aborted");
    }

    #[test]
    fn test_speaker_display() {
        assert_eq!(Speaker::Sentinel.to_string(), "sentinel");
        assert_eq!(Speaker::Governor.to_string(), "governor");
        assert_eq!(Speaker::Arbiter.to_string(), "arbiter");
    }

    #[test]
    fn test_speaker_serde_names() {
        assert_eq!(
            serde_json::to_string(&Speaker::Sentinel).unwrap(),
            "\"sentinel\""
        );
        assert_eq!(
            serde_json::to_string(&SessionStatus::InProgress).unwrap(),
            "\"in_progress\""
        );
    }

    #[test]
    fn test_entry_serde_camel_case() {
        let raw = serde_json::to_value(entry(1, Speaker::Sentinel, 8)).unwrap();
        assert!(raw.get("scoreDelta").is_some());
        assert!(raw.get("ethicalViolation").is_some());
        assert!(raw.get("createdAt").is_some());
    }
}
