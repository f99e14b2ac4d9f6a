//! The negotiation loop — drives one session to a terminal state.
//!
//! ## Lifecycle
//!
//! ```text
//! NegotiationOrchestrator::run(session, ctx)
//!   → loop:
//!       next_step(session)          — pure decision: invoke / finalize / abort
//!       pacing pause                — skipped when zero or cancelled
//!       reasoning call              — bounded by the configured timeout
//!       validate → append → score   — rejected replies abort the session
//!       persist + publish snapshot  — write-behind, never awaited
//!   → terminal status reached; the final snapshot is published last
//! ```
//!
//! One reasoning call is outstanding at a time. The session is owned by this
//! loop until it returns; nothing else writes to it (single-writer). Every
//! suspension point races the context's cancellation token so a caller can
//! abandon a stuck session.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::ArenaConfig;
use crate::error::{ArenaError, ArenaResult, ValidationError};
use crate::escalation;
use crate::reasoning::{ReasoningService, TurnReply, TurnRequest};
use crate::scheduler::{next_step, Action, FinalizeReason, TurnCue};
use crate::session::{NegotiationSession, SessionStatus};
use crate::snapshot::{SessionSnapshot, SharedSnapshotPublisher, SnapshotPublisher};
use crate::store::PersistenceQueue;

/// Per-run context: snapshot fan-out and cancellation.
///
/// Handed to `run` by the arena front (or built directly by library
/// callers). Cloneable so a caller can keep the cancel side.
#[derive(Clone)]
pub struct SessionContext {
    /// Snapshot fan-out for subscribers and point-in-time reads.
    pub publisher: SharedSnapshotPublisher,
    /// Trips the run at its next suspension point.
    pub cancel: CancellationToken,
}

impl SessionContext {
    pub fn new() -> Self {
        Self {
            publisher: SnapshotPublisher::new().shared(),
            cancel: CancellationToken::new(),
        }
    }

    /// Returns `true` if cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Abandon the run; it aborts at the next suspension point.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Drives negotiation sessions against a reasoning service.
///
/// One orchestrator serves any number of sessions, one `run` call each;
/// state lives in the session, not here.
pub struct NegotiationOrchestrator {
    service: Arc<dyn ReasoningService>,
    config: ArenaConfig,
    persistence: PersistenceQueue,
}

impl NegotiationOrchestrator {
    pub fn new(
        service: Arc<dyn ReasoningService>,
        config: ArenaConfig,
        persistence: PersistenceQueue,
    ) -> Self {
        Self {
            service,
            config,
            persistence,
        }
    }

    /// Drive a session until its status is terminal, then return it.
    ///
    /// Errors never escape: reasoning failures, contract violations, and
    /// cancellation all land as an Aborted session with the reason recorded.
    /// A session that is already terminal is returned unchanged.
    pub async fn run(
        &self,
        mut session: NegotiationSession,
        ctx: &SessionContext,
    ) -> NegotiationSession {
        info!(
            session_id = %session.id,
            grievance = %preview(&session.grievance_text),
            "negotiation starting"
        );

        loop {
            let action = next_step(&session, self.config.limits);
            debug!(session_id = %session.id, action = %action, "next step");

            match action {
                Action::Invoke(cue) => {
                    if let Err(err) = self.take_turn(&mut session, cue, ctx).await {
                        self.abort_session(&mut session, &err, ctx).await;
                        break;
                    }
                }
                Action::Finalize(reason) => {
                    self.finalize_session(&mut session, reason, ctx).await;
                    break;
                }
                Action::Abort { reason } => {
                    if session.is_complete() {
                        debug!(session_id = %session.id, %reason, "no further steps");
                    } else {
                        warn!(session_id = %session.id, %reason, "scheduler rejected session state");
                        if let Err(e) = session.abort(&reason) {
                            error!(session_id = %session.id, error = %e, "abort transition rejected");
                        }
                        self.checkpoint(&session, ctx).await;
                    }
                    break;
                }
            }
        }

        info!(session_id = %session.id, status = %session.status, "negotiation finished");
        session
    }

    /// Request, validate, and apply one cued turn.
    async fn take_turn(
        &self,
        session: &mut NegotiationSession,
        cue: TurnCue,
        ctx: &SessionContext,
    ) -> ArenaResult<()> {
        if !session.transcript.is_empty() {
            self.pause(self.config.turn_pace(), ctx).await?;
        }
        if cue.escalation_context {
            info!(
                session_id = %session.id,
                round = cue.round,
                "violation standing, holding before the escalated answer"
            );
            self.pause(self.config.escalation_ack(), ctx).await?;
        }

        let reply = self.call_service(session, cue, ctx).await?;
        if session.status == SessionStatus::Pending {
            session.start()?;
        }

        self.validate_reply(session, cue, &reply)?;
        session.apply_entry(reply.into_entry())?;

        let entry = session
            .transcript
            .last()
            .expect("entry was appended this iteration");
        info!(
            session_id = %session.id,
            round = entry.round,
            speaker = %entry.speaker,
            delta = entry.score_delta,
            sentinel = session.scores.sentinel,
            governor = session.scores.governor,
            "turn recorded"
        );
        if escalation::awaiting_escalated_response(&session.transcript) {
            info!(
                session_id = %session.id,
                round = entry.round,
                "safety concern dismissed on budget grounds"
            );
        }

        self.checkpoint(session, ctx).await;
        Ok(())
    }

    /// Check the reply against its cue before it touches the transcript.
    ///
    /// The transcript's own append validation enforces the alternation; the
    /// cue check is what enforces a forced arbiter turn, which the
    /// alternation alone would not demand.
    fn validate_reply(
        &self,
        session: &NegotiationSession,
        cue: TurnCue,
        reply: &TurnReply,
    ) -> ArenaResult<()> {
        if reply.round != cue.round {
            return Err(ValidationError::RoundMismatch {
                expected: cue.round,
                got: reply.round,
            }
            .into());
        }
        if reply.speaker != cue.speaker {
            return Err(ValidationError::SpeakerMismatch {
                expected: cue.speaker,
                got: reply.speaker,
            }
            .into());
        }
        // The hint was delivered; the flag itself is advisory.
        if cue.escalation_context && !reply.escalated_response {
            debug!(
                session_id = %session.id,
                round = cue.round,
                "escalated turn came back without the flag"
            );
        }
        Ok(())
    }

    /// One reasoning call, bounded by the configured timeout and the
    /// cancellation token.
    async fn call_service(
        &self,
        session: &NegotiationSession,
        cue: TurnCue,
        ctx: &SessionContext,
    ) -> ArenaResult<TurnReply> {
        if ctx.is_cancelled() {
            return Err(ArenaError::Cancelled);
        }

        let request = TurnRequest::for_cue(session, cue);
        debug!(
            session_id = %session.id,
            round = cue.round,
            speaker = %cue.speaker,
            escalation = cue.escalation_context,
            "requesting turn"
        );

        tokio::select! {
            _ = ctx.cancel.cancelled() => Err(ArenaError::Cancelled),
            outcome = timeout(self.config.call_timeout(), self.service.next_turn(request)) => {
                match outcome {
                    Ok(result) => result,
                    Err(_) => Err(ArenaError::transport(format!(
                        "reasoning call timed out after {} ms",
                        self.config.call_timeout_ms
                    ))),
                }
            }
        }
    }

    /// Sleep for a pacing interval unless cancelled first.
    async fn pause(&self, duration: Duration, ctx: &SessionContext) -> ArenaResult<()> {
        if duration.is_zero() {
            return Ok(());
        }
        if ctx.is_cancelled() {
            return Err(ArenaError::Cancelled);
        }
        tokio::select! {
            _ = ctx.cancel.cancelled() => Err(ArenaError::Cancelled),
            _ = tokio::time::sleep(duration) => Ok(()),
        }
    }

    async fn finalize_session(
        &self,
        session: &mut NegotiationSession,
        reason: FinalizeReason,
        ctx: &SessionContext,
    ) {
        match session.complete(reason.consensus_text(), &reason.to_string()) {
            Ok(()) => {
                info!(
                    session_id = %session.id,
                    reason = %reason,
                    sentinel = session.scores.sentinel,
                    governor = session.scores.governor,
                    "negotiation completed"
                );
            }
            Err(e) => {
                error!(session_id = %session.id, error = %e, "completion rejected");
                if let Err(abort_err) = session.abort(&format!("transition failure: {e}")) {
                    error!(session_id = %session.id, error = %abort_err, "abort transition rejected");
                }
            }
        }
        self.checkpoint(session, ctx).await;
    }

    async fn abort_session(
        &self,
        session: &mut NegotiationSession,
        err: &ArenaError,
        ctx: &SessionContext,
    ) {
        error!(
            session_id = %session.id,
            code = err.reason_code(),
            error = %err,
            "negotiation interrupted"
        );
        if let Err(e) = session.abort(&err.to_string()) {
            error!(session_id = %session.id, error = %e, "abort transition rejected");
        }
        self.checkpoint(session, ctx).await;
    }

    /// Enqueue the durable write and publish the live snapshot.
    ///
    /// A snapshot that cannot even be enqueued is counted and dropped; the
    /// next step's snapshot supersedes it.
    async fn checkpoint(&self, session: &NegotiationSession, ctx: &SessionContext) {
        let snapshot = SessionSnapshot::of(session);
        if let Err(e) = self.persistence.enqueue(snapshot.clone()) {
            self.persistence.count_failure();
            warn!(session_id = %session.id, error = %e, "snapshot not enqueued for persistence");
        }
        ctx.publisher.publish(snapshot).await;
    }
}

fn preview(text: &str) -> String {
    const MAX_CHARS: usize = 60;
    if text.chars().count() <= MAX_CHARS {
        text.to_string()
    } else {
        let head: String = text.chars().take(MAX_CHARS).collect();
        format!("{head}...")
    }
}
