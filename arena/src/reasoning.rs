//! Reasoning service seam — the external collaborator that writes each turn.
//!
//! The orchestrator never generates argument text itself. It hands the
//! grievance, the transcript so far, and the cued round to a
//! [`ReasoningService`] and gets back one [`TurnReply`]. How the reply is
//! produced is the service's business; this module only fixes the contract.
//!
//! `HttpReasoningService` in the runner crate implements this over the
//! portal's wire format. Tests provide mock implementations.

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::ArenaResult;
use crate::scheduler::TurnCue;
use crate::session::{NegotiationSession, Speaker, TurnEntry};

/// One request for the next turn entry.
///
/// Serialized with the portal's camelCase field names.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnRequest {
    /// The grievance under negotiation.
    pub grievance_text: String,
    /// Round the reply must carry.
    pub round: u32,
    /// Full transcript so far, oldest first.
    pub transcript: Vec<TurnEntry>,
    /// The reply must answer a standing ethical violation.
    #[serde(default)]
    pub escalation_context: bool,
}

impl TurnRequest {
    /// Build the request for a cued turn against the current session state.
    pub fn for_cue(session: &NegotiationSession, cue: TurnCue) -> Self {
        Self {
            grievance_text: session.grievance_text.clone(),
            round: cue.round,
            transcript: session.transcript.entries().to_vec(),
            escalation_context: cue.escalation_context,
        }
    }
}

/// One turn entry as returned by the reasoning service.
///
/// Carries no timestamp; the orchestrator stamps `created_at` on append.
/// The optional flags default to false when the service omits them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnReply {
    pub round: u32,
    pub speaker: Speaker,
    pub message: String,
    pub score_delta: i32,
    #[serde(default)]
    pub ethical_violation: bool,
    #[serde(default)]
    pub escalated_response: bool,
}

impl TurnReply {
    /// Convert to a transcript entry, stamped now.
    pub fn into_entry(self) -> TurnEntry {
        TurnEntry {
            round: self.round,
            speaker: self.speaker,
            message: self.message,
            score_delta: self.score_delta,
            ethical_violation: self.ethical_violation,
            escalated_response: self.escalated_response,
            created_at: Utc::now(),
        }
    }
}

/// Produces the next turn entry for a negotiation.
///
/// One call is outstanding at a time per session; the orchestrator bounds
/// each call with its configured timeout and treats any error as a
/// transport failure that aborts the session.
#[async_trait]
pub trait ReasoningService: Send + Sync {
    /// Produce the next turn entry.
    async fn next_turn(&self, request: TurnRequest) -> ArenaResult<TurnReply>;
}
