//! Turn scheduling — the pure decision function for the negotiation loop.
//!
//! `next_step` inspects a session and says what must happen next: summon a
//! speaker, finalize, or abort. All guard logic lives here so the async loop
//! stays a thin driver. No reasoning calls and no I/O in this module.
//!
//! ## Decision order
//!
//! 1. terminal or inconsistent session → abort
//! 2. arbiter ruling recorded → finalize with the ruling
//! 3. argument cap reached → finalize with the fallback consensus
//! 4. round limit crossed with a full exchange → summon the arbiter
//! 5. otherwise → summon the next speaker in the alternation

use serde::{Deserialize, Serialize};

use crate::escalation;
use crate::session::{NegotiationSession, Speaker};

/// Limits that bound a negotiation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RoundLimits {
    /// Full rounds the two sides may argue before arbitration.
    pub max_rounds: u32,
    /// Hard cap on entries by the two arguing sides.
    pub max_arguments: u32,
}

impl Default for RoundLimits {
    fn default() -> Self {
        Self {
            max_rounds: 3,
            max_arguments: 8,
        }
    }
}

/// A request for one speaker to produce the next entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnCue {
    /// Round the reply must carry.
    pub round: u32,
    /// Speaker the reply must come from.
    pub speaker: Speaker,
    /// The reply must answer a standing ethical violation.
    pub escalation_context: bool,
}

/// Why a session finalizes rather than aborts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FinalizeReason {
    /// An arbiter ruling is recorded; its message becomes the consensus.
    ArbiterRuled { consensus: String },
    /// The argument cap was hit without a ruling.
    ArgumentCapReached,
}

impl FinalizeReason {
    /// Consensus text recorded on completion.
    ///
    /// The cap case synthesizes a deterministic fallback so completion never
    /// depends on a ruling that was never produced.
    pub fn consensus_text(&self) -> String {
        match self {
            Self::ArbiterRuled { consensus } => consensus.clone(),
            Self::ArgumentCapReached => {
                "No ruling was issued: the negotiation reached its turn cap with both sides \
                 unreconciled."
                    .to_string()
            }
        }
    }
}

impl std::fmt::Display for FinalizeReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ArbiterRuled { .. } => write!(f, "arbiter_ruled"),
            Self::ArgumentCapReached => write!(f, "argument_cap_reached"),
        }
    }
}

/// What the negotiation loop must do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Request one entry from the cued speaker.
    Invoke(TurnCue),
    /// Complete the session.
    Finalize(FinalizeReason),
    /// Stop: the session state admits no further work.
    Abort { reason: String },
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Invoke(cue) => write!(f, "invoke({}, round {})", cue.speaker, cue.round),
            Self::Finalize(reason) => write!(f, "finalize({reason})"),
            Self::Abort { .. } => write!(f, "abort"),
        }
    }
}

/// Decide the next step for a session.
///
/// Total over any session state, including snapshots restored from storage:
/// sessions the live loop could never produce (say, a transcript already at
/// the argument cap) still map to a definite action.
pub fn next_step(session: &NegotiationSession, limits: RoundLimits) -> Action {
    if session.status.is_terminal() {
        return Action::Abort {
            reason: format!("no further steps: session is {}", session.status),
        };
    }
    if session.status == crate::session::SessionStatus::Pending
        && !session.transcript.is_empty()
    {
        return Action::Abort {
            reason: "turns recorded on a pending session".to_string(),
        };
    }

    if let Some(ruling) = session.transcript.ruling() {
        return Action::Finalize(FinalizeReason::ArbiterRuled {
            consensus: ruling.message.clone(),
        });
    }

    let arguments = session.transcript.argument_count() as u32;
    if arguments >= limits.max_arguments {
        return Action::Finalize(FinalizeReason::ArgumentCapReached);
    }

    // No ruling recorded, so the alternation always has a successor here.
    let Some((round, speaker)) = session.transcript.expected_next() else {
        return Action::Abort {
            reason: "transcript holds a ruling that is not last".to_string(),
        };
    };

    if round > limits.max_rounds && arguments >= 2 * limits.max_rounds {
        return Action::Invoke(TurnCue {
            round,
            speaker: Speaker::Arbiter,
            escalation_context: false,
        });
    }

    Action::Invoke(TurnCue {
        round,
        speaker,
        escalation_context: escalation::awaiting_escalated_response(&session.transcript),
    })
}
