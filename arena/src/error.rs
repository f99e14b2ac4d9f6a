//! Arena error taxonomy with fatality classification.
//!
//! Every failure in the negotiation layer is represented here. Callers can
//! query `is_fatal()` / `reason_code()` without string matching.
//!
//! ## Session effect per variant
//!
//! | Variant        | Fatal | Effect                                      |
//! |----------------|-------|---------------------------------------------|
//! | Validation     | yes   | entry rejected, session aborted             |
//! | Transport      | yes   | session aborted, partial transcript kept    |
//! | Transition     | yes   | session aborted (misuse of the lifecycle)   |
//! | Cancelled      | yes   | session aborted                             |
//! | UnknownSession | yes   | lookup failed, no session touched           |
//! | Persistence    | no    | logged and counted, loop continues          |

use thiserror::Error;

use crate::session::{Speaker, TransitionError};

/// Result alias for negotiation operations.
pub type ArenaResult<T> = Result<T, ArenaError>;

/// A reasoning service reply that breaks the turn contract.
///
/// Only structure and flag placement are checked here; the flag values
/// themselves are the reasoning service's judgment.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Message text is empty after trimming.
    #[error("message is empty after trimming")]
    EmptyMessage,

    /// Reply round differs from the round the scheduler cued.
    #[error("round mismatch: expected {expected}, got {got}")]
    RoundMismatch { expected: u32, got: u32 },

    /// Reply speaker differs from the speaker the scheduler cued.
    #[error("speaker mismatch: expected {expected}, got {got}")]
    SpeakerMismatch { expected: Speaker, got: Speaker },

    /// Round numbers went backwards.
    #[error("non-monotonic round: last {last}, got {got}")]
    NonMonotonicRound { last: u32, got: u32 },

    /// `ethical_violation` set on anything but a governor entry.
    #[error("ethical violation flag on {speaker} entry")]
    MisplacedViolationFlag { speaker: Speaker },

    /// `escalated_response` set outside the slot right after a violation.
    #[error("escalated response flag outside an escalation exchange")]
    MisplacedEscalationFlag,

    /// An arbiter ruling is already recorded; nothing may follow it.
    #[error("no entries may follow the arbiter ruling")]
    EntryAfterRuling,
}

/// Error from the persistent store.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Snapshot could not be serialized.
    #[error("serialize failed: {0}")]
    Serialize(String),

    /// Backend rejected the write.
    #[error("write failed: {0}")]
    Write(String),

    /// Backend read failed.
    #[error("read failed: {0}")]
    Read(String),

    /// The write-behind queue is full; the snapshot was dropped.
    #[error("persistence queue full")]
    QueueFull,

    /// The write-behind worker is gone.
    #[error("persistence channel closed")]
    ChannelClosed,
}

/// Unified error type for negotiation operations.
#[derive(Debug, Error)]
pub enum ArenaError {
    /// The reasoning service reply violated the turn contract.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// The reasoning service call failed (network, non-2xx, malformed body,
    /// or timeout).
    #[error("transport failure: {reason}")]
    Transport { reason: String },

    /// The persistent store rejected a write.
    #[error("persistence failure: {0}")]
    Persistence(#[from] StoreError),

    /// Illegal session status transition.
    #[error("transition failure: {0}")]
    Transition(#[from] TransitionError),

    /// The caller abandoned the session.
    #[error("cancelled")]
    Cancelled,

    /// No session registered under the given id.
    #[error("unknown session: {0}")]
    UnknownSession(String),
}

impl ArenaError {
    /// Short stable code recorded in abort reasons and log fields.
    pub fn reason_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Transport { .. } => "transport",
            Self::Persistence(_) => "persistence",
            Self::Transition(_) => "transition",
            Self::Cancelled => "cancelled",
            Self::UnknownSession(_) => "unknown_session",
        }
    }

    /// Returns `true` if this error must abort the running session.
    ///
    /// Persistence is the only non-fatal case: the in-memory session stays
    /// authoritative and the next snapshot supersedes the lost write.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Persistence(_))
    }

    /// Build a `Transport` variant conveniently.
    pub fn transport(reason: impl Into<String>) -> Self {
        Self::Transport {
            reason: reason.into(),
        }
    }
}
