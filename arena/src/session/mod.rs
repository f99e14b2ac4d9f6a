//! Session model — status machine, transcript, and score ledger.
//!
//! # Session flow
//!
//! ```text
//! Pending → InProgress → Completed   (ruling or argument cap)
//!    │           │
//!    └───────────┴─────→ Aborted     (failure or cancellation)
//! ```
//!
//! A session's transcript and scores only ever change through validated
//! appends; terminal statuses are final.

pub mod scores;
pub mod state;
pub mod transcript;

pub use scores::{ScoreLedger, SCORE_CEIL, SCORE_FLOOR, SCORE_START};
pub use state::{
    NegotiationSession, SessionId, SessionStatus, Speaker, StatusTransition, TransitionError,
    TurnEntry,
};
pub use transcript::Transcript;
