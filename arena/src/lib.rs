//! Negotiation Orchestrator — "the Arena"
//!
//! Turn-based engine behind the grievance portal: it drives a multi-round
//! deliberation over a submitted grievance, keeps two bounded strength
//! scores, detects the escalation pattern (a safety complaint answered with
//! a budget objection), and forces a neutral ruling when the rounds run out.
//!
//! # What lives where
//!
//! - `session` — the state machine: statuses, speakers, the append-only
//!   transcript, and the score ledger
//! - `scheduler` — pure `next_step(session) -> Action` decision function
//! - `escalation` — flag-placement rules and the unanswered-violation check
//! - `reasoning` — the `ReasoningService` seam and its wire DTOs
//! - `store` — the `SessionStore` seam, the in-memory store, and the
//!   write-behind persistence worker
//! - `snapshot` — client-facing snapshots and their broadcast publisher
//! - `orchestrator` — the async loop driving one session to a terminal state
//! - `arena` — the front: start, subscribe, read, cancel
//! - `config` / `error` — knobs and the failure taxonomy
//!
//! # Flow
//!
//! ```text
//! Arena::start_session(grievance)
//!   └─ spawn NegotiationOrchestrator::run
//!        loop: next_step → reasoning call → validate → append → score
//!              → persist (write-behind) → publish snapshot
//!        until: arbiter ruling | argument cap | failure | cancellation
//! ```
//!
//! The reasoning service and the persistent store are trait seams; the
//! runner binary wires HTTP and JSON-file implementations, tests wire
//! scripted and in-memory ones.

pub mod arena;
pub mod config;
pub mod error;
pub mod escalation;
pub mod orchestrator;
pub mod reasoning;
pub mod scheduler;
pub mod session;
pub mod snapshot;
pub mod store;

// Re-export the client surface
pub use arena::{Arena, SharedArena};

// Re-export key session types
pub use session::{
    NegotiationSession, ScoreLedger, SessionId, SessionStatus, Speaker, StatusTransition,
    Transcript, TransitionError, TurnEntry,
};

// Re-export scheduler types
pub use scheduler::{next_step, Action, FinalizeReason, RoundLimits, TurnCue};

// Re-export the reasoning seam
pub use reasoning::{ReasoningService, TurnReply, TurnRequest};

// Re-export snapshot types
pub use snapshot::{SessionSnapshot, SharedSnapshotPublisher, SnapshotPublisher};

// Re-export persistence types
pub use store::{spawn_write_behind, MemoryStore, PersistenceQueue, SessionStore};

// Re-export loop and configuration types
pub use config::ArenaConfig;
pub use orchestrator::{NegotiationOrchestrator, SessionContext};

// Re-export the error taxonomy
pub use error::{ArenaError, ArenaResult, StoreError, ValidationError};
