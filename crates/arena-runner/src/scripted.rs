//! Scripted reasoning service — replays recorded turn replies.
//!
//! Used for offline demos and for replaying a captured negotiation against
//! the engine. The script is a JSON array of turn replies in wire shape;
//! replies are handed out in order and the script erroring out once empty
//! looks to the engine like any other transport failure.

use std::collections::VecDeque;
use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::sync::Mutex;

use arena::{ArenaError, ArenaResult, ReasoningService, Speaker, TurnReply, TurnRequest};

/// Reasoning service that replays a fixed list of replies.
#[derive(Debug)]
pub struct ScriptedReasoningService {
    replies: Mutex<VecDeque<TurnReply>>,
    total: usize,
}

impl ScriptedReasoningService {
    pub fn from_replies(replies: Vec<TurnReply>) -> Self {
        Self {
            total: replies.len(),
            replies: Mutex::new(replies.into()),
        }
    }

    /// Load a script from a JSON file (an array of wire-shape replies).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read turn script {}", path.display()))?;
        let replies: Vec<TurnReply> = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse turn script {}", path.display()))?;
        Ok(Self::from_replies(replies))
    }

    /// A complete canned negotiation, escalation exchange included.
    pub fn builtin_demo() -> Self {
        Self::from_replies(demo_replies())
    }
}

#[async_trait]
impl ReasoningService for ScriptedReasoningService {
    async fn next_turn(&self, _request: TurnRequest) -> ArenaResult<TurnReply> {
        self.replies.lock().await.pop_front().ok_or_else(|| {
            ArenaError::transport(format!("script exhausted after {} replies", self.total))
        })
    }
}

fn demo_replies() -> Vec<TurnReply> {
    let reply = |round, speaker, message: &str, delta| TurnReply {
        round,
        speaker,
        message: message.to_string(),
        score_delta: delta,
        ethical_violation: false,
        escalated_response: false,
    };

    let mut violation = reply(
        1,
        Speaker::Governor,
        "Remediation is not provided for in this fiscal year's budget; \
         the request is deferred to the next planning cycle.",
        -4,
    );
    violation.ethical_violation = true;

    let mut answer = reply(
        2,
        Speaker::Sentinel,
        "A budget line does not suspend a safety obligation; deferring a \
         hazard is choosing to keep it.",
        12,
    );
    answer.escalated_response = true;

    vec![
        reply(
            1,
            Speaker::Sentinel,
            "The filed grievance describes a concrete, recurring hazard that \
             affects everyone on the floor, not a matter of comfort.",
            8,
        ),
        violation,
        answer,
        reply(
            2,
            Speaker::Governor,
            "The administration does not dispute the concern, only the \
             timeline; interim measures are already in place.",
            6,
        ),
        reply(
            3,
            Speaker::Sentinel,
            "Interim measures lapse without an owner; the grievance asks for \
             a committed date, not reassurance.",
            3,
        ),
        reply(
            3,
            Speaker::Governor,
            "A committed date requires contractor quotes the administration \
             has not yet received.",
            -2,
        ),
        reply(
            4,
            Speaker::Arbiter,
            "Ruling: the administration obtains quotes within two weeks and \
             funds remediation this quarter; the interim measures stay in \
             force with a named owner until the work is done.",
            0,
        ),
    ]
}
