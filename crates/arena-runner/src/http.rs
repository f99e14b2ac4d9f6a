//! HTTP reasoning service — one JSON POST per turn.
//!
//! The endpoint receives a `TurnRequest` and must answer with a single
//! `TurnReply`, both in the portal's camelCase wire shape. Any connection
//! failure, non-2xx status, or unparseable body is a transport failure; the
//! per-call deadline lives in the orchestrator, not here.

use async_trait::async_trait;
use tracing::debug;

use arena::{ArenaError, ArenaResult, ReasoningService, TurnReply, TurnRequest};

/// Reasoning service backed by a JSON-over-HTTP endpoint.
pub struct HttpReasoningService {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpReasoningService {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl ReasoningService for HttpReasoningService {
    async fn next_turn(&self, request: TurnRequest) -> ArenaResult<TurnReply> {
        debug!(endpoint = %self.endpoint, round = request.round, "posting turn request");

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                ArenaError::transport(format!("request to {} failed: {e}", self.endpoint))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_else(|_| String::new());
            return Err(ArenaError::transport(format!(
                "reasoning endpoint returned {status}: {}",
                body_preview(&body)
            )));
        }

        response
            .json::<TurnReply>()
            .await
            .map_err(|e| ArenaError::transport(format!("malformed turn reply: {e}")))
    }
}

/// First line of an error body, capped, for log-sized diagnostics.
fn body_preview(body: &str) -> String {
    const MAX_CHARS: usize = 200;
    let line = body.lines().next().unwrap_or("");
    if line.chars().count() <= MAX_CHARS {
        line.to_string()
    } else {
        let head: String = line.chars().take(MAX_CHARS).collect();
        format!("{head}...")
    }
}
