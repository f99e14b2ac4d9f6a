//! Arena runner — drive one negotiation end to end from the terminal.
//!
//! # Usage
//!
//! ```bash
//! # Offline demo (built-in turn script)
//! arena-runner --grievance "the thermostat is locked at 17C"
//!
//! # Against a live reasoning endpoint
//! ARENA_REASONING_URL=http://localhost:9000/turn \
//!     arena-runner --grievance "the archive room has no fire suppression"
//!
//! # Replay a recorded script
//! arena-runner --grievance "..." --script turns.json
//!
//! # Inspect a stored session
//! arena-runner --show 6f9a1c3e-...
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use arena::{
    spawn_write_behind, Arena, ReasoningService, SessionSnapshot, SessionStatus, SessionStore,
    TurnEntry,
};
use arena_runner::{
    check_endpoint, HttpReasoningService, JsonFileStore, RunnerConfig, ScriptedReasoningService,
};

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Grievance text to negotiate
    #[arg(long)]
    grievance: Option<String>,

    /// JSON turn script to replay instead of calling an endpoint
    #[arg(long)]
    script: Option<PathBuf>,

    /// Reasoning service endpoint (overrides ARENA_REASONING_URL)
    #[arg(long)]
    endpoint: Option<String>,

    /// Directory for session snapshots (overrides ARENA_STORE_DIR)
    #[arg(long)]
    store_dir: Option<PathBuf>,

    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print a stored session as JSON and exit
    #[arg(long)]
    show: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();
    let mut config = RunnerConfig::load(args.config.as_deref())?;
    if let Some(endpoint) = args.endpoint {
        config.reasoning_url = Some(endpoint);
    }
    if let Some(script) = args.script {
        config.script_path = Some(script);
    }
    if let Some(dir) = args.store_dir {
        config.store_dir = dir;
    }

    if let Some(id) = args.show {
        return show_session(&config, &id).await;
    }
    let Some(grievance) = args.grievance else {
        bail!("pass --grievance to start a negotiation, or --show <id> to inspect one");
    };

    let service = build_service(&config).await?;
    let store = JsonFileStore::new(config.store_dir.clone())
        .await
        .context("failed to open the session store")?;
    let (queue, worker) = spawn_write_behind(Arc::new(store));
    let arena = Arena::new(service, config.arena, queue).shared();

    let id = arena.start_session(grievance).await;
    info!(
        session_id = %id,
        store = %config.store_dir.display(),
        "negotiation started"
    );

    let mut snapshots = arena.subscribe(&id).await?;
    let mut printed = 0usize;
    let final_snapshot = loop {
        tokio::select! {
            received = snapshots.recv() => match received {
                Ok(snapshot) => {
                    printed = print_new_entries(&snapshot, printed);
                    if snapshot.is_terminal() {
                        break snapshot;
                    }
                }
                Err(RecvError::Lagged(missed)) => {
                    warn!(missed, "snapshot stream lagged");
                }
                Err(RecvError::Closed) => {
                    bail!("snapshot stream closed before the session ended");
                }
            },
            _ = tokio::signal::ctrl_c() => {
                warn!(session_id = %id, "interrupt received, cancelling the session");
                arena.cancel_session(&id).await;
            }
        }
    };

    print_outcome(&final_snapshot);

    // release the queue so the write-behind worker drains and exits
    drop(arena);
    worker.await.context("persistence worker panicked")?;
    info!(session_id = %final_snapshot.session_id, "session written to disk");
    Ok(())
}

/// Pick the reasoning service: script replay, live endpoint, or the demo.
async fn build_service(config: &RunnerConfig) -> Result<Arc<dyn ReasoningService>> {
    if let Some(path) = &config.script_path {
        info!(script = %path.display(), "replaying a recorded turn script");
        let service = ScriptedReasoningService::from_file(path).await?;
        return Ok(Arc::new(service));
    }
    if let Some(url) = &config.reasoning_url {
        if check_endpoint(url).await {
            info!(endpoint = %url, "reasoning endpoint reachable");
        } else {
            warn!(endpoint = %url, "reasoning endpoint did not answer a probe; calls may time out");
        }
        return Ok(Arc::new(HttpReasoningService::new(url.clone())));
    }
    info!("no endpoint or script configured, running the built-in demo");
    Ok(Arc::new(ScriptedReasoningService::builtin_demo()))
}

/// Print entries this snapshot added; returns the new printed count.
fn print_new_entries(snapshot: &SessionSnapshot, already: usize) -> usize {
    for entry in &snapshot.transcript.entries()[already..] {
        println!("{}", format_entry(entry));
    }
    snapshot.transcript.len()
}

fn format_entry(entry: &TurnEntry) -> String {
    let marker = if entry.ethical_violation {
        "  [dismisses a safety concern on budget grounds]"
    } else if entry.escalated_response {
        "  [escalated response]"
    } else {
        ""
    };
    format!(
        "round {} | {:<8} ({:+3}) {}{}",
        entry.round, entry.speaker, entry.score_delta, entry.message, marker
    )
}

fn print_outcome(snapshot: &SessionSnapshot) {
    println!();
    match snapshot.status {
        SessionStatus::Completed => {
            println!(
                "consensus: {}",
                snapshot.final_consensus.as_deref().unwrap_or("(none recorded)")
            );
        }
        SessionStatus::Aborted => {
            println!(
                "negotiation interrupted: {}",
                snapshot.abort_reason.as_deref().unwrap_or("(no reason recorded)")
            );
        }
        SessionStatus::Pending | SessionStatus::InProgress => {}
    }
    println!(
        "final standing: sentinel {} / governor {} | {} entries through round {}",
        snapshot.sentinel_score,
        snapshot.governor_score,
        snapshot.transcript.len(),
        snapshot.round,
    );
    println!(
        "recorded at {}",
        snapshot.taken_at.with_timezone(&chrono::Local)
    );
}

async fn show_session(config: &RunnerConfig, id: &str) -> Result<()> {
    let store = JsonFileStore::new(config.store_dir.clone())
        .await
        .context("failed to open the session store")?;
    match store.load(id).await? {
        Some(snapshot) => {
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
            Ok(())
        }
        None => bail!("no session {id} under {}", config.store_dir.display()),
    }
}
