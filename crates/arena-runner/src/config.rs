//! Runner configuration — environment variables with an optional TOML file.
//!
//! Precedence: values in the TOML file override environment variables,
//! which override the built-in defaults. CLI flags are applied on top by
//! `main`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;

use arena::ArenaConfig;

/// Reasoning service endpoint URL.
pub const ENV_REASONING_URL: &str = "ARENA_REASONING_URL";
/// JSON turn script to replay instead of calling an endpoint.
pub const ENV_SCRIPT_PATH: &str = "ARENA_SCRIPT_PATH";
/// Directory session snapshots are written to.
pub const ENV_STORE_DIR: &str = "ARENA_STORE_DIR";

const DEFAULT_STORE_DIR: &str = "arena-sessions";

/// Top-level runner configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Reasoning endpoint; `None` falls back to the built-in demo script.
    pub reasoning_url: Option<String>,
    /// Turn script to replay; takes precedence over the endpoint.
    pub script_path: Option<PathBuf>,
    /// Where session snapshots land, one JSON file per session.
    pub store_dir: PathBuf,
    /// Engine knobs: round limits, pacing, call timeout.
    pub arena: ArenaConfig,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            reasoning_url: std::env::var(ENV_REASONING_URL).ok(),
            script_path: std::env::var(ENV_SCRIPT_PATH).ok().map(PathBuf::from),
            store_dir: std::env::var(ENV_STORE_DIR)
                .unwrap_or_else(|_| DEFAULT_STORE_DIR.to_string())
                .into(),
            arena: ArenaConfig::default(),
        }
    }
}

impl RunnerConfig {
    /// Load the configuration, overlaying a TOML file when given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read config file {}", path.display()))?;
                toml::from_str::<Self>(&raw)
                    .with_context(|| format!("failed to parse config file {}", path.display()))?
            }
            None => Self::default(),
        };
        config
            .arena
            .validate()
            .map_err(|reason| anyhow!("invalid configuration: {reason}"))?;
        Ok(config)
    }
}

/// Check whether the reasoning endpoint is reachable.
///
/// Any HTTP response counts as reachable; only connection-level failures
/// (refused, DNS, TLS) report false.
pub async fn check_endpoint(url: &str) -> bool {
    reqwest::Client::new()
        .get(url)
        .timeout(Duration::from_secs(5))
        .send()
        .await
        .is_ok()
}
