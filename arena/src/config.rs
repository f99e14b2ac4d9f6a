//! Runtime configuration for the negotiation engine.
//!
//! ## Precedence (highest to lowest)
//!
//! 1. Values set explicitly by a caller (or the runner's TOML file)
//! 2. Environment variable overrides (e.g. `ARENA_CALL_TIMEOUT_MS`)
//! 3. Built-in defaults
//!
//! Pacing values are UI concerns: they slow the loop down so a watching
//! client can read each turn as it lands. Correctness never depends on them,
//! and tests zero them out with [`ArenaConfig::unpaced`].

use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::scheduler::RoundLimits;

/// Upper bound on one reasoning service call, in milliseconds.
const DEFAULT_CALL_TIMEOUT_MS: u64 = 30_000;
/// Delay between turns so clients can follow the exchange.
const DEFAULT_TURN_PACE_MS: u64 = 800;
/// Hold after an ethical violation before requesting the answer.
const DEFAULT_ESCALATION_ACK_MS: u64 = 1_500;

const ENV_CALL_TIMEOUT_MS: &str = "ARENA_CALL_TIMEOUT_MS";
const ENV_TURN_PACE_MS: &str = "ARENA_TURN_PACE_MS";
const ENV_ESCALATION_ACK_MS: &str = "ARENA_ESCALATION_ACK_MS";
const ENV_MAX_ROUNDS: &str = "ARENA_MAX_ROUNDS";
const ENV_MAX_ARGUMENTS: &str = "ARENA_MAX_ARGUMENTS";

/// Knobs for the negotiation loop: round limits, call timeout, pacing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    /// Round and entry limits enforced by the scheduler.
    pub limits: RoundLimits,
    /// Upper bound on one reasoning service call, in milliseconds.
    pub call_timeout_ms: u64,
    /// Pause between turns, in milliseconds.
    pub turn_pace_ms: u64,
    /// Acknowledgment hold after an ethical violation, in milliseconds.
    pub escalation_ack_ms: u64,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            limits: RoundLimits {
                max_rounds: env_u32(ENV_MAX_ROUNDS, RoundLimits::default().max_rounds),
                max_arguments: env_u32(ENV_MAX_ARGUMENTS, RoundLimits::default().max_arguments),
            },
            call_timeout_ms: env_u64(ENV_CALL_TIMEOUT_MS, DEFAULT_CALL_TIMEOUT_MS),
            turn_pace_ms: env_u64(ENV_TURN_PACE_MS, DEFAULT_TURN_PACE_MS),
            escalation_ack_ms: env_u64(ENV_ESCALATION_ACK_MS, DEFAULT_ESCALATION_ACK_MS),
        }
    }
}

impl ArenaConfig {
    /// Build from environment, falling back to defaults.
    pub fn from_env() -> Self {
        Self::default()
    }

    /// Default limits and timeout with all pacing delays zeroed.
    pub fn unpaced() -> Self {
        Self {
            turn_pace_ms: 0,
            escalation_ack_ms: 0,
            ..Self::default()
        }
    }

    /// Validate the config; return an error string if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.call_timeout_ms == 0 {
            return Err("call_timeout_ms must be > 0".to_string());
        }
        if self.limits.max_rounds == 0 {
            return Err("max_rounds must be > 0".to_string());
        }
        if self.limits.max_arguments < 2 * self.limits.max_rounds {
            return Err(format!(
                "max_arguments ({}) must cover {} full rounds ({} entries)",
                self.limits.max_arguments,
                self.limits.max_rounds,
                2 * self.limits.max_rounds
            ));
        }
        Ok(())
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    pub fn turn_pace(&self) -> Duration {
        Duration::from_millis(self.turn_pace_ms)
    }

    pub fn escalation_ack(&self) -> Duration {
        Duration::from_millis(self.escalation_ack_ms)
    }
}

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u32(name: &str, default: u32) -> u32 {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        let cfg = ArenaConfig::default();
        cfg.validate().expect("default config should be valid");
        assert_eq!(cfg.limits.max_rounds, 3);
        assert_eq!(cfg.limits.max_arguments, 8);
        assert_eq!(cfg.call_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn unpaced_zeroes_delays_only() {
        let cfg = ArenaConfig::unpaced();
        assert_eq!(cfg.turn_pace(), Duration::ZERO);
        assert_eq!(cfg.escalation_ack(), Duration::ZERO);
        assert_eq!(cfg.call_timeout_ms, ArenaConfig::default().call_timeout_ms);
        cfg.validate().unwrap();
    }

    #[test]
    fn zero_timeout_rejected() {
        let mut cfg = ArenaConfig::default();
        cfg.call_timeout_ms = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn cap_below_round_budget_rejected() {
        let mut cfg = ArenaConfig::default();
        cfg.limits.max_arguments = 5;
        let err = cfg.validate().unwrap_err();
        assert!(err.contains("max_arguments"));
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let cfg: ArenaConfig = serde_json::from_str(r#"{"turn_pace_ms": 0}"#).unwrap();
        assert_eq!(cfg.turn_pace_ms, 0);
        assert_eq!(cfg.call_timeout_ms, ArenaConfig::default().call_timeout_ms);
        assert_eq!(cfg.limits.max_rounds, 3);
    }
}
