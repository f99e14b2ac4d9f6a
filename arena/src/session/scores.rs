//! Score ledger — clamped strength counters for the two sides.

use serde::{Deserialize, Serialize};

use super::state::{Speaker, TurnEntry};

/// Lower bound for either score.
pub const SCORE_FLOOR: u32 = 0;
/// Upper bound for either score.
pub const SCORE_CEIL: u32 = 100;
/// Starting value for both sides.
pub const SCORE_START: u32 = 50;

/// Strength scores for the two negotiating sides.
///
/// The ledger is a small immutable value: `apply` returns the successor
/// ledger instead of mutating in place, so no score state is shared across
/// await points. Both counters stay within `[SCORE_FLOOR, SCORE_CEIL]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreLedger {
    /// Sentinel (grievance side) strength.
    pub sentinel: u32,
    /// Governor (administration side) strength.
    pub governor: u32,
}

impl Default for ScoreLedger {
    fn default() -> Self {
        Self {
            sentinel: SCORE_START,
            governor: SCORE_START,
        }
    }
}

impl ScoreLedger {
    /// Level ledger, both sides at the starting value.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ledger after applying one entry's delta to its author's score.
    ///
    /// Arbiter entries carry no score effect.
    pub fn apply(self, entry: &TurnEntry) -> Self {
        match entry.speaker {
            Speaker::Sentinel => Self {
                sentinel: clamped(self.sentinel, entry.score_delta),
                ..self
            },
            Speaker::Governor => Self {
                governor: clamped(self.governor, entry.score_delta),
                ..self
            },
            Speaker::Arbiter => self,
        }
    }

    /// Sentinel share of total strength as a rounded whole percentage.
    ///
    /// Derived on demand, never stored.
    pub fn sentinel_share(self) -> u32 {
        let total = (self.sentinel + self.governor).max(1);
        ((100.0 * f64::from(self.sentinel)) / f64::from(total)).round() as u32
    }
}

fn clamped(current: u32, delta: i32) -> u32 {
    (i64::from(current) + i64::from(delta)).clamp(i64::from(SCORE_FLOOR), i64::from(SCORE_CEIL))
        as u32
}
