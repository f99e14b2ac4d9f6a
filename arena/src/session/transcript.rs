//! Append-only transcript with structural validation.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::escalation;

use super::state::{Speaker, TurnEntry};

/// Ordered, append-only log of turn entries.
///
/// Every append is validated: rounds never decrease, the two sides alternate
/// sentinel then governor with the round advancing after each governor
/// entry, flags sit only where the escalation rules allow, and nothing
/// follows an arbiter ruling. Entries are immutable once appended.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Transcript {
    entries: Vec<TurnEntry>,
}

impl Transcript {
    /// Empty transcript.
    pub fn new() -> Self {
        Self::default()
    }

    /// The round and speaker the alternation expects next.
    ///
    /// Returns `None` once an arbiter ruling is recorded.
    pub fn expected_next(&self) -> Option<(u32, Speaker)> {
        match self.entries.last() {
            None => Some((1, Speaker::Sentinel)),
            Some(last) => match last.speaker {
                Speaker::Sentinel => Some((last.round, Speaker::Governor)),
                Speaker::Governor => Some((last.round + 1, Speaker::Sentinel)),
                Speaker::Arbiter => None,
            },
        }
    }

    /// Append a new entry, enforcing the structural invariants.
    pub fn append(&mut self, entry: TurnEntry) -> Result<(), ValidationError> {
        if entry.message.trim().is_empty() {
            return Err(ValidationError::EmptyMessage);
        }
        escalation::validate_flags(self.entries.last(), &entry)?;

        let Some((round, speaker)) = self.expected_next() else {
            return Err(ValidationError::EntryAfterRuling);
        };

        if entry.speaker == Speaker::Arbiter {
            let last_round = self.last_round();
            if entry.round < last_round {
                return Err(ValidationError::NonMonotonicRound {
                    last: last_round,
                    got: entry.round,
                });
            }
        } else {
            if entry.round != round {
                return Err(ValidationError::RoundMismatch {
                    expected: round,
                    got: entry.round,
                });
            }
            if entry.speaker != speaker {
                return Err(ValidationError::SpeakerMismatch {
                    expected: speaker,
                    got: entry.speaker,
                });
            }
        }

        self.entries.push(entry);
        Ok(())
    }

    /// The arbiter's entry, if a ruling is recorded.
    pub fn ruling(&self) -> Option<&TurnEntry> {
        self.entries
            .last()
            .filter(|e| e.speaker == Speaker::Arbiter)
    }

    /// Count of entries by the two arguing sides.
    pub fn argument_count(&self) -> usize {
        self.entries.len() - usize::from(self.ruling().is_some())
    }

    /// Round of the most recent entry, or 0 when empty.
    pub fn last_round(&self) -> u32 {
        self.entries.last().map(|e| e.round).unwrap_or(0)
    }

    /// The most recent entry.
    pub fn last(&self) -> Option<&TurnEntry> {
        self.entries.last()
    }

    /// All entries, oldest first.
    pub fn entries(&self) -> &[TurnEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Re-check every invariant, as if the entries were appended one by one.
    ///
    /// Deserialization bypasses `append`; loaded transcripts go through this
    /// before being trusted.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut replay = Transcript::new();
        for entry in &self.entries {
            replay.append(entry.clone())?;
        }
        Ok(())
    }
}
