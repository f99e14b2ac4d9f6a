//! Escalation detection — pure predicates over transcript flags.
//!
//! A governor entry that dismisses a safety complaint on budget grounds
//! arrives flagged `ethical_violation` by the reasoning service. The next
//! sentinel turn is then requested with escalation context so the reply
//! answers the dismissal directly. Everything here is deterministic and
//! synchronous; no reasoning calls happen in this module.

use crate::error::ValidationError;
use crate::session::{Speaker, Transcript, TurnEntry};

/// Whether the next sentinel turn must carry escalation context.
///
/// True exactly when the latest entry is a governor entry flagged as an
/// ethical violation. The flag is consumed by the sentinel's reply: after
/// that reply is appended, this returns false again.
pub fn awaiting_escalated_response(transcript: &Transcript) -> bool {
    matches!(
        transcript.last(),
        Some(e) if e.speaker == Speaker::Governor && e.ethical_violation
    )
}

/// Check flag placement for an entry about to be appended after `prev`.
///
/// `ethical_violation` may only sit on governor entries, and
/// `escalated_response` only on a sentinel entry directly answering a
/// violation. The flag values themselves are the reasoning service's
/// judgment and are not second-guessed here.
pub fn validate_flags(
    prev: Option<&TurnEntry>,
    entry: &TurnEntry,
) -> Result<(), ValidationError> {
    if entry.ethical_violation && entry.speaker != Speaker::Governor {
        return Err(ValidationError::MisplacedViolationFlag {
            speaker: entry.speaker,
        });
    }

    if entry.escalated_response {
        if entry.speaker != Speaker::Sentinel {
            return Err(ValidationError::MisplacedEscalationFlag);
        }
        let answers_violation =
            matches!(prev, Some(p) if p.speaker == Speaker::Governor && p.ethical_violation);
        if !answers_violation {
            return Err(ValidationError::MisplacedEscalationFlag);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn entry(speaker: Speaker, ethical_violation: bool, escalated_response: bool) -> TurnEntry {
        TurnEntry {
            round: 1,
            speaker,
            message: "argument".to_string(),
            score_delta: 0,
            ethical_violation,
            escalated_response,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_detector_fires_on_fresh_violation() {
        let mut transcript = Transcript::new();
        transcript
            .append(entry(Speaker::Sentinel, false, false))
            .unwrap();
        assert!(!awaiting_escalated_response(&transcript));

        transcript
            .append(entry(Speaker::Governor, true, false))
            .unwrap();
        assert!(awaiting_escalated_response(&transcript));
    }

    #[test]
    fn test_detector_consumed_by_the_answer() {
        let mut transcript = Transcript::new();
        transcript
            .append(entry(Speaker::Sentinel, false, false))
            .unwrap();
        transcript
            .append(entry(Speaker::Governor, true, false))
            .unwrap();

        let mut answer = entry(Speaker::Sentinel, false, true);
        answer.round = 2;
        transcript.append(answer).unwrap();
        assert!(!awaiting_escalated_response(&transcript));
    }

    #[test]
    fn test_quiet_governor_entry_does_not_fire() {
        let mut transcript = Transcript::new();
        transcript
            .append(entry(Speaker::Sentinel, false, false))
            .unwrap();
        transcript
            .append(entry(Speaker::Governor, false, false))
            .unwrap();
        assert!(!awaiting_escalated_response(&transcript));
    }

    #[test]
    fn test_empty_transcript_does_not_fire() {
        assert!(!awaiting_escalated_response(&Transcript::new()));
    }

    #[test]
    fn test_violation_flag_rejected_off_governor() {
        for speaker in [Speaker::Sentinel, Speaker::Arbiter] {
            let err = validate_flags(None, &entry(speaker, true, false)).unwrap_err();
            assert_eq!(err, ValidationError::MisplacedViolationFlag { speaker });
        }
    }

    #[test]
    fn test_violation_flag_accepted_on_governor() {
        let prev = entry(Speaker::Sentinel, false, false);
        assert!(validate_flags(Some(&prev), &entry(Speaker::Governor, true, false)).is_ok());
    }

    #[test]
    fn test_escalated_response_rejected_without_violation() {
        let prev = entry(Speaker::Governor, false, false);
        let err =
            validate_flags(Some(&prev), &entry(Speaker::Sentinel, false, true)).unwrap_err();
        assert_eq!(err, ValidationError::MisplacedEscalationFlag);

        let err = validate_flags(None, &entry(Speaker::Sentinel, false, true)).unwrap_err();
        assert_eq!(err, ValidationError::MisplacedEscalationFlag);
    }

    #[test]
    fn test_escalated_response_rejected_off_sentinel() {
        let prev = entry(Speaker::Governor, true, false);
        let err =
            validate_flags(Some(&prev), &entry(Speaker::Arbiter, false, true)).unwrap_err();
        assert_eq!(err, ValidationError::MisplacedEscalationFlag);
    }

    #[test]
    fn test_escalated_response_accepted_in_slot() {
        let prev = entry(Speaker::Governor, true, false);
        assert!(validate_flags(Some(&prev), &entry(Speaker::Sentinel, false, true)).is_ok());
    }

    #[test]
    fn test_plain_entries_pass() {
        assert!(validate_flags(None, &entry(Speaker::Sentinel, false, false)).is_ok());
        let prev = entry(Speaker::Sentinel, false, false);
        assert!(validate_flags(Some(&prev), &entry(Speaker::Governor, false, false)).is_ok());
    }
}
