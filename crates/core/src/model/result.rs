use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::model::condition::Condition;
use crate::model::ids::SessionId;

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Completed,
    TimedOut,
}

impl FinishReason {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            FinishReason::Completed => "completed",
            FinishReason::TimedOut => "timed_out",
        }
    }
}

impl fmt::Display for FinishReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionResultError {
    #[error("finished_at is before started_at")]
    InvalidTimeRange,

    #[error("correct count ({correct}) exceeds questions attempted ({attempted})")]
    CorrectExceedsAttempted { correct: u32, attempted: u32 },

    #[error("questions attempted ({attempted}) exceeds bank size ({total})")]
    AttemptedExceedsTotal { attempted: u32, total: u32 },
}

/// Score counters for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SessionTally {
    pub correct: u32,
    pub attempted: u32,
    pub total: u32,
}

impl SessionTally {
    /// `correct / attempted`, or `None` when nothing was attempted.
    #[must_use]
    pub fn score(&self) -> Option<f64> {
        if self.attempted == 0 {
            None
        } else {
            Some(f64::from(self.correct) / f64::from(self.attempted))
        }
    }

    fn validate(&self) -> Result<(), SessionResultError> {
        if self.correct > self.attempted {
            return Err(SessionResultError::CorrectExceedsAttempted {
                correct: self.correct,
                attempted: self.attempted,
            });
        }
        if self.attempted > self.total {
            return Err(SessionResultError::AttemptedExceedsTotal {
                attempted: self.attempted,
                total: self.total,
            });
        }
        Ok(())
    }
}

/// Final record of a participant session, handed to the finalization service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionResult {
    session_id: SessionId,
    participant: Option<String>,
    condition: Condition,
    reason: FinishReason,
    tally: SessionTally,
    remaining_seconds: u32,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
    #[serde(default)]
    bonus_per_correct_cents: u32,
}

impl SessionResult {
    /// Rehydrate a result from storage.
    ///
    /// # Errors
    ///
    /// Returns `SessionResultError` if the counters or timestamps are inconsistent.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        session_id: SessionId,
        participant: Option<String>,
        condition: Condition,
        reason: FinishReason,
        tally: SessionTally,
        remaining_seconds: u32,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
    ) -> Result<Self, SessionResultError> {
        if finished_at < started_at {
            return Err(SessionResultError::InvalidTimeRange);
        }
        tally.validate()?;

        Ok(Self {
            session_id,
            participant,
            condition,
            reason,
            tally,
            remaining_seconds,
            started_at,
            finished_at,
            bonus_per_correct_cents: 0,
        })
    }

    /// Record the result of a live session.
    ///
    /// Counters are clamped so `correct <= attempted <= total` and the finish
    /// time never precedes the start.
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn record(
        session_id: SessionId,
        participant: Option<String>,
        condition: Condition,
        reason: FinishReason,
        tally: SessionTally,
        remaining_seconds: u32,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
    ) -> Self {
        let attempted = tally.attempted.min(tally.total);
        let tally = SessionTally {
            correct: tally.correct.min(attempted),
            attempted,
            total: tally.total,
        };

        Self {
            session_id,
            participant,
            condition,
            reason,
            tally,
            remaining_seconds,
            started_at,
            finished_at: finished_at.max(started_at),
            bonus_per_correct_cents: 0,
        }
    }

    /// Sets the rate the participant is paid per correct answer.
    #[must_use]
    pub fn with_bonus_per_correct_cents(mut self, cents: u32) -> Self {
        self.bonus_per_correct_cents = cents;
        self
    }

    #[must_use]
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    #[must_use]
    pub fn participant(&self) -> Option<&str> {
        self.participant.as_deref()
    }

    #[must_use]
    pub fn condition(&self) -> Condition {
        self.condition
    }

    #[must_use]
    pub fn reason(&self) -> FinishReason {
        self.reason
    }

    #[must_use]
    pub fn tally(&self) -> SessionTally {
        self.tally
    }

    #[must_use]
    pub fn correct_count(&self) -> u32 {
        self.tally.correct
    }

    #[must_use]
    pub fn questions_attempted(&self) -> u32 {
        self.tally.attempted
    }

    #[must_use]
    pub fn total_questions(&self) -> u32 {
        self.tally.total
    }

    #[must_use]
    pub fn remaining_seconds(&self) -> u32 {
        self.remaining_seconds
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn finished_at(&self) -> DateTime<Utc> {
        self.finished_at
    }

    #[must_use]
    pub fn timed_out(&self) -> bool {
        self.reason == FinishReason::TimedOut
    }

    /// `None` when no question was attempted.
    #[must_use]
    pub fn score(&self) -> Option<f64> {
        self.tally.score()
    }

    #[must_use]
    pub fn bonus_per_correct_cents(&self) -> u32 {
        self.bonus_per_correct_cents
    }

    /// Bonus earned: one rate per correct answer.
    #[must_use]
    pub fn bonus_cents(&self) -> u32 {
        self.tally.correct.saturating_mul(self.bonus_per_correct_cents)
    }

    /// Bonus in dollars.
    #[must_use]
    pub fn bonus(&self) -> f64 {
        f64::from(self.bonus_cents()) / 100.0
    }

    /// Score as a percentage; an empty session reports zero.
    #[must_use]
    pub fn score_percent(&self) -> f64 {
        self.score().map_or(0.0, |s| s * 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;
    use chrono::Duration;

    fn tally(correct: u32, attempted: u32, total: u32) -> SessionTally {
        SessionTally {
            correct,
            attempted,
            total,
        }
    }

    #[test]
    fn zero_attempts_has_no_score() {
        let now = fixed_now();
        let result = SessionResult::from_persisted(
            SessionId::new_random(),
            None,
            Condition::Static,
            FinishReason::TimedOut,
            tally(0, 0, 6),
            0,
            now,
            now,
        )
        .unwrap();
        assert_eq!(result.score(), None);
        assert!((result.score_percent() - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn persisted_counters_are_checked() {
        let now = fixed_now();
        let err = SessionResult::from_persisted(
            SessionId::new_random(),
            None,
            Condition::Adaptive,
            FinishReason::Completed,
            tally(3, 2, 6),
            10,
            now,
            now,
        )
        .unwrap_err();
        assert!(matches!(err, SessionResultError::CorrectExceedsAttempted { .. }));

        let err = SessionResult::from_persisted(
            SessionId::new_random(),
            None,
            Condition::Adaptive,
            FinishReason::Completed,
            tally(1, 2, 6),
            10,
            now,
            now - Duration::seconds(1),
        )
        .unwrap_err();
        assert_eq!(err, SessionResultError::InvalidTimeRange);
    }

    #[test]
    fn record_clamps_inconsistent_counters() {
        let now = fixed_now();
        let result = SessionResult::record(
            SessionId::new_random(),
            Some("p-1".into()),
            Condition::Adaptive,
            FinishReason::Completed,
            tally(9, 8, 6),
            0,
            now,
            now - Duration::seconds(3),
        );
        assert_eq!(result.questions_attempted(), 6);
        assert_eq!(result.correct_count(), 6);
        assert_eq!(result.finished_at(), now);
        assert_eq!(result.participant(), Some("p-1"));
    }

    #[test]
    fn half_correct_scores_fifty_percent() {
        let now = fixed_now();
        let result = SessionResult::record(
            SessionId::new_random(),
            None,
            Condition::Static,
            FinishReason::TimedOut,
            tally(1, 2, 6),
            0,
            now,
            now,
        );
        assert!((result.score_percent() - 50.0).abs() < 1e-9);
        assert!(result.timed_out());
    }

    #[test]
    fn bonus_pays_per_correct_answer() {
        let now = fixed_now();
        let result = SessionResult::record(
            SessionId::new_random(),
            None,
            Condition::Adaptive,
            FinishReason::Completed,
            tally(4, 6, 6),
            12,
            now,
            now,
        );
        assert_eq!(result.bonus_cents(), 0);

        let result = result.with_bonus_per_correct_cents(2);
        assert_eq!(result.bonus_cents(), 8);
        assert!((result.bonus() - 0.08).abs() < 1e-9);
    }
}
