use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_TIME_LIMIT_SECONDS: u32 = 300;
pub const DEFAULT_WINDOW_SIZE: usize = 3;
pub const DEFAULT_ESCALATION_THRESHOLD: f64 = 0.33;
pub const DEFAULT_ADAPTIVE_ADVANCE_DELAY_MS: u64 = 900;
pub const DEFAULT_STATIC_ADVANCE_DELAY_MS: u64 = 700;
pub const DEFAULT_BONUS_PER_CORRECT_CENTS: u32 = 2;

/// What the static policy does after an incorrect answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StaticIncorrect {
    /// Show a review link and wait for the participant to continue.
    #[default]
    ReviewLink,
    /// Advance after the fixed delay without offering remediation.
    AutoAdvance,
}

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum SettingsError {
    #[error("time limit must be at least one second")]
    ZeroTimeLimit,

    #[error("window size must be at least one")]
    ZeroWindow,

    #[error("escalation threshold must be within [0, 1], got {0}")]
    ThresholdOutOfRange(f64),

    #[error("bonus per correct answer must be a non-negative amount, got {0}")]
    InvalidBonus(f64),
}

/// Raw settings as read from a bank file; every field falls back to its default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuizSettingsDraft {
    pub time_limit_seconds: u32,
    pub window_size: usize,
    pub escalation_threshold: f64,
    pub adaptive_advance_delay_ms: u64,
    pub static_advance_delay_ms: u64,
    pub static_incorrect: StaticIncorrect,
    pub offer_retry: bool,
    /// Dollars paid per correct answer.
    pub bonus_per_correct: f64,
}

impl Default for QuizSettingsDraft {
    fn default() -> Self {
        Self {
            time_limit_seconds: DEFAULT_TIME_LIMIT_SECONDS,
            window_size: DEFAULT_WINDOW_SIZE,
            escalation_threshold: DEFAULT_ESCALATION_THRESHOLD,
            adaptive_advance_delay_ms: DEFAULT_ADAPTIVE_ADVANCE_DELAY_MS,
            static_advance_delay_ms: DEFAULT_STATIC_ADVANCE_DELAY_MS,
            static_incorrect: StaticIncorrect::default(),
            offer_retry: false,
            bonus_per_correct: f64::from(DEFAULT_BONUS_PER_CORRECT_CENTS) / 100.0,
        }
    }
}

impl QuizSettingsDraft {
    /// Validate into usable settings.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError` for a zero time limit, a zero window, a
    /// threshold outside `[0, 1]` or a negative bonus.
    pub fn validate(self) -> Result<QuizSettings, SettingsError> {
        if self.time_limit_seconds == 0 {
            return Err(SettingsError::ZeroTimeLimit);
        }
        let window_size = NonZeroUsize::new(self.window_size).ok_or(SettingsError::ZeroWindow)?;
        if !(0.0..=1.0).contains(&self.escalation_threshold) {
            return Err(SettingsError::ThresholdOutOfRange(self.escalation_threshold));
        }
        if !self.bonus_per_correct.is_finite() || self.bonus_per_correct < 0.0 {
            return Err(SettingsError::InvalidBonus(self.bonus_per_correct));
        }
        // Stored in whole cents.
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let bonus_per_correct_cents = (self.bonus_per_correct * 100.0).round() as u32;

        Ok(QuizSettings {
            time_limit_seconds: self.time_limit_seconds,
            window_size,
            escalation_threshold: self.escalation_threshold,
            adaptive_advance_delay: Duration::from_millis(self.adaptive_advance_delay_ms),
            static_advance_delay: Duration::from_millis(self.static_advance_delay_ms),
            static_incorrect: self.static_incorrect,
            offer_retry: self.offer_retry,
            bonus_per_correct_cents,
        })
    }
}

/// Validated quiz configuration shared by the controller and both policies.
#[derive(Debug, Clone, PartialEq)]
pub struct QuizSettings {
    time_limit_seconds: u32,
    window_size: NonZeroUsize,
    escalation_threshold: f64,
    adaptive_advance_delay: Duration,
    static_advance_delay: Duration,
    static_incorrect: StaticIncorrect,
    offer_retry: bool,
    bonus_per_correct_cents: u32,
}

impl Default for QuizSettings {
    fn default() -> Self {
        Self {
            time_limit_seconds: DEFAULT_TIME_LIMIT_SECONDS,
            window_size: NonZeroUsize::new(DEFAULT_WINDOW_SIZE).unwrap_or(NonZeroUsize::MIN),
            escalation_threshold: DEFAULT_ESCALATION_THRESHOLD,
            adaptive_advance_delay: Duration::from_millis(DEFAULT_ADAPTIVE_ADVANCE_DELAY_MS),
            static_advance_delay: Duration::from_millis(DEFAULT_STATIC_ADVANCE_DELAY_MS),
            static_incorrect: StaticIncorrect::default(),
            offer_retry: false,
            bonus_per_correct_cents: DEFAULT_BONUS_PER_CORRECT_CENTS,
        }
    }
}

impl QuizSettings {
    /// Returns a copy with a different session time budget.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError::ZeroTimeLimit` if `seconds` is zero.
    pub fn with_time_limit(mut self, seconds: u32) -> Result<Self, SettingsError> {
        if seconds == 0 {
            return Err(SettingsError::ZeroTimeLimit);
        }
        self.time_limit_seconds = seconds;
        Ok(self)
    }

    #[must_use]
    pub fn with_static_incorrect(mut self, mode: StaticIncorrect) -> Self {
        self.static_incorrect = mode;
        self
    }

    #[must_use]
    pub fn with_offer_retry(mut self, offer_retry: bool) -> Self {
        self.offer_retry = offer_retry;
        self
    }

    #[must_use]
    pub fn time_limit_seconds(&self) -> u32 {
        self.time_limit_seconds
    }

    #[must_use]
    pub fn window_size(&self) -> NonZeroUsize {
        self.window_size
    }

    #[must_use]
    pub fn escalation_threshold(&self) -> f64 {
        self.escalation_threshold
    }

    #[must_use]
    pub fn adaptive_advance_delay(&self) -> Duration {
        self.adaptive_advance_delay
    }

    #[must_use]
    pub fn static_advance_delay(&self) -> Duration {
        self.static_advance_delay
    }

    #[must_use]
    pub fn static_incorrect(&self) -> StaticIncorrect {
        self.static_incorrect
    }

    #[must_use]
    pub fn offer_retry(&self) -> bool {
        self.offer_retry
    }

    #[must_use]
    pub fn bonus_per_correct_cents(&self) -> u32 {
        self.bonus_per_correct_cents
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_draft_matches_default_settings() {
        let settings = QuizSettingsDraft::default().validate().unwrap();
        assert_eq!(settings, QuizSettings::default());
        assert_eq!(settings.window_size().get(), 3);
        assert_eq!(settings.time_limit_seconds(), 300);
        assert_eq!(settings.bonus_per_correct_cents(), 2);
    }

    #[test]
    fn rejects_degenerate_values() {
        let draft = QuizSettingsDraft {
            time_limit_seconds: 0,
            ..QuizSettingsDraft::default()
        };
        assert_eq!(draft.validate().unwrap_err(), SettingsError::ZeroTimeLimit);

        let draft = QuizSettingsDraft {
            window_size: 0,
            ..QuizSettingsDraft::default()
        };
        assert_eq!(draft.validate().unwrap_err(), SettingsError::ZeroWindow);

        let draft = QuizSettingsDraft {
            escalation_threshold: 1.5,
            ..QuizSettingsDraft::default()
        };
        assert!(matches!(
            draft.validate(),
            Err(SettingsError::ThresholdOutOfRange(_))
        ));
    }

    #[test]
    fn bonus_is_stored_in_cents() {
        let draft: QuizSettingsDraft =
            serde_json::from_str(r#"{"bonus_per_correct": 0.05}"#).unwrap();
        assert_eq!(draft.validate().unwrap().bonus_per_correct_cents(), 5);

        let draft = QuizSettingsDraft {
            bonus_per_correct: -0.01,
            ..QuizSettingsDraft::default()
        };
        assert_eq!(draft.validate().unwrap_err(), SettingsError::InvalidBonus(-0.01));

        let draft = QuizSettingsDraft {
            bonus_per_correct: f64::NAN,
            ..QuizSettingsDraft::default()
        };
        assert!(matches!(draft.validate(), Err(SettingsError::InvalidBonus(_))));
    }

    #[test]
    fn partial_draft_deserializes_with_defaults() {
        let draft: QuizSettingsDraft =
            serde_json::from_str(r#"{"time_limit_seconds": 60, "static_incorrect": "auto_advance"}"#)
                .unwrap();
        let settings = draft.validate().unwrap();
        assert_eq!(settings.time_limit_seconds(), 60);
        assert_eq!(settings.static_incorrect(), StaticIncorrect::AutoAdvance);
        assert_eq!(settings.adaptive_advance_delay(), Duration::from_millis(900));
    }

    #[test]
    fn time_limit_override_rejects_zero() {
        assert!(QuizSettings::default().with_time_limit(0).is_err());
        let s = QuizSettings::default().with_time_limit(5).unwrap();
        assert_eq!(s.time_limit_seconds(), 5);
    }
}
