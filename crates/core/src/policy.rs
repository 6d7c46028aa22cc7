//! Feedback policies.
//!
//! A participant gets exactly one policy for the whole session, picked from
//! their `Condition`. Both variants take the same inputs; only the adaptive one
//! looks at the performance window.

use std::collections::BTreeSet;
use std::time::Duration;

use crate::model::{
    Condition, FeedbackAction, FeedbackDirective, FeedbackKind, QuizSettings, StaticIncorrect,
    TrialOutcome,
};
use crate::window::PerformanceWindow;

fn actions(list: &[FeedbackAction]) -> BTreeSet<FeedbackAction> {
    list.iter().copied().collect()
}

//
// ─── STATIC ────────────────────────────────────────────────────────────────────
//

/// Terse, history-independent feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticPolicy {
    pub advance_delay: Duration,
    pub incorrect: StaticIncorrect,
}

impl StaticPolicy {
    #[must_use]
    pub fn decide(&self, outcome: &TrialOutcome<'_>) -> FeedbackDirective {
        if outcome.correct {
            return FeedbackDirective {
                kind: FeedbackKind::StaticPositive,
                message: "Correct.".to_owned(),
                offered_actions: actions(&[FeedbackAction::Continue]),
                revealed_answer: None,
                review_link: None,
                advance_delay: Some(self.advance_delay),
            };
        }

        match self.incorrect {
            StaticIncorrect::ReviewLink => FeedbackDirective {
                kind: FeedbackKind::StaticNegativeWithLink,
                message: "Wrong. Here's a link to review the topic.".to_owned(),
                offered_actions: actions(&[FeedbackAction::Continue, FeedbackAction::Review]),
                revealed_answer: None,
                review_link: Some(outcome.question.remediation_link().clone()),
                advance_delay: None,
            },
            StaticIncorrect::AutoAdvance => FeedbackDirective {
                kind: FeedbackKind::StaticNegative,
                message: "Wrong.".to_owned(),
                offered_actions: actions(&[FeedbackAction::Continue]),
                revealed_answer: None,
                review_link: None,
                advance_delay: Some(self.advance_delay),
            },
        }
    }
}

//
// ─── ADAPTIVE ──────────────────────────────────────────────────────────────────
//

/// Feedback that reacts to recent performance.
///
/// Escalation needs a full window whose proportion correct is at or below
/// `threshold`; a partially filled window never escalates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdaptivePolicy {
    pub threshold: f64,
    pub advance_delay: Duration,
    pub offer_retry: bool,
}

impl AdaptivePolicy {
    #[must_use]
    pub fn should_escalate(&self, window: &PerformanceWindow) -> bool {
        window.is_full()
            && window
                .proportion_correct()
                .is_some_and(|p| p <= self.threshold)
    }

    #[must_use]
    pub fn decide(&self, outcome: &TrialOutcome<'_>, window: &PerformanceWindow) -> FeedbackDirective {
        if outcome.correct {
            return FeedbackDirective {
                kind: FeedbackKind::AdaptivePositive,
                message: "Nice! That's correct. Keep going!".to_owned(),
                offered_actions: actions(&[FeedbackAction::Continue]),
                revealed_answer: None,
                review_link: None,
                advance_delay: Some(self.advance_delay),
            };
        }

        let revealed_answer = Some(outcome.question.canonical_answer().to_owned());
        let review_link = Some(outcome.question.remediation_link().clone());

        if self.should_escalate(window) {
            return FeedbackDirective {
                kind: FeedbackKind::AdaptiveEncourageOfferReview,
                message: "Don't worry, you'll get it next time. Would you like to review the topic?"
                    .to_owned(),
                offered_actions: actions(&[FeedbackAction::Continue, FeedbackAction::Review]),
                revealed_answer,
                review_link,
                advance_delay: None,
            };
        }

        if self.offer_retry {
            FeedbackDirective {
                kind: FeedbackKind::AdaptiveSuggestRetry,
                message: "That's not quite right. Want to try another similar question or review the topic?"
                    .to_owned(),
                offered_actions: actions(&[
                    FeedbackAction::Continue,
                    FeedbackAction::Retry,
                    FeedbackAction::Review,
                ]),
                revealed_answer,
                review_link,
                advance_delay: None,
            }
        } else {
            FeedbackDirective {
                kind: FeedbackKind::AdaptiveSuggestReview,
                message: "That's not quite right. Want to review the topic before moving on?"
                    .to_owned(),
                offered_actions: actions(&[FeedbackAction::Continue, FeedbackAction::Review]),
                revealed_answer,
                review_link,
                advance_delay: None,
            }
        }
    }
}

//
// ─── POLICY ────────────────────────────────────────────────────────────────────
//

/// The feedback policy selected once at session start.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FeedbackPolicy {
    Adaptive(AdaptivePolicy),
    Static(StaticPolicy),
}

impl FeedbackPolicy {
    #[must_use]
    pub fn for_condition(condition: Condition, settings: &QuizSettings) -> Self {
        match condition {
            Condition::Adaptive => FeedbackPolicy::Adaptive(AdaptivePolicy {
                threshold: settings.escalation_threshold(),
                advance_delay: settings.adaptive_advance_delay(),
                offer_retry: settings.offer_retry(),
            }),
            Condition::Static => FeedbackPolicy::Static(StaticPolicy {
                advance_delay: settings.static_advance_delay(),
                incorrect: settings.static_incorrect(),
            }),
        }
    }

    #[must_use]
    pub fn condition(&self) -> Condition {
        match self {
            FeedbackPolicy::Adaptive(_) => Condition::Adaptive,
            FeedbackPolicy::Static(_) => Condition::Static,
        }
    }

    #[must_use]
    pub fn decide(&self, outcome: &TrialOutcome<'_>, window: &PerformanceWindow) -> FeedbackDirective {
        match self {
            FeedbackPolicy::Adaptive(policy) => policy.decide(outcome, window),
            FeedbackPolicy::Static(policy) => policy.decide(outcome),
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
