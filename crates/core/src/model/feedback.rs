use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;
use url::Url;

/// Follow-up a participant can pick after feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackAction {
    Continue,
    Retry,
    Review,
}

impl FeedbackAction {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            FeedbackAction::Continue => "continue",
            FeedbackAction::Retry => "retry",
            FeedbackAction::Review => "review",
        }
    }

    /// `Continue` and `Retry` move on to the next question; `Review` does not.
    #[must_use]
    pub fn advances(self) -> bool {
        !matches!(self, FeedbackAction::Review)
    }
}

impl fmt::Display for FeedbackAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which feedback branch produced a directive. Logged with every `FEEDBACK` event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackKind {
    AdaptivePositive,
    AdaptiveEncourageOfferReview,
    AdaptiveSuggestReview,
    AdaptiveSuggestRetry,
    StaticPositive,
    StaticNegativeWithLink,
    StaticNegative,
}

impl FeedbackKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            FeedbackKind::AdaptivePositive => "adaptive_positive",
            FeedbackKind::AdaptiveEncourageOfferReview => "adaptive_encourage_offer_review",
            FeedbackKind::AdaptiveSuggestReview => "adaptive_suggest_review",
            FeedbackKind::AdaptiveSuggestRetry => "adaptive_suggest_retry",
            FeedbackKind::StaticPositive => "static_positive",
            FeedbackKind::StaticNegativeWithLink => "static_negative_with_link",
            FeedbackKind::StaticNegative => "static_negative",
        }
    }

    /// True for the escalated, explicitly supportive adaptive branch.
    #[must_use]
    pub fn is_escalated(self) -> bool {
        matches!(self, FeedbackKind::AdaptiveEncourageOfferReview)
    }
}

impl fmt::Display for FeedbackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What to show after a graded submission and how the trial may proceed.
///
/// `advance_delay` is set when the trial advances on its own; the controller
/// turns it into a cancellable scheduled advance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedbackDirective {
    pub kind: FeedbackKind,
    pub message: String,
    pub offered_actions: BTreeSet<FeedbackAction>,
    pub revealed_answer: Option<String>,
    pub review_link: Option<Url>,
    pub advance_delay: Option<Duration>,
}

impl FeedbackDirective {
    #[must_use]
    pub fn offers(&self, action: FeedbackAction) -> bool {
        self.offered_actions.contains(&action)
    }

    #[must_use]
    pub fn auto_advances(&self) -> bool {
        self.advance_delay.is_some()
    }
}
