use std::fmt;
use std::time::Duration;

/// Trial controller states.
///
/// `Presenting` is transient: the controller shows the question and moves on
/// to `AwaitingResponse` in the same step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrialState {
    NotStarted,
    Presenting(usize),
    AwaitingResponse(usize),
    Feedback(usize),
    Finished,
}

impl TrialState {
    /// True while the countdown is armed.
    #[must_use]
    pub fn is_running(self) -> bool {
        matches!(
            self,
            TrialState::Presenting(_) | TrialState::AwaitingResponse(_) | TrialState::Feedback(_)
        )
    }

    #[must_use]
    pub fn is_finished(self) -> bool {
        matches!(self, TrialState::Finished)
    }
}

impl fmt::Display for TrialState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrialState::NotStarted => f.write_str("not_started"),
            TrialState::Presenting(i) => write!(f, "presenting({i})"),
            TrialState::AwaitingResponse(i) => write!(f, "awaiting_response({i})"),
            TrialState::Feedback(i) => write!(f, "feedback({i})"),
            TrialState::Finished => f.write_str("finished"),
        }
    }
}

/// A pending auto-advance.
///
/// The driver waits `delay` and then hands `token` back to the controller. A
/// token that no longer matches the pending advance is stale and ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledAdvance {
    pub token: u64,
    pub delay: Duration,
}
