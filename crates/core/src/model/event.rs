use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::condition::Condition;
use crate::model::feedback::{FeedbackAction, FeedbackKind};
use crate::model::ids::{QuestionId, SessionId};
use crate::model::question::Difficulty;
use crate::model::result::FinishReason;

/// Participant interaction with the feedback controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    ClickedReviewLink,
    ClickedContinue,
    ClickedRetry,
}

impl From<FeedbackAction> for InteractionKind {
    fn from(action: FeedbackAction) -> Self {
        match action {
            FeedbackAction::Continue => InteractionKind::ClickedContinue,
            FeedbackAction::Retry => InteractionKind::ClickedRetry,
            FeedbackAction::Review => InteractionKind::ClickedReviewLink,
        }
    }
}

/// One row of the trial log, tagged by phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrialEvent {
    Assignment {
        condition: Condition,
    },
    Test {
        trial_index: usize,
        question_id: QuestionId,
        question_text: String,
        correct_answer: String,
        response: String,
        correct: bool,
        difficulty: Difficulty,
        rt_ms: u64,
        condition: Condition,
    },
    Feedback {
        feedback_type: FeedbackKind,
        question_id: QuestionId,
        condition: Condition,
    },
    Interaction {
        event: InteractionKind,
        question_id: QuestionId,
        condition: Condition,
    },
    Finished {
        reason: FinishReason,
        condition: Condition,
    },
}

impl TrialEvent {
    #[must_use]
    pub fn phase(&self) -> &'static str {
        match self {
            TrialEvent::Assignment { .. } => "ASSIGNMENT",
            TrialEvent::Test { .. } => "TEST",
            TrialEvent::Feedback { .. } => "FEEDBACK",
            TrialEvent::Interaction { .. } => "INTERACTION",
            TrialEvent::Finished { .. } => "FINISHED",
        }
    }
}

/// A trial event stamped with its session and time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedEvent {
    pub session_id: SessionId,
    pub recorded_at: DateTime<Utc>,
    #[serde(flatten)]
    pub event: TrialEvent,
}

impl RecordedEvent {
    #[must_use]
    pub fn new(session_id: SessionId, recorded_at: DateTime<Utc>, event: TrialEvent) -> Self {
        Self {
            session_id,
            recorded_at,
            event,
        }
    }
}
