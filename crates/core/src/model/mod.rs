mod condition;
mod event;
mod feedback;
mod ids;
mod outcome;
mod question;
mod result;
mod settings;

pub use condition::{Condition, ConditionDirective};
pub use event::{InteractionKind, RecordedEvent, TrialEvent};
pub use feedback::{FeedbackAction, FeedbackDirective, FeedbackKind};
pub use ids::{QuestionId, SessionId};
pub use outcome::TrialOutcome;
pub use question::{Difficulty, Question, QuestionDraft, QuestionError};
pub use result::{FinishReason, SessionResult, SessionResultError, SessionTally};
pub use settings::{QuizSettings, QuizSettingsDraft, SettingsError, StaticIncorrect};
