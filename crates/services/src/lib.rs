#![forbid(unsafe_code)]

pub mod error;
pub mod history;
pub mod quiz;
pub mod recorder;

pub use quiz_core::Clock;

pub use error::{BankError, HistoryError, SinkError, TrialError};
pub use history::{ConditionStats, ResultHistoryService, SessionExport, summarize_by_condition};
pub use quiz::{
    AckOutcome, Assignment, AssignmentSource, Collaborators, ConditionAssigner, MemorySink,
    QuestionBank, QuestionView, RenderSurface, ScheduledAdvance, SessionFinalizer, SubmitOutcome,
    TickOutcome, TrialController, TrialLogSink, TrialState,
};
pub use recorder::{ChannelSink, RecordMessage, Recorder, RecorderReport};
