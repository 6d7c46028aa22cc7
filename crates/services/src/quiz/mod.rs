mod assigner;
mod bank;
mod collaborators;
mod controller;
mod state;

// Public API of the quiz subsystem.
pub use assigner::{Assignment, AssignmentSource, ConditionAssigner};
pub use bank::QuestionBank;
pub use collaborators::{
    Collaborators, MemorySink, QuestionView, RenderSurface, SessionFinalizer, TrialLogSink,
};
pub use controller::{AckOutcome, SubmitOutcome, TickOutcome, TrialController};
pub use state::{ScheduledAdvance, TrialState};
