//! Shared error types for the services crate.

use thiserror::Error;

use quiz_core::model::{FeedbackAction, QuestionId};
use storage::repository::StorageError;

use crate::quiz::TrialState;

/// Errors emitted while loading a `QuestionBank`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum BankError {
    #[error("question bank is empty")]
    Empty,
    #[error("duplicate question id: {0}")]
    DuplicateId(QuestionId),
}

/// Errors emitted by the `TrialController` for events it cannot accept.
///
/// None of these are fatal: the controller state is unchanged when one is returned.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TrialError {
    #[error("session already started")]
    AlreadyStarted,
    #[error("{event} is not valid in state {state}")]
    InvalidEvent {
        event: &'static str,
        state: TrialState,
    },
    #[error("action {0} was not offered")]
    ActionNotOffered(FeedbackAction),
}

/// Errors reported by trial-log sinks and the finalization service.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SinkError {
    #[error("recorder channel closed")]
    Closed,
    #[error("sink unavailable: {0}")]
    Unavailable(String),
}

/// Errors emitted by `ResultHistoryService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HistoryError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}
