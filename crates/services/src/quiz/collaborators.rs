use std::fmt;
use std::sync::{Arc, Mutex};

use quiz_core::model::{FeedbackDirective, Question, RecordedEvent, SessionResult};
use url::Url;

use crate::error::SinkError;

/// What the surface needs to show a question.
#[derive(Debug, Clone, Copy)]
pub struct QuestionView<'a> {
    pub question: &'a Question,
    pub index: usize,
    pub total: usize,
    pub remaining_seconds: u32,
}

/// Presentation side effects. The controller never reads anything back.
pub trait RenderSurface {
    fn show_question(&self, view: &QuestionView<'_>);

    fn show_feedback(&self, directive: &FeedbackDirective);

    /// The last response was blank; ask again.
    fn reprompt(&self);

    /// Open a remediation link.
    fn open_link(&self, link: &Url);

    fn show_score_summary(&self, result: &SessionResult);

    fn show_timeout_summary(&self, result: &SessionResult);
}

/// Fire-and-forget trial log. Failures are logged by the caller and dropped.
pub trait TrialLogSink: Send + Sync {
    /// Record one event.
    ///
    /// # Errors
    ///
    /// Returns `SinkError` if the event could not be queued.
    fn record(&self, event: &RecordedEvent) -> Result<(), SinkError>;
}

/// Receives the final result exactly once, when the session finishes.
pub trait SessionFinalizer: Send + Sync {
    /// Hand off the result for persistence and the post-quiz phase.
    ///
    /// # Errors
    ///
    /// Returns `SinkError` if the hand-off failed.
    fn finalize(&self, result: &SessionResult) -> Result<(), SinkError>;
}

/// External collaborators injected into a `TrialController`.
pub struct Collaborators {
    pub surface: Box<dyn RenderSurface>,
    pub trial_log: Arc<dyn TrialLogSink>,
    pub finalizer: Arc<dyn SessionFinalizer>,
}

impl Collaborators {
    #[must_use]
    pub fn new(
        surface: Box<dyn RenderSurface>,
        trial_log: Arc<dyn TrialLogSink>,
        finalizer: Arc<dyn SessionFinalizer>,
    ) -> Self {
        Self {
            surface,
            trial_log,
            finalizer,
        }
    }
}

impl fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}

/// Keeps events and results in memory. Used for dry runs and tests.
#[derive(Clone, Default)]
pub struct MemorySink {
    events: Arc<Mutex<Vec<RecordedEvent>>>,
    results: Arc<Mutex<Vec<SessionResult>>>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events.lock().map(|g| g.clone()).unwrap_or_default()
    }

    #[must_use]
    pub fn results(&self) -> Vec<SessionResult> {
        self.results.lock().map(|g| g.clone()).unwrap_or_default()
    }

    /// Phase labels of recorded events, in order.
    #[must_use]
    pub fn phases(&self) -> Vec<&'static str> {
        self.events().iter().map(|e| e.event.phase()).collect()
    }
}

impl TrialLogSink for MemorySink {
    fn record(&self, event: &RecordedEvent) -> Result<(), SinkError> {
        let mut guard = self
            .events
            .lock()
            .map_err(|e| SinkError::Unavailable(e.to_string()))?;
        guard.push(event.clone());
        Ok(())
    }
}

impl SessionFinalizer for MemorySink {
    fn finalize(&self, result: &SessionResult) -> Result<(), SinkError> {
        let mut guard = self
            .results
            .lock()
            .map_err(|e| SinkError::Unavailable(e.to_string()))?;
        guard.push(result.clone());
        Ok(())
    }
}
