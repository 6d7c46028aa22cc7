use crate::model::question::Question;

/// Result of grading one submission.
///
/// Short-lived: the controller builds it, hands it to the feedback policy and
/// the trial log, then drops it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrialOutcome<'a> {
    pub question: &'a Question,
    pub raw_response: String,
    pub correct: bool,
    pub reaction_time_ms: u64,
}

impl<'a> TrialOutcome<'a> {
    #[must_use]
    pub fn new(
        question: &'a Question,
        raw_response: impl Into<String>,
        correct: bool,
        reaction_time_ms: u64,
    ) -> Self {
        Self {
            question,
            raw_response: raw_response.into(),
            correct,
            reaction_time_ms,
        }
    }
}
