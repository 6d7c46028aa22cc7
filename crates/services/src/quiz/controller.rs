use chrono::{DateTime, Utc};
use rand::Rng;
use std::collections::BTreeSet;
use std::fmt;
use tracing::{debug, info, warn};

use quiz_core::model::{
    Condition, FeedbackAction, FeedbackDirective, FinishReason, InteractionKind, Question,
    QuizSettings, RecordedEvent, SessionId, SessionResult, SessionTally, TrialEvent, TrialOutcome,
};
use quiz_core::{Clock, FeedbackPolicy, PerformanceWindow, grade, is_blank};

use super::bank::QuestionBank;
use super::collaborators::{Collaborators, QuestionView};
use super::state::{ScheduledAdvance, TrialState};
use crate::error::TrialError;

//
// ─── OUTCOMES ──────────────────────────────────────────────────────────────────
//

/// Result of delivering a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The response was blank; nothing changed.
    Reprompt,
    /// The response was graded and feedback is showing.
    Feedback(FeedbackDirective),
    /// The session already finished.
    Ignored,
}

/// Result of acknowledging feedback or firing a scheduled advance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AckOutcome {
    /// The remediation link was opened; still in feedback.
    Reviewed,
    /// Moved on to the question at this index.
    Presenting(usize),
    Finished(SessionResult),
    /// Stale or late event, dropped.
    Ignored,
}

/// Result of one countdown tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    Running { remaining_seconds: u32 },
    TimedOut(SessionResult),
    /// The countdown is not armed.
    Ignored,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

struct Session {
    ordered: Vec<Question>,
    current_index: usize,
    correct_count: u32,
    attempted: u32,
    window: PerformanceWindow,
    remaining_seconds: u32,
    started_at: DateTime<Utc>,
    presented_at: DateTime<Utc>,
    offered: BTreeSet<FeedbackAction>,
}

impl Session {
    fn tally(&self) -> SessionTally {
        SessionTally {
            correct: self.correct_count,
            attempted: self.attempted,
            total: u32::try_from(self.ordered.len()).unwrap_or(u32::MAX),
        }
    }
}

//
// ─── CONTROLLER ────────────────────────────────────────────────────────────────
//

/// Drives one participant session from assignment to the final result.
///
/// Single-threaded and event driven: the owner feeds it submissions,
/// acknowledgements, countdown ticks and fired auto-advance tokens. Once
/// `Finished`, every further event is ignored.
pub struct TrialController {
    session_id: SessionId,
    participant: Option<String>,
    policy: FeedbackPolicy,
    settings: QuizSettings,
    bank: QuestionBank,
    clock: Clock,
    collaborators: Collaborators,
    state: TrialState,
    session: Option<Session>,
    pending_advance: Option<ScheduledAdvance>,
    next_token: u64,
    result: Option<SessionResult>,
}

impl TrialController {
    #[must_use]
    pub fn new(
        condition: Condition,
        bank: QuestionBank,
        settings: QuizSettings,
        collaborators: Collaborators,
    ) -> Self {
        Self {
            session_id: SessionId::new_random(),
            participant: None,
            policy: FeedbackPolicy::for_condition(condition, &settings),
            settings,
            bank,
            clock: Clock::default(),
            collaborators,
            state: TrialState::NotStarted,
            session: None,
            pending_advance: None,
            next_token: 0,
            result: None,
        }
    }

    /// Override the clock (usually for deterministic testing).
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn with_session_id(mut self, session_id: SessionId) -> Self {
        self.session_id = session_id;
        self
    }

    #[must_use]
    pub fn with_participant(mut self, participant: impl Into<String>) -> Self {
        self.participant = Some(participant.into());
        self
    }

    #[must_use]
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    #[must_use]
    pub fn condition(&self) -> Condition {
        self.policy.condition()
    }

    #[must_use]
    pub fn settings(&self) -> &QuizSettings {
        &self.settings
    }

    #[must_use]
    pub fn state(&self) -> TrialState {
        self.state
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.state.is_finished()
    }

    /// Question order of this session; empty before `start`.
    #[must_use]
    pub fn ordered_questions(&self) -> &[Question] {
        self.session.as_ref().map_or(&[], |s| s.ordered.as_slice())
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.session.as_ref().map_or(0, |s| s.current_index)
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        let session = self.session.as_ref()?;
        match self.state {
            TrialState::Presenting(i) | TrialState::AwaitingResponse(i) | TrialState::Feedback(i) => {
                session.ordered.get(i)
            }
            TrialState::NotStarted | TrialState::Finished => None,
        }
    }

    #[must_use]
    pub fn correct_count(&self) -> u32 {
        self.session.as_ref().map_or(0, |s| s.correct_count)
    }

    #[must_use]
    pub fn questions_attempted(&self) -> u32 {
        self.session.as_ref().map_or(0, |s| s.attempted)
    }

    #[must_use]
    pub fn remaining_seconds(&self) -> u32 {
        self.session
            .as_ref()
            .map_or(self.settings.time_limit_seconds(), |s| s.remaining_seconds)
    }

    #[must_use]
    pub fn window(&self) -> Option<&PerformanceWindow> {
        self.session.as_ref().map(|s| &s.window)
    }

    /// The auto-advance currently waiting to fire, if any.
    #[must_use]
    pub fn pending_advance(&self) -> Option<ScheduledAdvance> {
        self.pending_advance
    }

    #[must_use]
    pub fn result(&self) -> Option<&SessionResult> {
        self.result.as_ref()
    }

    /// Draw the question order, arm the countdown and present the first question.
    ///
    /// # Errors
    ///
    /// Returns `TrialError::AlreadyStarted` if called twice.
    pub fn start<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<TrialState, TrialError> {
        if self.state != TrialState::NotStarted {
            return Err(TrialError::AlreadyStarted);
        }

        let ordered = self.bank.draw(rng);
        let now = self.clock.now();
        info!(
            session_id = %self.session_id,
            condition = %self.condition(),
            questions = ordered.len(),
            time_limit_seconds = self.settings.time_limit_seconds(),
            "session started"
        );

        self.session = Some(Session {
            ordered,
            current_index: 0,
            correct_count: 0,
            attempted: 0,
            window: PerformanceWindow::new(self.settings.window_size()),
            remaining_seconds: self.settings.time_limit_seconds(),
            started_at: now,
            presented_at: now,
            offered: BTreeSet::new(),
        });

        self.emit(TrialEvent::Assignment {
            condition: self.condition(),
        });
        self.present(0);
        Ok(self.state)
    }

    /// Grade a response and show feedback.
    ///
    /// # Errors
    ///
    /// Returns `TrialError::InvalidEvent` unless a response is awaited. After
    /// the session finished the submission is ignored instead.
    pub fn submit(&mut self, response: &str) -> Result<SubmitOutcome, TrialError> {
        let index = match self.state {
            TrialState::Finished => {
                debug!(session_id = %self.session_id, "submission after finish ignored");
                return Ok(SubmitOutcome::Ignored);
            }
            TrialState::AwaitingResponse(i) => i,
            state => return Err(TrialError::InvalidEvent { event: "submit", state }),
        };

        if is_blank(response) {
            self.collaborators.surface.reprompt();
            return Ok(SubmitOutcome::Reprompt);
        }

        let condition = self.condition();
        let policy = self.policy;
        let invalid = TrialError::InvalidEvent {
            event: "submit",
            state: self.state,
        };
        let Some(session) = self.session.as_mut() else {
            return Err(invalid);
        };
        let Some(question) = session.ordered.get(index) else {
            return Err(invalid);
        };

        let correct = grade(response, question);
        session.attempted += 1;
        if correct {
            session.correct_count += 1;
        }
        session.window.push(correct);

        let outcome = TrialOutcome::new(
            question,
            response.trim(),
            correct,
            self.clock.elapsed_ms(session.presented_at),
        );
        let directive = policy.decide(&outcome, &session.window);
        session.offered = directive.offered_actions.clone();

        let test_event = TrialEvent::Test {
            trial_index: index,
            question_id: question.id().clone(),
            question_text: question.prompt().to_owned(),
            correct_answer: question.canonical_answer().to_owned(),
            response: outcome.raw_response.clone(),
            correct,
            difficulty: question.difficulty(),
            rt_ms: outcome.reaction_time_ms,
            condition,
        };
        let feedback_event = TrialEvent::Feedback {
            feedback_type: directive.kind,
            question_id: question.id().clone(),
            condition,
        };

        debug!(
            session_id = %self.session_id,
            trial = index,
            correct,
            feedback = %directive.kind,
            escalated = directive.kind.is_escalated(),
            "response graded"
        );
        self.emit(test_event);
        self.emit(feedback_event);
        self.collaborators.surface.show_feedback(&directive);
        self.state = TrialState::Feedback(index);

        if let Some(delay) = directive.advance_delay {
            self.next_token += 1;
            self.pending_advance = Some(ScheduledAdvance {
                token: self.next_token,
                delay,
            });
        }

        Ok(SubmitOutcome::Feedback(directive))
    }

    /// Apply the participant's choice after feedback.
    ///
    /// `Continue` and `Retry` advance and cancel any pending auto-advance.
    /// `Review` opens the remediation link and stays on the current question.
    ///
    /// # Errors
    ///
    /// Returns `TrialError::InvalidEvent` outside feedback and
    /// `TrialError::ActionNotOffered` for an action the feedback did not offer.
    pub fn acknowledge(&mut self, action: FeedbackAction) -> Result<AckOutcome, TrialError> {
        let index = match self.state {
            TrialState::Finished => {
                debug!(session_id = %self.session_id, %action, "acknowledgement after finish ignored");
                return Ok(AckOutcome::Ignored);
            }
            TrialState::Feedback(i) => i,
            state => {
                return Err(TrialError::InvalidEvent {
                    event: "acknowledge",
                    state,
                });
            }
        };

        let invalid = TrialError::InvalidEvent {
            event: "acknowledge",
            state: self.state,
        };
        let Some(session) = self.session.as_ref() else {
            return Err(invalid);
        };
        if !session.offered.contains(&action) {
            return Err(TrialError::ActionNotOffered(action));
        }
        let Some(question) = session.ordered.get(index) else {
            return Err(invalid);
        };
        let question_id = question.id().clone();
        let link = question.remediation_link().clone();
        let condition = self.condition();

        let interaction = TrialEvent::Interaction {
            event: InteractionKind::from(action),
            question_id,
            condition,
        };
        if action.advances() {
            self.emit(interaction);
            self.pending_advance = None;
            return Ok(self.advance());
        }

        self.collaborators.surface.open_link(&link);
        self.emit(interaction);
        Ok(AckOutcome::Reviewed)
    }

    /// Fire a scheduled auto-advance.
    ///
    /// Only the currently pending token advances; anything else is stale.
    pub fn fire_advance(&mut self, token: u64) -> AckOutcome {
        match (self.state, self.pending_advance) {
            (TrialState::Feedback(_), Some(pending)) if pending.token == token => {
                self.pending_advance = None;
                self.advance()
            }
            _ => {
                debug!(session_id = %self.session_id, token, "stale auto-advance ignored");
                AckOutcome::Ignored
            }
        }
    }

    /// One countdown unit. Reaching zero finishes the session as timed out,
    /// pre-empting any pending feedback choice or auto-advance.
    pub fn tick(&mut self) -> TickOutcome {
        if !self.state.is_running() {
            return TickOutcome::Ignored;
        }
        let Some(session) = self.session.as_mut() else {
            return TickOutcome::Ignored;
        };

        session.remaining_seconds = session.remaining_seconds.saturating_sub(1);
        let remaining_seconds = session.remaining_seconds;
        if remaining_seconds == 0 {
            return TickOutcome::TimedOut(self.finish(FinishReason::TimedOut));
        }
        TickOutcome::Running { remaining_seconds }
    }

    fn present(&mut self, index: usize) {
        self.state = TrialState::Presenting(index);
        let now = self.clock.now();
        if let Some(session) = self.session.as_mut() {
            session.presented_at = now;
            session.offered.clear();
            if let Some(question) = session.ordered.get(index) {
                let view = QuestionView {
                    question,
                    index,
                    total: session.ordered.len(),
                    remaining_seconds: session.remaining_seconds,
                };
                self.collaborators.surface.show_question(&view);
            }
        }
        self.state = TrialState::AwaitingResponse(index);
        debug!(session_id = %self.session_id, trial = index, "question presented");
    }

    fn advance(&mut self) -> AckOutcome {
        let Some(session) = self.session.as_mut() else {
            return AckOutcome::Ignored;
        };
        session.current_index += 1;
        let next = session.current_index;
        if next >= session.ordered.len() {
            AckOutcome::Finished(self.finish(FinishReason::Completed))
        } else {
            self.present(next);
            AckOutcome::Presenting(next)
        }
    }

    fn finish(&mut self, reason: FinishReason) -> SessionResult {
        // Cancels the countdown and any pending auto-advance.
        self.pending_advance = None;
        self.state = TrialState::Finished;

        let now = self.clock.now();
        let (tally, remaining_seconds, started_at) = match &self.session {
            Some(s) => (s.tally(), s.remaining_seconds, s.started_at),
            None => (SessionTally::default(), 0, now),
        };
        let result = SessionResult::record(
            self.session_id,
            self.participant.clone(),
            self.condition(),
            reason,
            tally,
            remaining_seconds,
            started_at,
            now,
        )
        .with_bonus_per_correct_cents(self.settings.bonus_per_correct_cents());

        self.emit(TrialEvent::Finished {
            reason,
            condition: self.condition(),
        });
        match reason {
            FinishReason::Completed => self.collaborators.surface.show_score_summary(&result),
            FinishReason::TimedOut => self.collaborators.surface.show_timeout_summary(&result),
        }
        if let Err(err) = self.collaborators.finalizer.finalize(&result) {
            warn!(session_id = %self.session_id, %err, "session finalization failed");
        }

        info!(
            session_id = %self.session_id,
            %reason,
            correct = result.correct_count(),
            attempted = result.questions_attempted(),
            bonus_cents = result.bonus_cents(),
            "session finished"
        );
        self.result = Some(result.clone());
        result
    }

    fn emit(&self, event: TrialEvent) {
        let recorded = RecordedEvent::new(self.session_id, self.clock.now(), event);
        if let Err(err) = self.collaborators.trial_log.record(&recorded) {
            warn!(
                session_id = %self.session_id,
                phase = recorded.event.phase(),
                %err,
                "trial log sink failed"
            );
        }
    }
}

impl fmt::Debug for TrialController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrialController")
            .field("session_id", &self.session_id)
            .field("condition", &self.condition())
            .field("state", &self.state)
            .field("current_index", &self.current_index())
            .field("correct_count", &self.correct_count())
            .field("remaining_seconds", &self.remaining_seconds())
            .field("pending_advance", &self.pending_advance)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
