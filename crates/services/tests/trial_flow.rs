use std::sync::Arc;

use quiz_core::model::{
    Condition, Difficulty, FeedbackAction, FeedbackDirective, FeedbackKind, FinishReason,
    QuestionDraft, QuizSettings, SessionResult, StaticIncorrect, TrialEvent,
};
use quiz_core::time::fixed_clock;
use rand::SeedableRng;
use rand::rngs::StdRng;
use services::{
    AckOutcome, Collaborators, MemorySink, QuestionBank, QuestionView, Recorder, RenderSurface,
    ResultHistoryService, SubmitOutcome, TickOutcome, TrialController, TrialState,
};
use storage::repository::Storage;
use url::Url;

struct Silent;

impl RenderSurface for Silent {
    fn show_question(&self, _view: &QuestionView<'_>) {}
    fn show_feedback(&self, _directive: &FeedbackDirective) {}
    fn reprompt(&self) {}
    fn open_link(&self, _link: &Url) {}
    fn show_score_summary(&self, _result: &SessionResult) {}
    fn show_timeout_summary(&self, _result: &SessionResult) {}
}

fn calculus_bank() -> QuestionBank {
    let rows = [
        ("d1", "What is the derivative of 5x?", "5", Difficulty::Easy),
        ("d2", "What is the derivative of sin(x)?", "cos(x)", Difficulty::Easy),
        ("d3", "What is the derivative of e^x?", "e^x", Difficulty::Easy),
        ("i1", "What is the integral of 2x from 0 to 2?", "4", Difficulty::Difficult),
        ("i2", "What is the integral of 1/x?", "ln(x)", Difficulty::Difficult),
        ("i3", "What is the integral of cos(x)?", "sin(x)", Difficulty::Difficult),
    ];
    QuestionBank::load(
        rows.iter()
            .map(|(id, prompt, answer, difficulty)| {
                QuestionDraft {
                    id: (*id).into(),
                    prompt: (*prompt).into(),
                    answer: (*answer).into(),
                    aliases: Vec::new(),
                    difficulty: *difficulty,
                    remediation_link: format!("https://example.org/calculus/{id}"),
                }
                .validate()
                .unwrap()
            })
            .collect(),
    )
    .unwrap()
}

fn controller(condition: Condition, sink: &MemorySink) -> TrialController {
    let collaborators = Collaborators::new(
        Box::new(Silent),
        Arc::new(sink.clone()),
        Arc::new(sink.clone()),
    );
    TrialController::new(condition, calculus_bank(), QuizSettings::default(), collaborators)
        .with_clock(fixed_clock())
}

fn correct_answer(c: &TrialController) -> String {
    c.current_question().unwrap().canonical_answer().to_owned()
}

#[test]
fn static_all_correct_completes_with_full_score() {
    let sink = MemorySink::new();
    let mut c = controller(Condition::Static, &sink);
    c.start(&mut StdRng::seed_from_u64(11)).unwrap();

    let mut finished = None;
    for i in 0..6 {
        let answer = correct_answer(&c);
        let SubmitOutcome::Feedback(directive) = c.submit(&answer).unwrap() else {
            panic!("expected feedback for trial {i}");
        };
        assert_eq!(directive.kind, FeedbackKind::StaticPositive);
        let token = c.pending_advance().unwrap().token;
        match c.fire_advance(token) {
            AckOutcome::Presenting(next) => assert_eq!(next, i + 1),
            AckOutcome::Finished(result) => finished = Some(result),
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    let result = finished.unwrap();
    assert_eq!(result.reason(), FinishReason::Completed);
    assert_eq!(result.questions_attempted(), 6);
    assert_eq!(result.correct_count(), 6);
    assert!((result.score_percent() - 100.0).abs() < 1e-9);
    assert_eq!(sink.results(), vec![result]);

    let phases = sink.phases();
    assert_eq!(phases.first(), Some(&"ASSIGNMENT"));
    assert_eq!(phases.iter().filter(|p| **p == "TEST").count(), 6);
    assert_eq!(phases.last(), Some(&"FINISHED"));
}

#[test]
fn timeout_after_two_trials_scores_attempted_only() {
    let sink = MemorySink::new();
    let mut c = controller(Condition::Static, &sink);
    c.start(&mut StdRng::seed_from_u64(12)).unwrap();

    let answer = correct_answer(&c);
    c.submit(&answer).unwrap();
    c.acknowledge(FeedbackAction::Continue).unwrap();
    c.submit("not even close").unwrap();
    c.acknowledge(FeedbackAction::Continue).unwrap();
    assert_eq!(c.state(), TrialState::AwaitingResponse(2));

    let outcome = (0..300).map(|_| c.tick()).last().unwrap();
    let TickOutcome::TimedOut(result) = outcome else {
        panic!("expected timeout, got {outcome:?}");
    };
    assert_eq!(result.reason(), FinishReason::TimedOut);
    assert_eq!(result.questions_attempted(), 2);
    assert_eq!(result.correct_count(), 1);
    assert!((result.score_percent() - 50.0).abs() < 1e-9);

    assert_eq!(c.submit("late").unwrap(), SubmitOutcome::Ignored);
    assert_eq!(c.acknowledge(FeedbackAction::Continue).unwrap(), AckOutcome::Ignored);
    assert_eq!(sink.results().len(), 1);
}

#[test]
fn bonus_pays_two_cents_per_correct_answer() {
    let sink = MemorySink::new();
    let mut c = controller(Condition::Static, &sink);
    c.start(&mut StdRng::seed_from_u64(13)).unwrap();

    for _ in 0..4 {
        let answer = correct_answer(&c);
        c.submit(&answer).unwrap();
        c.acknowledge(FeedbackAction::Continue).unwrap();
    }
    c.submit("no idea").unwrap();
    c.acknowledge(FeedbackAction::Continue).unwrap();

    let outcome = (0..300).map(|_| c.tick()).last().unwrap();
    let TickOutcome::TimedOut(result) = outcome else {
        panic!("expected timeout, got {outcome:?}");
    };
    assert_eq!(result.correct_count(), 4);
    assert_eq!(result.bonus_per_correct_cents(), 2);
    assert_eq!(result.bonus_cents(), 8);
    assert!((result.bonus() - 0.08).abs() < 1e-9);
    assert_eq!(sink.results()[0].bonus_cents(), 8);
}

#[test]
fn adaptive_escalates_after_a_full_window_of_misses() {
    let sink = MemorySink::new();
    let mut c = controller(Condition::Adaptive, &sink);
    c.start(&mut StdRng::seed_from_u64(13)).unwrap();

    let mut kinds = Vec::new();
    for _ in 0..4 {
        let question = c.current_question().unwrap().clone();
        let SubmitOutcome::Feedback(directive) = c.submit("wrong").unwrap() else {
            panic!("expected feedback");
        };
        assert_eq!(directive.revealed_answer.as_deref(), Some(question.canonical_answer()));
        assert_eq!(directive.review_link.as_ref(), Some(question.remediation_link()));
        kinds.push(directive.kind);
        c.acknowledge(FeedbackAction::Continue).unwrap();
    }
    assert_eq!(
        kinds,
        vec![
            FeedbackKind::AdaptiveSuggestReview,
            FeedbackKind::AdaptiveSuggestReview,
            FeedbackKind::AdaptiveEncourageOfferReview,
            FeedbackKind::AdaptiveEncourageOfferReview,
        ]
    );

    let answer = correct_answer(&c);
    let SubmitOutcome::Feedback(directive) = c.submit(&answer).unwrap() else {
        panic!("expected feedback");
    };
    assert_eq!(directive.kind, FeedbackKind::AdaptivePositive);
    assert!(directive.auto_advances());
}

#[test]
fn adaptive_retry_is_offered_when_enabled() {
    let sink = MemorySink::new();
    let collaborators = Collaborators::new(
        Box::new(Silent),
        Arc::new(sink.clone()),
        Arc::new(sink.clone()),
    );
    let settings = QuizSettings::default().with_offer_retry(true);
    let mut c = TrialController::new(Condition::Adaptive, calculus_bank(), settings, collaborators)
        .with_clock(fixed_clock());
    c.start(&mut StdRng::seed_from_u64(14)).unwrap();

    let SubmitOutcome::Feedback(directive) = c.submit("wrong").unwrap() else {
        panic!("expected feedback");
    };
    assert_eq!(directive.kind, FeedbackKind::AdaptiveSuggestRetry);
    assert!(directive.offers(FeedbackAction::Retry));
    assert_eq!(c.acknowledge(FeedbackAction::Retry).unwrap(), AckOutcome::Presenting(1));
}

#[test]
fn static_auto_advance_variant_skips_the_link() {
    let sink = MemorySink::new();
    let collaborators = Collaborators::new(
        Box::new(Silent),
        Arc::new(sink.clone()),
        Arc::new(sink.clone()),
    );
    let settings = QuizSettings::default()
        .with_static_incorrect(StaticIncorrect::AutoAdvance);
    let mut c = TrialController::new(Condition::Static, calculus_bank(), settings, collaborators)
        .with_clock(fixed_clock());
    c.start(&mut StdRng::seed_from_u64(15)).unwrap();

    let SubmitOutcome::Feedback(directive) = c.submit("wrong").unwrap() else {
        panic!("expected feedback");
    };
    assert_eq!(directive.kind, FeedbackKind::StaticNegative);
    assert!(directive.review_link.is_none());
    assert!(directive.revealed_answer.is_none());
    let token = c.pending_advance().unwrap().token;
    assert_eq!(c.fire_advance(token), AckOutcome::Presenting(1));
}

#[test]
fn trial_log_records_responses_and_feedback_labels() {
    let sink = MemorySink::new();
    let mut c = controller(Condition::Static, &sink);
    c.start(&mut StdRng::seed_from_u64(16)).unwrap();
    let question = c.current_question().unwrap().clone();
    c.submit("  WRONG ").unwrap();
    c.acknowledge(FeedbackAction::Review).unwrap();

    let events = sink.events();
    assert!(events.iter().all(|e| e.session_id == c.session_id()));
    match &events[1].event {
        TrialEvent::Test {
            trial_index,
            question_id,
            response,
            correct,
            condition,
            ..
        } => {
            assert_eq!(*trial_index, 0);
            assert_eq!(question_id, question.id());
            assert_eq!(response, "WRONG");
            assert!(!correct);
            assert_eq!(*condition, Condition::Static);
        }
        other => panic!("expected TEST event, got {other:?}"),
    }
    assert!(matches!(
        events[2].event,
        TrialEvent::Feedback {
            feedback_type: FeedbackKind::StaticNegativeWithLink,
            ..
        }
    ));
}

#[tokio::test]
async fn recorder_persists_a_full_session() {
    let storage = Storage::in_memory();
    let (sink, handle) = Recorder::new(&storage).spawn();
    let collaborators = Collaborators::new(Box::new(Silent), Arc::new(sink.clone()), Arc::new(sink));
    let mut c = TrialController::new(
        Condition::Adaptive,
        calculus_bank(),
        QuizSettings::default(),
        collaborators,
    )
    .with_clock(fixed_clock())
    .with_participant("p-7");
    c.start(&mut StdRng::seed_from_u64(17)).unwrap();

    while !c.is_finished() {
        let answer = correct_answer(&c);
        c.submit(&answer).unwrap();
        c.acknowledge(FeedbackAction::Continue).unwrap();
    }
    let session_id = c.session_id();
    drop(c);

    let report = handle.await.unwrap();
    assert!(report.is_clean());
    assert_eq!(report.results_written, 1);
    // assignment + (test, feedback, interaction) x 6 + finished
    assert_eq!(report.events_written, 20);

    let history = ResultHistoryService::new(&storage);
    let listed = history.list_recent(10).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].session_id(), session_id);
    assert_eq!(listed[0].participant(), Some("p-7"));
    assert_eq!(listed[0].bonus_cents(), 12);

    let stats = history.stats().await.unwrap();
    assert_eq!(stats[0].condition, Condition::Adaptive);
    assert_eq!(stats[0].mean_score, Some(1.0));
}
