use std::io::Write;

use quiz_core::model::{FeedbackAction, FeedbackDirective, SessionResult};
use services::{QuestionView, RenderSurface};
use url::Url;

/// Line-oriented surface on stdout.
#[derive(Debug, Default)]
pub struct TerminalSurface;

impl TerminalSurface {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Announce the remaining time at a few fixed marks.
    pub fn countdown(remaining_seconds: u32) {
        if remaining_seconds % 60 == 0 || remaining_seconds == 30 || remaining_seconds == 10 {
            println!("  [{} remaining]", format_clock(remaining_seconds));
        }
    }

    pub fn unknown_choice(input: &str, directive: Option<&FeedbackDirective>) {
        let choices = directive.map(choice_hint).unwrap_or_default();
        println!("  '{}' is not one of the choices. {choices}", input.trim());
    }

    fn prompt() {
        print!("> ");
        // A failed flush only delays the prompt.
        let _ = std::io::stdout().flush();
    }
}

impl RenderSurface for TerminalSurface {
    fn show_question(&self, view: &QuestionView<'_>) {
        println!();
        println!(
            "Question {} of {}  ({} left)",
            view.index + 1,
            view.total,
            format_clock(view.remaining_seconds)
        );
        println!("{}", view.question.prompt());
        Self::prompt();
    }

    fn show_feedback(&self, directive: &FeedbackDirective) {
        println!("{}", directive.message);
        if let Some(answer) = &directive.revealed_answer {
            println!("The correct answer is: {answer}");
        }
        if let Some(link) = &directive.review_link {
            println!("Review: {link}");
        }
        if directive.auto_advances() {
            println!("(moving on shortly, or press Enter)");
        } else {
            println!("{}", choice_hint(directive));
        }
    }

    fn reprompt(&self) {
        println!("Please enter an answer.");
        Self::prompt();
    }

    fn open_link(&self, link: &Url) {
        println!("Open this page to review the topic: {link}");
        println!("Press Enter to continue when ready.");
    }

    fn show_score_summary(&self, result: &SessionResult) {
        println!();
        println!("Quiz complete!");
        println!(
            "You answered {} out of {} questions correctly ({:.0}%).",
            result.correct_count(),
            result.questions_attempted(),
            result.score_percent()
        );
    }

    fn show_timeout_summary(&self, result: &SessionResult) {
        println!();
        println!("Time's up!");
        println!(
            "You completed {} questions and answered {} correctly ({:.0}%).",
            result.questions_attempted(),
            result.correct_count(),
            result.score_percent()
        );
    }
}

/// Map a typed line to a feedback action. An empty line means continue.
#[must_use]
pub fn parse_action(input: &str) -> Option<FeedbackAction> {
    match input.trim().to_ascii_lowercase().as_str() {
        "" | "c" | "continue" | "n" | "next" => Some(FeedbackAction::Continue),
        "r" | "retry" => Some(FeedbackAction::Retry),
        "v" | "review" | "l" | "link" => Some(FeedbackAction::Review),
        _ => None,
    }
}

fn choice_hint(directive: &FeedbackDirective) -> String {
    let labels: Vec<&str> = directive
        .offered_actions
        .iter()
        .map(|action| match action {
            FeedbackAction::Continue => "[Enter] continue",
            FeedbackAction::Retry => "[r] retry",
            FeedbackAction::Review => "[v] review the topic",
        })
        .collect();
    labels.join("  ")
}

fn format_clock(seconds: u32) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}
