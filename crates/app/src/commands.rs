use std::fs::File;
use std::io;
use std::path::Path;

use comfy_table::{Cell, Table};
use serde::Serialize;

use quiz_core::model::{SessionResult, TrialEvent};
use services::{ConditionStats, ResultHistoryService, SessionExport};

type CommandResult = Result<(), Box<dyn std::error::Error>>;

pub const TRIAL_CSV: &str = "trial_data.csv";
pub const SESSION_CSV: &str = "session_data.csv";

const TRIAL_HEADER: [&str; 11] = [
    "participant_id",
    "condition",
    "trial_index",
    "question_id",
    "question_text",
    "correct_answer",
    "response",
    "correct",
    "difficulty",
    "rt",
    "timestamp",
];

const SESSION_HEADER: [&str; 12] = [
    "participant_id",
    "session_id",
    "condition",
    "reason",
    "correct",
    "attempted",
    "total",
    "score_percent",
    "bonus",
    "remaining_seconds",
    "started_at",
    "finished_at",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Json,
    Csv,
}

impl ExportFormat {
    pub fn from_arg(arg: &str) -> Option<Self> {
        match arg.trim().to_ascii_lowercase().as_str() {
            "json" => Some(Self::Json),
            "csv" => Some(Self::Csv),
            _ => None,
        }
    }
}

/// `list`: most recent sessions as a table.
pub async fn list(history: &ResultHistoryService, limit: u32) -> CommandResult {
    let results = history.list_recent(limit).await?;
    if results.is_empty() {
        println!("No sessions recorded yet.");
        return Ok(());
    }
    println!("{}", results_table(&results));
    Ok(())
}

/// `export`: every stored session.
///
/// JSON goes to `out` or stdout. CSV always includes the trial log and writes
/// [`TRIAL_CSV`] and [`SESSION_CSV`] into the `out` directory (default `.`).
pub async fn export(
    history: &ResultHistoryService,
    out: Option<&Path>,
    format: ExportFormat,
    with_events: bool,
) -> CommandResult {
    match format {
        ExportFormat::Json => export_json(history, out, with_events).await,
        ExportFormat::Csv => export_csv(history, out.unwrap_or(Path::new("."))).await,
    }
}

async fn export_json(
    history: &ResultHistoryService,
    out: Option<&Path>,
    with_events: bool,
) -> CommandResult {
    let rows = history.export(with_events).await?;
    let json = serde_json::to_string_pretty(&rows)?;
    match out {
        Some(path) => {
            std::fs::write(path, json)?;
            eprintln!("exported {} sessions to {}", rows.len(), path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

async fn export_csv(history: &ResultHistoryService, dir: &Path) -> CommandResult {
    let rows = history.export(true).await?;
    std::fs::create_dir_all(dir)?;
    let trials = write_trial_csv(&rows, File::create(dir.join(TRIAL_CSV))?)?;
    write_session_csv(&rows, File::create(dir.join(SESSION_CSV))?)?;
    eprintln!(
        "exported {trials} trials from {} sessions to {}",
        rows.len(),
        dir.display()
    );
    Ok(())
}

/// `stats`: per-condition summary.
pub async fn stats(history: &ResultHistoryService) -> CommandResult {
    let stats = history.stats().await?;
    println!("{}", stats_table(&stats));
    Ok(())
}

fn participant_id(result: &SessionResult) -> String {
    result
        .participant()
        .map_or_else(|| result.session_id().to_string(), str::to_owned)
}

#[derive(Serialize)]
struct TrialRow<'a> {
    participant_id: &'a str,
    condition: &'static str,
    trial_index: usize,
    question_id: &'a str,
    question_text: &'a str,
    correct_answer: &'a str,
    response: &'a str,
    correct: bool,
    difficulty: &'static str,
    rt: u64,
    timestamp: String,
}

#[derive(Serialize)]
struct SessionRow<'a> {
    participant_id: &'a str,
    session_id: String,
    condition: &'static str,
    reason: &'static str,
    correct: u32,
    attempted: u32,
    total: u32,
    score_percent: String,
    bonus: String,
    remaining_seconds: u32,
    started_at: String,
    finished_at: String,
}

/// One row per `TEST` event. Returns the number of rows written.
fn write_trial_csv<W: io::Write>(rows: &[SessionExport], out: W) -> Result<usize, csv::Error> {
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(out);
    writer.write_record(TRIAL_HEADER)?;

    let mut written = 0;
    for row in rows {
        let participant = participant_id(&row.result);
        for recorded in row.events.iter().flatten() {
            let TrialEvent::Test {
                trial_index,
                question_id,
                question_text,
                correct_answer,
                response,
                correct,
                difficulty,
                rt_ms,
                condition,
            } = &recorded.event
            else {
                continue;
            };
            writer.serialize(TrialRow {
                participant_id: &participant,
                condition: condition.as_str(),
                trial_index: *trial_index,
                question_id: question_id.as_str(),
                question_text,
                correct_answer,
                response,
                correct: *correct,
                difficulty: difficulty.as_str(),
                rt: *rt_ms,
                timestamp: recorded.recorded_at.to_rfc3339(),
            })?;
            written += 1;
        }
    }

    writer.flush()?;
    Ok(written)
}

fn write_session_csv<W: io::Write>(rows: &[SessionExport], out: W) -> Result<(), csv::Error> {
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(out);
    writer.write_record(SESSION_HEADER)?;

    for row in rows {
        let r = &row.result;
        let participant = participant_id(r);
        writer.serialize(SessionRow {
            participant_id: &participant,
            session_id: r.session_id().to_string(),
            condition: r.condition().as_str(),
            reason: r.reason().as_str(),
            correct: r.correct_count(),
            attempted: r.questions_attempted(),
            total: r.total_questions(),
            score_percent: format!("{:.1}", row.score_percent),
            bonus: format!("{:.2}", row.bonus),
            remaining_seconds: r.remaining_seconds(),
            started_at: r.started_at().to_rfc3339(),
            finished_at: r.finished_at().to_rfc3339(),
        })?;
    }

    writer.flush()?;
    Ok(())
}

fn results_table(results: &[SessionResult]) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        "Session",
        "Participant",
        "Condition",
        "Finish",
        "Correct",
        "Attempted",
        "Score",
        "Bonus",
        "Finished at",
    ]);
    for r in results {
        table.add_row(vec![
            Cell::new(r.session_id()),
            Cell::new(r.participant().unwrap_or("-")),
            Cell::new(r.condition()),
            Cell::new(r.reason()),
            Cell::new(r.correct_count()),
            Cell::new(format!("{}/{}", r.questions_attempted(), r.total_questions())),
            Cell::new(format!("{:.1}%", r.score_percent())),
            Cell::new(format!("${:.2}", r.bonus())),
            Cell::new(r.finished_at().format("%Y-%m-%d %H:%M:%S")),
        ]);
    }
    table
}

fn stats_table(stats: &[ConditionStats]) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        "Condition",
        "Sessions",
        "Mean score",
        "Mean attempted",
        "Timeouts",
    ]);
    for s in stats {
        table.add_row(vec![
            Cell::new(s.condition),
            Cell::new(s.sessions),
            Cell::new(
                s.mean_score
                    .map_or_else(|| "-".to_owned(), |m| format!("{:.1}%", m * 100.0)),
            ),
            Cell::new(
                s.mean_attempted
                    .map_or_else(|| "-".to_owned(), |m| format!("{m:.2}")),
            ),
            Cell::new(s.timeouts),
        ]);
    }
    table
}
