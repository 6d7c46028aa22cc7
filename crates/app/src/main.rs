use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use quiz_core::model::ConditionDirective;
use services::{
    Clock, Collaborators, ConditionAssigner, MemorySink, Recorder, ResultHistoryService, TrialController,
};
use storage::repository::Storage;

mod bank_file;
mod commands;
mod runner;
mod terminal;

use commands::{ExportFormat, SESSION_CSV, TRIAL_CSV};
use terminal::TerminalSurface;

const DEFAULT_DB_URL: &str = "sqlite://quiz.sqlite3";
const DEFAULT_LIST_LIMIT: u32 = 20;

#[derive(Debug, PartialEq, Eq)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidNumber { flag: &'static str, raw: String },
    InvalidDbUrl { raw: String },
    InvalidFormat { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidNumber { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidFormat { raw } => {
                write!(f, "invalid --format value: {raw} (expected json or csv)")
            }
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn parse_number<T: std::str::FromStr>(raw: String, flag: &'static str) -> Result<T, ArgsError> {
    raw.trim()
        .parse()
        .map_err(|_| ArgsError::InvalidNumber { flag, raw })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- run    [--db <sqlite_url>] [--condition <adaptive|static|1|0>]");
    eprintln!("                             [--counterbalance <n>] [--bank <file.toml>] [--seed <n>]");
    eprintln!("                             [--participant <label>] [--dry-run]");
    eprintln!("  cargo run -p app -- list   [--db <sqlite_url>] [--limit <n>]");
    eprintln!("  cargo run -p app -- export [--db <sqlite_url>] [--format <json|csv>]");
    eprintln!("                             [--out <file.json|dir>] [--events]");
    eprintln!("  cargo run -p app -- stats  [--db <sqlite_url>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db {DEFAULT_DB_URL}");
    eprintln!("  --limit {DEFAULT_LIST_LIMIT}");
    eprintln!("  --format json (csv writes {TRIAL_CSV} and {SESSION_CSV} into --out, default .)");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  QUIZ_DB_URL, QUIZ_CONDITION, QUIZ_COUNTERBALANCE, QUIZ_BANK, RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Run,
    List,
    Export,
    Stats,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "run" => Some(Self::Run),
            "list" => Some(Self::List),
            "export" => Some(Self::Export),
            "stats" => Some(Self::Stats),
            _ => None,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
struct RunArgs {
    db_url: String,
    condition: Option<ConditionDirective>,
    counterbalance: Option<i64>,
    bank: Option<PathBuf>,
    seed: Option<u64>,
    participant: Option<String>,
    dry_run: bool,
}

#[derive(Debug, PartialEq, Eq)]
struct DataArgs {
    db_url: String,
    limit: u32,
    out: Option<PathBuf>,
    format: ExportFormat,
    events: bool,
}

fn directive(raw: &str) -> ConditionDirective {
    let Ok(directive) = raw.parse::<ConditionDirective>();
    directive
}

fn default_db_url(env: &impl Fn(&str) -> Option<String>) -> String {
    env("QUIZ_DB_URL").map_or_else(|| DEFAULT_DB_URL.into(), normalize_sqlite_url)
}

fn parse_db(args: &mut impl Iterator<Item = String>) -> Result<String, ArgsError> {
    let value = require_value(args, "--db")?;
    if value.trim().is_empty() {
        return Err(ArgsError::InvalidDbUrl { raw: value });
    }
    Ok(normalize_sqlite_url(value))
}

impl RunArgs {
    fn parse(
        args: &mut impl Iterator<Item = String>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ArgsError> {
        let mut parsed = Self {
            db_url: default_db_url(&env),
            condition: env("QUIZ_CONDITION").map(|v| directive(&v)),
            counterbalance: env("QUIZ_COUNTERBALANCE").and_then(|v| v.trim().parse().ok()),
            bank: env("QUIZ_BANK").map(PathBuf::from),
            seed: None,
            participant: None,
            dry_run: false,
        };

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => parsed.db_url = parse_db(args)?,
                "--condition" => {
                    parsed.condition = Some(directive(&require_value(args, "--condition")?));
                }
                "--counterbalance" => {
                    let value = require_value(args, "--counterbalance")?;
                    parsed.counterbalance = Some(parse_number(value, "--counterbalance")?);
                }
                "--bank" => parsed.bank = Some(require_value(args, "--bank")?.into()),
                "--seed" => {
                    let value = require_value(args, "--seed")?;
                    parsed.seed = Some(parse_number(value, "--seed")?);
                }
                "--participant" => parsed.participant = Some(require_value(args, "--participant")?),
                "--dry-run" => parsed.dry_run = true,
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(parsed)
    }
}

impl DataArgs {
    fn parse(
        cmd: Command,
        args: &mut impl Iterator<Item = String>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ArgsError> {
        let mut parsed = Self {
            db_url: default_db_url(&env),
            limit: DEFAULT_LIST_LIMIT,
            out: None,
            format: ExportFormat::default(),
            events: false,
        };

        while let Some(arg) = args.next() {
            match (cmd, arg.as_str()) {
                (_, "--db") => parsed.db_url = parse_db(args)?,
                (Command::List, "--limit") => {
                    let value = require_value(args, "--limit")?;
                    parsed.limit = parse_number(value, "--limit")?;
                }
                (Command::Export, "--out") => parsed.out = Some(require_value(args, "--out")?.into()),
                (Command::Export, "--format") => {
                    let raw = require_value(args, "--format")?;
                    parsed.format =
                        ExportFormat::from_arg(&raw).ok_or(ArgsError::InvalidFormat { raw })?;
                }
                (Command::Export, "--events") => parsed.events = true,
                (_, "--help" | "-h") => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(parsed)
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

async fn open_storage(db_url: &str) -> Result<Storage, Box<dyn std::error::Error>> {
    prepare_sqlite_file(db_url)?;
    Ok(Storage::sqlite(db_url).await?)
}

async fn run_quiz(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let loaded = match &args.bank {
        Some(path) => bank_file::load(path)?,
        None => bank_file::builtin()?,
    };
    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    let (storage, counterbalance) = if args.dry_run {
        (None, args.counterbalance)
    } else {
        let storage = open_storage(&args.db_url).await?;
        let counterbalance = match args.counterbalance {
            Some(value) => Some(value),
            None => {
                let stored = ResultHistoryService::new(&storage).count_sessions().await?;
                i64::try_from(stored).ok()
            }
        };
        (Some(storage), counterbalance)
    };

    let assignment =
        ConditionAssigner::new().resolve(args.condition.as_ref(), counterbalance, &mut rng);
    info!(condition = %assignment.condition, source = ?assignment.source, "condition assigned");

    let surface = Box::new(TerminalSurface::new());
    let (collaborators, recorder) = match &storage {
        Some(storage) => {
            let (sink, handle) = Recorder::new(storage).spawn();
            let collaborators = Collaborators::new(surface, Arc::new(sink.clone()), Arc::new(sink));
            (collaborators, Some(handle))
        }
        None => {
            let sink = MemorySink::new();
            let collaborators = Collaborators::new(surface, Arc::new(sink.clone()), Arc::new(sink));
            (collaborators, None)
        }
    };

    let mut controller = TrialController::new(
        assignment.condition,
        loaded.bank,
        loaded.settings,
        collaborators,
    )
    .with_clock(Clock::system());
    if let Some(participant) = args.participant {
        controller = controller.with_participant(participant);
    }

    let outcome = runner::run_session(&mut controller, &mut rng).await;
    // Dropping the controller closes the recorder channel.
    drop(controller);

    if let Some(handle) = recorder {
        let report = handle.await?;
        if !report.is_clean() {
            warn!(failures = report.failures, "some records were not persisted");
        }
    }

    if outcome?.is_none() {
        eprintln!("session ended before the quiz finished");
    }
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let argv: Vec<String> = std::env::args().skip(1).collect();

    // No subcommand means `run`.
    let (cmd, rest) = match argv.first().map(String::as_str) {
        None => (Command::Run, &argv[..]),
        Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) if first.starts_with("--") => (Command::Run, &argv[..]),
        Some(first) => {
            let cmd = Command::from_arg(first).ok_or_else(|| {
                eprintln!("unknown subcommand: {first}");
                print_usage();
                ArgsError::UnknownArg(first.to_owned())
            })?;
            (cmd, &argv[1..])
        }
    };

    let mut iter = rest.iter().cloned();
    let env = |key: &str| std::env::var(key).ok();
    let report_usage = |e: ArgsError| {
        eprintln!("{e}");
        print_usage();
        e
    };

    if cmd == Command::Run {
        let parsed = RunArgs::parse(&mut iter, env).map_err(report_usage)?;
        return run_quiz(parsed).await;
    }

    let parsed = DataArgs::parse(cmd, &mut iter, env).map_err(report_usage)?;
    let storage = open_storage(&parsed.db_url).await?;
    let history = ResultHistoryService::new(&storage);
    match cmd {
        Command::List => commands::list(&history, parsed.limit).await,
        Command::Export => {
            commands::export(&history, parsed.out.as_deref(), parsed.format, parsed.events).await
        }
        Command::Stats | Command::Run => commands::stats(&history).await,
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
