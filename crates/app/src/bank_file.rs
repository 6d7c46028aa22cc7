//! Question banks on disk.
//!
//! ```toml
//! [settings]
//! time_limit_seconds = 300
//! static_incorrect = "review_link"
//! bonus_per_correct = 0.02
//!
//! [[questions]]
//! id = "deriv-5x"
//! prompt = "What is the derivative of 5x?"
//! answer = "5"
//! difficulty = "easy"
//! remediation_link = "https://tutorial.math.lamar.edu/Classes/CalcI/DerivativeIntro.aspx"
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use quiz_core::model::{Difficulty, QuestionDraft, QuestionError, QuizSettings, QuizSettingsDraft, SettingsError};
use services::{BankError, QuestionBank};

#[derive(Debug, Error)]
pub enum BankFileError {
    #[error("failed to read bank file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse bank file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error(transparent)]
    Bank(#[from] BankError),
}

#[derive(Debug, Deserialize)]
struct BankFile {
    #[serde(default)]
    settings: QuizSettingsDraft,
    #[serde(default)]
    questions: Vec<QuestionDraft>,
}

/// A validated bank together with the settings it ships with.
#[derive(Debug, Clone)]
pub struct LoadedBank {
    pub bank: QuestionBank,
    pub settings: QuizSettings,
}

/// Read and validate a TOML bank file.
///
/// # Errors
///
/// Returns `BankFileError` when the file cannot be read or parsed, or when a
/// question, the settings, or the bank as a whole is invalid.
pub fn load(path: &Path) -> Result<LoadedBank, BankFileError> {
    let content = std::fs::read_to_string(path).map_err(|source| BankFileError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse(&content, path)
}

/// Parse TOML content; `source_path` is only used in error messages.
///
/// # Errors
///
/// See [`load`].
pub fn parse(content: &str, source_path: &Path) -> Result<LoadedBank, BankFileError> {
    let file: BankFile = toml::from_str(content).map_err(|source| BankFileError::Parse {
        path: source_path.to_path_buf(),
        source,
    })?;

    let settings = file.settings.validate()?;
    let questions = file
        .questions
        .into_iter()
        .map(QuestionDraft::validate)
        .collect::<Result<Vec<_>, _>>()?;
    let bank = QuestionBank::load(questions)?;
    Ok(LoadedBank { bank, settings })
}

const LAMAR_CALC_I: &str = "https://tutorial.math.lamar.edu/Classes/CalcI";

/// The six calculus questions used when no bank file is given.
///
/// # Errors
///
/// Only fails if the embedded questions are invalid.
pub fn builtin() -> Result<LoadedBank, BankFileError> {
    let rows = [
        (
            "deriv-5x",
            "What is the derivative of 5x? (Enter a number)",
            "5",
            Difficulty::Easy,
            "DerivativeIntro.aspx",
        ),
        (
            "deriv-sin",
            "What is the derivative of sin(x)?",
            "cos(x)",
            Difficulty::Easy,
            "DiffTrigFcns.aspx",
        ),
        (
            "deriv-exp",
            "What is the derivative of e^x?",
            "e^x",
            Difficulty::Easy,
            "DiffExpLogFcns.aspx",
        ),
        (
            "integral-3x2",
            "Evaluate the definite integral from 0 to 2 of: 3x^2 dx. (Enter a number)",
            "8",
            Difficulty::Difficult,
            "DefnIntegrals.aspx",
        ),
        (
            "integral-inv-x",
            "What is the integral of 1/x dx? (Format: ln(x))",
            "ln(x)",
            Difficulty::Difficult,
            "IndefiniteIntegrals.aspx",
        ),
        (
            "integral-cos",
            "What is the integral of cos(x) dx? (Omit +C)",
            "sin(x)",
            Difficulty::Difficult,
            "IntegralsOfTrig.aspx",
        ),
    ];

    let questions = rows
        .into_iter()
        .map(|(id, prompt, answer, difficulty, page)| {
            QuestionDraft {
                id: id.to_owned(),
                prompt: prompt.to_owned(),
                answer: answer.to_owned(),
                aliases: Vec::new(),
                difficulty,
                remediation_link: format!("{LAMAR_CALC_I}/{page}"),
            }
            .validate()
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(LoadedBank {
        bank: QuestionBank::load(questions)?,
        settings: QuizSettings::default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::StaticIncorrect;

    const SAMPLE: &str = r#"
[settings]
time_limit_seconds = 120
static_incorrect = "auto_advance"
bonus_per_correct = 0.05

[[questions]]
id = "q1"
prompt = "What is 2 + 2?"
answer = "4"
aliases = ["four"]
difficulty = "easy"
remediation_link = "https://example.org/arithmetic"

[[questions]]
id = "q2"
prompt = "Derivative of x^2?"
answer = "2x"
difficulty = "difficult"
remediation_link = "https://example.org/derivatives"
"#;

    #[test]
    fn parses_settings_and_questions() {
        let loaded = parse(SAMPLE, Path::new("sample.toml")).unwrap();
        assert_eq!(loaded.bank.len(), 2);
        assert_eq!(loaded.settings.time_limit_seconds(), 120);
        assert_eq!(loaded.settings.static_incorrect(), StaticIncorrect::AutoAdvance);
        assert_eq!(loaded.settings.window_size().get(), 3);
        assert_eq!(loaded.settings.bonus_per_correct_cents(), 5);
        let q1 = &loaded.bank.questions()[0];
        assert!(q1.aliases().contains("four"));
    }

    #[test]
    fn settings_table_is_optional() {
        let content = r#"
[[questions]]
id = "only"
prompt = "p"
answer = "a"
difficulty = "easy"
remediation_link = "https://example.org/"
"#;
        let loaded = parse(content, Path::new("min.toml")).unwrap();
        assert_eq!(loaded.settings, QuizSettings::default());
    }

    #[test]
    fn empty_bank_is_rejected() {
        let err = parse("", Path::new("empty.toml")).unwrap_err();
        assert!(matches!(err, BankFileError::Bank(BankError::Empty)));
    }

    #[test]
    fn invalid_link_is_rejected() {
        let content = r#"
[[questions]]
id = "bad"
prompt = "p"
answer = "a"
difficulty = "easy"
remediation_link = "not a url"
"#;
        let err = parse(content, Path::new("bad.toml")).unwrap_err();
        assert!(matches!(err, BankFileError::Question(QuestionError::InvalidLink { .. })));
    }

    #[test]
    fn malformed_toml_names_the_file() {
        let err = parse("[[questions]\n", Path::new("broken.toml")).unwrap_err();
        assert!(err.to_string().contains("broken.toml"));
    }

    #[test]
    fn builtin_bank_has_six_questions() {
        let loaded = builtin().unwrap();
        assert_eq!(loaded.bank.len(), 6);
        let difficult = loaded
            .bank
            .questions()
            .iter()
            .filter(|q| q.difficulty() == Difficulty::Difficult)
            .count();
        assert_eq!(difficult, 3);
        assert!(
            loaded
                .bank
                .questions()
                .iter()
                .all(|q| q.remediation_link().host_str() == Some("tutorial.math.lamar.edu"))
        );
    }
}
