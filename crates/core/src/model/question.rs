use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;
use url::Url;

use crate::grader::normalize_answer;
use crate::model::ids::QuestionId;

//
// ─── DIFFICULTY ────────────────────────────────────────────────────────────────
//

/// Difficulty tag carried by each question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Difficult,
}

impl Difficulty {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Difficult => "difficult",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question id cannot be empty")]
    EmptyId,

    #[error("question {id} has an empty prompt")]
    EmptyPrompt { id: String },

    #[error("question {id} has an empty answer")]
    EmptyAnswer { id: String },

    #[error("question {id} has a blank alias")]
    BlankAlias { id: String },

    #[error("question {id} has an invalid remediation link: {link}")]
    InvalidLink { id: String, link: String },
}

//
// ─── DRAFT ─────────────────────────────────────────────────────────────────────
//

/// Unvalidated question as read from a bank file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionDraft {
    pub id: String,
    pub prompt: String,
    pub answer: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    pub difficulty: Difficulty,
    pub remediation_link: String,
}

impl QuestionDraft {
    /// Validate the draft into an immutable `Question`.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` when the id, prompt or answer is blank, an alias
    /// normalizes to nothing, or the remediation link is not a valid URL.
    pub fn validate(self) -> Result<Question, QuestionError> {
        let id = self.id.trim().to_owned();
        if id.is_empty() {
            return Err(QuestionError::EmptyId);
        }

        let prompt = self.prompt.trim().to_owned();
        if prompt.is_empty() {
            return Err(QuestionError::EmptyPrompt { id });
        }

        let canonical_answer = self.answer.trim().to_owned();
        if normalize_answer(&canonical_answer).is_empty() {
            return Err(QuestionError::EmptyAnswer { id });
        }

        let mut aliases = BTreeSet::new();
        for alias in self.aliases {
            let alias = alias.trim().to_owned();
            if normalize_answer(&alias).is_empty() {
                return Err(QuestionError::BlankAlias { id });
            }
            if alias != canonical_answer {
                aliases.insert(alias);
            }
        }

        let remediation_link =
            Url::parse(self.remediation_link.trim()).map_err(|_| QuestionError::InvalidLink {
                id: id.clone(),
                link: self.remediation_link.clone(),
            })?;

        Ok(Question {
            id: QuestionId::new(id),
            prompt,
            canonical_answer,
            aliases,
            difficulty: self.difficulty,
            remediation_link,
        })
    }
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// A single quiz question.
///
/// The canonical answer is always part of the accepted set; aliases only add
/// alternatives to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    id: QuestionId,
    prompt: String,
    canonical_answer: String,
    aliases: BTreeSet<String>,
    difficulty: Difficulty,
    remediation_link: Url,
}

impl Question {
    #[must_use]
    pub fn id(&self) -> &QuestionId {
        &self.id
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn canonical_answer(&self) -> &str {
        &self.canonical_answer
    }

    #[must_use]
    pub fn aliases(&self) -> &BTreeSet<String> {
        &self.aliases
    }

    /// Canonical answer first, then every alias.
    pub fn accepted_answers(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.canonical_answer.as_str()).chain(self.aliases.iter().map(String::as_str))
    }

    #[must_use]
    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    #[must_use]
    pub fn remediation_link(&self) -> &Url {
        &self.remediation_link
    }

    /// Back to the draft shape, e.g. for writing a bank file.
    #[must_use]
    pub fn to_draft(&self) -> QuestionDraft {
        QuestionDraft {
            id: self.id.as_str().to_owned(),
            prompt: self.prompt.clone(),
            answer: self.canonical_answer.clone(),
            aliases: self.aliases.iter().cloned().collect(),
            difficulty: self.difficulty,
            remediation_link: self.remediation_link.to_string(),
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> QuestionDraft {
        QuestionDraft {
            id: "q1".into(),
            prompt: "What is the derivative of sin(x)?".into(),
            answer: "cos(x)".into(),
            aliases: vec!["cos x".into()],
            difficulty: Difficulty::Easy,
            remediation_link: "https://example.org/trig".into(),
        }
    }

    #[test]
    fn valid_draft_builds_question() {
        let q = draft().validate().unwrap();
        assert_eq!(q.id().as_str(), "q1");
        assert_eq!(q.canonical_answer(), "cos(x)");
        let accepted: Vec<_> = q.accepted_answers().collect();
        assert_eq!(accepted, vec!["cos(x)", "cos x"]);
    }

    #[test]
    fn alias_equal_to_canonical_is_folded() {
        let mut d = draft();
        d.aliases = vec!["cos(x)".into(), "  cos(x) ".into()];
        let q = d.validate().unwrap();
        assert!(q.aliases().is_empty());
        assert_eq!(q.accepted_answers().count(), 1);
    }

    #[test]
    fn blank_fields_are_rejected() {
        let mut d = draft();
        d.id = "  ".into();
        assert_eq!(d.validate().unwrap_err(), QuestionError::EmptyId);

        let mut d = draft();
        d.prompt = String::new();
        assert!(matches!(d.validate(), Err(QuestionError::EmptyPrompt { .. })));

        let mut d = draft();
        d.answer = " \t".into();
        assert!(matches!(d.validate(), Err(QuestionError::EmptyAnswer { .. })));

        let mut d = draft();
        d.aliases = vec![" ".into()];
        assert!(matches!(d.validate(), Err(QuestionError::BlankAlias { .. })));
    }

    #[test]
    fn invalid_link_is_rejected() {
        let mut d = draft();
        d.remediation_link = "not a url".into();
        assert!(matches!(d.validate(), Err(QuestionError::InvalidLink { .. })));
    }

    #[test]
    fn draft_round_trip_keeps_fields() {
        let q = draft().validate().unwrap();
        let again = q.to_draft().validate().unwrap();
        assert_eq!(again, q);
    }
}
