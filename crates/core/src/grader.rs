//! Literal answer matching.
//!
//! Responses and accepted answers are compared after lowercasing and removing
//! every whitespace character. There is no numeric or symbolic equivalence:
//! `5x` and `5*x` are different answers.

use crate::model::Question;

/// Lowercase and strip all whitespace.
#[must_use]
pub fn normalize_answer(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// True when a response has nothing to grade. Callers re-prompt instead of grading.
#[must_use]
pub fn is_blank(response: &str) -> bool {
    response.trim().is_empty()
}

/// Grade a response against the question's canonical answer and aliases.
#[must_use]
pub fn grade(response: &str, question: &Question) -> bool {
    let response = normalize_answer(response);
    if response.is_empty() {
        return false;
    }
    question
        .accepted_answers()
        .any(|accepted| normalize_answer(accepted) == response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Difficulty, QuestionDraft};

    fn question(answer: &str, aliases: &[&str]) -> Question {
        QuestionDraft {
            id: "q".into(),
            prompt: "prompt".into(),
            answer: answer.into(),
            aliases: aliases.iter().map(|a| (*a).to_owned()).collect(),
            difficulty: Difficulty::Easy,
            remediation_link: "https://example.org/review".into(),
        }
        .validate()
        .unwrap()
    }

    #[test]
    fn ignores_case_and_whitespace() {
        let q = question("5x", &[]);
        assert!(grade("  5X ", &q));
        assert!(grade("5 x", &q));
    }

    #[test]
    fn no_symbolic_equivalence() {
        let q = question("5x", &[]);
        assert!(!grade("5*x", &q));
    }

    #[test]
    fn aliases_are_accepted() {
        let q = question("ln(x)", &["ln|x|", "log(x)"]);
        assert!(grade("LN|X|", &q));
        assert!(grade("log (x)", &q));
        assert!(!grade("e^x", &q));
    }

    #[test]
    fn blank_detection_uses_trim() {
        assert!(is_blank("   \t"));
        assert!(!is_blank(" 8 "));
        assert!(!grade("   ", &question("8", &[])));
    }

    #[test]
    fn normalization_strips_interior_whitespace() {
        assert_eq!(normalize_answer(" Cos ( X ) "), "cos(x)");
    }
}
