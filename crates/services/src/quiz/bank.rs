use rand::Rng;
use rand::seq::SliceRandom;
use std::collections::HashSet;

use quiz_core::model::Question;

use crate::error::BankError;

/// The fixed question set of a study.
///
/// Every session uses every question exactly once, in an order drawn by
/// `draw` at session start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionBank {
    questions: Vec<Question>,
}

impl QuestionBank {
    /// Load a bank, checking that ids are unique.
    ///
    /// # Errors
    ///
    /// Returns `BankError::Empty` for an empty set and `BankError::DuplicateId`
    /// when two questions share an id.
    pub fn load(questions: Vec<Question>) -> Result<Self, BankError> {
        if questions.is_empty() {
            return Err(BankError::Empty);
        }

        let mut seen = HashSet::with_capacity(questions.len());
        for q in &questions {
            if !seen.insert(q.id()) {
                return Err(BankError::DuplicateId(q.id().clone()));
            }
        }

        Ok(Self { questions })
    }

    /// A uniformly random permutation of the whole bank.
    #[must_use]
    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<Question> {
        let mut order = self.questions.clone();
        order.as_mut_slice().shuffle(rng);
        order
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}
