use std::collections::VecDeque;
use std::num::NonZeroUsize;

/// Bounded FIFO of recent correctness outcomes.
///
/// Lives for the whole session and is never reset, so the adaptive policy
/// reacts to recent rather than lifetime performance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PerformanceWindow {
    capacity: NonZeroUsize,
    outcomes: VecDeque<bool>,
}

impl PerformanceWindow {
    #[must_use]
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            capacity,
            outcomes: VecDeque::with_capacity(capacity.get() + 1),
        }
    }

    /// Append an outcome, evicting the oldest once over capacity.
    pub fn push(&mut self, correct: bool) {
        self.outcomes.push_back(correct);
        while self.outcomes.len() > self.capacity.get() {
            self.outcomes.pop_front();
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.outcomes.len() == self.capacity.get()
    }

    #[must_use]
    pub fn correct_count(&self) -> usize {
        self.outcomes.iter().filter(|c| **c).count()
    }

    /// Share of correct outcomes in the window; `None` while empty.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn proportion_correct(&self) -> Option<f64> {
        if self.outcomes.is_empty() {
            return None;
        }
        Some(self.correct_count() as f64 / self.outcomes.len() as f64)
    }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        self.outcomes.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(values: &[bool]) -> PerformanceWindow {
        let mut w = PerformanceWindow::new(NonZeroUsize::new(3).unwrap());
        for v in values {
            w.push(*v);
        }
        w
    }

    #[test]
    fn empty_window_has_no_proportion() {
        let w = window(&[]);
        assert!(w.is_empty());
        assert!(!w.is_full());
        assert_eq!(w.proportion_correct(), None);
    }

    #[test]
    fn proportion_over_full_window() {
        let w = window(&[true, false, false]);
        assert!(w.is_full());
        let p = w.proportion_correct().unwrap();
        assert!((p - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn fourth_push_evicts_oldest() {
        let mut w = window(&[true, false, false]);
        w.push(false);
        assert_eq!(w.len(), 3);
        assert_eq!(w.iter().collect::<Vec<_>>(), vec![false, false, false]);
        assert_eq!(w.proportion_correct(), Some(0.0));
    }

    #[test]
    fn partial_window_is_not_full() {
        let w = window(&[false, false]);
        assert_eq!(w.len(), 2);
        assert!(!w.is_full());
        assert_eq!(w.proportion_correct(), Some(0.0));
    }
}
