use rand::Rng;
use tracing::debug;

use quiz_core::model::{Condition, ConditionDirective};

/// Which rule decided the assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentSource {
    Directive,
    Counterbalance,
    Random,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Assignment {
    pub condition: Condition,
    pub source: AssignmentSource,
}

/// Resolves a participant's condition.
///
/// First match wins: a recognizable directive, then counterbalance parity, then
/// a fair coin. Unrecognized directives fall through silently.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConditionAssigner;

impl ConditionAssigner {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    pub fn resolve<R: Rng + ?Sized>(
        &self,
        directive: Option<&ConditionDirective>,
        counterbalance: Option<i64>,
        rng: &mut R,
    ) -> Assignment {
        if let Some(directive) = directive {
            if let Some(condition) = directive.condition() {
                return Assignment {
                    condition,
                    source: AssignmentSource::Directive,
                };
            }
            debug!(?directive, "unrecognized condition directive, falling through");
        }

        if let Some(signal) = counterbalance {
            return Assignment {
                condition: Condition::from_counterbalance(signal),
                source: AssignmentSource::Counterbalance,
            };
        }

        let condition = if rng.random_bool(0.5) {
            Condition::Adaptive
        } else {
            Condition::Static
        };
        Assignment {
            condition,
            source: AssignmentSource::Random,
        }
    }
}
