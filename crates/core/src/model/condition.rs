use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Feedback policy a participant is assigned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Condition {
    Adaptive,
    Static,
}

impl Condition {
    pub const ALL: [Condition; 2] = [Condition::Adaptive, Condition::Static];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Condition::Adaptive => "adaptive",
            Condition::Static => "static",
        }
    }

    /// Maps a numeric directive to a condition: `1` is adaptive, `0` is static.
    /// Anything else is unknown.
    #[must_use]
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Condition::Adaptive),
            0 => Some(Condition::Static),
            _ => None,
        }
    }

    /// Case-insensitive parse of a textual directive.
    ///
    /// Accepts the full name, the single-letter abbreviation, or the numeric code.
    #[must_use]
    pub fn from_directive(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "adaptive" | "a" | "1" => Some(Condition::Adaptive),
            "static" | "s" | "0" => Some(Condition::Static),
            _ => None,
        }
    }

    /// Even counterbalance values map to adaptive, odd to static.
    #[must_use]
    pub fn from_counterbalance(signal: i64) -> Self {
        if signal.rem_euclid(2) == 0 {
            Condition::Adaptive
        } else {
            Condition::Static
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An explicit assignment request, textual or numeric.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConditionDirective {
    Text(String),
    Code(i64),
}

impl ConditionDirective {
    /// Resolves the directive if it names a condition unambiguously.
    #[must_use]
    pub fn condition(&self) -> Option<Condition> {
        match self {
            ConditionDirective::Text(raw) => Condition::from_directive(raw),
            ConditionDirective::Code(code) => Condition::from_code(*code),
        }
    }
}

impl FromStr for ConditionDirective {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().parse::<i64>() {
            Ok(code) => ConditionDirective::Code(code),
            Err(_) => ConditionDirective::Text(s.to_owned()),
        })
    }
}
