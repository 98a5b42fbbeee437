use std::fmt::{Display, Formatter};

/// An error raised while building a grammar, before any input is parsed.
///
/// Construction errors are the only error class the grammar algebra can
/// raise; a grammar that simply fails to match an input is not an error, it
/// is an empty [`findall`](crate::earley::Parser::findall) result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstructionError {
    /// A rule referenced by name in a DSL front-end was never defined.
    UndefinedRule(String),
    /// `repeatable` was asked for bounds that cannot be satisfied:
    /// `min < 0` cannot occur (the field is unsigned), so this carries
    /// `max < 1` or `min > max`.
    InvalidRepetition { min: usize, max: Option<usize> },
}

impl Display for ConstructionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ConstructionError::UndefinedRule(name) => {
                write!(f, "undefined rule {}", name)
            }
            ConstructionError::InvalidRepetition { min, max } => match max {
                Some(max) => write!(
                    f,
                    "invalid repetition bounds: min={} max={} (require 0 <= min <= max, max >= 1)",
                    min, max
                ),
                None => write!(f, "invalid repetition bounds: min={} max=unbounded", min),
            },
        }
    }
}

impl std::error::Error for ConstructionError {}

/// An error raised from a `custom`/`attr_custom` interpretation function.
///
/// This is the only way [`fact`](crate::tree::Match::fact) can fail: the
/// morph service returning no parses for an `inflected` spec is not an
/// error, it falls back to the original token value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterpretError(pub String);

impl Display for InterpretError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "interpretation failed: {}", self.0)
    }
}

impl std::error::Error for InterpretError {}
