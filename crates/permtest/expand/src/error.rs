//! Error types for evaluation and expansion.

use thiserror::Error;

/// Reasons an expression string could not be evaluated.
///
/// These never escape the merger: a value that fails to evaluate is kept
/// as raw text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("Unexpected character '{0}' at offset {1}")]
    UnexpectedChar(char, usize),

    #[error("Invalid integer literal: {0}")]
    InvalidLiteral(String),

    #[error("Unexpected token: {0}")]
    UnexpectedToken(String),

    #[error("Unexpected end of expression")]
    UnexpectedEnd,

    #[error("Unbound name: {0}")]
    Unbound(String),

    #[error("Name is not a scalar: {0}")]
    NotScalar(String),

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Arithmetic overflow")]
    Overflow,
}

/// Result type for expression evaluation.
pub type EvalResult<T> = Result<T, EvalError>;

/// Configuration errors found while expanding a suite.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExpandError {
    #[error("{suite}[{case}]: parameter '{key}' has no candidate values")]
    EmptyCandidates {
        suite: String,
        case: usize,
        key: String,
    },

    #[error("{suite}[{case}]: no parameter combinations (an alternatives list is empty)")]
    NoCombinations { suite: String, case: usize },

    #[error("{suite}[{case}]: parameter '{key}' is bound in only some permutations")]
    InconsistentKeys {
        suite: String,
        case: usize,
        key: String,
    },
}

/// Result type for expansion.
pub type ExpandResult<T> = Result<T, ExpandError>;
