//! Execution outcomes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// An assertion marker resolved back to its source line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssertionRecord {
    pub path: PathBuf,
    pub line: usize,
    /// The source text of `line`, without its newline.
    pub text: String,
    pub message: String,
}

/// Everything captured from a failing permutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    /// Interleaved stdout/stderr lines, without newlines.
    pub output: Vec<String>,
    /// Exit code, or `None` when the process was killed by a signal.
    pub exit_code: Option<i32>,
    /// The memory checker reported a leak.
    pub leak: bool,
    pub assertion: Option<AssertionRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Passed,
    Failed(Failure),
}

impl Outcome {
    pub fn is_pass(&self) -> bool {
        matches!(self, Outcome::Passed)
    }
}

/// The outcome of one executed permutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermutationResult {
    pub suite: String,
    pub case: usize,
    pub permutation: usize,
    pub duration: Duration,
    pub outcome: Outcome,
}

impl PermutationResult {
    pub fn failure(&self) -> Option<&Failure> {
        match &self.outcome {
            Outcome::Failed(failure) => Some(failure),
            Outcome::Passed => None,
        }
    }
}

impl fmt::Display for PermutationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{},{}]", self.suite, self.case, self.permutation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_label() {
        let result = PermutationResult {
            suite: "test_dirs".into(),
            case: 1,
            permutation: 3,
            duration: Duration::ZERO,
            outcome: Outcome::Passed,
        };
        assert_eq!(result.to_string(), "test_dirs[1,3]");
        assert!(result.failure().is_none());
    }

    #[test]
    fn outcome_json_is_tagged() {
        let failed = Outcome::Failed(Failure {
            output: vec!["boom".into()],
            exit_code: Some(1),
            leak: false,
            assertion: None,
        });
        let json = serde_json::to_value(&failed).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["exit_code"], 1);
        assert_eq!(serde_json::to_value(Outcome::Passed).unwrap()["status"], "passed");
    }
}
