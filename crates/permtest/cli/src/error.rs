//! CLI error types

use std::path::PathBuf;
use thiserror::Error;

/// CLI error type
#[derive(Error, Debug)]
pub enum CliError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error in {}: {message}", .path.display())]
    Config { path: PathBuf, message: String },

    #[error("Invalid suite {}: {message}", .path.display())]
    Suite { path: PathBuf, message: String },

    #[error("Target error: {0}")]
    Target(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Expansion error: {0}")]
    Expand(#[from] permtest_expand::ExpandError),

    #[error("{0}")]
    Runner(#[from] permtest_runner::RunnerError),
}

impl CliError {
    /// Process exit status for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Runner(permtest_runner::RunnerError::BuildFailed { .. }) => 3,
            _ => 2,
        }
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_failures_have_their_own_exit_code() {
        let build = CliError::Runner(permtest_runner::RunnerError::BuildFailed {
            exit_code: Some(2),
            output: vec![],
        });
        assert_eq!(build.exit_code(), 3);
        assert_eq!(CliError::Target("none".into()).exit_code(), 2);
    }
}
