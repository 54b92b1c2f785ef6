//! Runner error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that stop a test session.
///
/// Test failures are not errors; they are recorded as
/// [`Outcome::Failed`](permtest_types::Outcome::Failed).
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed waiting for {program}: {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to reset backing store {}: {source}", .path.display())]
    StoreReset {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Build failed ({})", exit_label(.exit_code))]
    BuildFailed {
        exit_code: Option<i32>,
        output: Vec<String>,
    },

    #[error("Codegen error: {0}")]
    Codegen(#[from] permtest_codegen::CodegenError),
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "terminated by signal".to_string(),
    }
}

/// Result type for runner operations.
pub type RunnerResult<T> = Result<T, RunnerError>;
