//! Codegen error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while writing generated artifacts.
#[derive(Debug, Error)]
pub enum CodegenError {
    #[error("Failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for codegen operations.
pub type CodegenResult<T> = Result<T, CodegenError>;
