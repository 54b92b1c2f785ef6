#![deny(unsafe_code)]
//! # permtest-runner
//!
//! Everything that happens after artifacts are rendered:
//!
//! - [`BuildOrchestrator`] builds all suites with one build-tool invocation.
//! - [`ExecutionRunner`] runs each selected permutation in its own process
//!   against a freshly reset backing store, optionally under a memory
//!   checker.
//! - [`diagnose`](diagnose::diagnose) recovers the failing assertion from
//!   a test's output.
//! - [`RunReport`] aggregates results for text or JSON output.
//!
//! [`Session`] strings the stages together. Processes are started through
//! the [`ProcessLauncher`] seam so stages can be exercised without a
//! compiler.

pub mod build;
pub mod diagnose;
pub mod error;
pub mod execute;
pub mod process;
pub mod report;
pub mod session;

pub use build::{BuildConfig, BuildOptions, BuildOrchestrator, BuildSummary};
pub use error::{RunnerError, RunnerResult};
pub use execute::{Execution, ExecutionRunner, RunConfig, RunObserver, RunOptions, Silent};
pub use process::{Captured, CommandSpec, ProcessLauncher, TokioLauncher};
pub use report::{ProgressPrinter, RunReport};
pub use session::Session;
