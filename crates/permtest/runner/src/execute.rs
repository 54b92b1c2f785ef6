//! Sequential execution of built permutations.

use permtest_codegen::ArtifactPaths;
use permtest_types::{ExpandedCase, ExpandedSuite, Failure, Outcome, Permutation, PermutationResult, Selector};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use crate::diagnose::diagnose;
use crate::error::{RunnerError, RunnerResult};
use crate::process::{Captured, CommandSpec, ProcessLauncher};

/// Runtime environment of the test binaries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Backing-store directory, removed before every permutation.
    pub store_dir: PathBuf,
    /// Memory checker command prefix.
    pub memcheck: Vec<String>,
    /// Exit code the memory checker uses to report a leak.
    pub leak_exit_code: i32,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            store_dir: PathBuf::from("blocks"),
            memcheck: ["valgrind", "--leak-check=full", "--error-exitcode=4", "-q"]
                .into_iter()
                .map(String::from)
                .collect(),
            leak_exit_code: 4,
        }
    }
}

/// Per-invocation execution switches.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Only run permutations matching this selector.
    pub selector: Option<Selector>,
    /// Keep running after the first failure.
    pub keep_going: bool,
    /// Wrap non-leaky cases in the memory checker.
    pub memcheck: bool,
    /// Echo commands and output as they run.
    pub verbose: bool,
}

/// Receives progress events while permutations execute.
pub trait RunObserver {
    fn suite_started(&mut self, _suite: &str) {}
    fn permutation_finished(&mut self, _result: &PermutationResult) {}
    fn suite_finished(&mut self, _suite: &str) {}
}

/// Observer that ignores every event.
#[derive(Debug, Default)]
pub struct Silent;

impl RunObserver for Silent {}

/// Results of an execution pass, in execution order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Execution {
    pub results: Vec<PermutationResult>,
    /// A failure stopped the pass before every selected permutation ran.
    pub halted: bool,
}

/// Invokes each built artifact once per selected permutation.
pub struct ExecutionRunner {
    config: RunConfig,
    launcher: Arc<dyn ProcessLauncher>,
}

impl ExecutionRunner {
    pub fn new(config: RunConfig, launcher: Arc<dyn ProcessLauncher>) -> Self {
        Self { config, launcher }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Run the selected permutations of `suites` strictly in suite, case,
    /// permutation order.
    pub async fn run(
        &self,
        suites: &[ExpandedSuite],
        options: RunOptions,
        observer: &mut dyn RunObserver,
    ) -> RunnerResult<Execution> {
        let mut execution = Execution::default();

        for suite in suites {
            let program = program_path(&ArtifactPaths::for_suite(&suite.suite.path).target);
            observer.suite_started(suite.name());

            for (case, perm) in suite.permutations() {
                if let Some(selector) = &options.selector {
                    if !selector.matches(perm.case, perm.index) {
                        continue;
                    }
                }

                let result = self.run_permutation(suite.name(), &program, case, perm, options).await?;
                observer.permutation_finished(&result);
                let failed = !result.outcome.is_pass();
                execution.results.push(result);

                if failed && !options.keep_going {
                    execution.halted = true;
                    break;
                }
            }

            observer.suite_finished(suite.name());
            if execution.halted {
                tracing::info!(suite = %suite.name(), "stopping at first failure");
                break;
            }
        }

        Ok(execution)
    }

    /// The command for one permutation.
    pub fn command(&self, program: &str, case: &ExpandedCase, perm: &Permutation, memcheck: bool) -> CommandSpec {
        let cmd = CommandSpec::new(program)
            .arg(perm.case.to_string())
            .arg(perm.index.to_string());
        if memcheck && !case.case.leaky {
            cmd.wrapped_in(&self.config.memcheck)
        } else {
            cmd
        }
    }

    async fn run_permutation(
        &self,
        suite: &str,
        program: &str,
        case: &ExpandedCase,
        perm: &Permutation,
        options: RunOptions,
    ) -> RunnerResult<PermutationResult> {
        reset_store(&self.config.store_dir).await?;

        let memchecked = options.memcheck && !case.case.leaky;
        let cmd = self.command(program, case, perm, options.memcheck);
        if options.verbose {
            println!("{cmd}");
        }

        let started = Instant::now();
        let captured = match self.launcher.run(&cmd, options.verbose).await {
            Ok(captured) => captured,
            Err(err) => {
                tracing::warn!(command = %cmd, error = %err, "test binary did not run");
                Captured {
                    lines: vec![err.to_string()],
                    exit_code: None,
                }
            }
        };
        let duration = started.elapsed();

        let outcome = if captured.success() {
            Outcome::Passed
        } else {
            let leak = memchecked && captured.exit_code == Some(self.config.leak_exit_code);
            let assertion = diagnose(&captured.lines);
            Outcome::Failed(Failure {
                output: captured.lines,
                exit_code: captured.exit_code,
                leak,
                assertion,
            })
        };

        tracing::debug!(
            suite,
            case = perm.case,
            permutation = perm.index,
            passed = outcome.is_pass(),
            "permutation finished"
        );

        Ok(PermutationResult {
            suite: suite.to_string(),
            case: perm.case,
            permutation: perm.index,
            duration,
            outcome,
        })
    }
}

/// Relative artifact paths are invoked as `./path` so the shell lookup
/// never searches `PATH`.
fn program_path(target: &Path) -> String {
    if target.is_relative() {
        Path::new(".").join(target).display().to_string()
    } else {
        target.display().to_string()
    }
}

async fn reset_store(dir: &Path) -> RunnerResult<()> {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(RunnerError::StoreReset {
            path: dir.to_path_buf(),
            source,
        }),
    }
}
