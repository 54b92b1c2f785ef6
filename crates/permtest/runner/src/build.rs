//! Single-shot build of every generated artifact.

use permtest_codegen::GeneratedArtifact;
use permtest_types::ExpandedSuite;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::{RunnerError, RunnerResult};
use crate::process::{CommandSpec, ProcessLauncher};

/// How to invoke the external build tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Build tool executable.
    pub tool: String,
    /// Base makefile read before the generated fragments.
    pub makefile: Option<PathBuf>,
    /// Parallel jobs handed to the build tool.
    pub jobs: Option<usize>,
    /// Extra compiler flags appended to `CFLAGS`.
    pub cflags: Vec<String>,
    /// Definition added to `CFLAGS` when trace output is forwarded.
    pub trace_define: String,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            tool: "make".to_string(),
            makefile: None,
            jobs: None,
            cflags: vec!["-fdiagnostics-color=always".to_string()],
            trace_define: "LFS_YES_TRACE".to_string(),
        }
    }
}

/// Per-invocation build switches.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuildOptions {
    /// Echo the command and its output while building.
    pub verbose: bool,
    /// Compile with [`BuildConfig::trace_define`].
    pub trace: bool,
}

/// Totals reported after a successful build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildSummary {
    pub suites: usize,
    pub cases: usize,
    pub permutations: usize,
}

impl BuildSummary {
    pub fn of(suites: &[ExpandedSuite]) -> Self {
        Self {
            suites: suites.len(),
            cases: suites.iter().map(ExpandedSuite::case_count).sum(),
            permutations: suites.iter().map(ExpandedSuite::permutation_count).sum(),
        }
    }
}

impl fmt::Display for BuildSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "built {} test suites, {} test cases, {} permutations",
            self.suites, self.cases, self.permutations
        )
    }
}

/// Drives the build tool across all artifacts at once, leaving
/// parallelism to the tool itself.
pub struct BuildOrchestrator {
    config: BuildConfig,
    launcher: Arc<dyn ProcessLauncher>,
}

impl BuildOrchestrator {
    pub fn new(config: BuildConfig, launcher: Arc<dyn ProcessLauncher>) -> Self {
        Self { config, launcher }
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// The build command for `artifacts`.
    pub fn command(&self, artifacts: &[GeneratedArtifact], options: BuildOptions) -> CommandSpec {
        let mut cmd = CommandSpec::new(&self.config.tool);
        if let Some(makefile) = &self.config.makefile {
            cmd = cmd.arg("-f").arg(makefile.display().to_string());
        }
        for artifact in artifacts {
            cmd = cmd.arg("-f").arg(artifact.paths.rules.display().to_string());
        }
        if let Some(jobs) = self.config.jobs {
            cmd = cmd.arg(format!("-j{jobs}"));
        }

        let mut cflags = self.config.cflags.clone();
        if options.trace {
            cflags.push(format!("-D{}", self.config.trace_define));
        }
        if !cflags.is_empty() {
            cmd = cmd.arg(format!("CFLAGS+={}", cflags.join(" ")));
        }

        cmd.args(
            artifacts
                .iter()
                .map(|artifact| artifact.paths.target.display().to_string()),
        )
    }

    /// Build every target.
    ///
    /// A non-zero exit of the build tool is returned as
    /// [`RunnerError::BuildFailed`] carrying the captured output.
    pub async fn build(
        &self,
        suites: &[ExpandedSuite],
        artifacts: &[GeneratedArtifact],
        options: BuildOptions,
    ) -> RunnerResult<BuildSummary> {
        let cmd = self.command(artifacts, options);
        if options.verbose {
            println!("{cmd}");
        }

        let captured = self.launcher.run(&cmd, options.verbose).await?;
        if !captured.success() {
            tracing::error!(exit_code = ?captured.exit_code, "build failed");
            return Err(RunnerError::BuildFailed {
                exit_code: captured.exit_code,
                output: captured.lines,
            });
        }

        let summary = BuildSummary::of(suites);
        tracing::debug!(
            suites = summary.suites,
            cases = summary.cases,
            permutations = summary.permutations,
            "build finished"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::Captured;
    use async_trait::async_trait;
    use permtest_codegen::ArtifactGenerator;
    use permtest_expand::Expander;
    use permtest_types::{Case, ParamMap, Suite};
    use std::sync::Mutex;

    /// Records commands and answers with a fixed exit code.
    struct ScriptedLauncher {
        exit_code: Option<i32>,
        seen: Mutex<Vec<CommandSpec>>,
    }

    impl ScriptedLauncher {
        fn new(exit_code: Option<i32>) -> Arc<Self> {
            Arc::new(Self {
                exit_code,
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ProcessLauncher for ScriptedLauncher {
        async fn run(&self, command: &CommandSpec, _echo: bool) -> RunnerResult<Captured> {
            self.seen.lock().unwrap().push(command.clone());
            Ok(Captured {
                lines: vec!["cc -o x x.c".into(), "x.c:1:1: error: nope".into()],
                exit_code: self.exit_code,
            })
        }
    }

    fn fixtures() -> (Vec<ExpandedSuite>, Vec<GeneratedArtifact>) {
        let expander = Expander::new(ParamMap::new().with("SIZE", 16));
        let suites: Vec<_> = ["tests/test_a.toml", "tests/test_b.toml"]
            .into_iter()
            .map(|path| {
                let suite = Suite::new(path)
                    .with_case(Case::new(0, 3, "").with_defines(ParamMap::new().with("N", vec![1, 2])))
                    .with_case(Case::new(1, 8, ""));
                expander.expand_suite(suite).unwrap()
            })
            .collect();
        let generator = ArtifactGenerator::default();
        let artifacts = suites.iter().map(|s| generator.generate(s)).collect();
        (suites, artifacts)
    }

    #[test]
    fn command_lists_fragments_then_targets() {
        let (_, artifacts) = fixtures();
        let config = BuildConfig {
            makefile: Some("Makefile".into()),
            jobs: Some(8),
            ..BuildConfig::default()
        };
        let orchestrator = BuildOrchestrator::new(config, ScriptedLauncher::new(Some(0)));

        let cmd = orchestrator.command(&artifacts, BuildOptions::default());
        assert_eq!(cmd.program, "make");
        assert_eq!(
            cmd.args,
            vec![
                "-f",
                "Makefile",
                "-f",
                "tests/test_a.toml.test.mk",
                "-f",
                "tests/test_b.toml.test.mk",
                "-j8",
                "CFLAGS+=-fdiagnostics-color=always",
                "tests/test_a.toml.test",
                "tests/test_b.toml.test",
            ]
        );
    }

    #[test]
    fn trace_adds_define() {
        let (_, artifacts) = fixtures();
        let config = BuildConfig {
            cflags: vec![],
            ..BuildConfig::default()
        };
        let orchestrator = BuildOrchestrator::new(config, ScriptedLauncher::new(Some(0)));

        let plain = orchestrator.command(&artifacts, BuildOptions::default());
        assert!(!plain.args.iter().any(|a| a.starts_with("CFLAGS")));

        let traced = orchestrator.command(
            &artifacts,
            BuildOptions {
                trace: true,
                ..BuildOptions::default()
            },
        );
        assert!(traced.args.contains(&"CFLAGS+=-DLFS_YES_TRACE".to_string()));
    }

    #[tokio::test]
    async fn success_reports_totals() {
        let (suites, artifacts) = fixtures();
        let launcher = ScriptedLauncher::new(Some(0));
        let orchestrator = BuildOrchestrator::new(BuildConfig::default(), launcher.clone());

        let summary = orchestrator
            .build(&suites, &artifacts, BuildOptions::default())
            .await
            .unwrap();
        assert_eq!(
            summary,
            BuildSummary {
                suites: 2,
                cases: 4,
                permutations: 6
            }
        );
        assert_eq!(summary.to_string(), "built 2 test suites, 4 test cases, 6 permutations");
        assert_eq!(launcher.seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn failure_surfaces_output() {
        let (suites, artifacts) = fixtures();
        let orchestrator = BuildOrchestrator::new(BuildConfig::default(), ScriptedLauncher::new(Some(2)));

        let err = orchestrator
            .build(&suites, &artifacts, BuildOptions::default())
            .await
            .unwrap_err();
        match err {
            RunnerError::BuildFailed { exit_code, output } => {
                assert_eq!(exit_code, Some(2));
                assert_eq!(output[1], "x.c:1:1: error: nope");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
