//! One pass of generate, build, execute and report over a set of suites.

use permtest_codegen::{ArtifactGenerator, GeneratedArtifact, HarnessConfig};
use permtest_types::ExpandedSuite;
use std::sync::Arc;

use crate::build::{BuildConfig, BuildOptions, BuildOrchestrator, BuildSummary};
use crate::error::RunnerResult;
use crate::execute::{Execution, ExecutionRunner, RunConfig, RunObserver, RunOptions, Silent};
use crate::process::{ProcessLauncher, TokioLauncher};
use crate::report::RunReport;

/// Ties the pipeline stages together around a shared process launcher.
pub struct Session {
    generator: ArtifactGenerator,
    builder: BuildOrchestrator,
    runner: ExecutionRunner,
}

impl Session {
    pub fn new(harness: HarnessConfig, build: BuildConfig, run: RunConfig) -> Self {
        Self::with_launcher(harness, build, run, Arc::new(TokioLauncher))
    }

    pub fn with_launcher(
        harness: HarnessConfig,
        build: BuildConfig,
        run: RunConfig,
        launcher: Arc<dyn ProcessLauncher>,
    ) -> Self {
        Self {
            generator: ArtifactGenerator::new(harness),
            builder: BuildOrchestrator::new(build, launcher.clone()),
            runner: ExecutionRunner::new(run, launcher),
        }
    }

    /// Render and persist the artifacts of every suite.
    pub async fn prepare(&self, suites: &[ExpandedSuite]) -> RunnerResult<Vec<GeneratedArtifact>> {
        let mut artifacts = Vec::with_capacity(suites.len());
        for suite in suites {
            let artifact = self.generator.generate(suite);
            let written = self.generator.write(&artifact).await?;
            tracing::debug!(
                suite = %artifact.suite,
                unit_written = written.unit_written,
                rules_written = written.rules_written,
                "prepared"
            );
            artifacts.push(artifact);
        }
        Ok(artifacts)
    }

    pub async fn build(
        &self,
        suites: &[ExpandedSuite],
        artifacts: &[GeneratedArtifact],
        options: BuildOptions,
    ) -> RunnerResult<BuildSummary> {
        self.builder.build(suites, artifacts, options).await
    }

    pub async fn execute(
        &self,
        suites: &[ExpandedSuite],
        options: RunOptions,
        observer: &mut dyn RunObserver,
    ) -> RunnerResult<Execution> {
        self.runner.run(suites, options, observer).await
    }

    /// Run every stage without progress output.
    ///
    /// A build failure is returned before any test binary is invoked.
    pub async fn run(
        &self,
        suites: &[ExpandedSuite],
        build: BuildOptions,
        run: RunOptions,
    ) -> RunnerResult<RunReport> {
        let artifacts = self.prepare(suites).await?;
        let summary = self.build(suites, &artifacts, build).await?;
        let execution = self.execute(suites, run, &mut Silent).await?;
        Ok(RunReport::new(summary, execution))
    }
}
