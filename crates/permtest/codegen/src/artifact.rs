//! Artifact generation and idempotent persistence.

use permtest_types::ExpandedSuite;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::error::{CodegenError, CodegenResult};
use crate::harness::HarnessConfig;
use crate::rules::render_rules;
use crate::unit::render_unit;

/// Where the generated files for one suite live, next to the suite file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    /// Generated C unit, `<suite>.test.c`.
    pub source: PathBuf,
    /// Make fragment, `<suite>.test.mk`.
    pub rules: PathBuf,
    /// Test binary, `<suite>.test`.
    pub target: PathBuf,
}

impl ArtifactPaths {
    pub fn for_suite(suite_path: &Path) -> Self {
        let with_suffix = |suffix: &str| {
            let mut s = OsString::from(suite_path.as_os_str());
            s.push(suffix);
            PathBuf::from(s)
        };
        Self {
            source: with_suffix(".test.c"),
            rules: with_suffix(".test.mk"),
            target: with_suffix(".test"),
        }
    }
}

/// Rendered unit and make fragment for one suite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedArtifact {
    pub suite: String,
    pub paths: ArtifactPaths,
    pub unit: String,
    pub rules: String,
}

/// Which files [`ArtifactGenerator::write`] actually touched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteOutcome {
    pub unit_written: bool,
    pub rules_written: bool,
}

/// Renders and persists suite artifacts.
#[derive(Debug, Clone, Default)]
pub struct ArtifactGenerator {
    harness: HarnessConfig,
}

impl ArtifactGenerator {
    pub fn new(harness: HarnessConfig) -> Self {
        Self { harness }
    }

    pub fn harness(&self) -> &HarnessConfig {
        &self.harness
    }

    /// Render the artifact for `suite` without touching the filesystem.
    pub fn generate(&self, suite: &ExpandedSuite) -> GeneratedArtifact {
        let paths = ArtifactPaths::for_suite(&suite.suite.path);
        let unit = render_unit(suite, &self.harness);
        let rules = render_rules(suite, &paths, &unit, &self.harness);
        GeneratedArtifact {
            suite: suite.name().to_string(),
            paths,
            unit,
            rules,
        }
    }

    /// Persist an artifact.
    ///
    /// Files whose current content is already identical are left alone,
    /// so their modification times do not trigger needless rebuilds.
    pub async fn write(&self, artifact: &GeneratedArtifact) -> CodegenResult<WriteOutcome> {
        let unit_written = write_if_changed(&artifact.paths.source, &artifact.unit).await?;
        let rules_written = write_if_changed(&artifact.paths.rules, &artifact.rules).await?;

        tracing::debug!(
            suite = %artifact.suite,
            unit_written,
            rules_written,
            "artifact persisted"
        );

        Ok(WriteOutcome {
            unit_written,
            rules_written,
        })
    }
}

async fn write_if_changed(path: &Path, contents: &str) -> CodegenResult<bool> {
    if let Ok(existing) = tokio::fs::read(path).await {
        if existing == contents.as_bytes() {
            return Ok(false);
        }
    }
    tokio::fs::write(path, contents)
        .await
        .map_err(|source| CodegenError::Write {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use permtest_expand::Expander;
    use permtest_types::{Case, ParamMap, Suite};

    fn expanded(dir: &Path) -> ExpandedSuite {
        let suite = Suite::new(dir.join("test_write.toml"))
            .with_case(Case::new(0, 4, "    noop();\n").with_defines(ParamMap::new().with("N", vec![1, 2, 3])));
        Expander::new(ParamMap::new().with("SIZE", 16))
            .expand_suite(suite)
            .unwrap()
    }

    #[test]
    fn paths_append_suffixes() {
        let paths = ArtifactPaths::for_suite(Path::new("tests/test_dirs.toml"));
        assert_eq!(paths.source, PathBuf::from("tests/test_dirs.toml.test.c"));
        assert_eq!(paths.rules, PathBuf::from("tests/test_dirs.toml.test.mk"));
        assert_eq!(paths.target, PathBuf::from("tests/test_dirs.toml.test"));
    }

    #[tokio::test]
    async fn regeneration_is_byte_identical_and_skips_writes() {
        let dir = tempfile::tempdir().unwrap();
        let generator = ArtifactGenerator::default();

        let first = generator.generate(&expanded(dir.path()));
        let outcome = generator.write(&first).await.unwrap();
        assert_eq!(outcome, WriteOutcome { unit_written: true, rules_written: true });
        let unit_bytes = std::fs::read(&first.paths.source).unwrap();
        let rules_bytes = std::fs::read(&first.paths.rules).unwrap();

        let second = generator.generate(&expanded(dir.path()));
        assert_eq!(first, second);
        let outcome = generator.write(&second).await.unwrap();
        assert_eq!(outcome, WriteOutcome::default());
        assert_eq!(std::fs::read(&second.paths.source).unwrap(), unit_bytes);
        assert_eq!(std::fs::read(&second.paths.rules).unwrap(), rules_bytes);
    }

    #[tokio::test]
    async fn changed_input_rewrites() {
        let dir = tempfile::tempdir().unwrap();
        let generator = ArtifactGenerator::default();
        generator.write(&generator.generate(&expanded(dir.path()))).await.unwrap();

        let changed = Expander::new(ParamMap::new().with("SIZE", 32))
            .expand_suite(expanded(dir.path()).suite)
            .unwrap();
        let outcome = generator.write(&generator.generate(&changed)).await.unwrap();
        // SIZE is suite-wide, so only the make fragment changes.
        assert!(!outcome.unit_written);
        assert!(outcome.rules_written);
    }

    #[tokio::test]
    async fn unwritable_path_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let generator = ArtifactGenerator::default();
        let artifact = generator.generate(&expanded(&dir.path().join("missing")));
        let err = generator.write(&artifact).await.unwrap_err();
        assert!(err.to_string().contains("test_write.toml.test.c"));
    }
}
