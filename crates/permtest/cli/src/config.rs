//! CLI configuration file

use crate::error::{CliError, CliResult};
use crate::loader::param_map;
use permtest_codegen::HarnessConfig;
use permtest_runner::{BuildConfig, RunConfig};
use permtest_types::ParamMap;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default configuration file, looked up in the working directory.
pub const DEFAULT_CONFIG: &str = "permtest.toml";

/// CLI configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CliConfig {
    /// Directory holding `test_*.toml` suites
    pub tests_dir: PathBuf,

    /// Global parameter defaults, lowest precedence
    pub defaults: Option<toml::Table>,

    /// Code woven around every case
    pub harness: HarnessConfig,

    /// Build tool invocation
    pub build: BuildConfig,

    /// Test binary environment
    pub run: RunConfig,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            tests_dir: PathBuf::from("tests"),
            defaults: None,
            harness: HarnessConfig::default(),
            build: BuildConfig::default(),
            run: RunConfig::default(),
        }
    }
}

impl CliConfig {
    /// Load configuration from file
    ///
    /// An explicitly named file must exist; the default file is optional.
    pub fn load(path: Option<&Path>) -> CliResult<Self> {
        let (config_path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG), false),
        };

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path)?;
            let config = Self::parse(&contents).map_err(|message| CliError::Config {
                path: config_path.clone(),
                message,
            })?;
            tracing::debug!(path = %config_path.display(), "loaded configuration");
            Ok(config)
        } else if explicit {
            Err(CliError::Config {
                path: config_path,
                message: "file not found".into(),
            })
        } else {
            Ok(CliConfig::default())
        }
    }

    pub fn parse(contents: &str) -> Result<Self, String> {
        toml::from_str(contents).map_err(|e| e.to_string())
    }

    /// Global defaults as a parameter layer.
    pub fn globals(&self) -> ParamMap {
        match &self.defaults {
            Some(table) => param_map(table),
            None => littlefs_geometry(),
        }
    }
}

/// Block-device geometry expected by the littlefs harness.
fn littlefs_geometry() -> ParamMap {
    ParamMap::new()
        .with("LFS_READ_SIZE", 16)
        .with("LFS_PROG_SIZE", "LFS_READ_SIZE")
        .with("LFS_BLOCK_SIZE", 512)
        .with("LFS_BLOCK_COUNT", 1024)
        .with("LFS_BLOCK_CYCLES", 1024)
        .with("LFS_CACHE_SIZE", "(64 % LFS_PROG_SIZE == 0 ? 64 : LFS_PROG_SIZE)")
        .with("LFS_LOOKAHEAD_SIZE", 16)
}

#[cfg(test)]
mod tests {
    use super::*;
    use permtest_types::ParamValue;

    #[test]
    fn test_default_config() {
        let config = CliConfig::default();
        assert_eq!(config.tests_dir, PathBuf::from("tests"));
        assert_eq!(config.build.tool, "make");
        assert_eq!(config.run.store_dir, PathBuf::from("blocks"));
        assert_eq!(config.run.leak_exit_code, 4);
        assert_eq!(config.globals().len(), 7);
        assert_eq!(
            config.globals().get("LFS_PROG_SIZE"),
            Some(&ParamValue::Str("LFS_READ_SIZE".into()))
        );
    }

    #[test]
    fn test_partial_config() {
        let config = CliConfig::parse(
            r#"
tests_dir = "suites"

[defaults]
BLOCK = 4096
NAME = "BLOCK * 2"

[build]
jobs = 4
makefile = "Makefile"

[run]
store_dir = "/tmp/store"
"#,
        )
        .unwrap();

        assert_eq!(config.tests_dir, PathBuf::from("suites"));
        assert_eq!(config.build.jobs, Some(4));
        assert_eq!(config.build.tool, "make");
        assert_eq!(config.build.makefile, Some(PathBuf::from("Makefile")));
        assert_eq!(config.run.store_dir, PathBuf::from("/tmp/store"));
        assert_eq!(config.run.memcheck[0], "valgrind");

        let globals = config.globals();
        let keys: Vec<&str> = globals.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["BLOCK", "NAME"]);
    }

    #[test]
    fn test_unknown_keys_rejected() {
        assert!(CliConfig::parse("test_dir = \"x\"\n").is_err());
    }

    #[test]
    fn test_missing_explicit_file() {
        let err = CliConfig::load(Some(Path::new("/nonexistent/permtest.toml"))).unwrap_err();
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("permtest.toml");
        std::fs::write(&path, "[harness]\nsources = [\"a.c\"]\n").unwrap();

        let config = CliConfig::load(Some(&path)).unwrap();
        assert_eq!(config.harness.sources, vec![PathBuf::from("a.c")]);
        // Unset harness text falls back to the littlefs defaults.
        assert!(config.harness.setup.contains("lfs_emubd_create"));
    }
}
