//! Resolution of the positional target into suite files and a selector.

use permtest_types::Selector;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::error::{CliError, CliResult};

fn selector_suffix() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\[(\d+)(?:,(\d+))?\]$").expect("selector pattern is valid"))
}

/// Suites to load and the permutations to run from them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    /// Suite files, sorted by suite name.
    pub suites: Vec<PathBuf>,
    pub selector: Option<Selector>,
}

/// Split a trailing `[case]` or `[case,perm]` off `arg`.
pub fn split_selector(arg: &str) -> CliResult<(&str, Option<Selector>)> {
    let Some(caps) = selector_suffix().captures(arg) else {
        return Ok((arg, None));
    };
    let number = |m: regex::Match<'_>| {
        m.as_str()
            .parse::<usize>()
            .map_err(|e| CliError::Target(format!("{}: {e}", m.as_str())))
    };

    let case = caps.get(1).map(number).transpose()?.unwrap_or_default();
    let selector = match caps.get(2).map(number).transpose()? {
        Some(perm) => Selector::permutation(case, perm),
        None => Selector::case(case),
    };
    let rest = caps.get(0).map_or(arg, |m| &arg[..m.start()]);
    Ok((rest, Some(selector)))
}

/// Resolve `arg` against the filesystem.
///
/// A directory selects every `test_*.toml` in it, an existing file selects
/// itself, anything else names a suite in `tests_dir`.
pub fn resolve(arg: &str, tests_dir: &Path) -> CliResult<Target> {
    let (rest, selector) = split_selector(arg)?;
    let path = Path::new(rest);

    let mut suites = if path.is_dir() {
        discover(path)?
    } else if path.is_file() {
        vec![path.to_path_buf()]
    } else {
        let named = if rest.ends_with(".toml") {
            tests_dir.join(rest)
        } else {
            tests_dir.join(format!("{rest}.toml"))
        };
        if !named.is_file() {
            return Err(CliError::Target(format!("no test suite named '{rest}'")));
        }
        vec![named]
    };

    if suites.is_empty() {
        return Err(CliError::Target(format!(
            "no test_*.toml suites in {}",
            path.display()
        )));
    }
    suites.sort_by_key(|p| suite_key(p));

    tracing::debug!(suites = suites.len(), selector = ?selector, "resolved target");
    Ok(Target { suites, selector })
}

fn discover(dir: &Path) -> CliResult<Vec<PathBuf>> {
    let mut found = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let is_suite = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with("test_") && n.ends_with(".toml"));
        if is_suite && path.is_file() {
            found.push(path);
        }
    }
    Ok(found)
}

fn suite_key(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.trim_end_matches(".toml").to_string())
        .unwrap_or_default()
}
