//! Assertion marker recovery from failing test output.
//!
//! Test binaries report a failed assertion as a line of the form
//! `<path>:<line>:assert: <message>`, where `<path>` and `<line>` refer to
//! the suite file thanks to the `#line` directives in the generated unit.

use permtest_types::AssertionRecord;
use regex::Regex;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

fn marker_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^([^:\n]+):([0-9]+):assert: ?(.*)$").expect("assertion marker pattern is valid")
    })
}

/// A parsed assertion marker, not yet resolved against its source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssertMarker {
    pub path: PathBuf,
    pub line: usize,
    pub message: String,
}

/// Parse one output line as an assertion marker.
pub fn parse_marker(line: &str) -> Option<AssertMarker> {
    let caps = marker_pattern().captures(line)?;
    Some(AssertMarker {
        path: PathBuf::from(&caps[1]),
        line: caps[2].parse().ok()?,
        message: caps[3].to_string(),
    })
}

/// Read line `line` (1-based) of `path`, without its newline.
pub fn source_line(path: &Path, line: usize) -> Option<String> {
    let index = line.checked_sub(1)?;
    let file = File::open(path).ok()?;
    let text = BufReader::new(file).lines().nth(index)?.ok()?;
    Some(text.trim_end_matches('\r').to_string())
}

/// Resolve the last assertion marker in `lines` whose source line can be
/// read.
///
/// Returns `None` when no marker resolves; the failure is then reported
/// with raw output only.
pub fn diagnose(lines: &[String]) -> Option<AssertionRecord> {
    lines
        .iter()
        .rev()
        .filter_map(|line| parse_marker(line))
        .find_map(resolve)
}

fn resolve(marker: AssertMarker) -> Option<AssertionRecord> {
    let Some(text) = source_line(&marker.path, marker.line) else {
        tracing::debug!(
            path = %marker.path.display(),
            line = marker.line,
            "assertion source not readable"
        );
        return None;
    };
    Some(AssertionRecord {
        path: marker.path,
        line: marker.line,
        text,
        message: marker.message,
    })
}
