//! Result aggregation and rendering.

use chrono::{DateTime, Utc};
use colored::Colorize;
use permtest_types::{Failure, PermutationResult};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::io::Write as _;

use crate::build::BuildSummary;
use crate::diagnose::parse_marker;
use crate::execute::{Execution, RunObserver};

/// Everything known about a finished session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub generated_at: DateTime<Utc>,
    pub build: BuildSummary,
    pub passed: usize,
    pub failed: usize,
    /// Execution stopped at the first failure.
    pub halted: bool,
    pub results: Vec<PermutationResult>,
}

impl RunReport {
    pub fn new(build: BuildSummary, execution: Execution) -> Self {
        let failed = execution
            .results
            .iter()
            .filter(|r| !r.outcome.is_pass())
            .count();
        Self {
            generated_at: Utc::now(),
            build,
            passed: execution.results.len() - failed,
            failed,
            halted: execution.halted,
            results: execution.results,
        }
    }

    pub fn failures(&self) -> impl Iterator<Item = (&PermutationResult, &Failure)> {
        self.results.iter().filter_map(|r| r.failure().map(|f| (r, f)))
    }

    /// Failure blocks followed by the pass/fail totals.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for (result, failure) in self.failures() {
            let _ = writeln!(out, "--- {result} ---");
            render_failure(&mut out, failure);
            out.push('\n');
        }
        let _ = writeln!(out, "tests passed: {}", self.passed);
        let _ = writeln!(out, "tests failed: {}", self.failed);
        out
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

fn render_failure(out: &mut String, failure: &Failure) {
    let Some(assertion) = &failure.assertion else {
        for line in &failure.output {
            let _ = writeln!(out, "{line}");
        }
        render_notes(out, failure);
        return;
    };

    // The resolved marker line is replaced by the form printed below.
    let marker = failure.output.iter().rposition(|line| {
        parse_marker(line).is_some_and(|m| m.path == assertion.path && m.line == assertion.line)
    });
    for (index, line) in failure.output.iter().enumerate() {
        if Some(index) != marker {
            let _ = writeln!(out, "{line}");
        }
    }
    let _ = writeln!(
        out,
        "{}{} {}",
        format!("{}:{}:", assertion.path.display(), assertion.line).bright_white(),
        "assert:".bright_red(),
        assertion.message
    );
    let _ = writeln!(out, "{}", assertion.text);
    render_notes(out, failure);
}

fn render_notes(out: &mut String, failure: &Failure) {
    if failure.leak {
        let _ = writeln!(out, "{}", "memory checker reported a leak".yellow());
    }
    if failure.exit_code.is_none() {
        let _ = writeln!(out, "{}", "terminated by signal".yellow());
    }
}

/// Prints `suite ✓✓✗` progress lines as permutations finish.
#[derive(Debug, Default)]
pub struct ProgressPrinter;

impl RunObserver for ProgressPrinter {
    fn suite_started(&mut self, suite: &str) {
        print!("{suite} ");
        let _ = std::io::stdout().flush();
    }

    fn permutation_finished(&mut self, result: &PermutationResult) {
        if result.outcome.is_pass() {
            print!("{}", "✓".green());
        } else {
            print!("{}", "✗".red());
        }
        let _ = std::io::stdout().flush();
    }

    fn suite_finished(&mut self, _suite: &str) {
        println!();
    }
}
