//! Make fragment accompanying each generated unit.

use base64::Engine;
use permtest_types::ExpandedSuite;

use crate::artifact::ArtifactPaths;
use crate::harness::HarnessConfig;

/// Render the make fragment for one suite.
///
/// The fragment
/// - adds a `-D` definition per suite-wide constant to the target's CFLAGS,
/// - regenerates the unit from an embedded copy whenever the suite file is
///   newer than it, and
/// - links the target from the unit and the harness sources.
///
/// The fragment itself is a prerequisite of the target so that a change
/// of suite-wide constants forces a rebuild.
pub fn render_rules(
    suite: &ExpandedSuite,
    paths: &ArtifactPaths,
    unit: &str,
    harness: &HarnessConfig,
) -> String {
    let target = paths.target.display();
    let source = paths.source.display();
    let mut out = String::new();

    out.push_str(&format!(
        "# AUTOGENERATED from {}, do not edit\n\n",
        suite.suite.path.display()
    ));

    for (k, v) in &suite.constants {
        out.push_str(&format!(
            "{target}: override CFLAGS += {}\n",
            shell_quote(&format!("-D{k}={}", v.to_c_token()))
        ));
    }
    if !suite.constants.is_empty() {
        out.push('\n');
    }

    let encoded = base64::engine::general_purpose::STANDARD.encode(unit.as_bytes());
    out.push_str(&format!("{source}: {}\n", suite.suite.path.display()));
    out.push_str(&format!("\tprintf '%s' '{encoded}' | base64 -d > $@\n\n"));

    let mut prereqs = vec![source.to_string(), paths.rules.display().to_string()];
    prereqs.extend(harness.sources.iter().map(|s| s.display().to_string()));
    out.push_str(&format!("{target}: {}\n", prereqs.join(" ")));
    out.push_str("\t$(CC) $(CFLAGS) $(filter-out %.mk,$^) $(LFLAGS) -o $@\n");

    out
}

/// Quote `word` for the shell a recipe runs in, escaping `$` for make.
fn shell_quote(word: &str) -> String {
    let plain = word
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || "-_=.,/+".contains(c));
    let quoted = if plain {
        word.to_string()
    } else {
        format!("'{}'", word.replace('\'', r"'\''"))
    };
    quoted.replace('$', "$$")
}
