use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;

const CONFIG: &str = r#"
[defaults]

[harness]
preamble = '''
#include <stdio.h>
#define assert(x) do { if (!(x)) { \
    printf("%s:%d:assert: %s\n", __FILE__, __LINE__, #x); \
    fflush(stdout); \
    exit(1); \
} } while (0)
'''
setup = ""
teardown = ""
sources = []

[build]
cflags = []
"#;

fn toolchain_available() -> bool {
    ["make", "cc", "base64"].iter().all(|tool| {
        std::process::Command::new(tool)
            .arg("--version")
            .output()
            .map(|out| out.status.success())
            .unwrap_or(false)
    })
}

fn workspace(suites: &[(&str, &str)]) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("permtest.toml"), CONFIG).unwrap();
    std::fs::create_dir(dir.path().join("tests")).unwrap();
    for (name, text) in suites {
        std::fs::write(dir.path().join("tests").join(name), text).unwrap();
    }
    dir
}

fn permtest(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("permtest").unwrap();
    cmd.current_dir(dir).env_remove("PERMTEST_CONFIG").env_remove("RUST_LOG");
    cmd
}

const PASSING: &str = r#"
[[case]]
define.N = [1, 2, 3]
code = '''
    assert(N >= 1 && N <= 3);
'''
"#;

const FAILING: &str = r#"# padding
# padding
# padding
# padding
# padding
# padding
[[case]]
code = '''
    assert(1 == 2);
'''
"#;

#[test]
fn help_lists_flags() {
    Command::cargo_bin("permtest")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--keep-going"))
        .stdout(predicate::str::contains("--valgrind"));
}

#[test]
fn unknown_suite_is_an_error() {
    let dir = workspace(&[]);
    permtest(dir.path())
        .arg("test_missing")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("no test suite named 'test_missing'"));
}

#[test]
fn malformed_config_is_an_error() {
    let dir = workspace(&[("test_a.toml", PASSING)]);
    std::fs::write(dir.path().join("broken.toml"), "[build\n").unwrap();
    permtest(dir.path())
        .args(["-c", "broken.toml"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("broken.toml"));
}

#[test]
fn malformed_define_is_an_error() {
    let dir = workspace(&[("test_a.toml", PASSING)]);
    permtest(dir.path())
        .args(["-D", "NOVALUE"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("NAME=VALUE"));
}

#[test]
fn passing_suite_reports_totals() {
    if !toolchain_available() {
        return;
    }
    let dir = workspace(&[("test_a.toml", PASSING)]);
    permtest(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("built 1 test suites, 1 test cases, 3 permutations"))
        .stdout(predicate::str::contains("tests passed: 3"))
        .stdout(predicate::str::contains("tests failed: 0"));
}

#[test]
fn failing_assertion_is_reported_not_propagated() {
    if !toolchain_available() {
        return;
    }
    let dir = workspace(&[("test_fail.toml", FAILING)]);
    permtest(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("--- test_fail[0,0] ---"))
        .stdout(predicate::str::contains("tests/test_fail.toml:9:"))
        .stdout(predicate::str::contains("    assert(1 == 2);"))
        .stdout(predicate::str::contains("tests failed: 1"));
}

#[test]
fn override_and_selector_narrow_the_run() {
    if !toolchain_available() {
        return;
    }
    let dir = workspace(&[("test_a.toml", PASSING)]);
    let out = permtest(dir.path())
        .args(["test_a[0,1]", "-D", "N=[2,3,4]", "-o", "json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let report: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(report["build"]["permutations"], 3);
    assert_eq!(report["results"].as_array().unwrap().len(), 1);
    assert_eq!(report["results"][0]["case"], 0);
    assert_eq!(report["results"][0]["permutation"], 1);
    assert_eq!(report["passed"], 1);
}

#[test]
fn build_failure_exits_before_testing() {
    if !toolchain_available() {
        return;
    }
    let broken = "[[case]]\ncode = '''\n    not C at all\n'''\n";
    let dir = workspace(&[("test_broken.toml", broken)]);
    permtest(dir.path())
        .assert()
        .code(3)
        .stdout(predicate::str::contains("====== testing ======").not())
        .stderr(predicate::str::contains("Build failed"));
    assert!(!dir.path().join("tests/test_broken.toml.test").exists());
}

#[test]
fn build_failure_in_json_mode_keeps_stdout_clean() {
    if !toolchain_available() {
        return;
    }
    let broken = "[[case]]\ncode = '''\n    not C at all\n'''\n";
    let dir = workspace(&[("test_broken.toml", broken)]);
    permtest(dir.path())
        .args(["-o", "json"])
        .assert()
        .code(3)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("Build failed"));
}
