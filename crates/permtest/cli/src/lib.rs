//! permtest CLI - build and run parameterized test suites
//!
//! Suites are TOML files holding C code fragments and parameter
//! definitions. Every combination of parameters becomes a permutation;
//! all suites are compiled with a single build-tool invocation and each
//! selected permutation runs in its own process.

use clap::Parser;
use permtest_expand::Expander;
use permtest_runner::{
    BuildOptions, ProgressPrinter, RunObserver, RunOptions, RunReport, RunnerError, Session, Silent,
};
use permtest_types::ParamMap;
use std::ffi::OsString;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub mod config;
mod error;
pub mod loader;
pub mod output;
pub mod target;

pub use config::CliConfig;
pub use error::{CliError, CliResult};
use output::OutputFormat;

/// permtest CLI application
#[derive(Parser, Debug)]
#[command(name = "permtest")]
#[command(about = "Run parameterized tests in various configurations", long_about = None)]
#[command(version)]
struct Cli {
    /// Tests to run: a directory, a suite file or a suite name, optionally
    /// followed by [case] or [case,perm]. Defaults to the tests directory.
    target: Option<String>,

    /// Override a parameter, e.g. -D N=4 or -D N=[1,2]
    #[arg(short = 'D', value_name = "NAME=VALUE")]
    define: Vec<String>,

    /// Echo build and test commands with their output
    #[arg(short, long)]
    verbose: bool,

    /// Compile with trace output enabled
    #[arg(short, long)]
    trace: bool,

    /// Run all tests instead of stopping on the first failure
    #[arg(short, long)]
    keep_going: bool,

    /// Run non-leaky tests under the memory checker
    #[arg(long)]
    valgrind: bool,

    /// Configuration file path
    #[arg(short, long, env = "PERMTEST_CONFIG")]
    config: Option<PathBuf>,

    /// Output format (table, json)
    #[arg(short, long, default_value = "table")]
    output: OutputFormat,

    /// Parallel build jobs
    #[arg(short, long)]
    jobs: Option<usize>,
}

/// Run using the current process arguments.
pub async fn run() -> CliResult<()> {
    run_with_args(std::env::args_os()).await
}

/// Run using the provided argument iterator.
pub async fn run_with_args<I, T>(args: I) -> CliResult<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::parse_from(args);

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .without_time()
                .with_writer(std::io::stderr),
        )
        .try_init();

    let mut config = CliConfig::load(cli.config.as_deref())?;
    if cli.jobs.is_some() {
        config.build.jobs = cli.jobs;
    }

    let arg = cli
        .target
        .clone()
        .unwrap_or_else(|| config.tests_dir.display().to_string());
    let target = target::resolve(&arg, &config.tests_dir)?;

    let expander = Expander::new(config.globals()).with_overrides(parse_defines(&cli.define)?);
    let mut suites = Vec::with_capacity(target.suites.len());
    for path in &target.suites {
        suites.push(expander.expand_suite(loader::load_suite(path)?)?);
    }

    let table = cli.output == OutputFormat::Table;
    let session = Session::new(config.harness, config.build, config.run);

    if table {
        println!("====== building ======");
    }
    let artifacts = session.prepare(&suites).await?;
    let build_options = BuildOptions {
        verbose: cli.verbose,
        trace: cli.trace,
    };
    let summary = match session.build(&suites, &artifacts, build_options).await {
        Ok(summary) => summary,
        Err(RunnerError::BuildFailed { exit_code, output }) => {
            // Keep stdout parseable when it carries the JSON report.
            if !cli.verbose {
                for line in &output {
                    if table {
                        println!("{line}");
                    } else {
                        eprintln!("{line}");
                    }
                }
            }
            return Err(RunnerError::BuildFailed { exit_code, output }.into());
        }
        Err(err) => return Err(err.into()),
    };
    if table {
        println!("{summary}");
        println!("====== testing ======");
    } else {
        tracing::info!("{summary}");
    }

    let run_options = RunOptions {
        selector: target.selector,
        keep_going: cli.keep_going,
        memcheck: cli.valgrind,
        verbose: cli.verbose,
    };
    let mut progress = ProgressPrinter;
    let mut silent = Silent;
    let observer: &mut dyn RunObserver = if table && !cli.verbose {
        &mut progress
    } else {
        &mut silent
    };
    let execution = session.execute(&suites, run_options, observer).await?;
    let report = RunReport::new(summary, execution);

    match cli.output {
        OutputFormat::Table => {
            println!("====== results ======");
            print!("{}", report.to_text());
        }
        OutputFormat::Json => println!("{}", report.to_json()?),
    }

    Ok(())
}

/// Parse repeated `NAME=VALUE` overrides; values stay raw so the merger
/// can evaluate them.
fn parse_defines(defines: &[String]) -> CliResult<ParamMap> {
    let mut map = ParamMap::new();
    for define in defines {
        let (name, value) = define
            .split_once('=')
            .ok_or_else(|| CliError::InvalidArgument(format!("-D {define}: expected NAME=VALUE")))?;
        let name = name.trim();
        if name.is_empty() {
            return Err(CliError::InvalidArgument(format!("-D {define}: empty name")));
        }
        map.insert(name, value.trim());
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use permtest_types::ParamValue;

    #[test]
    fn defines_parse() {
        let map = parse_defines(&["N=4".into(), "M = [1, 2]".into(), "X=a=b".into()]).unwrap();
        assert_eq!(map.get("N"), Some(&ParamValue::Str("4".into())));
        assert_eq!(map.get("M"), Some(&ParamValue::Str("[1, 2]".into())));
        assert_eq!(map.get("X"), Some(&ParamValue::Str("a=b".into())));

        assert!(parse_defines(&["N".into()]).is_err());
        assert!(parse_defines(&["=4".into()]).is_err());
    }

    #[test]
    fn cli_flags() {
        let cli = Cli::parse_from([
            "permtest",
            "test_dirs[1,2]",
            "-D",
            "N=4",
            "-DM=2",
            "-vtk",
            "--valgrind",
            "-o",
            "json",
            "-j",
            "8",
        ]);
        assert_eq!(cli.target.as_deref(), Some("test_dirs[1,2]"));
        assert_eq!(cli.define, vec!["N=4", "M=2"]);
        assert!(cli.verbose && cli.trace && cli.keep_going && cli.valgrind);
        assert_eq!(cli.output, OutputFormat::Json);
        assert_eq!(cli.jobs, Some(8));
    }
}
