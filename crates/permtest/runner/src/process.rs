//! Child process invocation with streamed, interleaved output capture.

use async_trait::async_trait;
use std::io::{BufRead, BufReader, Read};
use std::process::Stdio;
use tokio::process::Command;
use tokio::sync::mpsc;

use crate::error::{RunnerError, RunnerResult};

/// A command line to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Prefix this command with a wrapper, e.g. a memory checker.
    pub fn wrapped_in(self, wrapper: &[String]) -> Self {
        let Some((program, rest)) = wrapper.split_first() else {
            return self;
        };
        let mut args = rest.to_vec();
        args.push(self.program);
        args.extend(self.args);
        Self {
            program: program.clone(),
            args,
        }
    }
}

impl std::fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Output and exit status of a finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Captured {
    /// stdout and stderr lines in arrival order, without newlines.
    pub lines: Vec<String>,
    /// Exit code, `None` when terminated by a signal.
    pub exit_code: Option<i32>,
}

impl Captured {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Runs external processes on behalf of the build and execution steps.
#[async_trait]
pub trait ProcessLauncher: Send + Sync {
    /// Run `command` to completion.
    ///
    /// With `echo` set, every line is also written to stdout as soon as it
    /// is read.
    async fn run(&self, command: &CommandSpec, echo: bool) -> RunnerResult<Captured>;
}

/// Launches real processes with tokio.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioLauncher;

#[async_trait]
impl ProcessLauncher for TokioLauncher {
    async fn run(&self, command: &CommandSpec, echo: bool) -> RunnerResult<Captured> {
        tracing::debug!(command = %command, "spawning");

        let spawn_error = |source: std::io::Error| RunnerError::Spawn {
            program: command.program.clone(),
            source,
        };

        // One pipe behind both streams keeps lines in the order they were written.
        let (reader, writer) = os_pipe::pipe().map_err(spawn_error)?;
        let stderr_writer = writer.try_clone().map_err(spawn_error)?;

        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .stdin(Stdio::null())
            .stdout(writer)
            .stderr(stderr_writer)
            .kill_on_drop(true);
        let mut child = cmd.spawn().map_err(spawn_error)?;
        // The command keeps its copies of the write end open until dropped.
        drop(cmd);

        let (tx, mut rx) = mpsc::unbounded_channel();
        let reading = tokio::task::spawn_blocking(move || forward_lines(reader, tx));

        let mut lines = Vec::new();
        while let Some(line) = rx.recv().await {
            if echo {
                println!("{line}");
            }
            lines.push(line);
        }
        if let Err(err) = reading.await {
            tracing::warn!(error = %err, "output reader did not finish");
        }

        let status = child.wait().await.map_err(|source| RunnerError::Wait {
            program: command.program.clone(),
            source,
        })?;

        Ok(Captured {
            lines,
            exit_code: status.code(),
        })
    }
}

/// Send each line of `reader` until EOF; invalid UTF-8 is replaced.
fn forward_lines(reader: impl Read, tx: mpsc::UnboundedSender<String>) {
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                let line = line.trim_end_matches(['\n', '\r']).to_string();
                if tx.send(line).is_err() {
                    break;
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "stopped reading child output");
                break;
            }
        }
    }
}
