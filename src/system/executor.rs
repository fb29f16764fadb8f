// src/system/executor.rs

use crate::models::EnvironmentMapping;
use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use thiserror::Error;
use tokio::process::Command;

#[cfg(windows)]
const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;

/// A boxed future borrowed from the runner, so runners can be used as trait objects.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("Command '{command}' could not be started: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Command '{command}' exited with {}.", describe_code(.code))]
    NonZeroExit {
        command: String,
        code: Option<i32>,
        stderr: String,
    },
    #[error("Command '{0}' was interrupted.")]
    Interrupted(String),
}

impl ProcessError {
    /// Captured stderr of a failed command, empty for other failures.
    pub fn stderr(&self) -> &str {
        match self {
            Self::NonZeroExit { stderr, .. } => stderr,
            _ => "",
        }
    }
}

fn describe_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "no exit code (terminated by a signal)".to_string(),
    }
}

/// One pending external command: program, arguments, working directory and
/// the environment snapshot it runs with. The snapshot is the *whole*
/// environment of the child; nothing is inherited from rosdev itself.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    pub env: Arc<EnvironmentMapping>,
}

impl Invocation {
    pub fn new(program: impl Into<String>, cwd: &Path, env: Arc<EnvironmentMapping>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: cwd.to_path_buf(),
            env,
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

    /// Shell-quoted rendering of the command, for messages and logs.
    pub fn command_line(&self) -> String {
        let parts = std::iter::once(self.program.as_str()).chain(self.args.iter().map(String::as_str));
        shlex::try_join(parts).unwrap_or_else(|_| {
            // A NUL byte in an argument; fall back to plain joining for display.
            let mut line = self.program.clone();
            for arg in &self.args {
                line.push(' ');
                line.push_str(arg);
            }
            line
        })
    }
}

/// Captured result of a successful command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    /// Stdout split on line boundaries, trimmed, empty lines dropped.
    pub fn lines(&self) -> Vec<String> {
        split_lines(&self.stdout)
    }
}

pub fn split_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Runs external commands. Implemented by [`SystemRunner`] for real
/// processes and by a recording fake in tests.
pub trait ProcessRunner: Send + Sync + std::fmt::Debug {
    /// Runs to completion with stdout and stderr captured.
    fn output<'a>(&'a self, invocation: &'a Invocation) -> BoxFuture<'a, Result<ProcessOutput, ProcessError>>;

    /// Runs to completion with the terminal attached, so output streams live.
    fn attached<'a>(&'a self, invocation: &'a Invocation) -> BoxFuture<'a, Result<(), ProcessError>>;

    /// Starts the command in the background and returns its pid.
    fn detached(&self, invocation: &Invocation) -> Result<u32, ProcessError>;
}

/// The production runner, backed by `tokio::process`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl SystemRunner {
    fn command(invocation: &Invocation) -> Command {
        let mut command = Command::new(&invocation.program);
        command
            .args(&invocation.args)
            .current_dir(dunce::simplified(&invocation.cwd))
            .env_clear()
            .envs(invocation.env.iter());
        command
    }
}

impl ProcessRunner for SystemRunner {
    fn output<'a>(&'a self, invocation: &'a Invocation) -> BoxFuture<'a, Result<ProcessOutput, ProcessError>> {
        Box::pin(async move {
            let command_line = invocation.command_line();
            log::debug!("Capturing: {} (cwd: {})", command_line, invocation.cwd.display());

            let output = Self::command(invocation)
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .output()
                .await
                .map_err(|source| ProcessError::Spawn {
                    command: command_line.clone(),
                    source,
                })?;

            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            if !output.status.success() {
                log::debug!("'{}' failed with stderr: {}", command_line, stderr.trim());
                return Err(ProcessError::NonZeroExit {
                    command: command_line,
                    code: output.status.code(),
                    stderr,
                });
            }

            // A single odd byte (e.g. in an `env` dump) must not sink the whole result.
            let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
            log::trace!("'{}' produced {} bytes of output.", command_line, stdout.len());
            Ok(ProcessOutput { stdout, stderr })
        })
    }

    fn attached<'a>(&'a self, invocation: &'a Invocation) -> BoxFuture<'a, Result<(), ProcessError>> {
        Box::pin(async move {
            let command_line = invocation.command_line();
            log::debug!("Attaching: {} (cwd: {})", command_line, invocation.cwd.display());

            let mut child = Self::command(invocation)
                .stdin(Stdio::inherit())
                .stdout(Stdio::inherit())
                .stderr(Stdio::inherit())
                .spawn()
                .map_err(|source| ProcessError::Spawn {
                    command: command_line.clone(),
                    source,
                })?;

            // The terminal delivers Ctrl+C to the child as well. We only stop
            // rosdev from dying first, then wait for the child to wind down.
            let finished = tokio::select! {
                status = child.wait() => Some(status),
                _ = tokio::signal::ctrl_c() => None,
            };

            let status: ExitStatus = match finished {
                Some(status) => status.map_err(|source| ProcessError::Spawn {
                    command: command_line.clone(),
                    source,
                })?,
                None => {
                    log::debug!("Ctrl+C received, waiting for '{}' to exit.", command_line);
                    if let Err(e) = child.wait().await {
                        log::warn!("Failed to wait for interrupted child: {}", e);
                    }
                    return Err(ProcessError::Interrupted(command_line));
                }
            };

            if !status.success() {
                return Err(ProcessError::NonZeroExit {
                    command: command_line,
                    code: status.code(),
                    stderr: String::new(),
                });
            }
            Ok(())
        })
    }

    fn detached(&self, invocation: &Invocation) -> Result<u32, ProcessError> {
        let command_line = invocation.command_line();
        log::debug!("Detaching: {} (cwd: {})", command_line, invocation.cwd.display());

        let mut command = Self::command(invocation);
        command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(false);
        // Own process group: Ctrl+C in the terminal must not reach it.
        #[cfg(unix)]
        command.process_group(0);
        #[cfg(windows)]
        command.creation_flags(CREATE_NEW_PROCESS_GROUP);

        let child = command
            .spawn()
            .map_err(|source| ProcessError::Spawn {
                command: command_line.clone(),
                source,
            })?;

        child.id().ok_or_else(|| ProcessError::Spawn {
            command: command_line,
            source: std::io::Error::new(ErrorKind::Other, "process exited before its pid was read"),
        })
    }
}
