//! Sub-command execution.
//!
//! # Responsibilities
//! - Run management commands to completion, capturing output
//! - Run the application server in the foreground until it exits
//! - Forward termination signals to the server
//!
//! # Design Decisions
//! - Management commands get a null stdin (never prompt)
//! - Captured lines are echoed as they arrive so operators still see them
//! - Cancelling a management command kills it
//! - The server inherits stdio and is never killed, only signalled

use std::io::{self, Write};
use std::process::Stdio;
use std::time::Instant;

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;

use crate::lifecycle::shutdown::Shutdown;
use crate::process::command::{exit_code_of, CommandOutput, CommandSpec};

/// Errors from starting or supervising a process. A non-zero exit is not an
/// error at this level; it is reported through `CommandOutput`.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("failed while waiting for '{program}': {source}")]
    Wait {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("'{program}' was cancelled")]
    Cancelled { program: String },
}

/// Executes sub-commands on behalf of the orchestrator.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run to completion and capture the result.
    async fn run(
        &self,
        spec: &CommandSpec,
        cancel: &CancellationToken,
    ) -> Result<CommandOutput, ProcessError>;

    /// Run in the foreground, forwarding signals from `shutdown`, and return
    /// the exit code.
    async fn exec(&self, spec: &CommandSpec, shutdown: &Shutdown) -> Result<i32, ProcessError>;
}

/// Runs real processes through `tokio::process`.
#[derive(Debug, Clone)]
pub struct SystemRunner {
    echo: bool,
}

impl SystemRunner {
    pub fn new() -> Self {
        Self { echo: true }
    }

    /// Capture output without echoing it.
    pub fn quiet() -> Self {
        Self { echo: false }
    }

    fn command(spec: &CommandSpec) -> Command {
        let mut command = Command::new(&spec.program);
        command
            .args(&spec.args)
            .envs(spec.env.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        if let Some(dir) = &spec.working_dir {
            command.current_dir(dir);
        }
        command
    }
}

impl Default for SystemRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Copy)]
enum Echo {
    Off,
    Stdout,
    Stderr,
}

/// Reads the pipe to EOF, decoding each line lossily. The pipe stays open
/// until the child closes it, whatever bytes arrive.
async fn collect_lines<R>(reader: Option<R>, echo: Echo) -> String
where
    R: AsyncRead + Unpin,
{
    let Some(reader) = reader else {
        return String::new();
    };
    let mut reader = BufReader::new(reader);
    let mut collected = String::new();
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                let line = line.trim_end_matches(['\n', '\r']);
                echo_line(echo, line);
                collected.push_str(line);
                collected.push('\n');
            }
            Err(e) => {
                tracing::warn!(error = %e, "Output capture failed; discarding the rest");
                let _ = tokio::io::copy(&mut reader, &mut tokio::io::sink()).await;
                break;
            }
        }
    }
    collected
}

fn echo_line(echo: Echo, line: &str) {
    // A closed stdout/stderr must not take the reader down with it.
    match echo {
        Echo::Off => {}
        Echo::Stdout => {
            let _ = writeln!(io::stdout().lock(), "{line}");
        }
        Echo::Stderr => {
            let _ = writeln!(io::stderr().lock(), "{line}");
        }
    }
}

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(
        &self,
        spec: &CommandSpec,
        cancel: &CancellationToken,
    ) -> Result<CommandOutput, ProcessError> {
        let started = Instant::now();
        let mut child = Self::command(spec)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ProcessError::Spawn {
                program: spec.program.clone(),
                source,
            })?;

        tracing::debug!(command = %spec, pid = ?child.id(), "Spawned command");

        let (out_echo, err_echo) = if self.echo {
            (Echo::Stdout, Echo::Stderr)
        } else {
            (Echo::Off, Echo::Off)
        };
        let stdout_task = tokio::spawn(collect_lines(child.stdout.take(), out_echo));
        let stderr_task = tokio::spawn(collect_lines(child.stderr.take(), err_echo));

        let waited = tokio::select! {
            status = child.wait() => Some(status),
            _ = cancel.cancelled() => None,
        };

        let status = match waited {
            Some(status) => status.map_err(|source| ProcessError::Wait {
                program: spec.program.clone(),
                source,
            })?,
            None => {
                tracing::warn!(command = %spec, "Cancelling command");
                let _ = child.kill().await;
                return Err(ProcessError::Cancelled {
                    program: spec.program.clone(),
                });
            }
        };

        let stdout = stdout_task.await.unwrap_or_default();
        let stderr = stderr_task.await.unwrap_or_default();

        Ok(CommandOutput {
            exit_code: exit_code_of(status),
            stdout,
            stderr,
            duration: started.elapsed(),
        })
    }

    async fn exec(&self, spec: &CommandSpec, shutdown: &Shutdown) -> Result<i32, ProcessError> {
        let mut signals = shutdown.subscribe();
        let mut child = Self::command(spec)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| ProcessError::Spawn {
                program: spec.program.clone(),
                source,
            })?;

        let pid = child.id();
        tracing::info!(command = %spec, pid = ?pid, "Server process started");

        if let Some(signal) = shutdown.signal() {
            forward_signal(pid, signal);
        }

        let mut listening = true;
        loop {
            tokio::select! {
                status = child.wait() => {
                    let status = status.map_err(|source| ProcessError::Wait {
                        program: spec.program.clone(),
                        source,
                    })?;
                    let code = exit_code_of(status);
                    tracing::info!(command = %spec, exit_code = code, "Server process exited");
                    return Ok(code);
                }
                received = signals.recv(), if listening => match received {
                    Ok(signal) => forward_signal(pid, signal),
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Missed signals while forwarding");
                    }
                    Err(RecvError::Closed) => listening = false,
                },
            }
        }
    }
}

#[cfg(unix)]
fn forward_signal(pid: Option<u32>, signal: i32) {
    let Some(pid) = pid else {
        return;
    };
    tracing::info!(pid, signal, "Forwarding signal to server");
    // SAFETY: kill(2) has no memory-safety preconditions.
    let ret = unsafe { libc::kill(pid as libc::pid_t, signal) };
    if ret != 0 {
        tracing::warn!(pid, signal, error = %io::Error::last_os_error(), "Signal forwarding failed");
    }
}

#[cfg(not(unix))]
fn forward_signal(pid: Option<u32>, signal: i32) {
    tracing::warn!(pid = ?pid, signal, "Signal forwarding is not supported on this platform");
}
