//! Command execution over SSH
//!
//! Provides [`CommandExecutor`], which runs exactly one command on an
//! established [`Session`] and streams its standard output line by line.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use russh::client::Msg;
use russh::{Channel, ChannelMsg};
use serde::Serialize;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, error, info, warn};

use super::connection::Session;
use crate::error::{Result, SshExecError};

/// Output from a command execution
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CommandResult {
    /// Standard output, every line terminated with `\n`
    pub stdout: String,

    /// Exit status reported by the server, if any
    pub exit_status: Option<u32>,
}

impl CommandResult {
    /// Check if the command succeeded (exit status 0 or none reported)
    pub fn success(&self) -> bool {
        self.exit_status.is_none_or(|code| code == 0)
    }

    /// Output lines without their terminators
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.stdout.lines()
    }
}

/// Where a single `run` was when it failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecStage {
    OpeningChannel,
    Starting,
    Draining,
}

impl fmt::Display for ExecStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stage = match self {
            ExecStage::OpeningChannel => "opening channel",
            ExecStage::Starting => "starting command",
            ExecStage::Draining => "reading output",
        };
        f.write_str(stage)
    }
}

/// Runs one command per call over an existing session
#[derive(Debug, Clone, Default)]
pub struct CommandExecutor {
    timeout: Option<Duration>,
}

impl CommandExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound channel open, exec and draining together
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Execute `command` and collect its standard output
    ///
    /// `command` is sent verbatim; the remote shell interprets it. Each
    /// complete line is handed to `on_line` as soon as it arrives, then
    /// appended to the result. The channel is closed before returning on
    /// every path, and output gathered before a failure is discarded.
    ///
    /// # Errors
    /// * `ExecutionFailed` - channel open, exec request or read failed
    /// * `Timeout` - the configured deadline expired
    pub async fn run<F>(
        &self,
        session: &mut Session,
        command: &str,
        mut on_line: F,
    ) -> Result<CommandResult>
    where
        F: FnMut(&str),
    {
        debug!("Running command on {}: {}", session.target().address(), command);

        let deadline = self.timeout.map(|limit| (Instant::now() + limit, limit));

        let mut channel = within(deadline, session.open_channel()).await?;
        let outcome = within(deadline, drive(&mut channel, command, &mut on_line)).await;

        // The server may already have closed its side.
        if let Err(e) = channel.close().await {
            debug!("Channel close after command: {}", e);
        }

        match &outcome {
            Ok(result) => info!(
                "Command completed: exit_status={:?}, stdout_len={}",
                result.exit_status,
                result.stdout.len()
            ),
            Err(e) => error!("Command failed: {}", e),
        }

        outcome
    }
}

/// Await `fut`, failing with `Timeout` once the deadline passes
async fn within<T>(
    deadline: Option<(Instant, Duration)>,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    match deadline {
        Some((at, limit)) => match timeout_at(at, fut).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    "Command timed out after {}ms, closing channel",
                    limit.as_millis()
                );
                Err(SshExecError::timeout("command", limit))
            }
        },
        None => fut.await,
    }
}

/// Send the exec request and drain the channel
async fn drive<F>(
    channel: &mut Channel<Msg>,
    command: &str,
    on_line: &mut F,
) -> Result<CommandResult>
where
    F: FnMut(&str),
{
    channel
        .exec(true, command)
        .await
        .map_err(|e| SshExecError::execution(ExecStage::Starting, e))?;

    let mut result = CommandResult::default();
    let mut lines = LineBuffer::default();
    let mut got_eof = false;

    let mut emit = |line: &str, result: &mut CommandResult| {
        on_line(line);
        result.stdout.push_str(line);
        result.stdout.push('\n');
    };

    loop {
        match channel.wait().await {
            Some(ChannelMsg::Data { data }) => {
                lines.push(&data);
                while let Some(line) = lines.next_line() {
                    emit(&line, &mut result);
                }
            }
            Some(ChannelMsg::ExtendedData { data, ext }) => {
                debug!("Ignoring {} bytes of extended data (ext={})", data.len(), ext);
            }
            Some(ChannelMsg::ExitStatus { exit_status }) => {
                result.exit_status = Some(exit_status);
                if got_eof {
                    break;
                }
            }
            Some(ChannelMsg::Eof) => {
                got_eof = true;
                if result.exit_status.is_some() {
                    break;
                }
            }
            Some(ChannelMsg::Failure) => {
                return Err(SshExecError::execution(
                    ExecStage::Starting,
                    "remote host refused the exec request",
                ));
            }
            Some(ChannelMsg::Close) => break,
            Some(_) => {}
            None if got_eof => break,
            None => {
                return Err(SshExecError::execution(
                    ExecStage::Draining,
                    "channel closed before end of output",
                ));
            }
        }
    }

    if let Some(line) = lines.finish() {
        emit(&line, &mut result);
    }

    Ok(result)
}

/// Splits a byte stream into lines
///
/// Bytes are kept until a `\n` arrives so multi-byte characters split across
/// packets decode correctly. A `\r` right before the `\n` is dropped.
#[derive(Debug, Default)]
struct LineBuffer {
    pending: Vec<u8>,
    /// Prefix of `pending` already known to hold no `\n`
    scanned: usize,
}

impl LineBuffer {
    fn push(&mut self, bytes: &[u8]) {
        self.pending.extend_from_slice(bytes);
    }

    fn next_line(&mut self) -> Option<String> {
        let Some(offset) = self.pending[self.scanned..].iter().position(|&b| b == b'\n') else {
            self.scanned = self.pending.len();
            return None;
        };
        let end = self.scanned + offset;
        self.scanned = 0;
        let mut line: Vec<u8> = self.pending.drain(..=end).collect();
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        Some(String::from_utf8_lossy(&line).into_owned())
    }

    /// Whatever is left after end-of-stream, if anything
    fn finish(self) -> Option<String> {
        if self.pending.is_empty() {
            None
        } else {
            Some(String::from_utf8_lossy(&self.pending).into_owned())
        }
    }
}
