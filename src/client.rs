//! Connect, run, disconnect
//!
//! [`SshClient`] composes [`SessionManager`] and [`CommandExecutor`] into a
//! single call that always releases the session it opened.

use std::path::PathBuf;

use tracing::{debug, info};

use crate::error::Result;
use crate::ssh::{CommandExecutor, CommandResult, SessionManager, SshConfig};

/// One-shot SSH command client
///
/// Every call opens its own session, so a client can be shared freely; two
/// concurrent calls never share a session or channel.
#[derive(Debug, Clone)]
pub struct SshClient {
    config: SshConfig,
    sessions: SessionManager,
    executor: CommandExecutor,
}

impl SshClient {
    pub fn new(config: SshConfig) -> Self {
        let sessions = SessionManager::new(config.host_key_policy.clone())
            .with_connect_timeout(config.connect_timeout);
        let executor = CommandExecutor::new().with_timeout(config.command_timeout);

        Self {
            config,
            sessions,
            executor,
        }
    }

    pub fn config(&self) -> &SshConfig {
        &self.config
    }

    /// Run `command` and return its output once it finishes
    pub async fn execute_command(&self, command: &str) -> Result<CommandResult> {
        self.execute_command_with(command, |line| debug!("{}", line))
            .await
    }

    /// Run `command`, handing each output line to `on_line` as it arrives
    ///
    /// The session is disconnected whether or not the command succeeded;
    /// the channel is already closed by the time `run` returns.
    pub async fn execute_command_with<F>(&self, command: &str, on_line: F) -> Result<CommandResult>
    where
        F: FnMut(&str),
    {
        let mut session = self
            .sessions
            .connect(&self.config.target, &self.config.identity)
            .await?;

        let outcome = self.executor.run(&mut session, command, on_line).await;

        session.disconnect().await;

        outcome
    }
}

/// Run one command and return its standard output
///
/// Uses the default configuration: permissive host key checking and no
/// deadlines. Each output line is logged as it arrives.
pub async fn execute_command(
    host: &str,
    port: u16,
    user: &str,
    private_key_path: impl Into<PathBuf>,
    command: &str,
) -> Result<String> {
    let config = SshConfig::new(host, user, private_key_path).with_port(port);
    let client = SshClient::new(config);

    let result = client
        .execute_command_with(command, |line| info!("{}", line))
        .await?;

    Ok(result.stdout)
}
