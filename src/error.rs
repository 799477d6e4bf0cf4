//! Error types for ssh-exec

use std::path::PathBuf;

use thiserror::Error;

use crate::ssh::ExecStage;

/// Main error type for ssh-exec
#[derive(Debug, Error)]
pub enum SshExecError {
    /// Private key file is missing or unreadable
    #[error("private key not found: {}: {source}", path.display())]
    IdentityNotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Private key file exists but is not a supported key format
    #[error("invalid private key {}: {source}", path.display())]
    IdentityInvalid {
        path: PathBuf,
        #[source]
        source: russh::keys::Error,
    },

    /// TCP connect or SSH handshake failed before authentication
    #[error("SSH connection error: {0}")]
    Connection(String),

    /// Strict host key checking rejected the server key
    #[error("host key verification failed for {host}:{port}")]
    HostKeyRejected { host: String, port: u16 },

    /// The remote host rejected the user/key combination
    #[error("authentication failed for user '{user}': {reason}")]
    AuthenticationFailed { user: String, reason: String },

    /// Channel open, exec request or output read failed
    #[error("command execution failed while {stage}: {reason}")]
    ExecutionFailed { stage: ExecStage, reason: String },

    /// A configured deadline expired
    #[error("{operation} timeout after {millis}ms")]
    Timeout {
        operation: &'static str,
        millis: u64,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias using SshExecError
pub type Result<T> = std::result::Result<T, SshExecError>;

impl SshExecError {
    /// Create a connection error from a string
    pub fn connection(msg: impl Into<String>) -> Self {
        SshExecError::Connection(msg.into())
    }

    /// Create an authentication error for `user`
    pub fn auth(user: impl Into<String>, reason: impl Into<String>) -> Self {
        SshExecError::AuthenticationFailed {
            user: user.into(),
            reason: reason.into(),
        }
    }

    /// Create an execution error for the stage that failed
    pub fn execution(stage: ExecStage, reason: impl ToString) -> Self {
        SshExecError::ExecutionFailed {
            stage,
            reason: reason.to_string(),
        }
    }

    /// Create a timeout error
    pub fn timeout(operation: &'static str, after: std::time::Duration) -> Self {
        SshExecError::Timeout {
            operation,
            millis: after.as_millis() as u64,
        }
    }

    /// Create a config error from a string
    pub fn config(msg: impl Into<String>) -> Self {
        SshExecError::Config(msg.into())
    }
}
