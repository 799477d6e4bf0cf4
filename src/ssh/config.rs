//! SSH configuration types
//!
//! Where to connect, who to authenticate as, and how strictly to treat the
//! server's host key.

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default SSH port used when none is given
pub const DEFAULT_SSH_PORT: u16 = 8080;

/// Remote endpoint and the user to authenticate as
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionTarget {
    /// Remote hostname or IP address
    pub host: String,

    /// SSH port (default: 8080)
    pub port: u16,

    /// Username for authentication
    pub user: String,
}

impl ConnectionTarget {
    pub fn new(host: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_SSH_PORT,
            user: user.into(),
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// `host:port` form used for connecting and logging
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Private key used to authenticate
///
/// Only the path is held; the file is read on every connect and never
/// modified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub private_key_path: PathBuf,
}

impl Identity {
    pub fn new(private_key_path: impl Into<PathBuf>) -> Self {
        Self {
            private_key_path: private_key_path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.private_key_path
    }
}

/// How the server's host key is verified
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum HostKeyPolicy {
    /// Accept any host key without verification
    #[default]
    Permissive,

    /// Require the key to be present in a known_hosts file.
    /// `None` uses `~/.ssh/known_hosts`.
    Strict { known_hosts: Option<PathBuf> },
}

impl HostKeyPolicy {
    pub fn strict() -> Self {
        HostKeyPolicy::Strict { known_hosts: None }
    }

    pub fn strict_with(known_hosts: impl Into<PathBuf>) -> Self {
        HostKeyPolicy::Strict {
            known_hosts: Some(known_hosts.into()),
        }
    }

    pub fn is_strict(&self) -> bool {
        matches!(self, HostKeyPolicy::Strict { .. })
    }
}

/// Full client configuration
#[derive(Debug, Clone)]
pub struct SshConfig {
    pub target: ConnectionTarget,

    pub identity: Identity,

    /// Host key verification (default: permissive)
    pub host_key_policy: HostKeyPolicy,

    /// Deadline for TCP connect, handshake and authentication (default: none)
    pub connect_timeout: Option<Duration>,

    /// Deadline for running one command to completion (default: none)
    pub command_timeout: Option<Duration>,
}

impl SshConfig {
    /// Create a new SSH configuration with the required fields
    pub fn new(
        host: impl Into<String>,
        user: impl Into<String>,
        private_key_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            target: ConnectionTarget::new(host, user),
            identity: Identity::new(private_key_path),
            host_key_policy: HostKeyPolicy::default(),
            connect_timeout: None,
            command_timeout: None,
        }
    }

    /// Set the SSH port
    pub fn with_port(mut self, port: u16) -> Self {
        self.target.port = port;
        self
    }

    pub fn with_host_key_policy(mut self, policy: HostKeyPolicy) -> Self {
        self.host_key_policy = policy;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = Some(timeout);
        self
    }
}
