//! Configuration and CLI argument parsing for ssh-exec

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::error::{Result, SshExecError};
use crate::ssh::{HostKeyPolicy, SshConfig, DEFAULT_SSH_PORT};

/// ssh-exec CLI Arguments
#[derive(Parser, Debug, Clone)]
#[command(name = "ssh-exec")]
#[command(version)]
#[command(about = "Run one command on a remote host over SSH and stream its output")]
pub struct Args {
    /// SSH host to connect to
    #[arg(long, env = "SSH_EXEC_HOST")]
    pub host: String,

    /// SSH port
    #[arg(long, default_value_t = DEFAULT_SSH_PORT, env = "SSH_EXEC_PORT")]
    pub port: u16,

    /// SSH username
    #[arg(long, env = "SSH_EXEC_USER")]
    pub user: String,

    /// Path to SSH private key file
    #[arg(long, env = "SSH_EXEC_KEY")]
    pub key: PathBuf,

    /// Verify the server key against known_hosts instead of accepting any key
    #[arg(long, default_value = "false", env = "SSH_EXEC_STRICT_HOST_KEY_CHECKING")]
    pub strict_host_key_checking: bool,

    /// known_hosts file for strict checking (default: ~/.ssh/known_hosts)
    #[arg(long, env = "SSH_EXEC_KNOWN_HOSTS")]
    pub known_hosts: Option<PathBuf>,

    /// Connect and authentication timeout in milliseconds.
    /// Use "none", "0", or negative value to wait forever.
    #[arg(long, env = "SSH_EXEC_CONNECT_TIMEOUT")]
    pub connect_timeout: Option<String>,

    /// Command timeout in milliseconds.
    /// Use "none", "0", or negative value to wait forever.
    #[arg(long, env = "SSH_EXEC_TIMEOUT")]
    pub timeout: Option<String>,

    /// Print the result as JSON once the command finishes
    #[arg(long, default_value = "false")]
    pub json: bool,

    /// Command to run on the remote host
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}

/// Parsed and validated configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub ssh: SshConfig,

    /// Command passed verbatim to the remote shell
    pub command: String,

    /// Print JSON instead of streaming lines
    pub json: bool,
}

impl Config {
    /// Create Config from CLI Args
    pub fn from_args(args: Args) -> Result<Self> {
        validate_args(&args)?;

        let host_key_policy = if args.strict_host_key_checking {
            HostKeyPolicy::Strict {
                known_hosts: args.known_hosts,
            }
        } else {
            HostKeyPolicy::Permissive
        };

        let mut ssh = SshConfig::new(args.host, args.user, args.key)
            .with_port(args.port)
            .with_host_key_policy(host_key_policy);
        ssh.connect_timeout = parse_timeout(args.connect_timeout.as_deref())?;
        ssh.command_timeout = parse_timeout(args.timeout.as_deref())?;

        Ok(Config {
            ssh,
            command: args.command.join(" "),
            json: args.json,
        })
    }
}

/// Validate CLI arguments
fn validate_args(args: &Args) -> Result<()> {
    let mut errors = Vec::new();

    if args.host.is_empty() {
        errors.push("Missing required --host".to_string());
    }

    if args.user.is_empty() {
        errors.push("Missing required --user".to_string());
    }

    if args.key.as_os_str().is_empty() {
        errors.push("Missing required --key".to_string());
    }

    if args.command.iter().all(|part| part.trim().is_empty()) {
        errors.push("Missing command to run".to_string());
    }

    if args.known_hosts.is_some() && !args.strict_host_key_checking {
        errors.push("--known-hosts requires --strict-host-key-checking".to_string());
    }

    if !errors.is_empty() {
        return Err(SshExecError::config(format!(
            "Configuration error:\n{}",
            errors.join("\n")
        )));
    }

    Ok(())
}

/// Parse a timeout argument
///
/// - not provided, "none" (case-insensitive), "0" or negative → None (no deadline)
/// - positive integer → that many milliseconds
/// - anything else → error
pub fn parse_timeout(value: Option<&str>) -> Result<Option<Duration>> {
    let Some(raw) = value else {
        return Ok(None);
    };

    let trimmed = raw.trim();
    if trimmed.eq_ignore_ascii_case("none") {
        return Ok(None);
    }

    match trimmed.parse::<i64>() {
        Ok(n) if n <= 0 => Ok(None),
        Ok(n) => Ok(Some(Duration::from_millis(n as u64))),
        Err(_) => Err(SshExecError::config(format!(
            "Invalid timeout '{}': expected milliseconds or 'none'",
            raw
        ))),
    }
}
