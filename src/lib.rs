//! ssh-exec - run one command on a remote host over SSH
//!
//! This crate opens an authenticated SSH session with a private key, runs a
//! single command on an exec channel, streams its standard output back line
//! by line, and always tears down the channel and the session, in that
//! order, whether the command succeeded or not.
//!
//! # Features
//!
//! - Public key authentication from a key file
//! - Permissive (default) or known_hosts based host key checking
//! - Line-by-line output streaming with the remote exit status
//! - Optional connect and command deadlines
//!
//! # Example Usage (CLI)
//!
//! ```bash
//! ssh-exec --host=192.168.1.100 --user=admin --key=~/.ssh/id_rsa -- uname -a
//! ```
//!
//! # Example Usage (library)
//!
//! ```no_run
//! # async fn demo() -> ssh_exec::Result<()> {
//! let output = ssh_exec::execute_command(
//!     "192.168.1.100",
//!     8080,
//!     "admin",
//!     "/home/admin/.ssh/id_rsa",
//!     "echo 'Hello World!'",
//! )
//! .await?;
//! assert!(output.contains("Hello World!"));
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod ssh;

// Re-exports for convenience
pub use client::{execute_command, SshClient};
pub use config::{Args, Config};
pub use error::{Result, SshExecError};
pub use ssh::{
    CommandExecutor, CommandResult, ConnectionTarget, ExecStage, HostKeyPolicy, Identity,
    Session, SessionManager, SshConfig, SshHandler,
};
