//! SSH session and command execution module
//!
//! [`SessionManager`] produces authenticated [`Session`]s and
//! [`CommandExecutor`] runs one command at a time over them.

pub mod command;
pub mod config;
pub mod connection;
pub mod handler;

// Re-exports
pub use command::{CommandExecutor, CommandResult, ExecStage};
pub use config::{ConnectionTarget, HostKeyPolicy, Identity, SshConfig, DEFAULT_SSH_PORT};
pub use connection::{Session, SessionManager};
pub use handler::SshHandler;
