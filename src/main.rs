//! ssh-exec - Entry point
//!
//! Parses CLI arguments, runs the command on the remote host and streams its
//! output to stdout. Logs go to stderr.

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use ssh_exec::config::{Args, Config};
use ssh_exec::SshClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout carries the remote command's output
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ssh_exec=info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = Config::from_args(args)?;

    info!("ssh-exec v{} starting...", env!("CARGO_PKG_VERSION"));
    info!(
        "Connecting to {}@{}",
        config.ssh.target.user,
        config.ssh.target.address()
    );

    let client = SshClient::new(config.ssh.clone());
    let json = config.json;

    let result = client
        .execute_command_with(&config.command, |line| {
            if !json {
                println!("{}", line);
            }
        })
        .await
        .inspect_err(|e| error!("{}", e))
        .with_context(|| format!("failed to run '{}'", config.command))?;

    if json {
        let rendered =
            serde_json::to_string_pretty(&result).context("failed to render result as JSON")?;
        println!("{}", rendered);
    }

    match result.exit_status {
        Some(code) if code != 0 => {
            info!("Remote command exited with status {}", code);
            std::process::exit(code.min(255) as i32);
        }
        _ => Ok(()),
    }
}
