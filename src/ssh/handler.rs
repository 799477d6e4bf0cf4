//! SSH client handler implementation
//!
//! Implements the `russh::client::Handler` trait; its only job here is
//! deciding whether to trust the server's host key.

use std::path::PathBuf;

use russh::keys::known_hosts::{check_known_hosts, check_known_hosts_path};
use tracing::{debug, warn};

use super::config::HostKeyPolicy;

/// SSH client handler for russh
#[derive(Debug, Clone)]
pub struct SshHandler {
    host: String,
    port: u16,
    policy: HostKeyPolicy,
}

impl SshHandler {
    pub fn new(host: impl Into<String>, port: u16, policy: HostKeyPolicy) -> Self {
        Self {
            host: host.into(),
            port,
            policy,
        }
    }

    fn check_strict(
        &self,
        known_hosts: Option<&PathBuf>,
        server_public_key: &russh::keys::PublicKey,
    ) -> bool {
        let result = match known_hosts {
            Some(path) => check_known_hosts_path(&self.host, self.port, server_public_key, path),
            None => check_known_hosts(&self.host, self.port, server_public_key),
        };

        match result {
            Ok(true) => true,
            Ok(false) => {
                warn!(
                    "Host key for {}:{} is not in known_hosts",
                    self.host, self.port
                );
                false
            }
            Err(russh::keys::Error::KeyChanged { .. }) => {
                warn!(
                    "Host key for {}:{} does not match known_hosts",
                    self.host, self.port
                );
                false
            }
            Err(e) => {
                warn!("Failed to read known_hosts: {}", e);
                false
            }
        }
    }
}

impl russh::client::Handler for SshHandler {
    type Error = anyhow::Error;

    /// Verify the server's host key
    ///
    /// `Permissive` accepts every key. `Strict` only accepts keys already
    /// listed in the configured known_hosts file.
    async fn check_server_key(
        &mut self,
        server_public_key: &russh::keys::PublicKey,
    ) -> Result<bool, Self::Error> {
        match &self.policy {
            HostKeyPolicy::Permissive => {
                debug!(
                    "Accepting {} host key for {}:{} without verification",
                    server_public_key.algorithm().as_str(),
                    self.host,
                    self.port
                );
                Ok(true)
            }
            HostKeyPolicy::Strict { known_hosts } => {
                Ok(self.check_strict(known_hosts.as_ref(), server_public_key))
            }
        }
    }
}
