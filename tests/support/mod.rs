//! Test support utilities.
//!
//! Every test builds its own [`Fixture`]: a fresh embedded server on a free
//! port, sharing the process-wide key pair. Paths and ports are handed to the
//! client explicitly.

use std::sync::{Arc, Once};
use std::time::Duration;

use russh::keys::PublicKey;
use ssh_exec::SshConfig;
use tempfile::TempDir;

#[allow(dead_code)]
pub mod keys;

use keys::{shared_key_pair, TempKeyPair};
use server::{Authenticator, ExecMode, TestSshServer};

pub const VALID_USER: &str = "deploy";

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for tests. Safe to call multiple times.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;
        let filter = EnvFilter::from_default_env()
            .add_directive("ssh_exec=debug".parse().unwrap())
            .add_directive("russh=info".parse().unwrap());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// A running server plus the key pair it trusts.
pub struct Fixture {
    pub server: TestSshServer,
    pub keys: &'static TempKeyPair,
    pub dir: TempDir,
}

#[allow(dead_code)]
impl Fixture {
    /// Start a server that accepts [`VALID_USER`] with the shared key.
    pub async fn start() -> Self {
        Self::start_with(ExecMode::Run).await
    }

    /// Same as [`Fixture::start`], with exec requests handled per `mode`.
    pub async fn start_with(mode: ExecMode) -> Self {
        init_tracing();

        let keys = shared_key_pair();
        let authorized = keys
            .load_public_key()
            .expect("failed to read test public key");
        let authenticator: Authenticator = Arc::new(move |user: &str, key: &PublicKey| {
            user == VALID_USER && key.key_data() == authorized.key_data()
        });

        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let host_key_path = dir.path().join("hostkey");
        let server = match mode {
            ExecMode::Run => TestSshServer::start(0, &host_key_path, authenticator).await,
            _ => TestSshServer::start_with_mode(0, &host_key_path, authenticator, mode).await,
        }
        .expect("failed to start test SSH server");

        Self { server, keys, dir }
    }

    /// Client configuration pointing at this server as `user`.
    pub fn config(&self, user: &str) -> SshConfig {
        SshConfig::new("127.0.0.1", user, &self.keys.private_key).with_port(self.server.port())
    }

    /// Assert the server saw every session and channel closed.
    pub async fn assert_idle(&self) {
        assert!(
            self.server.wait_until_idle(Duration::from_secs(5)).await,
            "server still has {} session(s) and {} channel(s) open",
            self.server.active_sessions(),
            self.server.open_channels()
        );
    }
}
