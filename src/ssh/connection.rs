//! SSH Session Manager
//!
//! Loads the private key, opens the transport, verifies the host key and
//! authenticates. The resulting [`Session`] is owned by the caller and torn
//! down with [`Session::disconnect`].

use std::net::Shutdown;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use russh::client::{self, Handle};
use russh::keys::{PrivateKey, PrivateKeyWithHashAlg};
use russh::{Channel, Disconnect};
use tokio::net::TcpStream;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, error, info, warn};

use super::config::{ConnectionTarget, HostKeyPolicy, Identity};
use super::handler::SshHandler;
use crate::error::{Result, SshExecError};

/// Establishes authenticated sessions
#[derive(Debug, Clone, Default)]
pub struct SessionManager {
    host_key_policy: HostKeyPolicy,
    connect_timeout: Option<Duration>,
}

impl SessionManager {
    pub fn new(host_key_policy: HostKeyPolicy) -> Self {
        Self {
            host_key_policy,
            connect_timeout: None,
        }
    }

    /// Bound TCP connect, handshake and authentication together
    pub fn with_connect_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Establish an authenticated session
    ///
    /// The key is loaded before any network activity, so identity errors
    /// never leave a socket behind. Once the transport is open, every
    /// failure disconnects it before returning. When the deadline expires
    /// mid-handshake the socket is shut down, which also ends the
    /// background session task.
    pub async fn connect(&self, target: &ConnectionTarget, identity: &Identity) -> Result<Session> {
        let key = load_identity(identity.path()).await?;

        let Some(limit) = self.connect_timeout else {
            let stream = open_transport(target).await?;
            return self.handshake(target, stream, key).await;
        };

        let deadline = Instant::now() + limit;
        let stream = match timeout_at(deadline, open_transport(target)).await {
            Ok(stream) => stream?,
            Err(_) => return Err(connect_timed_out(target, limit)),
        };
        let (stream, socket) = split_shutdown_handle(target, stream)?;

        match timeout_at(deadline, self.handshake(target, stream, key)).await {
            Ok(result) => result,
            Err(_) => {
                if let Err(e) = socket.shutdown(Shutdown::Both) {
                    debug!("Shutdown after connect timeout failed: {}", e);
                }
                Err(connect_timed_out(target, limit))
            }
        }
    }

    /// SSH handshake and authentication over an open transport
    async fn handshake(
        &self,
        target: &ConnectionTarget,
        stream: TcpStream,
        key: PrivateKey,
    ) -> Result<Session> {
        let ssh_config = Arc::new(client::Config::default());
        let handler = SshHandler::new(
            target.host.clone(),
            target.port,
            self.host_key_policy.clone(),
        );

        let mut handle = client::connect_stream(ssh_config, stream, handler)
            .await
            .map_err(|e| self.classify_connect_error(target, e))?;

        if let Err(e) = authenticate(&mut handle, &target.user, key).await {
            send_disconnect(&handle, "authentication failed").await;
            return Err(e);
        }

        info!(
            "Successfully connected to {}@{}",
            target.user,
            target.address()
        );

        Ok(Session {
            handle,
            target: target.clone(),
        })
    }

    fn classify_connect_error(
        &self,
        target: &ConnectionTarget,
        e: anyhow::Error,
    ) -> SshExecError {
        let host_key_rejected = matches!(
            e.downcast_ref::<russh::Error>(),
            Some(russh::Error::UnknownKey)
        );

        if host_key_rejected && self.host_key_policy.is_strict() {
            error!("Host key verification failed for {}", target.address());
            return SshExecError::HostKeyRejected {
                host: target.host.clone(),
                port: target.port,
            };
        }

        error!("SSH connection to {} failed: {}", target.address(), e);
        SshExecError::connection(format!("{}: {}", target.address(), e))
    }
}

/// TCP connect to the target
async fn open_transport(target: &ConnectionTarget) -> Result<TcpStream> {
    info!("Connecting to SSH server {}...", target.address());

    TcpStream::connect((target.host.as_str(), target.port))
        .await
        .map_err(|e| {
            error!("SSH connection to {} failed: {}", target.address(), e);
            SshExecError::connection(format!("{}: {}", target.address(), e))
        })
}

/// Keep a second handle on the socket that can shut it down
///
/// The stream itself moves into russh's session task.
fn split_shutdown_handle(
    target: &ConnectionTarget,
    stream: TcpStream,
) -> Result<(TcpStream, std::net::TcpStream)> {
    let socket_error =
        |e: std::io::Error| SshExecError::connection(format!("{}: {}", target.address(), e));

    let stream = stream.into_std().map_err(socket_error)?;
    let socket = stream.try_clone().map_err(socket_error)?;
    let stream = TcpStream::from_std(stream).map_err(socket_error)?;
    Ok((stream, socket))
}

fn connect_timed_out(target: &ConnectionTarget, limit: Duration) -> SshExecError {
    error!(
        "SSH connection to {} timed out after {}ms",
        target.address(),
        limit.as_millis()
    );
    SshExecError::timeout("connect", limit)
}

/// Read and parse the private key at `path`
pub(crate) async fn load_identity(path: &Path) -> Result<PrivateKey> {
    debug!("Loading private key from {}", path.display());

    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| SshExecError::IdentityNotFound {
            path: path.to_path_buf(),
            source,
        })?;

    let text = String::from_utf8_lossy(&bytes);
    russh::keys::decode_secret_key(&text, None).map_err(|source| {
        SshExecError::IdentityInvalid {
            path: path.to_path_buf(),
            source,
        }
    })
}

/// Public key authentication as `user`
async fn authenticate(handle: &mut Handle<SshHandler>, user: &str, key: PrivateKey) -> Result<()> {
    debug!("Attempting key authentication for user '{}'", user);

    let algorithm = key.algorithm().as_str().to_string();

    // RSA keys need the strongest SHA-2 variant the server advertises.
    let hash_alg = handle
        .best_supported_rsa_hash()
        .await
        .map_err(|e| SshExecError::auth(user, format!("Auth fail: {}", e)))?
        .flatten();

    let auth_result = handle
        .authenticate_publickey(user, PrivateKeyWithHashAlg::new(Arc::new(key), hash_alg))
        .await
        .map_err(|e| SshExecError::auth(user, format!("Auth fail: {}", e)))?;

    if auth_result.success() {
        info!("Key authentication successful");
        Ok(())
    } else {
        warn!("Server rejected {} key for user '{}'", algorithm, user);
        Err(SshExecError::auth(
            user,
            format!("Auth fail: server rejected {} public key", algorithm),
        ))
    }
}

async fn send_disconnect(handle: &Handle<SshHandler>, reason: &str) {
    if let Err(e) = handle
        .disconnect(Disconnect::ByApplication, reason, "en")
        .await
    {
        debug!("Disconnect after failure did not complete cleanly: {}", e);
    }
}

/// An authenticated SSH session
///
/// Exactly one exec channel is open at a time: [`CommandExecutor::run`]
/// borrows the session mutably for the whole command. A session dropped
/// without [`Session::disconnect`] still closes its socket once russh's
/// session task sees the handle go away.
///
/// [`CommandExecutor::run`]: super::command::CommandExecutor::run
pub struct Session {
    handle: Handle<SshHandler>,
    target: ConnectionTarget,
}

impl Session {
    pub fn target(&self) -> &ConnectionTarget {
        &self.target
    }

    /// Open a new session channel for one exec request
    pub(crate) async fn open_channel(&mut self) -> Result<Channel<client::Msg>> {
        self.handle.channel_open_session().await.map_err(|e| {
            SshExecError::execution(
                super::command::ExecStage::OpeningChannel,
                format!("failed to open channel: {}", e),
            )
        })
    }

    /// Close the SSH connection
    ///
    /// Consumes the session, so a disconnected session can never be used
    /// again. Failures while saying goodbye are logged, not returned: the
    /// transport is dropped either way.
    pub async fn disconnect(self) {
        if let Err(e) = self
            .handle
            .disconnect(Disconnect::ByApplication, "", "en")
            .await
        {
            warn!("SSH disconnect from {} failed: {}", self.target.address(), e);
        }

        info!("SSH connection to {} closed", self.target.address());
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("host", &self.target.host)
            .field("port", &self.target.port)
            .field("user", &self.target.user)
            .finish()
    }
}
