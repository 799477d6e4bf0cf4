//! Temporary RSA key pairs for integration tests.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use russh::keys::ssh_key::private::{KeypairData, RsaKeypair};
use russh::keys::ssh_key::LineEnding;
use russh::keys::{PrivateKey, PublicKey};

const RSA_BITS: usize = 2048;

/// Paths of a generated key pair.
#[derive(Debug, Clone)]
pub struct TempKeyPair {
    /// authorized_keys formatted public key
    pub public_key: PathBuf,
    /// OpenSSH PEM-armoured private key
    pub private_key: PathBuf,
}

impl TempKeyPair {
    pub fn load_public_key(&self) -> anyhow::Result<PublicKey> {
        let text = std::fs::read_to_string(&self.public_key)?;
        Ok(PublicKey::from_openssh(text.trim())?)
    }
}

/// Generate a fresh RSA key pair inside `dir`.
pub fn generate(dir: &Path) -> anyhow::Result<TempKeyPair> {
    let keypair = RsaKeypair::random(&mut rand::rngs::OsRng, RSA_BITS)?;
    let private = PrivateKey::new(KeypairData::Rsa(keypair), "ssh-exec test key")?;

    let private_key = dir.join("private_key.pem");
    std::fs::write(&private_key, private.to_openssh(LineEnding::LF)?.as_bytes())?;

    let public_key = dir.join("public_key.pub");
    std::fs::write(&public_key, private.public_key().to_openssh()?)?;

    Ok(TempKeyPair {
        public_key,
        private_key,
    })
}

static SHARED_KEYS: OnceLock<TempKeyPair> = OnceLock::new();

fn shared_keys_dir() -> PathBuf {
    std::env::temp_dir().join(format!("ssh-exec-test-keys-{}", std::process::id()))
}

/// Key pair shared by every test in this process, generated on first use.
pub fn shared_key_pair() -> &'static TempKeyPair {
    SHARED_KEYS.get_or_init(|| {
        let dir = shared_keys_dir();
        std::fs::create_dir_all(&dir).expect("failed to create key directory");
        generate(&dir).expect("failed to generate test key pair")
    })
}

/// Remove the shared key pair on process exit.
#[ctor::dtor]
fn remove_shared_keys() {
    if SHARED_KEYS.get().is_some() {
        let _ = std::fs::remove_dir_all(shared_keys_dir());
    }
}
