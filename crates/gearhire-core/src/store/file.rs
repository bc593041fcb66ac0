//! Passphrase-sealed file store for platforms without a usable keychain.
//!
//! File layout: `salt (16) || nonce (12) || ciphertext`, where the plaintext
//! is a JSON object of key/value strings. The key is derived with Argon2id
//! from the passphrase and salt; every write uses a fresh nonce.

use std::collections::BTreeMap;
use std::path::PathBuf;

use argon2::Argon2;
use async_trait::async_trait;
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use rand::RngCore;
use tokio::sync::Mutex;
use tracing::debug;

use super::{SecureStore, StoreError};

const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;
const KEY_LEN: usize = 32;

pub struct EncryptedFileStore {
    path: PathBuf,
    salt: [u8; SALT_LEN],
    cipher: ChaCha20Poly1305,
    entries: Mutex<BTreeMap<String, String>>,
}

impl EncryptedFileStore {
    /// Open `path`, decrypting existing contents with `passphrase`.
    ///
    /// A missing file starts an empty store with a new random salt; nothing
    /// is written until the first `set`. A wrong passphrase fails here with
    /// `StoreError::Crypto`.
    pub fn open(path: impl Into<PathBuf>, passphrase: &str) -> Result<Self, StoreError> {
        let path = path.into();

        if path.exists() {
            let raw = std::fs::read(&path)?;
            if raw.len() < SALT_LEN + NONCE_LEN {
                return Err(StoreError::Corrupt(format!(
                    "{} is too short ({} bytes)",
                    path.display(),
                    raw.len()
                )));
            }

            let mut salt = [0u8; SALT_LEN];
            salt.copy_from_slice(&raw[..SALT_LEN]);
            let cipher = Self::derive_cipher(passphrase, &salt)?;

            let nonce = Nonce::from_slice(&raw[SALT_LEN..SALT_LEN + NONCE_LEN]);
            let plaintext = cipher
                .decrypt(nonce, &raw[SALT_LEN + NONCE_LEN..])
                .map_err(|_| StoreError::Crypto("wrong passphrase or tampered file".to_string()))?;
            let entries: BTreeMap<String, String> = serde_json::from_slice(&plaintext)
                .map_err(|e| StoreError::Corrupt(format!("Failed to parse store contents: {}", e)))?;

            debug!(path = %path.display(), entries = entries.len(), "Opened encrypted store");
            Ok(Self {
                path,
                salt,
                cipher,
                entries: Mutex::new(entries),
            })
        } else {
            let mut salt = [0u8; SALT_LEN];
            rand::thread_rng().fill_bytes(&mut salt);
            let cipher = Self::derive_cipher(passphrase, &salt)?;

            debug!(path = %path.display(), "Starting new encrypted store");
            Ok(Self {
                path,
                salt,
                cipher,
                entries: Mutex::new(BTreeMap::new()),
            })
        }
    }

    fn derive_cipher(passphrase: &str, salt: &[u8; SALT_LEN]) -> Result<ChaCha20Poly1305, StoreError> {
        let mut key = [0u8; KEY_LEN];
        Argon2::default()
            .hash_password_into(passphrase.as_bytes(), salt, &mut key)
            .map_err(|e| StoreError::Crypto(format!("Key derivation failed: {}", e)))?;
        Ok(ChaCha20Poly1305::new(Key::from_slice(&key)))
    }

    /// Seal the current entries and replace the file via a temp-file rename
    fn persist(&self, entries: &BTreeMap<String, String>) -> Result<(), StoreError> {
        let plaintext = serde_json::to_vec(entries)
            .map_err(|e| StoreError::Corrupt(format!("Failed to encode store contents: {}", e)))?;

        let mut nonce = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce);
        let ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext.as_ref())
            .map_err(|_| StoreError::Crypto("encryption failed".to_string()))?;

        let mut contents = Vec::with_capacity(SALT_LEN + NONCE_LEN + ciphertext.len());
        contents.extend_from_slice(&self.salt);
        contents.extend_from_slice(&nonce);
        contents.extend_from_slice(&ciphertext);

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, contents)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

#[async_trait]
impl SecureStore for EncryptedFileStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    // Both writers stage the change on a copy and only commit it to memory
    // once the file is on disk, so memory never runs ahead of the file.
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().await;
        let mut staged = entries.clone();
        staged.insert(key.to_string(), value.to_string());
        self.persist(&staged)?;
        *entries = staged;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().await;
        if !entries.contains_key(key) {
            return Ok(());
        }
        let mut staged = entries.clone();
        staged.remove(key);
        self.persist(&staged)?;
        *entries = staged;
        Ok(())
    }
}
