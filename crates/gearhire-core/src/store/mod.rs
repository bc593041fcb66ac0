//! Persistent, encrypted-at-rest key-value storage for the session shadow copy.
//!
//! Backends:
//! - `KeyringStore`: OS keychain via the `keyring` crate
//! - `EncryptedFileStore`: ChaCha20-Poly1305 sealed file, passphrase-derived key
//! - `MemoryStore`: process-local map for tests and throwaway sessions

pub mod file;
pub mod keychain;
pub mod memory;

use async_trait::async_trait;
use thiserror::Error;

pub use self::file::EncryptedFileStore;
pub use self::keychain::KeyringStore;
pub use self::memory::MemoryStore;

/// Key holding the raw bearer token
pub const ACCESS_TOKEN_KEY: &str = "access_token";

/// Key holding the JSON-serialized `User`
pub const USER_KEY: &str = "user";

/// Key holding the token expiry as epoch milliseconds
pub const TOKEN_EXPIRY_KEY: &str = "token_expiry";

/// Every key the session manager writes, in write order
pub const SESSION_KEYS: [&str; 3] = [ACCESS_TOKEN_KEY, USER_KEY, TOKEN_EXPIRY_KEY];

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Secure storage backend error: {0}")]
    Backend(String),

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encrypt or decrypt store: {0}")]
    Crypto(String),

    #[error("Store contents are corrupt: {0}")]
    Corrupt(String),
}

#[async_trait]
pub trait SecureStore: Send + Sync {
    /// Read a value; `Ok(None)` when the key was never written or was removed
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Remove a value. Removing an absent key is not an error.
    async fn remove(&self, key: &str) -> Result<(), StoreError>;
}
