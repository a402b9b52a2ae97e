//! Error types for secret management.

use thiserror::Error;

/// Errors that can occur during secret operations.
#[derive(Debug, Error)]
pub enum SecretError {
    /// The cipher key is not exactly 32 bytes. Nothing was encrypted or decrypted.
    #[error("Invalid key length: expected {expected} bytes, got {actual}")]
    KeyLength { expected: usize, actual: usize },

    /// The GCM tag did not verify: the value was tampered with or the key is wrong.
    #[error("Authentication failed: ciphertext or tag does not verify under this key")]
    Authentication,

    /// The stored blob is not in the `iv || tag || ciphertext` format.
    #[error("Malformed encrypted value: {0}")]
    MalformedBlob(String),

    /// The stored key fingerprint does not match the supplied key.
    #[error("Key mismatch: secret was written with a different password or master key")]
    KeyMismatch,

    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("Secret not found: {0}")]
    NotFound(String),

    #[error("Invalid secret name: {0}")]
    InvalidName(String),

    /// The store was opened without a key; only metadata operations work.
    #[error("Keystore is locked: no password or master key supplied")]
    Locked,

    #[error("Master key error: {0}")]
    MasterKey(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SecretError {
    /// Whether a different key might succeed where this one failed.
    ///
    /// Callers use this to decide whether re-prompting for a password makes sense.
    pub fn is_wrong_key(&self) -> bool {
        matches!(self, Self::Authentication | Self::KeyMismatch)
    }
}

/// Convenience result alias for secret operations.
pub type Result<T> = std::result::Result<T, SecretError>;
