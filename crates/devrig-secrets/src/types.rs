//! Secret representations at rest and in memory.

use chrono::{DateTime, Utc};
use devrig_core::SecretString;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::crypto::EncryptedValue;
use crate::error::{Result, SecretError};
use crate::kdf::SALT_LEN;

/// An encrypted secret as stored on disk.
///
/// ```json
/// { "salt": "<hex>", "hash": "<fingerprint>", "value": "<base64 iv||tag||ct>" }
/// ```
///
/// The timestamps are optional so documents written by other tools with
/// just the three core fields still load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSecret {
    /// Key-derivation salt, hex-encoded. Stable for the life of the secret.
    pub salt: String,

    /// Fingerprint of the key that produced `value`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,

    /// Base64 of `iv(12) || auth_tag(16) || ciphertext`.
    pub value: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl StoredSecret {
    /// Decode the hex salt.
    pub fn salt_bytes(&self) -> Result<[u8; SALT_LEN]> {
        let raw = hex::decode(self.salt.trim())
            .map_err(|e| SecretError::MalformedBlob(format!("salt hex decode failed: {e}")))?;
        raw.as_slice().try_into().map_err(|_| {
            SecretError::MalformedBlob(format!(
                "salt must be {SALT_LEN} bytes, got {}",
                raw.len()
            ))
        })
    }

    /// Decode the base64 value blob.
    pub fn encrypted_value(&self) -> Result<EncryptedValue> {
        EncryptedValue::decode(&self.value)
    }
}

/// A decrypted secret held in memory.
///
/// Debug and Display both emit `[REDACTED]`.
pub struct DecryptedSecret {
    inner: SecretString,
}

impl DecryptedSecret {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            inner: SecretString::new(value),
        }
    }

    /// Expose the plaintext value. Use sparingly.
    pub fn expose(&self) -> &str {
        self.inner.expose_secret()
    }
}

impl fmt::Debug for DecryptedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl fmt::Display for DecryptedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl From<String> for DecryptedSecret {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Metadata about a stored secret; never contains plaintext or ciphertext.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecretRef {
    pub name: String,

    /// Fingerprint of the key the secret was written with, if recorded.
    pub key_fingerprint: Option<String>,

    pub created_at: Option<DateTime<Utc>>,

    pub updated_at: Option<DateTime<Utc>>,
}
