//! Key derivation for the secret cipher.
//!
//! Derivation is always an explicit step that happens before
//! [`crate::crypto::encrypt`] or [`crate::crypto::decrypt`]; the cipher
//! itself only ever sees a finished 32-byte key.
//!
//! - Human passwords go through Argon2id ([`derive_key`]).
//! - A random 32-byte master key goes through HKDF-SHA256
//!   ([`derive_subkey`]), so the master key is never used directly as a
//!   cipher key.

use argon2::{Algorithm, Argon2, Params, Version};
use devrig_core::config::KdfConfig;
use hkdf::Hkdf;
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::fmt;
use zeroize::Zeroizing;

use crate::crypto::KEY_LEN;
use crate::error::{Result, SecretError};

/// Salt length in bytes.
pub const SALT_LEN: usize = 16;

/// HKDF info string used to domain-separate derived keys.
const HKDF_INFO: &[u8] = b"devrig-secret-v1";

/// Prefix hashed ahead of the key when computing its fingerprint.
const FINGERPRINT_DOMAIN: &[u8] = b"devrig-key-fingerprint-v1";

/// Argon2id cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfParams {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self::from(&KdfConfig::default())
    }
}

impl From<&KdfConfig> for KdfParams {
    fn from(config: &KdfConfig) -> Self {
        Self {
            memory_kib: config.memory_kib,
            iterations: config.iterations,
            parallelism: config.parallelism,
        }
    }
}

/// A derived 256-bit cipher key, wiped on drop.
#[derive(Clone)]
pub struct DerivedKey(Zeroizing<[u8; KEY_LEN]>);

impl DerivedKey {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0[..]
    }

    /// Fingerprint of this key, suitable for storing next to ciphertext.
    pub fn fingerprint(&self) -> String {
        key_fingerprint(self.as_bytes())
    }
}

impl fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DerivedKey([REDACTED])")
    }
}

/// Derive a cipher key from a password and salt with Argon2id.
///
/// The same password, salt, and parameters always yield the same key.
pub fn derive_key(password: &str, salt: &[u8], params: &KdfParams) -> Result<DerivedKey> {
    let argon_params = Params::new(
        params.memory_kib,
        params.iterations,
        params.parallelism,
        Some(KEY_LEN),
    )
    .map_err(|e| SecretError::KeyDerivation(format!("invalid Argon2 parameters: {e}")))?;

    let argon = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon_params);
    let mut okm = Zeroizing::new([0u8; KEY_LEN]);
    argon
        .hash_password_into(password.as_bytes(), salt, &mut okm[..])
        .map_err(|e| SecretError::KeyDerivation(e.to_string()))?;

    Ok(DerivedKey(okm))
}

/// Derive a per-salt cipher key from a 32-byte master key via HKDF-SHA256.
pub fn derive_subkey(master_key: &[u8], salt: &[u8]) -> Result<DerivedKey> {
    if master_key.len() != KEY_LEN {
        return Err(SecretError::KeyLength {
            expected: KEY_LEN,
            actual: master_key.len(),
        });
    }

    let hk = Hkdf::<Sha256>::new(Some(salt), master_key);
    let mut okm = Zeroizing::new([0u8; KEY_LEN]);
    hk.expand(HKDF_INFO, &mut okm[..])
        .map_err(|e| SecretError::KeyDerivation(e.to_string()))?;

    Ok(DerivedKey(okm))
}

/// Generate a fresh random salt.
pub fn generate_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt);
    salt
}

/// Opaque identifier of a key: hex of the first 16 bytes of
/// `SHA-256(domain || key)`. Reveals nothing useful about the key itself.
pub fn key_fingerprint(key: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(FINGERPRINT_DOMAIN);
    hasher.update(key);
    let digest = hasher.finalize();
    hex::encode(&digest[..16])
}
