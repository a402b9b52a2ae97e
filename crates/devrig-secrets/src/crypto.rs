//! AES-256-GCM encryption of individual secret values.
//!
//! Every call to [`encrypt`] draws a fresh random 96-bit nonce, so the same
//! plaintext under the same key never produces the same output. The result
//! is self-describing: nonce, tag, and ciphertext travel together as one
//! blob, laid out as `iv(12) || auth_tag(16) || ciphertext(N)` and
//! base64-encoded at rest.

use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::aead::AeadInPlace;
use aes_gcm::{Aes256Gcm, KeyInit, Nonce};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rand::RngCore;
use zeroize::{Zeroize, Zeroizing};

use crate::error::{Result, SecretError};

/// Nonce length in bytes (96-bit GCM nonce).
pub const IV_LEN: usize = 12;
/// Authentication tag length in bytes.
pub const TAG_LEN: usize = 16;
/// Cipher key length in bytes (AES-256).
pub const KEY_LEN: usize = 32;

const HEADER_LEN: usize = IV_LEN + TAG_LEN;

/// One encrypted secret value: nonce, tag, and ciphertext.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedValue {
    pub iv: [u8; IV_LEN],
    pub auth_tag: [u8; TAG_LEN],
    pub ciphertext: Vec<u8>,
}

impl EncryptedValue {
    /// Concatenate into the `iv || auth_tag || ciphertext` wire layout.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_LEN + self.ciphertext.len());
        out.extend_from_slice(&self.iv);
        out.extend_from_slice(&self.auth_tag);
        out.extend_from_slice(&self.ciphertext);
        out
    }

    /// Split a wire-layout blob back into its parts.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(SecretError::MalformedBlob(format!(
                "expected at least {HEADER_LEN} bytes, got {}",
                bytes.len()
            )));
        }

        let (iv, rest) = bytes.split_at(IV_LEN);
        let (auth_tag, ciphertext) = rest.split_at(TAG_LEN);

        let mut value = Self {
            iv: [0u8; IV_LEN],
            auth_tag: [0u8; TAG_LEN],
            ciphertext: ciphertext.to_vec(),
        };
        value.iv.copy_from_slice(iv);
        value.auth_tag.copy_from_slice(auth_tag);
        Ok(value)
    }

    /// Base64 (standard alphabet, padded) of the wire layout.
    pub fn encode(&self) -> String {
        STANDARD.encode(self.to_bytes())
    }

    /// Parse a base64 blob produced by [`encode`](Self::encode).
    pub fn decode(encoded: &str) -> Result<Self> {
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|e| SecretError::MalformedBlob(format!("base64 decode failed: {e}")))?;
        Self::from_bytes(&bytes)
    }
}

/// An AES-256-GCM cipher bound to one validated 32-byte key.
pub struct SecretCipher {
    cipher: Aes256Gcm,
}

impl SecretCipher {
    /// Build a cipher, rejecting any key that is not exactly [`KEY_LEN`] bytes.
    pub fn new(key: &[u8]) -> Result<Self> {
        check_key_len(key)?;
        let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| SecretError::KeyLength {
            expected: KEY_LEN,
            actual: key.len(),
        })?;
        Ok(Self { cipher })
    }

    /// Encrypt the UTF-8 bytes of `plaintext` under a fresh random nonce.
    pub fn encrypt(&self, plaintext: &str) -> Result<EncryptedValue> {
        let mut iv = [0u8; IV_LEN];
        rand::thread_rng().fill_bytes(&mut iv);

        let mut buffer = plaintext.as_bytes().to_vec();
        let tag = self
            .cipher
            .encrypt_in_place_detached(Nonce::from_slice(&iv), b"", &mut buffer)
            .map_err(|_| SecretError::MalformedBlob("plaintext too large for AES-GCM".into()))?;

        let mut auth_tag = [0u8; TAG_LEN];
        auth_tag.copy_from_slice(&tag);

        Ok(EncryptedValue {
            iv,
            auth_tag,
            ciphertext: buffer,
        })
    }

    /// Verify and decrypt. No plaintext is produced unless the tag verifies.
    pub fn decrypt(&self, value: &EncryptedValue) -> Result<String> {
        let mut buffer = Zeroizing::new(value.ciphertext.clone());
        self.cipher
            .decrypt_in_place_detached(
                Nonce::from_slice(&value.iv),
                b"",
                buffer.as_mut_slice(),
                GenericArray::from_slice(&value.auth_tag),
            )
            .map_err(|_| SecretError::Authentication)?;

        match String::from_utf8(std::mem::take(&mut *buffer)) {
            Ok(plaintext) => Ok(plaintext),
            Err(e) => {
                e.into_bytes().zeroize();
                Err(SecretError::MalformedBlob(
                    "decrypted value is not valid UTF-8".into(),
                ))
            }
        }
    }
}

fn check_key_len(key: &[u8]) -> Result<()> {
    if key.len() != KEY_LEN {
        return Err(SecretError::KeyLength {
            expected: KEY_LEN,
            actual: key.len(),
        });
    }
    Ok(())
}

/// Encrypt `plaintext` with a 32-byte `key`.
pub fn encrypt(plaintext: &str, key: &[u8]) -> Result<EncryptedValue> {
    SecretCipher::new(key)?.encrypt(plaintext)
}

/// Decrypt `value` with a 32-byte `key`, failing with
/// [`SecretError::Authentication`] if the value was tampered with.
pub fn decrypt(value: &EncryptedValue, key: &[u8]) -> Result<String> {
    SecretCipher::new(key)?.decrypt(value)
}

/// Generate a new random 256-bit key.
pub fn generate_key() -> Zeroizing<[u8; KEY_LEN]> {
    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    rand::thread_rng().fill_bytes(&mut key[..]);
    key
}
