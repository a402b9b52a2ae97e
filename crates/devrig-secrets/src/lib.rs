//! Encrypted secret handling for devrig.
//!
//! [`crypto`] is the cipher: AES-256-GCM over a single value with a fresh
//! nonce per call and a self-describing `iv || tag || ciphertext` blob.
//! [`kdf`] turns passwords or a master key into per-secret cipher keys.
//! [`store`] persists encrypted values as one JSON document per secret.

pub mod crypto;
pub mod error;
pub mod kdf;
pub mod master_key;
pub mod store;
pub mod types;

pub use crypto::{decrypt, encrypt, EncryptedValue, SecretCipher};
pub use error::{Result, SecretError};
pub use kdf::{derive_key, derive_subkey, generate_salt, key_fingerprint, DerivedKey, KdfParams};
pub use store::{FileSecretStore, KeySource, SecretStore};
pub use types::{DecryptedSecret, SecretRef, StoredSecret};
