//! Secret storage backends.
//!
//! Defines the [`SecretStore`] trait and provides [`FileSecretStore`], a
//! file-system-backed keystore that encrypts each secret into its own JSON
//! document under `~/.devrig/secrets/`.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use devrig_core::secret::constant_time_eq;
use devrig_core::SecretString;
use parking_lot::RwLock;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use zeroize::Zeroizing;

use crate::crypto::{SecretCipher, KEY_LEN};
use crate::error::{Result, SecretError};
use crate::kdf::{self, DerivedKey, KdfParams, SALT_LEN};
use crate::types::{DecryptedSecret, SecretRef, StoredSecret};

/// Maximum allowed length for a secret name.
const MAX_NAME_LEN: usize = 128;

/// Async trait for secret storage backends.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Store a secret under the given name, encrypting the value.
    async fn set(&self, name: &str, value: &str) -> Result<()>;

    /// Retrieve and decrypt a secret by name.
    async fn get(&self, name: &str) -> Result<DecryptedSecret>;

    /// Check whether a secret with the given name exists.
    async fn exists(&self, name: &str) -> Result<bool>;

    /// List all stored secrets (metadata only, no plaintext).
    async fn list(&self) -> Result<Vec<SecretRef>>;

    /// Delete a secret by name.
    async fn delete(&self, name: &str) -> Result<()>;
}

/// Where per-secret cipher keys come from.
pub enum KeySource {
    /// A human password, stretched with Argon2id and the secret's salt.
    Password {
        password: SecretString,
        params: KdfParams,
    },
    /// A 32-byte master key, expanded with HKDF and the secret's salt.
    MasterKey(Zeroizing<[u8; KEY_LEN]>),
    /// No key at all. Listing, existence checks and deletion still work.
    Locked,
}

impl KeySource {
    pub fn password(password: impl Into<SecretString>, params: KdfParams) -> Self {
        Self::Password {
            password: password.into(),
            params,
        }
    }

    /// Wrap a raw master key, rejecting anything but 32 bytes.
    pub fn master_key(key: &[u8]) -> Result<Self> {
        if key.len() != KEY_LEN {
            return Err(SecretError::KeyLength {
                expected: KEY_LEN,
                actual: key.len(),
            });
        }
        let mut owned = Zeroizing::new([0u8; KEY_LEN]);
        owned.copy_from_slice(key);
        Ok(Self::MasterKey(owned))
    }

    fn derive(&self, salt: &[u8]) -> Result<DerivedKey> {
        match self {
            Self::Password { password, params } => {
                kdf::derive_key(password.expose_secret(), salt, params)
            }
            Self::MasterKey(key) => kdf::derive_subkey(&key[..], salt),
            Self::Locked => Err(SecretError::Locked),
        }
    }
}

impl fmt::Debug for KeySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Password { params, .. } => f
                .debug_struct("Password")
                .field("password", &"[REDACTED]")
                .field("params", params)
                .finish(),
            Self::MasterKey(_) => f.write_str("MasterKey([REDACTED])"),
            Self::Locked => f.write_str("Locked"),
        }
    }
}

/// A file-system-backed secret store.
///
/// Each secret is stored as an individual JSON file at
/// `{base_dir}/{name}.json`. Files are created with mode `0600` on Unix and
/// replaced atomically on overwrite.
pub struct FileSecretStore {
    base_dir: PathBuf,
    key_source: KeySource,
    /// Derived keys by salt. Argon2id is slow on purpose, so a secret read
    /// several times per process derives its key once.
    key_cache: RwLock<HashMap<[u8; SALT_LEN], DerivedKey>>,
}

impl FileSecretStore {
    /// Create a new store rooted at `base_dir`.
    pub fn new(base_dir: PathBuf, key_source: KeySource) -> Self {
        Self {
            base_dir,
            key_source,
            key_cache: RwLock::new(HashMap::new()),
        }
    }

    /// Open a store without a key, for metadata operations only.
    pub fn locked(base_dir: PathBuf) -> Self {
        Self::new(base_dir, KeySource::Locked)
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Ensure the base directory exists with restrictive permissions.
    async fn ensure_dir(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.base_dir).await?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o700);
            tokio::fs::set_permissions(&self.base_dir, perms).await?;
        }

        Ok(())
    }

    /// Resolve the path for a secret file.
    fn secret_path(&self, name: &str) -> PathBuf {
        self.base_dir.join(format!("{name}.json"))
    }

    /// Derive (or fetch from cache) the cipher key for one salt.
    fn key_for(&self, salt: &[u8; SALT_LEN]) -> Result<DerivedKey> {
        if let Some(key) = self.key_cache.read().get(salt) {
            return Ok(key.clone());
        }

        let key = self.key_source.derive(salt)?;
        self.key_cache.write().insert(*salt, key.clone());
        Ok(key)
    }

    async fn read_stored(&self, path: &Path) -> Result<StoredSecret> {
        let data = tokio::fs::read_to_string(path).await?;
        Ok(serde_json::from_str(&data)?)
    }
}

/// Validate that a secret name contains only safe characters.
///
/// Allowed: ASCII alphanumeric, underscore, hyphen. Max length 128.
fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(SecretError::InvalidName(
            "name must not be empty".to_string(),
        ));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(SecretError::InvalidName(format!(
            "name exceeds maximum length of {MAX_NAME_LEN} characters"
        )));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(SecretError::InvalidName(format!(
            "name contains invalid characters (allowed: alphanumeric, underscore, hyphen): {name}"
        )));
    }
    Ok(())
}

/// Write `data` to `path` via a sibling temp file, mode 0600 on Unix.
async fn write_secret_file(path: &Path, data: &[u8]) -> Result<()> {
    let tmp = path.with_extension("json.tmp");

    // A leftover temp file would keep its old mode.
    match tokio::fs::remove_file(&tmp).await {
        Ok(()) => debug!(path = %tmp.display(), "removed stale temp file"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }

    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(0o600);

    let mut file = options.open(&tmp).await?;
    file.write_all(data).await?;
    file.sync_all().await?;
    drop(file);

    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

#[async_trait]
impl SecretStore for FileSecretStore {
    async fn set(&self, name: &str, value: &str) -> Result<()> {
        validate_name(name)?;
        self.ensure_dir().await?;

        let path = self.secret_path(name);
        let existing = if path.exists() {
            match self.read_stored(&path).await {
                Ok(stored) => Some(stored),
                Err(e) => {
                    warn!(name, path = %path.display(), "replacing unreadable secret file: {e}");
                    None
                }
            }
        } else {
            None
        };

        // An overwrite keeps the secret's salt; only the nonce is new.
        let salt = match existing.as_ref().map(StoredSecret::salt_bytes) {
            Some(Ok(salt)) => salt,
            _ => kdf::generate_salt(),
        };

        let key = self.key_for(&salt)?;
        let encrypted = SecretCipher::new(key.as_bytes())?.encrypt(value)?;
        let now = Utc::now();

        let stored = StoredSecret {
            salt: hex::encode(salt),
            hash: Some(key.fingerprint()),
            value: encrypted.encode(),
            created_at: existing.and_then(|s| s.created_at).or(Some(now)),
            updated_at: Some(now),
        };

        let json = serde_json::to_string_pretty(&stored)?;
        debug!(name, path = %path.display(), "writing secret");
        write_secret_file(&path, json.as_bytes()).await?;
        Ok(())
    }

    async fn get(&self, name: &str) -> Result<DecryptedSecret> {
        validate_name(name)?;

        let path = self.secret_path(name);
        if !path.exists() {
            return Err(SecretError::NotFound(name.to_string()));
        }

        let stored = self.read_stored(&path).await?;
        let salt = stored.salt_bytes()?;
        let encrypted = stored.encrypted_value()?;
        let key = self.key_for(&salt)?;

        if let Some(expected) = &stored.hash {
            if !constant_time_eq(expected.as_bytes(), key.fingerprint().as_bytes()) {
                debug!(name, "key fingerprint mismatch");
                return Err(SecretError::KeyMismatch);
            }
        }

        let value = SecretCipher::new(key.as_bytes())?.decrypt(&encrypted)?;
        debug!(name, "read secret");
        Ok(DecryptedSecret::new(value))
    }

    async fn exists(&self, name: &str) -> Result<bool> {
        validate_name(name)?;
        Ok(self.secret_path(name).exists())
    }

    async fn list(&self) -> Result<Vec<SecretRef>> {
        if !self.base_dir.exists() {
            return Ok(Vec::new());
        }

        let mut refs = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.base_dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }

            let name = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or_default()
                .to_string();

            match self.read_stored(&path).await {
                Ok(stored) => refs.push(SecretRef {
                    name,
                    key_fingerprint: stored.hash,
                    created_at: stored.created_at,
                    updated_at: stored.updated_at,
                }),
                Err(e) => {
                    warn!(path = %path.display(), "skipping unreadable secret file: {e}");
                }
            }
        }

        refs.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(refs)
    }

    async fn delete(&self, name: &str) -> Result<()> {
        validate_name(name)?;

        let path = self.secret_path(name);
        if !path.exists() {
            return Err(SecretError::NotFound(name.to_string()));
        }

        debug!(name, path = %path.display(), "deleting secret");
        tokio::fs::remove_file(&path).await?;
        Ok(())
    }
}
