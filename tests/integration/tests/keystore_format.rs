//! Keystore on-disk format integration tests.
//!
//! A stored secret must be readable with nothing but the public pieces:
//! the hex salt, the key derivation step, and the `iv || tag || ct` blob.

use base64::Engine;
use devrig_integration_tests::{master_key_store, TEST_MASTER_KEY};
use devrig_secrets::{
    decrypt, derive_subkey, EncryptedValue, SecretError, SecretStore, StoredSecret,
};
use tempfile::TempDir;

async fn stored(dir: &std::path::Path, name: &str) -> StoredSecret {
    let raw = tokio::fs::read_to_string(dir.join(format!("{name}.json")))
        .await
        .unwrap();
    serde_json::from_str(&raw).unwrap()
}

#[tokio::test]
async fn test_stored_secret_decrypts_from_public_parts() {
    let tmp = TempDir::new().unwrap();
    let store = master_key_store(tmp.path());
    store.set("db_password", "hunter2").await.unwrap();

    let doc = stored(tmp.path(), "db_password").await;
    let salt = hex::decode(&doc.salt).unwrap();
    assert_eq!(salt.len(), 16);

    let blob = base64::engine::general_purpose::STANDARD
        .decode(&doc.value)
        .unwrap();
    assert_eq!(blob.len(), 12 + 16 + "hunter2".len());

    let key = derive_subkey(&TEST_MASTER_KEY, &salt).unwrap();
    assert_eq!(doc.hash.as_deref(), Some(key.fingerprint().as_str()));

    let value = EncryptedValue::from_bytes(&blob).unwrap();
    assert_eq!(decrypt(&value, key.as_bytes()).unwrap(), "hunter2");
}

#[tokio::test]
async fn test_document_without_optional_fields_is_readable() {
    let tmp = TempDir::new().unwrap();
    let store = master_key_store(tmp.path());
    store.set("token", "abc").await.unwrap();

    // Strip everything except the three core fields.
    let doc = stored(tmp.path(), "token").await;
    let minimal = serde_json::json!({ "salt": doc.salt, "value": doc.value });
    tokio::fs::write(tmp.path().join("token.json"), minimal.to_string())
        .await
        .unwrap();

    assert_eq!(store.get("token").await.unwrap().expose(), "abc");
}

#[tokio::test]
async fn test_tampered_document_is_rejected() {
    let tmp = TempDir::new().unwrap();
    let store = master_key_store(tmp.path());
    store.set("token", "abc").await.unwrap();

    let mut doc = stored(tmp.path(), "token").await;
    let mut blob = base64::engine::general_purpose::STANDARD
        .decode(&doc.value)
        .unwrap();
    let last = blob.len() - 1;
    blob[last] ^= 0x80;
    doc.value = base64::engine::general_purpose::STANDARD.encode(&blob);
    tokio::fs::write(
        tmp.path().join("token.json"),
        serde_json::to_string(&doc).unwrap(),
    )
    .await
    .unwrap();

    assert!(matches!(
        store.get("token").await,
        Err(SecretError::Authentication)
    ));
}

#[tokio::test]
async fn test_other_master_key_is_detected() {
    let tmp = TempDir::new().unwrap();
    master_key_store(tmp.path())
        .set("token", "abc")
        .await
        .unwrap();

    let source = devrig_secrets::KeySource::master_key(&[0x11; 32]).unwrap();
    let other = devrig_secrets::FileSecretStore::new(tmp.path().to_path_buf(), source);
    let err = other.get("token").await.unwrap_err();
    assert!(err.is_wrong_key(), "{err}");
}
