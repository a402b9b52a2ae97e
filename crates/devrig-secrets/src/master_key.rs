//! Master key resolution for non-interactive keystore access.
//!
//! A master key is 32 random bytes, exchanged as 64 hex characters. The
//! keystore never uses it directly: each secret's cipher key is derived
//! from it with HKDF and the secret's own salt.

use zeroize::Zeroizing;

use crate::crypto::{self, KEY_LEN};
use crate::error::{Result, SecretError};

/// Parse a hex-encoded master key, requiring exactly 32 bytes.
pub fn parse_hex(hex_key: &str) -> Result<Zeroizing<[u8; KEY_LEN]>> {
    let raw = Zeroizing::new(hex::decode(hex_key.trim()).map_err(|e| {
        SecretError::MasterKey(format!("invalid hex: {e}"))
    })?);

    if raw.len() != KEY_LEN {
        return Err(SecretError::MasterKey(format!(
            "master key must decode to exactly {KEY_LEN} bytes, got {}",
            raw.len()
        )));
    }

    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    key.copy_from_slice(&raw);
    Ok(key)
}

/// Generate a new master key and return it hex-encoded.
pub fn generate_hex() -> Zeroizing<String> {
    Zeroizing::new(hex::encode(&crypto::generate_key()[..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_key_parses_back() {
        let hex_key = generate_hex();
        assert_eq!(hex_key.len(), KEY_LEN * 2);
        let key = parse_hex(&hex_key).unwrap();
        assert_eq!(hex::encode(&key[..]), hex_key.as_str());
    }

    #[test]
    fn test_surrounding_whitespace_ignored() {
        let hex_key = format!("  {}\n", "ab".repeat(KEY_LEN));
        let key = parse_hex(&hex_key).unwrap();
        assert!(key.iter().all(|b| *b == 0xab));
    }

    #[test]
    fn test_invalid_hex_rejected() {
        assert!(matches!(
            parse_hex("not-valid-hex!"),
            Err(SecretError::MasterKey(_))
        ));
    }

    #[test]
    fn test_wrong_length_rejected() {
        let err = parse_hex(&hex::encode([0u8; 16])).unwrap_err();
        assert!(err.to_string().contains("got 16"), "{err}");
    }
}
