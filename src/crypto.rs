//! Encryption of provider API keys at rest.
//!
//! Keys are sealed with AES-256-GCM. The AAD binds each ciphertext to the
//! owning user and the model provider, so a ciphertext copied onto another
//! row fails to decrypt. Stored payloads are framed as
//! `version byte || nonce || ciphertext+tag`.

#![allow(deprecated)]

use aes_gcm::{
    Aes256Gcm, Key, Nonce,
    aead::{Aead, AeadCore, KeyInit, OsRng, Payload},
};
use thiserror::Error;
use uuid::Uuid;
use zeroize::{Zeroize, ZeroizeOnDrop};

const VERSION_ENCRYPTED: u8 = 0x01;
const VERSION_FIELD_LEN: usize = 1;
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;
const MIN_ENCRYPTED_LEN: usize = VERSION_FIELD_LEN + NONCE_LEN + TAG_LEN;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("key must be exactly 32 bytes, got {0}")]
    InvalidKeyLength(usize),
    #[error("encryption failed: {0}")]
    EncryptionFailed(String),
    #[error("decryption failed: {0}")]
    DecryptionFailed(String),
    #[error("invalid ciphertext format")]
    InvalidFormat,
    #[error("empty ciphertext")]
    EmptyCiphertext,
}

/// A 32-byte AES key that is wiped from memory when dropped.
#[derive(Debug, Clone, Zeroize, ZeroizeOnDrop)]
pub struct ZeroizingKey(Vec<u8>);

pub type CryptoKey = ZeroizingKey;

impl CryptoKey {
    pub fn new(bytes: Vec<u8>) -> Result<Self, CryptoError> {
        if bytes.len() != 32 {
            return Err(CryptoError::InvalidKeyLength(bytes.len()));
        }
        Ok(ZeroizingKey(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

fn cipher_for(key: &CryptoKey) -> Aes256Gcm {
    Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_bytes()))
}

/// Seal `plaintext` under `key`, authenticated with `aad`.
pub fn encrypt_bytes(
    key: &CryptoKey,
    aad: &[u8],
    plaintext: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

    let mut sealed = cipher_for(key)
        .encrypt(
            &nonce,
            Payload {
                msg: plaintext,
                aad,
            },
        )
        .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

    let mut framed = Vec::with_capacity(VERSION_FIELD_LEN + NONCE_LEN + sealed.len());
    framed.push(VERSION_ENCRYPTED);
    framed.extend_from_slice(&nonce);
    framed.append(&mut sealed);

    Ok(framed)
}

/// Open a payload produced by [`encrypt_bytes`].
///
/// Unversioned payloads are rejected outright; nothing was ever written to
/// this store in another format.
pub fn decrypt_bytes(
    key: &CryptoKey,
    aad: &[u8],
    ciphertext: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    if ciphertext.is_empty() {
        return Err(CryptoError::EmptyCiphertext);
    }
    if ciphertext[0] != VERSION_ENCRYPTED || ciphertext.len() < MIN_ENCRYPTED_LEN {
        return Err(CryptoError::InvalidFormat);
    }

    let nonce = Nonce::from_slice(&ciphertext[VERSION_FIELD_LEN..VERSION_FIELD_LEN + NONCE_LEN]);
    let sealed = &ciphertext[VERSION_FIELD_LEN + NONCE_LEN..];

    debug_assert!(sealed.len() >= TAG_LEN);

    cipher_for(key)
        .decrypt(nonce, Payload { msg: sealed, aad })
        .map_err(|e| CryptoError::DecryptionFailed(e.to_string()))
}

/// AAD binding an API key to its owning user and provider.
pub fn api_key_aad(owner_id: Uuid, model_provider_id: Uuid) -> String {
    format!("{}|{}", owner_id, model_provider_id)
}

/// Encrypt an API key for storage on a model configuration.
pub fn encrypt_api_key(
    key: &CryptoKey,
    owner_id: Uuid,
    model_provider_id: Uuid,
    api_key: &str,
) -> Result<Vec<u8>, CryptoError> {
    let aad = api_key_aad(owner_id, model_provider_id);
    encrypt_bytes(key, aad.as_bytes(), api_key.as_bytes())
}

/// Decrypt a stored API key ciphertext.
pub fn decrypt_api_key(
    key: &CryptoKey,
    owner_id: Uuid,
    model_provider_id: Uuid,
    ciphertext: &[u8],
) -> Result<String, CryptoError> {
    let aad = api_key_aad(owner_id, model_provider_id);
    let bytes = decrypt_bytes(key, aad.as_bytes(), ciphertext)?;
    String::from_utf8(bytes)
        .map_err(|e| CryptoError::DecryptionFailed(format!("Invalid UTF-8: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_key() -> CryptoKey {
        CryptoKey::new(vec![7u8; 32]).expect("valid test key")
    }

    #[test]
    fn roundtrip_with_matching_aad() {
        let key = test_key();

        let sealed = encrypt_bytes(&key, b"owner|provider", b"sk-live-123").unwrap();
        assert_eq!(sealed[0], VERSION_ENCRYPTED);
        assert!(sealed.len() >= MIN_ENCRYPTED_LEN);

        let opened = decrypt_bytes(&key, b"owner|provider", &sealed).unwrap();
        assert_eq!(opened, b"sk-live-123");
    }

    #[test]
    fn aad_mismatch_fails() {
        let key = test_key();
        let sealed = encrypt_bytes(&key, b"row-a", b"secret").unwrap();

        assert!(decrypt_bytes(&key, b"row-b", &sealed).is_err());
    }

    #[test]
    fn flipped_ciphertext_bit_fails() {
        let key = test_key();
        let mut sealed = encrypt_bytes(&key, b"aad", b"secret").unwrap();
        sealed[MIN_ENCRYPTED_LEN - 1] ^= 0x01;

        assert!(decrypt_bytes(&key, b"aad", &sealed).is_err());
    }

    #[test]
    fn nonces_differ_between_calls() {
        let key = test_key();

        let first = encrypt_bytes(&key, b"aad", b"same input").unwrap();
        let second = encrypt_bytes(&key, b"aad", b"same input").unwrap();

        assert_ne!(
            first[VERSION_FIELD_LEN..VERSION_FIELD_LEN + NONCE_LEN],
            second[VERSION_FIELD_LEN..VERSION_FIELD_LEN + NONCE_LEN]
        );
    }

    #[test]
    fn unversioned_payload_is_rejected() {
        let key = test_key();

        let result = decrypt_bytes(&key, b"aad", b"raw-plaintext-bytes");
        assert!(matches!(result, Err(CryptoError::InvalidFormat)));
    }

    #[test]
    fn truncated_payload_is_rejected() {
        let key = test_key();

        let result = decrypt_bytes(&key, b"aad", &[VERSION_ENCRYPTED, 0x42, 0x42]);
        assert!(matches!(result, Err(CryptoError::InvalidFormat)));

        let result = decrypt_bytes(&key, b"aad", &[]);
        assert!(matches!(result, Err(CryptoError::EmptyCiphertext)));
    }

    #[test]
    fn keys_must_be_32_bytes() {
        assert!(matches!(
            CryptoKey::new(vec![0u8; 16]),
            Err(CryptoError::InvalidKeyLength(16))
        ));
        assert!(matches!(
            CryptoKey::new(vec![0u8; 33]),
            Err(CryptoError::InvalidKeyLength(33))
        ));
    }

    #[test]
    fn api_key_is_bound_to_owner_and_provider() {
        let key = test_key();
        let owner = Uuid::new_v4();
        let provider = Uuid::new_v4();

        let sealed = encrypt_api_key(&key, owner, provider, "sk-test-123").unwrap();
        assert_eq!(
            decrypt_api_key(&key, owner, provider, &sealed).unwrap(),
            "sk-test-123"
        );

        assert!(decrypt_api_key(&key, Uuid::new_v4(), provider, &sealed).is_err());
        assert!(decrypt_api_key(&key, owner, Uuid::new_v4(), &sealed).is_err());
    }
}
