//! Token encryption using AES-256-GCM.
//!
//! Access and refresh tokens are encrypted before they reach the database.
//! The additional authenticated data binds each ciphertext to its
//! `(user_id, provider)` row, so a ciphertext copied onto another row fails
//! to decrypt.
//!
//! Wire format: `version byte || 12-byte nonce || ciphertext+tag`.

use aes_gcm::{
    Aes256Gcm, Key, Nonce,
    aead::{Aead, AeadCore, KeyInit, OsRng, Payload},
};
use thiserror::Error;
use uuid::Uuid;
use zeroize::{Zeroize, ZeroizeOnDrop};

const FORMAT_VERSION: u8 = 0x01;
const NONCE_SIZE: usize = 12;
const TAG_SIZE: usize = 16;
// version + nonce + at least an auth tag
const MIN_FRAME_SIZE: usize = 1 + NONCE_SIZE + TAG_SIZE;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("encryption failed: {0}")]
    EncryptionFailed(String),
    #[error("decryption failed: {0}")]
    DecryptionFailed(String),
    #[error("invalid ciphertext format")]
    InvalidFormat,
}

/// 32-byte AES key, zeroized when dropped.
#[derive(Debug, Clone, Zeroize, ZeroizeOnDrop)]
pub struct CryptoKey(Vec<u8>);

impl CryptoKey {
    pub fn new(bytes: Vec<u8>) -> Result<Self, CryptoError> {
        if bytes.len() != 32 {
            return Err(CryptoError::EncryptionFailed(
                "invalid key length: expected 32 bytes".to_string(),
            ));
        }
        Ok(CryptoKey(bytes))
    }

    fn cipher(&self) -> Aes256Gcm {
        Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.0))
    }
}

/// AAD tying a token ciphertext to its owning row.
pub fn token_aad(user_id: Uuid, provider: &str) -> Vec<u8> {
    format!("{}|{}", user_id, provider).into_bytes()
}

pub fn encrypt_bytes(key: &CryptoKey, aad: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
    let sealed = key
        .cipher()
        .encrypt(&nonce, Payload { msg: plaintext, aad })
        .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

    let mut framed = Vec::with_capacity(1 + NONCE_SIZE + sealed.len());
    framed.push(FORMAT_VERSION);
    framed.extend_from_slice(&nonce);
    framed.extend_from_slice(&sealed);
    Ok(framed)
}

pub fn decrypt_bytes(key: &CryptoKey, aad: &[u8], framed: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if framed.len() < MIN_FRAME_SIZE || framed[0] != FORMAT_VERSION {
        return Err(CryptoError::InvalidFormat);
    }

    let (nonce, sealed) = framed[1..].split_at(NONCE_SIZE);
    key.cipher()
        .decrypt(Nonce::from_slice(nonce), Payload { msg: sealed, aad })
        .map_err(|e| CryptoError::DecryptionFailed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_key() -> CryptoKey {
        CryptoKey::new(vec![7u8; 32]).unwrap()
    }

    #[test]
    fn test_round_trip() {
        let key = test_key();
        let aad = token_aad(Uuid::new_v4(), "granola");
        let ct = encrypt_bytes(&key, &aad, b"ya29.secret").unwrap();
        assert_ne!(ct.as_slice(), b"ya29.secret");
        let pt = decrypt_bytes(&key, &aad, &ct).unwrap();
        assert_eq!(pt, b"ya29.secret");
    }

    #[test]
    fn test_aad_mismatch_fails() {
        let key = test_key();
        let user = Uuid::new_v4();
        let ct = encrypt_bytes(&key, &token_aad(user, "granola"), b"tok").unwrap();
        assert!(decrypt_bytes(&key, &token_aad(user, "google-calendar"), &ct).is_err());
    }

    #[test]
    fn test_rejects_short_or_unversioned_payloads() {
        let key = test_key();
        let aad = token_aad(Uuid::new_v4(), "granola");
        assert!(matches!(
            decrypt_bytes(&key, &aad, b""),
            Err(CryptoError::InvalidFormat)
        ));
        assert!(matches!(
            decrypt_bytes(&key, &aad, b"short"),
            Err(CryptoError::InvalidFormat)
        ));
        assert!(matches!(
            decrypt_bytes(&key, &aad, &[0x00; 64]),
            Err(CryptoError::InvalidFormat)
        ));
    }

    #[test]
    fn test_tampered_frame_fails_to_decrypt() {
        let key = test_key();
        let aad = token_aad(Uuid::new_v4(), "granola");
        let mut ct = encrypt_bytes(&key, &aad, b"tok").unwrap();
        let last = ct.len() - 1;
        ct[last] ^= 0x01;
        assert!(matches!(
            decrypt_bytes(&key, &aad, &ct),
            Err(CryptoError::DecryptionFailed(_))
        ));
    }

    #[test]
    fn test_key_must_be_32_bytes() {
        assert!(CryptoKey::new(vec![0u8; 16]).is_err());
        assert!(CryptoKey::new(vec![0u8; 32]).is_ok());
    }
}
