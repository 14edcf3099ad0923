//! Field-level encryption collaborator.
//!
//! Sensitive delegate/user fields are encrypted at rest with
//! AES-256-GCM. The cipher is an explicitly injected dependency of the
//! services that need it — there is no ambient global instance.

use aes_gcm::aead::rand_core::RngCore;
use aes_gcm::aead::{Aead, KeyInit, OsRng, Payload};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

use crate::error::EstateKitError;

/// An encrypted field value: base64 ciphertext, nonce, and GCM tag.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EncryptedValue {
    pub content: String,
    pub iv: String,
    pub auth_tag: String,
}

/// Symmetric field encryption.
///
/// A failed `encrypt` is fatal to the enclosing operation — callers
/// must abort without persisting a partial record.
pub trait CipherService: Send + Sync {
    fn encrypt(&self, plaintext: &[u8]) -> Result<EncryptedValue, EstateKitError>;
    fn decrypt(&self, value: &EncryptedValue) -> Result<Vec<u8>, EstateKitError>;
}

/// AES-256-GCM implementation with a random 96-bit nonce per call.
#[derive(Clone)]
pub struct Aes256GcmCipher {
    key: [u8; 32],
}

impl Aes256GcmCipher {
    pub fn new(key: [u8; 32]) -> Self {
        Self { key }
    }
}

const TAG_LEN: usize = 16;

impl CipherService for Aes256GcmCipher {
    fn encrypt(&self, plaintext: &[u8]) -> Result<EncryptedValue, EstateKitError> {
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.key));
        let mut nonce_bytes = [0u8; 12];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        // aes-gcm appends the 16-byte tag to the ciphertext; split it
        // back out so the stored shape is {content, iv, auth_tag}.
        let mut combined = cipher
            .encrypt(nonce, plaintext)
            .map_err(|e| EstateKitError::Encryption(format!("AES-GCM encrypt: {e}")))?;
        if combined.len() < TAG_LEN {
            return Err(EstateKitError::Encryption("ciphertext too short".into()));
        }
        let tag = combined.split_off(combined.len() - TAG_LEN);

        Ok(EncryptedValue {
            content: STANDARD.encode(combined),
            iv: STANDARD.encode(nonce_bytes),
            auth_tag: STANDARD.encode(tag),
        })
    }

    fn decrypt(&self, value: &EncryptedValue) -> Result<Vec<u8>, EstateKitError> {
        let content = STANDARD
            .decode(&value.content)
            .map_err(|e| EstateKitError::Encryption(format!("base64 decode: {e}")))?;
        let iv = STANDARD
            .decode(&value.iv)
            .map_err(|e| EstateKitError::Encryption(format!("base64 decode: {e}")))?;
        let tag = STANDARD
            .decode(&value.auth_tag)
            .map_err(|e| EstateKitError::Encryption(format!("base64 decode: {e}")))?;

        if iv.len() != 12 || tag.len() != TAG_LEN {
            return Err(EstateKitError::Encryption("malformed nonce or tag".into()));
        }

        let mut combined = content;
        combined.extend_from_slice(&tag);

        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.key));
        cipher
            .decrypt(
                Nonce::from_slice(&iv),
                Payload {
                    msg: &combined,
                    aad: &[],
                },
            )
            .map_err(|e| EstateKitError::Encryption(format!("AES-GCM decrypt: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encrypt_decrypt_roundtrip() {
        let cipher = Aes256GcmCipher::new([42u8; 32]);
        let encrypted = cipher.encrypt(b"delegate@example.com").unwrap();
        let decrypted = cipher.decrypt(&encrypted).unwrap();
        assert_eq!(decrypted, b"delegate@example.com");
    }

    #[test]
    fn wrong_key_fails_decrypt() {
        let cipher1 = Aes256GcmCipher::new([42u8; 32]);
        let cipher2 = Aes256GcmCipher::new([99u8; 32]);
        let encrypted = cipher1.encrypt(b"secret").unwrap();
        assert!(cipher2.decrypt(&encrypted).is_err());
    }

    #[test]
    fn tampered_tag_fails_decrypt() {
        let cipher = Aes256GcmCipher::new([42u8; 32]);
        let mut encrypted = cipher.encrypt(b"secret").unwrap();
        encrypted.auth_tag = STANDARD.encode([0u8; 16]);
        assert!(cipher.decrypt(&encrypted).is_err());
    }

    #[test]
    fn nonces_are_unique() {
        let cipher = Aes256GcmCipher::new([42u8; 32]);
        let a = cipher.encrypt(b"x").unwrap();
        let b = cipher.encrypt(b"x").unwrap();
        assert_ne!(a.iv, b.iv);
    }
}
