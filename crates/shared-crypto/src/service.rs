//! # Encryption Service
//!
//! The component the wire converters delegate to. Values travel as an
//! [`EncryptedValue`]: hex nonce plus hex ciphertext.

use shared_types::EncryptedValue;

use crate::symmetric::{Nonce, SecretKey};
use crate::CryptoError;

/// Encrypts and decrypts opaque byte payloads for the wire.
pub trait EncryptionService: Send + Sync {
    /// Encrypt `plaintext` under a fresh nonce.
    fn encrypt(&self, plaintext: &[u8]) -> Result<EncryptedValue, CryptoError>;

    /// Decrypt a value produced by [`EncryptionService::encrypt`].
    fn decrypt(&self, value: &EncryptedValue) -> Result<Vec<u8>, CryptoError>;
}

/// AES-256-GCM backed service.
#[derive(Debug)]
pub struct AesEncryptionService {
    key: SecretKey,
}

impl AesEncryptionService {
    /// Build from raw key material.
    ///
    /// # Errors
    ///
    /// `CryptoError::InvalidLength` unless `key` is 32 bytes.
    pub fn new(key: &[u8]) -> Result<Self, CryptoError> {
        Ok(Self {
            key: SecretKey::from_slice(key)?,
        })
    }

    /// Build from an existing key.
    pub fn with_key(key: SecretKey) -> Self {
        Self { key }
    }
}

impl EncryptionService for AesEncryptionService {
    fn encrypt(&self, plaintext: &[u8]) -> Result<EncryptedValue, CryptoError> {
        let (nonce, ciphertext) = self.key.seal(plaintext)?;
        Ok(EncryptedValue {
            nonce: hex::encode(nonce.as_bytes()),
            ciphertext: hex::encode(ciphertext),
        })
    }

    fn decrypt(&self, value: &EncryptedValue) -> Result<Vec<u8>, CryptoError> {
        let nonce = Nonce::from_slice(&unhex("nonce", &value.nonce)?)?;
        let ciphertext = unhex("ciphertext", &value.ciphertext)?;
        self.key.open(&nonce, &ciphertext)
    }
}

fn unhex(part: &'static str, value: &str) -> Result<Vec<u8>, CryptoError> {
    hex::decode(value).map_err(|e| CryptoError::InvalidEncoding {
        part,
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let service = AesEncryptionService::new(&[42u8; 32]).unwrap();
        let sealed = service.encrypt(b"card=4111").unwrap();

        assert_eq!(sealed.nonce.len(), 24);
        assert!(!sealed.ciphertext.contains("card"));
        assert_eq!(service.decrypt(&sealed).unwrap(), b"card=4111");
    }

    #[test]
    fn test_rejects_short_key() {
        assert!(matches!(
            AesEncryptionService::new(b"too short"),
            Err(CryptoError::InvalidLength { material: "key", expected: 32, .. })
        ));
    }

    #[test]
    fn test_bad_hex_rejected() {
        let service = AesEncryptionService::new(&[1u8; 32]).unwrap();
        let bogus = EncryptedValue {
            nonce: "zz".to_string(),
            ciphertext: "00".to_string(),
        };
        assert!(matches!(
            service.decrypt(&bogus),
            Err(CryptoError::InvalidEncoding { part: "nonce", .. })
        ));
    }
}
