//! # Symmetric Encryption
//!
//! AES-256-GCM. Every [`SecretKey::seal`] draws a fresh random 96-bit nonce,
//! so sealing the same value twice never yields the same ciphertext.

use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::Aes256Gcm;
use rand::RngCore;
use zeroize::Zeroize;

use crate::CryptoError;

/// AES-256 key size.
pub const KEY_LEN: usize = 32;

/// GCM nonce size.
pub const NONCE_LEN: usize = 12;

fn fixed<const N: usize>(material: &'static str, bytes: &[u8]) -> Result<[u8; N], CryptoError> {
    bytes.try_into().map_err(|_| CryptoError::InvalidLength {
        material,
        expected: N,
        actual: bytes.len(),
    })
}

fn random<const N: usize>() -> [u8; N] {
    let mut bytes = [0u8; N];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes
}

/// The shared key configured under `[security]`. Zeroized on drop and never
/// printed.
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct SecretKey([u8; KEY_LEN]);

impl SecretKey {
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// # Errors
    ///
    /// `InvalidLength` unless `bytes` is exactly [`KEY_LEN`] long.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        fixed("key", bytes).map(Self)
    }

    pub fn generate() -> Self {
        Self(random())
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }

    fn cipher(&self) -> Aes256Gcm {
        Aes256Gcm::new(GenericArray::from_slice(&self.0))
    }

    /// Encrypt `plaintext` under a fresh nonce.
    ///
    /// # Errors
    ///
    /// `Seal` if the cipher refuses the input.
    pub fn seal(&self, plaintext: &[u8]) -> Result<(Nonce, Vec<u8>), CryptoError> {
        let nonce = Nonce::generate();
        let ciphertext = self
            .cipher()
            .encrypt(GenericArray::from_slice(&nonce.0), plaintext)
            .map_err(|e| CryptoError::Seal(e.to_string()))?;
        Ok((nonce, ciphertext))
    }

    /// Decrypt and authenticate.
    ///
    /// # Errors
    ///
    /// `Open` if authentication fails.
    pub fn open(&self, nonce: &Nonce, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        self.cipher()
            .decrypt(GenericArray::from_slice(&nonce.0), ciphertext)
            .map_err(|_| CryptoError::Open)
    }
}

impl std::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecretKey(***)")
    }
}

/// Per-value GCM nonce, carried next to the ciphertext on the wire.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Nonce([u8; NONCE_LEN]);

impl Nonce {
    pub fn from_bytes(bytes: [u8; NONCE_LEN]) -> Self {
        Self(bytes)
    }

    /// # Errors
    ///
    /// `InvalidLength` unless `bytes` is exactly [`NONCE_LEN`] long.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        fixed("nonce", bytes).map(Self)
    }

    pub fn generate() -> Self {
        Self(random())
    }

    pub fn as_bytes(&self) -> &[u8; NONCE_LEN] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sealed_value_opens_with_same_key() {
        let key = SecretKey::generate();

        let (nonce, ciphertext) = key.seal(b"card=4111").unwrap();

        assert_eq!(key.open(&nonce, &ciphertext).unwrap(), b"card=4111");
    }

    #[test]
    fn test_other_key_cannot_open() {
        let (nonce, ciphertext) = SecretKey::generate().seal(b"card=4111").unwrap();

        let err = SecretKey::generate().open(&nonce, &ciphertext).unwrap_err();
        assert_eq!(err, CryptoError::Open);
    }

    #[test]
    fn test_tampering_detected() {
        let key = SecretKey::generate();
        let (nonce, mut ciphertext) = key.seal(b"card=4111").unwrap();
        ciphertext[0] ^= 0x01;

        assert!(key.open(&nonce, &ciphertext).is_err());
    }

    #[test]
    fn test_same_plaintext_seals_differently() {
        let key = SecretKey::from_bytes([9u8; KEY_LEN]);

        let (first_nonce, first) = key.seal(b"same").unwrap();
        let (second_nonce, second) = key.seal(b"same").unwrap();

        assert_ne!(first_nonce, second_nonce);
        assert_ne!(first, second);
    }

    #[test]
    fn test_material_lengths_enforced() {
        assert_eq!(
            SecretKey::from_slice(&[7u8; 16]).unwrap_err(),
            CryptoError::InvalidLength {
                material: "key",
                expected: KEY_LEN,
                actual: 16
            }
        );
        assert!(SecretKey::from_slice(&[7u8; KEY_LEN]).is_ok());
        assert!(matches!(
            Nonce::from_slice(&[0u8; 24]),
            Err(CryptoError::InvalidLength { material: "nonce", .. })
        ));
    }
}
