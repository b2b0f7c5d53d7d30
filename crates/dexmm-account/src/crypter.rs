//! Symmetric encryption of key material at rest.
//!
//! The seed and the derived account key are only ever stored encrypted.
//! Decrypted plaintext is returned in a zeroizing buffer.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use argon2::Argon2;
use rand::RngCore;
use zeroize::Zeroizing;

use crate::error::CryptoError;

const NONCE_LEN: usize = 12;
const SALT_LEN: usize = 16;
const KEY_LEN: usize = 32;

/// Encrypts and decrypts opaque byte strings.
pub trait Crypter: Send + Sync {
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError>;
    fn decrypt(&self, ciphertext: &[u8]) -> Result<Zeroizing<Vec<u8>>, CryptoError>;
}

/// AES-256-GCM with an Argon2id password-derived key.
///
/// Ciphertext format: `nonce (12 bytes) || sealed data`. The salt is not
/// part of the ciphertext; persist [`salt`](Self::salt) alongside it to
/// rebuild the crypter later.
pub struct AesGcmCrypter {
    key: Zeroizing<[u8; KEY_LEN]>,
    salt: [u8; SALT_LEN],
}

impl AesGcmCrypter {
    /// Derive a new key from `password` with a random salt.
    pub fn new(password: &[u8]) -> Result<Self, CryptoError> {
        let mut salt = [0u8; SALT_LEN];
        rand::thread_rng().fill_bytes(&mut salt);
        Self::with_salt(password, salt)
    }

    /// Re-derive the key for a previously used salt.
    pub fn with_salt(password: &[u8], salt: [u8; SALT_LEN]) -> Result<Self, CryptoError> {
        let mut key = Zeroizing::new([0u8; KEY_LEN]);
        Argon2::default()
            .hash_password_into(password, &salt, &mut key[..])
            .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
        Ok(Self { key, salt })
    }

    pub fn salt(&self) -> [u8; SALT_LEN] {
        self.salt
    }

    fn cipher(&self) -> Aes256Gcm {
        Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.key[..]))
    }
}

impl Crypter for AesGcmCrypter {
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let mut nonce = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce);

        let sealed = self
            .cipher()
            .encrypt(Nonce::from_slice(&nonce), plaintext)
            .map_err(|_| CryptoError::Encrypt)?;

        let mut out = Vec::with_capacity(NONCE_LEN + sealed.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&sealed);
        Ok(out)
    }

    fn decrypt(&self, ciphertext: &[u8]) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        if ciphertext.len() <= NONCE_LEN {
            return Err(CryptoError::TooShort(ciphertext.len()));
        }
        let (nonce, sealed) = ciphertext.split_at(NONCE_LEN);
        self.cipher()
            .decrypt(Nonce::from_slice(nonce), sealed)
            .map(Zeroizing::new)
            .map_err(|_| CryptoError::Decrypt)
    }
}

impl std::fmt::Debug for AesGcmCrypter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AesGcmCrypter")
            .field("salt", &hex::encode(self.salt))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encrypt_decrypt() {
        let crypter = AesGcmCrypter::new(b"correct horse").unwrap();
        let ct = crypter.encrypt(b"seed material").unwrap();
        assert_ne!(&ct[NONCE_LEN..], b"seed material");
        let pt = crypter.decrypt(&ct).unwrap();
        assert_eq!(pt.as_slice(), b"seed material");
    }

    #[test]
    fn test_same_salt_same_key() {
        let a = AesGcmCrypter::new(b"pw").unwrap();
        let b = AesGcmCrypter::with_salt(b"pw", a.salt()).unwrap();
        let ct = a.encrypt(b"abc").unwrap();
        assert_eq!(b.decrypt(&ct).unwrap().as_slice(), b"abc");
    }

    #[test]
    fn test_wrong_password_fails() {
        let a = AesGcmCrypter::new(b"pw").unwrap();
        let b = AesGcmCrypter::with_salt(b"other", a.salt()).unwrap();
        let ct = a.encrypt(b"abc").unwrap();
        assert!(matches!(b.decrypt(&ct), Err(CryptoError::Decrypt)));
    }

    #[test]
    fn test_short_ciphertext() {
        let crypter = AesGcmCrypter::new(b"pw").unwrap();
        assert!(matches!(
            crypter.decrypt(&[0u8; 4]),
            Err(CryptoError::TooShort(4))
        ));
    }

    #[test]
    fn test_debug_hides_key() {
        let crypter = AesGcmCrypter::new(b"pw").unwrap();
        let s = format!("{crypter:?}");
        assert!(s.contains("salt"));
        assert!(!s.contains("key"));
    }
}
