//! Error types for dexmm-account.

use thiserror::Error;

/// Encryption errors from a [`Crypter`](crate::crypter::Crypter).
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("Encryption failed")]
    Encrypt,

    #[error("Decryption failed")]
    Decrypt,

    #[error("Ciphertext too short: {0} bytes")]
    TooShort(usize),
}

/// HD key derivation errors.
#[derive(Debug, Error)]
pub enum KeyGenError {
    #[error("Invalid seed length: {0} bytes (expected 16..=64)")]
    InvalidSeedLength(usize),

    #[error("Child index {0} is not hardened")]
    NotHardened(u32),

    /// The derived key is outside the curve order or zero. Callers may
    /// retry with the next index.
    #[error("Unusable derived key")]
    UnusableKey,
}

/// Account errors.
#[derive(Debug, Error)]
pub enum AccountError {
    #[error("account locked")]
    AccountLocked,

    #[error("maximum key generation reached, cannot generate key {0}")]
    KeyIndexExhausted(u32),

    #[error("seed decryption error: {0}")]
    SeedDecrypt(#[source] CryptoError),

    #[error("key derivation error: {0}")]
    KeyDerivation(#[from] KeyGenError),

    #[error("invalid dex pubkey: {0}")]
    InvalidDexPubKey(String),

    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("invalid private key: {0}")]
    InvalidKey(String),

    #[error("signing error: {0}")]
    Signing(String),

    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    #[error("no message to verify")]
    NoMessage,

    #[error("no signature to verify")]
    NoSignature,
}

/// Result type alias for account operations.
pub type AccountResult<T> = Result<T, AccountError>;
