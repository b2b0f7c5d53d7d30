//! Exchange account identity for the dexmm trading core.
//!
//! - `DexAccount`: per-exchange account with separate key and auth state
//! - `keygen`: hardened BIP-32 derivation of account keys from the wallet seed
//! - `Crypter`: encryption of the seed and account key at rest
//! - `bond`: reputation, fidelity bonds and bonding snapshots
//!
//! # Security
//!
//! Decrypted seeds and keys live in zeroizing buffers and are never logged.

pub mod account;
pub mod bond;
pub mod crypter;
pub mod error;
pub mod keygen;

pub use account::{
    account_key_path, AccountId, AccountInfo, DexAccount, PrimaryCredentials,
    HD_KEY_PURPOSE_ACCTS,
};
pub use bond::{Bond, BondOptions, ExchangeAuth, PendingBondState, Reputation};
pub use crypter::{AesGcmCrypter, Crypter};
pub use error::{AccountError, AccountResult, CryptoError, KeyGenError};
pub use keygen::{gen_deep_child, harden, ExtendedKey, HARDENED_KEY_START};
