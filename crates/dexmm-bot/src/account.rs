//! Offline account identity derivation.

use dexmm_account::{
    AccountError, AccountId, AccountInfo, AesGcmCrypter, BondOptions, Crypter, DexAccount,
    PrimaryCredentials,
};
use rand::RngCore;
use tracing::debug;
use zeroize::Zeroizing;

use crate::error::AppResult;

/// Identity derived for one exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedAccount {
    pub id: AccountId,
    /// Compressed account public key.
    pub pub_key: Vec<u8>,
}

/// Derive the account identity for `dex_pub_key` at `key_index`.
///
/// The seed is encrypted with a throwaway in-memory crypter, then run
/// through the same setup an exchange login performs.
pub fn derive_account(
    seed: &[u8],
    dex_pub_key: &[u8],
    key_index: u32,
    host: &str,
) -> AppResult<DerivedAccount> {
    let mut password = Zeroizing::new([0u8; 32]);
    rand::thread_rng().fill_bytes(&mut password[..]);
    let crypter = AesGcmCrypter::new(&password[..])?;

    let creds = PrimaryCredentials {
        enc_seed: crypter.encrypt(seed)?,
    };
    let account = DexAccount::new(
        AccountInfo {
            host: host.to_string(),
            cert: Vec::new(),
            dex_pub_key: dex_pub_key.to_vec(),
            enc_key: Vec::new(),
            disabled: false,
            bond_options: BondOptions::default(),
            bond_expiry: chrono::Duration::zero(),
        },
        true,
    );
    account.setup_crypto(&creds, &crypter, key_index)?;

    let pub_key = account.pub_key().ok_or(AccountError::AccountLocked)?;
    let id = account.id();
    account.lock();
    debug!(host, account_id = %id, key_index, "Derived account");

    Ok(DerivedAccount { id, pub_key })
}
