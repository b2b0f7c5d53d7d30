//! Per-exchange account identity.
//!
//! `DexAccount` keeps two independently locked groups of state:
//! - key group: encrypted key, decrypted signing key, account ID, view-only flag
//! - auth group: login status, reputation, bonds and bond settings
//!
//! No method holds both locks at once.

use std::fmt;

use alloy::primitives::B256;
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::SignerSync;
use chrono::{DateTime, Duration, Utc};
use k256::ecdsa::signature::Verifier;
use k256::ecdsa::{Signature, VerifyingKey};
use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::bond::{Bond, BondOptions, ExchangeAuth, PendingBondState, Reputation};
use crate::crypter::Crypter;
use crate::error::{AccountError, AccountResult};
use crate::keygen::{self, harden, HARDENED_KEY_START};

/// Purpose index for exchange account keys: hardened "dex" (0x646578).
pub const HD_KEY_PURPOSE_ACCTS: u32 = HARDENED_KEY_START + 0x0064_6578;

const COMPRESSED_PUBKEY_LEN: usize = 33;

/// Account identifier: SHA-256 of the compressed account public key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct AccountId(pub [u8; 32]);

impl AccountId {
    pub fn from_pub_key(pub_key: &[u8]) -> Self {
        Self(Sha256::digest(pub_key).into())
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// Persisted account record used to construct a [`DexAccount`].
#[derive(Debug, Clone)]
pub struct AccountInfo {
    pub host: String,
    /// TLS certificate, empty if the host uses a public CA.
    pub cert: Vec<u8>,
    /// Exchange public key (SEC1 encoded).
    pub dex_pub_key: Vec<u8>,
    /// Encrypted account private key, empty before key setup.
    pub enc_key: Vec<u8>,
    pub disabled: bool,
    pub bond_options: BondOptions,
    /// Server bond expiry: a bond stops counting this long before its lock time.
    pub bond_expiry: Duration,
}

/// Credentials holding the encrypted wallet seed.
#[derive(Debug, Clone)]
pub struct PrimaryCredentials {
    pub enc_seed: Vec<u8>,
}

struct KeyState {
    view_only: bool,
    enc_key: Vec<u8>,
    /// Decrypted signing key. The underlying secret is zeroized on drop.
    signer: Option<PrivateKeySigner>,
    id: AccountId,
}

#[derive(Default)]
struct AuthState {
    is_authed: bool,
    disabled: bool,
    /// Confirmation counts of pending bonds, by hex coin ID.
    pending_bond_confs: std::collections::HashMap<String, u32>,
    pending_bonds: Vec<Bond>,
    bonds: Vec<Bond>,
    expired_bonds: Vec<Bond>,
    rep: Reputation,
    target_tier: u64,
    max_bonded_amt: u64,
    penalty_comps: u16,
    bond_asset: u32,
}

/// Client account at one exchange host.
pub struct DexAccount {
    host: String,
    cert: Vec<u8>,
    dex_pub_key: Vec<u8>,
    bond_expiry: Duration,

    keys: RwLock<KeyState>,
    auth: RwLock<AuthState>,
}

impl DexAccount {
    pub fn new(info: AccountInfo, view_only: bool) -> Self {
        let opts = info.bond_options;
        Self {
            host: info.host,
            cert: info.cert,
            dex_pub_key: info.dex_pub_key,
            bond_expiry: info.bond_expiry,
            keys: RwLock::new(KeyState {
                view_only,
                enc_key: info.enc_key,
                signer: None,
                id: AccountId::default(),
            }),
            auth: RwLock::new(AuthState {
                disabled: info.disabled,
                target_tier: opts.target_tier,
                max_bonded_amt: opts.max_bonded_amt,
                penalty_comps: opts.penalty_comps,
                bond_asset: opts.bond_asset,
                ..Default::default()
            }),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn cert(&self) -> &[u8] {
        &self.cert
    }

    // ---- key group ----

    /// Derive the account key for `key_index` from the wallet seed.
    ///
    /// The derivation path encodes the exchange public key, so the result
    /// is unique per exchange and reproducible from the seed alone.
    pub fn setup_crypto(
        &self,
        creds: &PrimaryCredentials,
        crypter: &dyn Crypter,
        key_index: u32,
    ) -> AccountResult<()> {
        if key_index >= HARDENED_KEY_START {
            return Err(AccountError::KeyIndexExhausted(key_index));
        }

        let seed = crypter
            .decrypt(&creds.enc_seed)
            .map_err(AccountError::SeedDecrypt)?;

        let dex_pk = self.dex_pub_key_compressed()?;
        let path = account_key_path(&dex_pk, key_index);
        let ext_key = keygen::gen_deep_child(&seed, &path)?;
        drop(seed);

        let signer = signer_from_bytes(ext_key.private_key())?;
        let enc_key = crypter.encrypt(ext_key.private_key())?;
        let id = AccountId::from_pub_key(&compressed_pub_key(&signer));

        {
            let mut keys = self.keys.write();
            keys.enc_key = enc_key;
            keys.signer = Some(signer);
            keys.id = id;
            keys.view_only = false;
        }

        info!(host = %self.host, account_id = %id, key_index, "Account key derived");
        Ok(())
    }

    /// Decrypt the account key.
    pub fn unlock(&self, crypter: &dyn Crypter) -> AccountResult<()> {
        let enc_key = self.keys.read().enc_key.clone();
        let key_bytes = crypter.decrypt(&enc_key)?;
        let signer = signer_from_bytes(&key_bytes)?;
        let id = AccountId::from_pub_key(&compressed_pub_key(&signer));

        {
            let mut keys = self.keys.write();
            keys.signer = Some(signer);
            keys.id = id;
        }

        debug!(host = %self.host, account_id = %id, "Account unlocked");
        Ok(())
    }

    /// Drop the decrypted account key.
    pub fn lock(&self) {
        self.keys.write().signer = None;
        debug!(host = %self.host, "Account locked");
    }

    pub fn id(&self) -> AccountId {
        self.keys.read().id
    }

    /// True unless account keys have been generated.
    pub fn is_view_only(&self) -> bool {
        self.keys.read().view_only
    }

    /// `(initialized, unlocked)`: an encrypted key exists, and it is decrypted.
    pub fn status(&self) -> (bool, bool) {
        let keys = self.keys.read();
        (!keys.enc_key.is_empty(), keys.signer.is_some())
    }

    /// True if the key is not decrypted, including before key setup.
    pub fn locked(&self) -> bool {
        self.keys.read().signer.is_none()
    }

    /// Compressed account public key, `None` while locked.
    pub fn pub_key(&self) -> Option<Vec<u8>> {
        self.keys.read().signer.as_ref().map(compressed_pub_key)
    }

    /// Encrypted account key, empty before key setup.
    pub fn enc_key(&self) -> Vec<u8> {
        self.keys.read().enc_key.clone()
    }

    /// Sign `msg` with the account key.
    ///
    /// Returns a 65-byte recoverable signature `r || s || v` over
    /// SHA-256(msg).
    pub fn sign(&self, msg: &[u8]) -> AccountResult<Vec<u8>> {
        let keys = self.keys.read();
        let signer = keys.signer.as_ref().ok_or(AccountError::AccountLocked)?;
        let digest = B256::from_slice(&Sha256::digest(msg));
        let sig = signer
            .sign_hash_sync(&digest)
            .map_err(|e| AccountError::Signing(e.to_string()))?;
        Ok(sig.as_bytes().to_vec())
    }

    /// Verify a signature by the exchange over `msg`.
    ///
    /// Accepts 64-byte `r || s`, 65-byte `r || s || v`, or DER encodings.
    pub fn check_sig(&self, msg: &[u8], sig: &[u8]) -> AccountResult<()> {
        if msg.is_empty() {
            return Err(AccountError::NoMessage);
        }
        if sig.is_empty() {
            return Err(AccountError::NoSignature);
        }
        let vk = VerifyingKey::from_sec1_bytes(&self.dex_pub_key)
            .map_err(|e| AccountError::InvalidDexPubKey(e.to_string()))?;

        let parsed = parse_signature(sig)?;

        vk.verify(msg, &parsed)
            .map_err(|e| AccountError::InvalidSignature(e.to_string()))
    }

    fn dex_pub_key_compressed(&self) -> AccountResult<[u8; COMPRESSED_PUBKEY_LEN]> {
        let vk = VerifyingKey::from_sec1_bytes(&self.dex_pub_key)
            .map_err(|e| AccountError::InvalidDexPubKey(e.to_string()))?;
        let point = vk.to_encoded_point(true);
        point.as_bytes().try_into().map_err(|_| {
            AccountError::InvalidDexPubKey(format!(
                "invalid dex pubkey length {}",
                point.as_bytes().len()
            ))
        })
    }

    // ---- auth group ----

    /// True once the exchange accepted our login.
    pub fn authed(&self) -> bool {
        self.auth.read().is_authed
    }

    /// Record a successful login and the reputation it reported.
    pub fn set_authed(&self, rep: Reputation) {
        let mut auth = self.auth.write();
        auth.is_authed = true;
        auth.rep = rep;
    }

    pub fn un_auth(&self) {
        self.auth.write().is_authed = false;
    }

    pub fn reputation(&self) -> Reputation {
        self.auth.read().rep
    }

    /// True if the effective tier as of the latest login is below 1.
    pub fn suspended(&self) -> bool {
        self.auth.read().rep.effective_tier() < 1
    }

    pub fn is_disabled(&self) -> bool {
        self.auth.read().disabled
    }

    pub fn toggle_account_status(&self, disable: bool) {
        self.auth.write().disabled = disable;
    }

    pub fn bond_options(&self) -> BondOptions {
        let auth = self.auth.read();
        BondOptions {
            bond_asset: auth.bond_asset,
            target_tier: auth.target_tier,
            max_bonded_amt: auth.max_bonded_amt,
            penalty_comps: auth.penalty_comps,
        }
    }

    pub fn set_bond_options(&self, opts: BondOptions) {
        let mut auth = self.auth.write();
        auth.bond_asset = opts.bond_asset;
        auth.target_tier = opts.target_tier;
        auth.max_bonded_amt = opts.max_bonded_amt;
        auth.penalty_comps = opts.penalty_comps;
    }

    /// Track a newly posted, unconfirmed bond.
    pub fn add_pending_bond(&self, mut bond: Bond) {
        bond.confirmed = false;
        let mut auth = self.auth.write();
        auth.pending_bond_confs.insert(bond.coin_id_hex(), 0);
        auth.pending_bonds.push(bond);
    }

    /// Update the confirmation count of a pending bond. Returns false if
    /// no pending bond has `coin_id`.
    pub fn set_pending_bond_confs(&self, coin_id: &[u8], confs: u32) -> bool {
        let key = hex::encode(coin_id);
        let mut auth = self.auth.write();
        if !auth.pending_bonds.iter().any(|b| b.coin_id == coin_id) {
            return false;
        }
        auth.pending_bond_confs.insert(key, confs);
        true
    }

    /// Move a pending bond to the active set.
    pub fn confirm_bond(&self, coin_id: &[u8]) -> bool {
        let mut auth = self.auth.write();
        let Some(pos) = auth.pending_bonds.iter().position(|b| b.coin_id == coin_id) else {
            return false;
        };
        let mut bond = auth.pending_bonds.remove(pos);
        auth.pending_bond_confs.remove(&bond.coin_id_hex());
        bond.confirmed = true;
        info!(
            host = %self.host,
            coin_id = %bond.coin_id_hex(),
            strength = bond.strength,
            "Bond confirmed"
        );
        auth.bonds.push(bond);
        true
    }

    /// Move active bonds whose expiry has passed to the expired set.
    ///
    /// A bond expires `bond_expiry` before its lock time. Returns the number
    /// of bonds moved.
    pub fn expire_bonds(&self, now: DateTime<Utc>) -> usize {
        let expiry = self.bond_expiry;
        let mut auth = self.auth.write();
        let (expired, live): (Vec<Bond>, Vec<Bond>) = std::mem::take(&mut auth.bonds)
            .into_iter()
            .partition(|b| b.lock_time - expiry <= now);
        auth.bonds = live;
        let n = expired.len();
        auth.expired_bonds.extend(expired);
        if n > 0 {
            debug!(host = %self.host, expired = n, "Bonds expired");
        }
        n
    }

    /// Forget an expired bond once it has been refunded.
    pub fn refund_bond(&self, coin_id: &[u8]) -> Option<Bond> {
        let mut auth = self.auth.write();
        let pos = auth.expired_bonds.iter().position(|b| b.coin_id == coin_id)?;
        Some(auth.expired_bonds.remove(pos))
    }

    /// Bonding state snapshot.
    ///
    /// Weak strength counts live bonds that will expire within the next
    /// `bond_expiry` window.
    pub fn exchange_auth(&self, now: DateTime<Utc>) -> ExchangeAuth {
        let weak_cutoff = now + self.bond_expiry;
        let expiry = self.bond_expiry;
        let auth = self.auth.read();

        let sum = |bonds: &[Bond]| bonds.iter().map(|b| i64::from(b.strength)).sum::<i64>();
        let live_strength = sum(&auth.bonds);
        let pending_strength = sum(&auth.pending_bonds);
        let weak_strength = auth
            .bonds
            .iter()
            .filter(|b| b.lock_time - expiry <= weak_cutoff)
            .map(|b| i64::from(b.strength))
            .sum::<i64>();

        let pending_bonds = auth
            .pending_bonds
            .iter()
            .map(|b| {
                let coin_id = b.coin_id_hex();
                PendingBondState {
                    confs: auth.pending_bond_confs.get(&coin_id).copied().unwrap_or(0),
                    coin_id,
                    asset_id: b.asset_id,
                }
            })
            .collect();

        let target_tier = i64::try_from(auth.target_tier).unwrap_or(i64::MAX);

        ExchangeAuth {
            rep: auth.rep,
            bond_asset_id: auth.bond_asset,
            pending_strength,
            weak_strength,
            live_strength,
            target_tier: auth.target_tier,
            effective_tier: auth.rep.effective_tier(),
            max_bonded_amt: auth.max_bonded_amt,
            penalty_comps: auth.penalty_comps,
            pending_bonds,
            expired_bonds: auth.expired_bonds.clone(),
            compensation: live_strength.saturating_sub(target_tier),
        }
    }
}

impl fmt::Debug for DexAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DexAccount")
            .field("host", &self.host)
            .field("id", &self.id())
            .finish_non_exhaustive()
    }
}

/// Child indices for the account key of `key_index` at the exchange with
/// compressed public key `dex_pk`.
///
/// Path: purpose, format byte, eight little-endian words of the key body,
/// key index. Every index is hardened.
pub fn account_key_path(dex_pk: &[u8; COMPRESSED_PUBKEY_LEN], key_index: u32) -> Vec<u32> {
    let mut kids = Vec::with_capacity(11);
    kids.push(HD_KEY_PURPOSE_ACCTS);
    kids.push(u32::from(dex_pk[0]));
    kids.extend(
        dex_pk[1..]
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]])),
    );
    kids.push(key_index);
    kids.into_iter().map(harden).collect()
}

fn signer_from_bytes(bytes: &[u8]) -> AccountResult<PrivateKeySigner> {
    PrivateKeySigner::from_slice(bytes).map_err(|e| AccountError::InvalidKey(e.to_string()))
}

fn compressed_pub_key(signer: &PrivateKeySigner) -> Vec<u8> {
    signer
        .credential()
        .verifying_key()
        .to_encoded_point(true)
        .as_bytes()
        .to_vec()
}

/// Parse a DER signature, or a 64/65-byte `r || s [|| v]` if it is not DER.
fn parse_signature(sig: &[u8]) -> AccountResult<Signature> {
    let parsed = match Signature::from_der(sig) {
        Ok(parsed) => parsed,
        Err(_) if matches!(sig.len(), 64 | 65) => Signature::from_slice(&sig[..64])
            .map_err(|e| AccountError::InvalidSignature(e.to_string()))?,
        Err(e) => return Err(AccountError::InvalidSignature(e.to_string())),
    };
    Ok(parsed.normalize_s().unwrap_or(parsed))
}
