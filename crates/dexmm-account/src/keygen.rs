//! BIP-32 hierarchical deterministic key derivation (hardened children only).
//!
//! Account keys are derived from the wallet seed along a path that encodes
//! the exchange's public key, so the same seed yields an independent,
//! reproducible key per exchange.

use hmac::{Hmac, Mac};
use k256::elliptic_curve::PrimeField;
use k256::{FieldBytes, Scalar};
use sha2::Sha512;
use zeroize::Zeroizing;

use crate::error::KeyGenError;

type HmacSha512 = Hmac<Sha512>;

/// First hardened child index.
pub const HARDENED_KEY_START: u32 = 0x8000_0000;

const MASTER_HMAC_KEY: &[u8] = b"Bitcoin seed";
const MIN_SEED_BYTES: usize = 16;
const MAX_SEED_BYTES: usize = 64;

/// Extended private key: secret scalar plus chain code.
pub struct ExtendedKey {
    key: Zeroizing<[u8; 32]>,
    chain_code: Zeroizing<[u8; 32]>,
    depth: u8,
}

impl ExtendedKey {
    /// Master key from a wallet seed.
    pub fn new_master(seed: &[u8]) -> Result<Self, KeyGenError> {
        if !(MIN_SEED_BYTES..=MAX_SEED_BYTES).contains(&seed.len()) {
            return Err(KeyGenError::InvalidSeedLength(seed.len()));
        }
        let i = hmac_sha512(MASTER_HMAC_KEY, &[seed])?;
        let (il, ir) = i.split_at(32);
        // IL must be a valid nonzero scalar
        let k = parse_scalar(il)?;
        if k == Scalar::ZERO {
            return Err(KeyGenError::UnusableKey);
        }
        Ok(Self {
            key: to_array(il),
            chain_code: to_array(ir),
            depth: 0,
        })
    }

    /// Hardened child at `index` (must be >= [`HARDENED_KEY_START`]).
    pub fn derive_hardened(&self, index: u32) -> Result<Self, KeyGenError> {
        if index < HARDENED_KEY_START {
            return Err(KeyGenError::NotHardened(index));
        }

        // 0x00 || ser256(k) || ser32(i)
        let i = hmac_sha512(
            &self.chain_code[..],
            &[&[0u8][..], &self.key[..], &index.to_be_bytes()[..]],
        )?;
        let (il, ir) = i.split_at(32);

        let tweak = parse_scalar(il)?;
        let parent = parse_scalar(&self.key[..])?;
        let child = tweak + parent;
        if child == Scalar::ZERO {
            return Err(KeyGenError::UnusableKey);
        }

        let child_bytes: FieldBytes = child.to_bytes();
        Ok(Self {
            key: to_array(&child_bytes),
            chain_code: to_array(ir),
            depth: self.depth.saturating_add(1),
        })
    }

    /// Raw 32-byte private key.
    pub fn private_key(&self) -> &[u8; 32] {
        &self.key
    }

    pub fn chain_code(&self) -> &[u8; 32] {
        &self.chain_code
    }

    pub fn depth(&self) -> u8 {
        self.depth
    }
}

/// Derive the key at `path` from `seed`. Every index must be hardened.
pub fn gen_deep_child(seed: &[u8], path: &[u32]) -> Result<ExtendedKey, KeyGenError> {
    path.iter()
        .try_fold(ExtendedKey::new_master(seed)?, |key, &index| {
            key.derive_hardened(index)
        })
}

/// Map any index into the hardened range.
#[inline]
pub fn harden(index: u32) -> u32 {
    index % HARDENED_KEY_START + HARDENED_KEY_START
}

fn hmac_sha512(key: &[u8], parts: &[&[u8]]) -> Result<Zeroizing<[u8; 64]>, KeyGenError> {
    let mut mac =
        <HmacSha512 as Mac>::new_from_slice(key).map_err(|_| KeyGenError::UnusableKey)?;
    for part in parts {
        mac.update(part);
    }
    let mut out = Zeroizing::new([0u8; 64]);
    out.copy_from_slice(&mac.finalize().into_bytes());
    Ok(out)
}

fn parse_scalar(bytes: &[u8]) -> Result<Scalar, KeyGenError> {
    Option::<Scalar>::from(Scalar::from_repr(FieldBytes::clone_from_slice(bytes)))
        .ok_or(KeyGenError::UnusableKey)
}

fn to_array(bytes: &[u8]) -> Zeroizing<[u8; 32]> {
    let mut out = Zeroizing::new([0u8; 32]);
    out.copy_from_slice(bytes);
    out
}
