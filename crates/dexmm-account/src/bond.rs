//! Reputation, fidelity bonds and bonding settings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Account standing as reported by the exchange.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reputation {
    pub bonded_tier: i64,
    pub penalties: u16,
    pub score: i32,
}

impl Reputation {
    /// Tier after subtracting penalties. Below 1 the account cannot trade.
    pub fn effective_tier(&self) -> i64 {
        self.bonded_tier - i64::from(self.penalties)
    }
}

/// A fidelity bond posted to the exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bond {
    pub asset_id: u32,
    #[serde(with = "hex_bytes")]
    pub coin_id: Vec<u8>,
    pub amount: u64,
    /// When the bond output becomes refundable.
    pub lock_time: DateTime<Utc>,
    /// Tiers this bond is worth.
    pub strength: u32,
    pub confirmed: bool,
}

impl Bond {
    pub fn coin_id_hex(&self) -> String {
        hex::encode(&self.coin_id)
    }
}

/// Auto-bond maintenance settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BondOptions {
    pub bond_asset: u32,
    pub target_tier: u64,
    pub max_bonded_amt: u64,
    pub penalty_comps: u16,
}

/// A bond waiting for confirmations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingBondState {
    #[serde(rename = "coinID")]
    pub coin_id: String,
    #[serde(rename = "assetID")]
    pub asset_id: u32,
    pub confs: u32,
}

/// Snapshot of the account's bonding state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeAuth {
    pub rep: Reputation,
    #[serde(rename = "bondAssetID")]
    pub bond_asset_id: u32,
    /// Tiers in unconfirmed bonds.
    pub pending_strength: i64,
    /// Live tiers that expire within the next bond expiry window.
    pub weak_strength: i64,
    /// All active tiers, weak included.
    pub live_strength: i64,
    pub target_tier: u64,
    pub effective_tier: i64,
    pub max_bonded_amt: u64,
    pub penalty_comps: u16,
    pub pending_bonds: Vec<PendingBondState>,
    /// Expired but not yet refundable.
    pub expired_bonds: Vec<Bond>,
    /// Tiers locked beyond what the target tier needs.
    pub compensation: i64,
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(d)?;
        hex::decode(s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_tier() {
        let rep = Reputation {
            bonded_tier: 2,
            penalties: 1,
            score: 0,
        };
        assert_eq!(rep.effective_tier(), 1);

        let rep = Reputation {
            bonded_tier: 1,
            penalties: 3,
            score: -10,
        };
        assert_eq!(rep.effective_tier(), -2);
    }

    #[test]
    fn test_bond_json_coin_id_hex() {
        let bond = Bond {
            asset_id: 42,
            coin_id: vec![0xde, 0xad],
            amount: 1_000,
            lock_time: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
            strength: 1,
            confirmed: false,
        };
        let json = serde_json::to_value(&bond).unwrap();
        assert_eq!(json["coinId"], "dead");
        let back: Bond = serde_json::from_value(json).unwrap();
        assert_eq!(back, bond);
    }
}
