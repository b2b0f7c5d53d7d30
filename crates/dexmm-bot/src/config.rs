//! Application configuration.
//!
//! One `[[bots]]` entry per market. Values are read from a TOML file and
//! may be overridden by `DEXMM__`-prefixed environment variables.

use std::collections::HashSet;

use dexmm_core::{AssetInfo, Market};
use dexmm_mm::BasicMarketMakingConfig;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

pub const CONFIG_ENV_VAR: &str = "DEXMM_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";
const ENV_PREFIX: &str = "DEXMM";

/// Asset as configured for a market.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetConfig {
    pub id: u32,
    pub symbol: String,
    /// Atoms per conventional unit.
    #[serde(default = "default_unit_factor")]
    pub unit_factor: u64,
}

fn default_unit_factor() -> u64 {
    100_000_000
}

impl From<&AssetConfig> for AssetInfo {
    fn from(a: &AssetConfig) -> Self {
        AssetInfo::new(a.id, a.symbol.clone(), a.unit_factor)
    }
}

/// One market making bot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotConfig {
    /// Exchange host, e.g. "dex.example.org:7232".
    pub host: String,
    pub base: AssetConfig,
    pub quote: AssetConfig,
    /// Lot size in base atoms.
    pub lot_size: u64,
    /// Rate step in message-rate units.
    #[serde(default = "default_rate_step")]
    pub rate_step: u64,
    pub mm: BasicMarketMakingConfig,
}

fn default_rate_step() -> u64 {
    1
}

impl BotConfig {
    /// Market label for logs and errors, e.g. "dcr_btc@dex.example.org:7232".
    pub fn label(&self) -> String {
        format!(
            "{}_{}@{}",
            self.base.symbol.to_lowercase(),
            self.quote.symbol.to_lowercase(),
            self.host
        )
    }

    /// Build the live market context.
    pub fn market(&self) -> AppResult<Market> {
        Market::new(
            self.host.clone(),
            AssetInfo::from(&self.base),
            AssetInfo::from(&self.quote),
            self.lot_size,
            self.rate_step,
        )
        .map_err(|source| AppError::Market {
            market: self.label(),
            source,
        })
    }

    /// Validate the market making config, filling in defaults.
    pub fn validate(&mut self) -> AppResult<()> {
        self.market()?;
        self.mm
            .validate()
            .map_err(|source| AppError::MarketMaking {
                market: self.label(),
                source,
            })
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub bots: Vec<BotConfig>,
}

impl AppConfig {
    /// Config path: CLI arg > `DEXMM_CONFIG` > `config/default.toml`.
    pub fn resolve_path(cli: Option<String>) -> String {
        cli.or_else(|| std::env::var(CONFIG_ENV_VAR).ok())
            .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string())
    }

    /// Load from a TOML file with environment overrides.
    pub fn from_file(path: &str) -> AppResult<Self> {
        let settings = ::config::Config::builder()
            .add_source(::config::File::new(path, ::config::FileFormat::Toml))
            .add_source(
                ::config::Environment::default()
                    .separator("__")
                    .prefix(ENV_PREFIX),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Parse TOML without environment overrides.
    pub fn from_toml_str(s: &str) -> AppResult<Self> {
        toml::from_str(s).map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))
    }

    /// Validate every bot and reject two bots on the same market.
    pub fn validate(&mut self) -> AppResult<()> {
        let mut seen = HashSet::new();
        for bot in &mut self.bots {
            bot.validate()?;
            let key = (bot.host.clone(), bot.base.id, bot.quote.id);
            if !seen.insert(key) {
                return Err(AppError::DuplicateMarket(bot.label()));
            }
        }
        Ok(())
    }
}
