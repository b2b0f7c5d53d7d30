//! dexmm bot - Entry Point

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use zeroize::Zeroizing;

use dexmm_bot::{derive_account, AppConfig};

/// dexmm market making bot
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via DEXMM_CONFIG env var)
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load and validate every bot configuration
    Validate,

    /// Derive the account identity for an exchange from a wallet seed
    DeriveAccount {
        /// Wallet seed, hex encoded
        #[arg(long)]
        seed_hex: String,

        /// Exchange public key, hex encoded SEC1
        #[arg(long)]
        dex_pubkey: String,

        /// Account key index
        #[arg(long, default_value_t = 0)]
        index: u32,

        /// Exchange host
        #[arg(long, default_value = "localhost")]
        host: String,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    dexmm_telemetry::init_logging()?;

    info!("Starting dexmm-bot v{}", env!("CARGO_PKG_VERSION"));

    match args.command {
        Command::Validate => validate(args.config),
        Command::DeriveAccount {
            seed_hex,
            dex_pubkey,
            index,
            host,
        } => {
            let seed = Zeroizing::new(hex::decode(seed_hex.trim()).context("Invalid seed hex")?);
            let dex_pk = hex::decode(dex_pubkey.trim()).context("Invalid exchange pubkey hex")?;
            let derived = derive_account(&seed, &dex_pk, index, &host)?;
            println!("account_id: {}", derived.id);
            println!("pub_key: {}", hex::encode(&derived.pub_key));
            Ok(())
        }
    }
}

fn validate(config: Option<String>) -> Result<()> {
    let config_path = AppConfig::resolve_path(config);
    info!(config_path = %config_path, "Loading configuration");

    let mut config = AppConfig::from_file(&config_path)?;
    config.validate()?;

    for bot in &config.bots {
        let market = bot.market()?;
        info!(
            market = %market,
            strategy = %bot.mm.gap_strategy,
            lot_size = %market.fmt_base(market.lot_size()),
            rate_step = bot.rate_step,
            buys = bot.mm.buy_placements.len(),
            sells = bot.mm.sell_placements.len(),
            drift_tolerance = bot.mm.drift_tolerance,
            "Bot config valid"
        );
    }
    info!(bots = config.bots.len(), "Configuration valid");
    Ok(())
}
