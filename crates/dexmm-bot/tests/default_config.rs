//! Loads the shipped default configuration.

use dexmm_bot::AppConfig;
use dexmm_mm::GapStrategy;

fn default_config_path() -> String {
    format!("{}/../../config/default.toml", env!("CARGO_MANIFEST_DIR"))
}

#[test]
fn test_default_config_is_valid() {
    let mut config = AppConfig::from_file(&default_config_path()).unwrap();
    config.validate().unwrap();

    assert_eq!(config.bots.len(), 2);
    assert_eq!(config.bots[0].mm.gap_strategy, GapStrategy::PercentPlus);
    assert_eq!(config.bots[1].mm.gap_strategy, GapStrategy::Multiplier);
    // omitted drift tolerance takes the default
    assert_eq!(config.bots[1].mm.drift_tolerance, 0.001);

    let market = config.bots[1].market().unwrap();
    assert_eq!(market.name(), "dcr_eth");
    assert_eq!(market.lot_size(), 1_000_000_000);
}
