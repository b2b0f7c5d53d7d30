//! dexmm bot application.
//!
//! - `AppConfig`: per-market bot settings loaded from TOML and the environment
//! - `derive_account`: offline derivation of an exchange account identity

pub mod account;
pub mod config;
pub mod error;

pub use crate::account::{derive_account, DerivedAccount};
pub use crate::config::{AppConfig, AssetConfig, BotConfig};
pub use crate::error::{AppError, AppResult};
