//! Engine configuration.
//!
//! Loaded from TOML at process start; every field has a default so an empty
//! file is a valid configuration.
//!
//! ```toml
//! fee_rate = "0.04"
//! max_active_games = 5
//! reconcile_interval_ms = 5000
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{FeeRate, Result, StakelineError, constants};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Fee charged on each side's stake. Applied to games created from now on.
    pub fee_rate: FeeRate,
    /// Cap on a single user's concurrently open games.
    pub max_active_games: usize,
    /// Deposit reconciliation cadence.
    pub reconcile_interval_ms: u64,
    /// How many recently confirmed transfers the reconciler remembers.
    pub confirmed_cache_size: usize,
    /// Capacity of the notification broadcast channel.
    pub notification_buffer: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fee_rate: FeeRate::from_bps(constants::DEFAULT_FEE_BPS).unwrap_or(FeeRate::ZERO),
            max_active_games: constants::DEFAULT_MAX_ACTIVE_GAMES,
            reconcile_interval_ms: constants::DEFAULT_RECONCILE_INTERVAL_MS,
            confirmed_cache_size: constants::DEFAULT_CONFIRMED_CACHE_SIZE,
            notification_buffer: constants::DEFAULT_NOTIFICATION_BUFFER,
        }
    }
}

impl EngineConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(source).map_err(|e| StakelineError::Configuration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.max_active_games == 0 {
            return Err(StakelineError::Configuration(
                "max_active_games must be > 0".into(),
            ));
        }
        if self.reconcile_interval_ms == 0 {
            return Err(StakelineError::Configuration(
                "reconcile_interval_ms must be > 0".into(),
            ));
        }
        if self.confirmed_cache_size == 0 {
            return Err(StakelineError::Configuration(
                "confirmed_cache_size must be > 0".into(),
            ));
        }
        if self.notification_buffer == 0 {
            return Err(StakelineError::Configuration(
                "notification_buffer must be > 0".into(),
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn reconcile_interval(&self) -> Duration {
        Duration::from_millis(self.reconcile_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn defaults() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.fee_rate.as_decimal(), Decimal::new(4, 2));
        assert_eq!(cfg.max_active_games, 5);
        assert_eq!(cfg.reconcile_interval(), Duration::from_secs(5));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn empty_toml_is_default() {
        let cfg = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(cfg, EngineConfig::default());
    }

    #[test]
    fn toml_overrides() {
        let cfg = EngineConfig::from_toml_str(
            r#"
            fee_rate = "0.025"
            max_active_games = 3
            reconcile_interval_ms = 1000
            "#,
        )
        .unwrap();
        assert_eq!(cfg.fee_rate.as_decimal(), Decimal::new(25, 3));
        assert_eq!(cfg.max_active_games, 3);
        assert_eq!(cfg.reconcile_interval_ms, 1000);
    }

    #[test]
    fn invalid_fee_rejected() {
        let err = EngineConfig::from_toml_str("fee_rate = \"1.2\"").unwrap_err();
        assert!(matches!(err, StakelineError::Configuration(_)));
    }

    #[test]
    fn zero_cap_rejected() {
        let err = EngineConfig::from_toml_str("max_active_games = 0").unwrap_err();
        assert!(format!("{err}").contains("max_active_games"));
    }

    #[test]
    fn unknown_keys_rejected() {
        assert!(EngineConfig::from_toml_str("fees = 1").is_err());
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = EngineConfig::load("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, StakelineError::Io(_)));
    }
}
