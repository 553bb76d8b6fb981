//! Bank configuration
//!
//! Process-wide settings for interest rates, accrual intervals and the
//! default credit limit. The configuration is loaded once at startup from a
//! JSON file (the key names match the original `config.json` layout) and
//! handed to components through a [`ConfigProvider`], which supports an
//! explicit reload instead of re-reading the file on every access.

use crate::types::BankError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tracing::warn;

/// How many cap-reset "days" fit into one accrual interval
///
/// The simulated day is `InterestCalculationIntervalSeconds / 30` of real
/// time; the child daily-spend counter resets on that cadence.
const DAYS_PER_ACCRUAL_INTERVAL: u32 = 30;

/// Interest, limit and interval settings
///
/// Field names serialize in PascalCase to stay compatible with the original
/// configuration file format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct BankConfig {
    /// Seconds between accrual ticks for interest-bearing accounts
    pub interest_calculation_interval_seconds: u64,

    /// Annual interest rate for saving and child-saving accounts
    pub savings_interest_rate: Decimal,

    /// Annual interest rate charged on overdrawn credit averages
    pub credit_interest_rate: Decimal,

    /// Interest-free period for credit accounts
    ///
    /// Carried as configuration state; the accrual rules of this design do
    /// not consume it.
    pub credit_grace_period_seconds: u64,

    /// Default maximum debit for credit accounts without an explicit limit
    pub spending_limit: Decimal,
}

impl Default for BankConfig {
    fn default() -> Self {
        BankConfig {
            interest_calculation_interval_seconds: 30,
            savings_interest_rate: Decimal::new(3, 2),
            credit_interest_rate: Decimal::new(12, 2),
            credit_grace_period_seconds: 60,
            spending_limit: Decimal::new(1000, 0),
        }
    }
}

impl BankConfig {
    /// Load the configuration from `path`
    ///
    /// A missing file is created with the default values so the deployment
    /// has something to edit. An unreadable or unparsable file falls back to
    /// the defaults with a warning. Non-positive interval, grace period or
    /// spending limit values are individually replaced by their defaults.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            let config = BankConfig::default();
            if let Err(e) = config.write(path) {
                warn!("could not write default configuration to {}: {}", path.display(), e);
            }
            return config;
        }

        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("could not read {}: {}; using default configuration", path.display(), e);
                return BankConfig::default();
            }
        };

        match serde_json::from_str::<BankConfig>(&raw) {
            Ok(config) => config.sanitized(),
            Err(e) => {
                warn!("could not parse {}: {}; using default configuration", path.display(), e);
                BankConfig::default()
            }
        }
    }

    /// Write the configuration as pretty-printed JSON
    pub fn write(&self, path: &Path) -> Result<(), BankError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Replace invalid values with their defaults
    fn sanitized(mut self) -> Self {
        let defaults = BankConfig::default();
        if self.interest_calculation_interval_seconds == 0 {
            self.interest_calculation_interval_seconds =
                defaults.interest_calculation_interval_seconds;
        }
        if self.credit_grace_period_seconds == 0 {
            self.credit_grace_period_seconds = defaults.credit_grace_period_seconds;
        }
        if self.spending_limit <= Decimal::ZERO {
            self.spending_limit = defaults.spending_limit;
        }
        self
    }

    /// The accrual tick period
    pub fn accrual_interval(&self) -> Duration {
        Duration::from_secs(self.interest_calculation_interval_seconds)
    }

    /// The child daily-cap reset period (one simulated day)
    pub fn cap_reset_interval(&self) -> Duration {
        Duration::from_secs_f64(
            self.interest_calculation_interval_seconds as f64 / DAYS_PER_ACCRUAL_INTERVAL as f64,
        )
    }
}

/// Read access to the active configuration
///
/// Holds the configuration loaded at startup and hands out cheap `Arc`
/// snapshots. `reload` re-reads the backing file on request; between calls
/// every reader sees one consistent snapshot.
pub struct ConfigProvider {
    path: Option<PathBuf>,
    current: RwLock<Arc<BankConfig>>,
}

impl ConfigProvider {
    /// Provider over a fixed configuration with no backing file
    pub fn fixed(config: BankConfig) -> Self {
        ConfigProvider {
            path: None,
            current: RwLock::new(Arc::new(config)),
        }
    }

    /// Provider backed by a configuration file
    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let config = BankConfig::load(&path);
        ConfigProvider {
            path: Some(path),
            current: RwLock::new(Arc::new(config)),
        }
    }

    /// The active configuration snapshot
    pub fn current(&self) -> Arc<BankConfig> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Re-read the backing file, replacing the active snapshot
    ///
    /// A no-op for fixed providers.
    pub fn reload(&self) {
        let Some(path) = &self.path else {
            return;
        };
        let config = BankConfig::load(path);
        let mut current = self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *current = Arc::new(config);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = BankConfig::default();
        assert_eq!(config.interest_calculation_interval_seconds, 30);
        assert_eq!(config.savings_interest_rate, Decimal::new(3, 2));
        assert_eq!(config.credit_interest_rate, Decimal::new(12, 2));
        assert_eq!(config.credit_grace_period_seconds, 60);
        assert_eq!(config.spending_limit, Decimal::new(1000, 0));
    }

    #[test]
    fn test_load_missing_file_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let config = BankConfig::load(&path);

        assert_eq!(config, BankConfig::default());
        assert!(path.exists());

        // The written file round-trips
        let reloaded = BankConfig::load(&path);
        assert_eq!(reloaded, config);
    }

    #[test]
    fn test_load_parses_pascal_case_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{
                "InterestCalculationIntervalSeconds": 60,
                "SavingsInterestRate": 0.05,
                "CreditInterestRate": 0.2,
                "CreditGracePeriodSeconds": 120,
                "SpendingLimit": 2500
            }"#,
        )
        .unwrap();

        let config = BankConfig::load(&path);
        assert_eq!(config.interest_calculation_interval_seconds, 60);
        assert_eq!(config.savings_interest_rate, Decimal::new(5, 2));
        assert_eq!(config.credit_interest_rate, Decimal::new(2, 1));
        assert_eq!(config.credit_grace_period_seconds, 120);
        assert_eq!(config.spending_limit, Decimal::new(2500, 0));
    }

    #[test]
    fn test_load_sanitizes_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{
                "InterestCalculationIntervalSeconds": 0,
                "CreditGracePeriodSeconds": 0,
                "SpendingLimit": -5
            }"#,
        )
        .unwrap();

        let config = BankConfig::load(&path);
        let defaults = BankConfig::default();
        assert_eq!(
            config.interest_calculation_interval_seconds,
            defaults.interest_calculation_interval_seconds
        );
        assert_eq!(
            config.credit_grace_period_seconds,
            defaults.credit_grace_period_seconds
        );
        assert_eq!(config.spending_limit, defaults.spending_limit);
    }

    #[test]
    fn test_load_malformed_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "not json at all").unwrap();

        let config = BankConfig::load(&path);
        assert_eq!(config, BankConfig::default());
    }

    #[test]
    fn test_missing_keys_use_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "SavingsInterestRate": 0.07 }"#).unwrap();

        let config = BankConfig::load(&path);
        assert_eq!(config.savings_interest_rate, Decimal::new(7, 2));
        assert_eq!(config.interest_calculation_interval_seconds, 30);
    }

    #[test]
    fn test_cap_reset_interval_is_one_thirtieth() {
        let config = BankConfig::default();
        assert_eq!(config.cap_reset_interval(), Duration::from_secs(1));

        let config = BankConfig {
            interest_calculation_interval_seconds: 60,
            ..BankConfig::default()
        };
        assert_eq!(config.cap_reset_interval(), Duration::from_secs(2));
    }

    #[test]
    fn test_provider_reload_picks_up_changes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "SpendingLimit": 500 }"#).unwrap();

        let provider = ConfigProvider::from_file(&path);
        assert_eq!(provider.current().spending_limit, Decimal::new(500, 0));

        std::fs::write(&path, r#"{ "SpendingLimit": 750 }"#).unwrap();
        provider.reload();
        assert_eq!(provider.current().spending_limit, Decimal::new(750, 0));
    }

    #[test]
    fn test_fixed_provider_ignores_reload() {
        let provider = ConfigProvider::fixed(BankConfig::default());
        provider.reload();
        assert_eq!(*provider.current(), BankConfig::default());
    }
}
