// 7.0 config.rs: all settings in one place. grant, staking rates, retries, market, missions.
// 7.1 presets per environment, validated before the engine starts.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::market::{MarketSettings, MAX_BAND_PPM, MAX_PRICE_SCALE};
use crate::staking::StakeRates;
use crate::types::Amount;

/** 7.2: optimistic-concurrency retry policy. bounded attempts, capped exponential backoff */
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    // Total tries including the first one
    pub max_attempts: u32,
    // Delay before the second try; doubles each time after
    pub base_backoff_ms: u64,
    // Ceiling for a single delay
    pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 8,
            base_backoff_ms: 1,
            max_backoff_ms: 50,
        }
    }
}

impl RetryPolicy {
    // delay to wait after `failed_attempts` conflicts (1-based)
    pub fn backoff(&self, failed_attempts: u32) -> Duration {
        let shift = failed_attempts.saturating_sub(1).min(20);
        let ms = self
            .base_backoff_ms
            .saturating_mul(1u64 << shift)
            .min(self.max_backoff_ms);
        Duration::from_millis(ms)
    }
}

// Mission behaviour
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissionPolicy {
    // Check the requirement against the journal before paying out.
    // false reproduces the old auto-complete behaviour.
    pub verify_requirements: bool,
}

impl Default for MissionPolicy {
    fn default() -> Self {
        Self {
            verify_requirements: true,
        }
    }
}

// The complete engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EconomyConfig {
    // Granted once per identity at first login
    pub starting_balance: Amount,
    pub staking: StakeRates,
    pub retry: RetryPolicy,
    pub market: MarketSettings,
    pub missions: MissionPolicy,
    // Rows on the leaderboard
    pub leaderboard_size: usize,
    // Default page size for transaction history
    pub history_limit: usize,
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            starting_balance: Amount::new(1_000_000_000), // $1 billion
            staking: StakeRates::default(),
            retry: RetryPolicy::default(),
            market: MarketSettings::default(),
            missions: MissionPolicy::default(),
            leaderboard_size: 20,
            history_limit: 50,
        }
    }
}

impl EconomyConfig {
    pub fn development() -> Self {
        Self::default()
    }

    // Deterministic and fast: no sleeping between retries, lots of them
    pub fn testing() -> Self {
        let mut config = Self::default();
        config.retry = RetryPolicy {
            max_attempts: 1_000,
            base_backoff_ms: 0,
            max_backoff_ms: 0,
        };
        config
    }

    pub fn production() -> Self {
        let mut config = Self::default();
        config.retry.max_attempts = 5;
        config.retry.base_backoff_ms = 5;
        config.retry.max_backoff_ms = 200;
        config.market.tick_interval_ms = 10_000;
        config
    }

    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    // Validate the configuration for internal consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.starting_balance.is_zero() {
            return Err(ConfigError::InvalidGrant {
                reason: "Starting balance must be positive".to_string(),
            });
        }

        // a stake must never pay back less than it locked
        let rates = [self.staking.day_bps, self.staking.week_bps, self.staking.month_bps];
        if rates.iter().any(|bps| *bps > 10_000) {
            return Err(ConfigError::InvalidStaking {
                reason: "Rate above 100%".to_string(),
            });
        }

        if self.retry.max_attempts == 0 {
            return Err(ConfigError::InvalidRetry {
                reason: "Need at least one attempt".to_string(),
            });
        }

        if self.retry.base_backoff_ms > self.retry.max_backoff_ms {
            return Err(ConfigError::InvalidRetry {
                reason: "Base backoff exceeds max backoff".to_string(),
            });
        }

        if self.market.tick_interval_ms <= 0 {
            return Err(ConfigError::InvalidMarket {
                reason: "Tick interval must be positive".to_string(),
            });
        }

        // bands at or above 100% could drive a price to zero in one tick
        if self.market.crypto_band_ppm > MAX_BAND_PPM || self.market.forex_band_ppm > MAX_BAND_PPM {
            return Err(ConfigError::InvalidMarket {
                reason: "Price band must be below 100%".to_string(),
            });
        }

        if self.market.price_scale > MAX_PRICE_SCALE {
            return Err(ConfigError::InvalidMarket {
                reason: "Price scale too large".to_string(),
            });
        }

        if self.leaderboard_size == 0 || self.history_limit == 0 {
            return Err(ConfigError::InvalidReadModel {
                reason: "Page sizes must be positive".to_string(),
            });
        }

        Ok(())
    }
}

// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid grant: {reason}")]
    InvalidGrant { reason: String },
    #[error("Invalid staking: {reason}")]
    InvalidStaking { reason: String },
    #[error("Invalid retry policy: {reason}")]
    InvalidRetry { reason: String },
    #[error("Invalid market: {reason}")]
    InvalidMarket { reason: String },
    #[error("Invalid read model: {reason}")]
    InvalidReadModel { reason: String },
    #[error("Config parse error: {0}")]
    Parse(String),
}

// Environment presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    Development,
    Testing,
    Production,
}

impl Environment {
    pub fn config(&self) -> EconomyConfig {
        match self {
            Environment::Development => EconomyConfig::development(),
            Environment::Testing => EconomyConfig::testing(),
            Environment::Production => EconomyConfig::production(),
        }
    }
}
