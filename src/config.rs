use chrono::Weekday;
use std::str::FromStr;
use thiserror::Error;

use crate::models::{DataInterval, Moneyness};

/// Fatal to the whole run; surfaced before any trade is processed.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid weekday for {field}: {value:?}")]
    InvalidWeekday { field: &'static str, value: String },
    #[error("{field} must be a trading day (Monday..Friday), got {value}")]
    WeekendWeekday { field: &'static str, value: Weekday },
    #[error("invalid moneyness mode: {0:?}")]
    InvalidMoneyness(String),
    #[error("invalid data interval: {0:?} (expected 1minute or 5minute)")]
    InvalidInterval(String),
    #[error("lot size must be at least 1")]
    InvalidLotSize,
    #[error("max concurrency must be at least 1")]
    InvalidConcurrency,
    #[error("UPSTOX_ACCESS_TOKEN is required for the live gateway")]
    MissingAccessToken,
}

/// Process-wide run configuration. Read once per run and passed by reference;
/// never mutated while a backtest is in flight.
#[derive(Debug, Clone)]
pub struct Config {
    // Instrument
    pub underlying: String,
    pub lot_size: u32,

    // Contract selection
    pub expiry_weekday: Weekday,
    pub rollover_weekday: Weekday,
    pub moneyness: Moneyness,

    // Market data
    pub interval: DataInterval,
    pub access_token: String,

    // Engine
    pub max_concurrent: usize,

    // Logging
    pub log_level: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let env = |key: &str, default: &str| -> String {
            std::env::var(key).unwrap_or_else(|_| default.to_string())
        };

        let expiry_weekday = parse_weekday("expiry weekday", &env("EXPIRY_WEEKDAY", "Thursday"))?;
        let rollover_weekday =
            parse_weekday("rollover weekday", &env("ROLLOVER_WEEKDAY", "Wednesday"))?;

        let moneyness_raw = env("MONEYNESS_MODE", "ATM");
        let moneyness = Moneyness::from_str_loose(&moneyness_raw)
            .ok_or(ConfigError::InvalidMoneyness(moneyness_raw))?;

        let interval_raw = env("DATA_INTERVAL", "1minute");
        let interval = DataInterval::from_str_loose(&interval_raw)
            .ok_or(ConfigError::InvalidInterval(interval_raw))?;

        let cfg = Config {
            underlying: env("UNDERLYING", "NSE_INDEX|Nifty 50"),
            lot_size: env("LOT_SIZE", "75").parse().unwrap_or(75),
            expiry_weekday,
            rollover_weekday,
            moneyness,
            interval,
            access_token: env("UPSTOX_ACCESS_TOKEN", ""),
            max_concurrent: env("MAX_CONCURRENT", "4").parse().unwrap_or(4),
            log_level: env("LOG_LEVEL", "info"),
        };

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.lot_size < 1 {
            return Err(ConfigError::InvalidLotSize);
        }
        if self.max_concurrent < 1 {
            return Err(ConfigError::InvalidConcurrency);
        }
        Ok(())
    }

    /// Extra check for runs against the live Upstox gateway.
    pub fn validate_live(&self) -> Result<(), ConfigError> {
        self.validate()?;
        if self.access_token.is_empty() {
            return Err(ConfigError::MissingAccessToken);
        }
        Ok(())
    }
}

fn parse_weekday(field: &'static str, value: &str) -> Result<Weekday, ConfigError> {
    let day = Weekday::from_str(value).map_err(|_| ConfigError::InvalidWeekday {
        field,
        value: value.to_string(),
    })?;
    // Options expire and roll over on trading days only.
    if day.num_days_from_monday() > 4 {
        return Err(ConfigError::WeekendWeekday { field, value: day });
    }
    Ok(day)
}
