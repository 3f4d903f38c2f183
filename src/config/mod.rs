//! Configuration module for Stockcast.
//!
//! Structured configuration loading from environment variables, organized
//! by concern: Market Data, Forecast and Persistence.

mod forecast_config;
mod market_data_config;
mod persistence_config;

pub use forecast_config::ForecastEnvConfig;
pub use market_data_config::{DEFAULT_CANDIDATES, MarketDataEnvConfig, ProviderKind};
pub use persistence_config::PersistenceEnvConfig;

use crate::application::forecasting::{ForecasterSettings, RankerSettings};
use anyhow::{Context, Result};
use std::env;
use std::str::FromStr;

/// Resolves a variable name to its raw value, if set.
pub type EnvLookup = dyn Fn(&str) -> Option<String>;

pub(crate) fn parse_var<T>(lookup: &EnvLookup, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .context(format!("Failed to parse {}", key)),
        None => Ok(default),
    }
}

/// Main application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub market_data: MarketDataEnvConfig,
    pub forecast: ForecastEnvConfig,
    pub persistence: PersistenceEnvConfig,
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(&|key: &str| env::var(key).ok())
    }

    pub fn from_lookup(lookup: &EnvLookup) -> Result<Self> {
        let market_data =
            MarketDataEnvConfig::from_lookup(lookup).context("Failed to load market data config")?;
        let forecast =
            ForecastEnvConfig::from_lookup(lookup).context("Failed to load forecast config")?;
        let persistence = PersistenceEnvConfig::from_lookup(lookup)
            .context("Failed to load persistence config")?;

        Ok(Self {
            market_data,
            forecast,
            persistence,
        })
    }

    pub fn forecaster_settings(&self) -> ForecasterSettings {
        ForecasterSettings {
            lookback_days: self.market_data.lookback_days(),
            model: self.forecast.model_config(),
            seed: None,
        }
    }

    pub fn ranker_settings(&self) -> RankerSettings {
        RankerSettings {
            candidates: self.market_data.candidate_symbols.clone(),
            lookback_days: self.market_data.lookback_days(),
            min_observations: self.forecast.ranker_min_observations,
            seed: self.forecast.ranker_seed,
        }
    }
}
