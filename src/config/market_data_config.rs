//! Market data configuration parsing from environment variables.
//!
//! Covers the price history provider, its endpoint and the candidate
//! universe used for recommendations.

use super::{EnvLookup, parse_var};
use anyhow::{Result, bail};
use std::str::FromStr;

pub const DEFAULT_CANDIDATES: &str = "TCS.NS,INFY.NS,RELIANCE.NS,HDFCBANK.NS,ICICIBANK.NS";

/// Which price history source to use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Yahoo,
    Mock,
}

impl FromStr for ProviderKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "yahoo" => Ok(ProviderKind::Yahoo),
            "mock" => Ok(ProviderKind::Mock),
            _ => bail!(
                "Invalid MARKET_DATA_PROVIDER: {}. Must be 'yahoo' or 'mock'",
                s
            ),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MarketDataEnvConfig {
    pub provider: ProviderKind,
    pub base_url: String,
    pub lookback_years: u32,
    pub fetch_timeout_secs: u64,
    pub candidate_symbols: Vec<String>,
}

impl MarketDataEnvConfig {
    pub fn from_lookup(lookup: &EnvLookup) -> Result<Self> {
        let provider = lookup("MARKET_DATA_PROVIDER")
            .unwrap_or_else(|| "yahoo".to_string())
            .parse::<ProviderKind>()?;

        let base_url = lookup("MARKET_DATA_URL")
            .unwrap_or_else(|| "https://query1.finance.yahoo.com".to_string())
            .trim_end_matches('/')
            .to_string();

        let lookback_years = parse_var(lookup, "LOOKBACK_YEARS", 2u32)?;
        if lookback_years == 0 {
            bail!("LOOKBACK_YEARS must be at least 1");
        }

        let candidate_symbols = parse_symbols(
            &lookup("CANDIDATE_SYMBOLS").unwrap_or_else(|| DEFAULT_CANDIDATES.to_string()),
        );
        if candidate_symbols.is_empty() {
            bail!("CANDIDATE_SYMBOLS must name at least one symbol");
        }

        Ok(Self {
            provider,
            base_url,
            lookback_years,
            fetch_timeout_secs: parse_var(lookup, "FETCH_TIMEOUT_SECS", 30u64)?,
            candidate_symbols,
        })
    }

    pub fn lookback_days(&self) -> u32 {
        self.lookback_years.saturating_mul(365)
    }
}

fn parse_symbols(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::lookup_from;

    #[test]
    fn test_market_data_defaults() {
        let config = MarketDataEnvConfig::from_lookup(&lookup_from(&[])).unwrap();
        assert_eq!(config.provider, ProviderKind::Yahoo);
        assert_eq!(config.base_url, "https://query1.finance.yahoo.com");
        assert_eq!(config.lookback_days(), 730);
        assert_eq!(config.fetch_timeout_secs, 30);
        assert_eq!(config.candidate_symbols.len(), 5);
        assert_eq!(config.candidate_symbols[0], "TCS.NS");
    }

    #[test]
    fn test_candidate_list_is_normalized() {
        let config = MarketDataEnvConfig::from_lookup(&lookup_from(&[
            ("CANDIDATE_SYMBOLS", " infy.ns, ,wipro.ns "),
            ("MARKET_DATA_PROVIDER", "MOCK"),
            ("MARKET_DATA_URL", "http://localhost:9000/"),
        ]))
        .unwrap();
        assert_eq!(config.candidate_symbols, vec!["INFY.NS", "WIPRO.NS"]);
        assert_eq!(config.provider, ProviderKind::Mock);
        assert_eq!(config.base_url, "http://localhost:9000");
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(
            MarketDataEnvConfig::from_lookup(&lookup_from(&[("MARKET_DATA_PROVIDER", "nse")]))
                .is_err()
        );
        assert!(
            MarketDataEnvConfig::from_lookup(&lookup_from(&[("LOOKBACK_YEARS", "0")])).is_err()
        );
        assert!(
            MarketDataEnvConfig::from_lookup(&lookup_from(&[("CANDIDATE_SYMBOLS", " , ")]))
                .is_err()
        );
    }
}
