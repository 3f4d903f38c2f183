//! Statistical forward-return ranking across the candidate universe.
//!
//! No model is trained here. Each symbol's predicted daily return is a
//! single draw from `Normal(mean, std / 2)` of its historical daily returns,
//! compounded over the horizon. Results differ between calls unless the
//! ranker is seeded.

use crate::domain::errors::ForecastError;
use crate::domain::forecast::RecommendationEntry;
use crate::domain::market::price_series::PriceSeries;
use crate::domain::ports::PriceHistoryProvider;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution as _, Normal};
use statrs::statistics::{Data, Distribution};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct RankerSettings {
    pub candidates: Vec<String>,
    pub lookback_days: u32,
    /// Symbols with fewer closes than this are skipped.
    pub min_observations: usize,
    pub seed: Option<u64>,
}

impl Default for RankerSettings {
    fn default() -> Self {
        Self {
            candidates: Vec::new(),
            lookback_days: 365 * 2,
            min_observations: 10,
            seed: None,
        }
    }
}

pub struct RecommendationRanker {
    provider: Arc<dyn PriceHistoryProvider>,
    settings: RankerSettings,
    rng: Mutex<StdRng>,
}

impl RecommendationRanker {
    pub fn new(provider: Arc<dyn PriceHistoryProvider>, settings: RankerSettings) -> Self {
        let rng = match settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        Self {
            provider,
            settings,
            rng: Mutex::new(rng),
        }
    }

    pub fn candidates(&self) -> &[String] {
        &self.settings.candidates
    }

    /// Rank every candidate by expected profit on `investment_amount` held
    /// for `horizon_days`, best first.
    ///
    /// Symbols without usable data are skipped; if none survive the result
    /// is empty rather than an error.
    pub async fn recommend(
        &self,
        investment_amount: f64,
        horizon_days: u32,
    ) -> Result<Vec<RecommendationEntry>, ForecastError> {
        validate_request(investment_amount, horizon_days)?;

        let mut histories = Vec::with_capacity(self.settings.candidates.len());
        for symbol in &self.settings.candidates {
            match self
                .provider
                .fetch_daily_closes(symbol, self.settings.lookback_days)
                .await
            {
                Ok(series) if series.len() >= self.settings.min_observations => {
                    histories.push(series)
                }
                Ok(series) => warn!(
                    "RecommendationRanker: skipping {}, only {} closes (need {})",
                    symbol,
                    series.len(),
                    self.settings.min_observations
                ),
                Err(e) => warn!("RecommendationRanker: skipping {}: {}", symbol, e),
            }
        }

        let entries: Vec<RecommendationEntry> = {
            let mut rng = match self.rng.lock() {
                Ok(guard) => guard,
                Err(poisoned) => {
                    warn!("RecommendationRanker: rng lock poisoned, recovering");
                    poisoned.into_inner()
                }
            };
            histories
                .iter()
                .filter_map(|series| {
                    project_entry(series, investment_amount, horizon_days, &mut *rng)
                })
                .collect()
        };

        let ranked = rank_by_profit(entries);
        info!(
            "RecommendationRanker: ranked {}/{} candidates for {} over {} days",
            ranked.len(),
            self.settings.candidates.len(),
            investment_amount,
            horizon_days
        );
        Ok(ranked)
    }
}

pub fn validate_request(investment_amount: f64, horizon_days: u32) -> Result<(), ForecastError> {
    if !investment_amount.is_finite() || investment_amount <= 0.0 {
        return Err(ForecastError::InvalidRequest {
            reason: format!("investment amount must be positive, got {}", investment_amount),
        });
    }
    if horizon_days == 0 {
        return Err(ForecastError::InvalidRequest {
            reason: "horizon must be at least one day".to_string(),
        });
    }
    Ok(())
}

/// Draw one predicted daily return for `series` and compound it.
///
/// Returns `None` when the series cannot support the estimate (no positive
/// current price, fewer than two returns, or a non-finite result).
pub fn project_entry<R: Rng>(
    series: &PriceSeries,
    investment_amount: f64,
    horizon_days: u32,
    rng: &mut R,
) -> Option<RecommendationEntry> {
    let symbol = series.symbol();
    let current_price = series.last_close().filter(|p| *p > 0.0)?;

    let returns = series.pct_returns();
    if returns.len() < 2 {
        debug!("{}: not enough returns for a volatility estimate", symbol);
        return None;
    }

    let data = Data::new(returns);
    let mean = data.mean()?;
    let std_dev = data.std_dev()?;

    let normal = match Normal::new(mean, std_dev / 2.0) {
        Ok(n) => n,
        Err(e) => {
            warn!("{}: invalid return distribution ({}, {}): {}", symbol, mean, std_dev, e);
            return None;
        }
    };
    let predicted_return = normal.sample(rng);

    let predicted_price = current_price * (1.0 + predicted_return).powf(horizon_days as f64);
    let profit = investment_amount * (predicted_price / current_price - 1.0);

    if !predicted_price.is_finite() || !profit.is_finite() {
        return None;
    }

    Some(RecommendationEntry {
        symbol: symbol.to_string(),
        current_price,
        predicted_price,
        profit,
    })
}

/// Sort descending by expected profit.
pub fn rank_by_profit(mut entries: Vec<RecommendationEntry>) -> Vec<RecommendationEntry> {
    entries.retain(|e| e.profit.is_finite());
    entries.sort_by(|a, b| {
        b.profit
            .partial_cmp(&a.profit)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn series(symbol: &str, closes: &[f64]) -> PriceSeries {
        PriceSeries::from_closes(symbol, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(), closes)
    }

    fn noisy(len: usize, drift: f64) -> Vec<f64> {
        (0..len)
            .map(|i| 100.0 * (1.0 + drift).powi(i as i32) * (1.0 + 0.01 * (i as f64).sin()))
            .collect()
    }

    #[test]
    fn test_profit_sign_matches_price_move() {
        let mut rng = StdRng::seed_from_u64(9);
        let s = series("A.NS", &noisy(60, 0.001));

        for _ in 0..200 {
            let entry = project_entry(&s, 10_000.0, 30, &mut rng).unwrap();
            assert_eq!(entry.profit > 0.0, entry.predicted_price > entry.current_price);
            assert_eq!(entry.current_price, s.last_close().unwrap());
        }
    }

    #[test]
    fn test_compounding_formula() {
        // Constant growth: every return equals 1%, std dev is 0, so the draw is exact.
        let closes: Vec<f64> = (0..20).map(|i| 100.0 * 1.01f64.powi(i)).collect();
        let s = series("G", &closes);
        let mut rng = StdRng::seed_from_u64(1);

        let entry = project_entry(&s, 1000.0, 10, &mut rng).unwrap();
        let expected_price = closes[19] * 1.01f64.powi(10);
        assert!((entry.predicted_price - expected_price).abs() < 1e-6);
        assert!((entry.profit - 1000.0 * (1.01f64.powi(10) - 1.0)).abs() < 1e-6);
    }

    #[test]
    fn test_seeded_draws_are_reproducible() {
        let s = series("R", &noisy(50, 0.0));
        let a = project_entry(&s, 500.0, 5, &mut StdRng::seed_from_u64(77)).unwrap();
        let b = project_entry(&s, 500.0, 5, &mut StdRng::seed_from_u64(77)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_rejects_degenerate_series() {
        let mut rng = StdRng::seed_from_u64(2);
        assert!(project_entry(&series("Z", &[0.0; 15]), 100.0, 5, &mut rng).is_none());
        assert!(project_entry(&series("S", &[10.0, 11.0]), 100.0, 5, &mut rng).is_none());
    }

    #[test]
    fn test_rank_by_profit_orders_descending() {
        let entry = |symbol: &str, profit: f64| RecommendationEntry {
            symbol: symbol.to_string(),
            current_price: 1.0,
            predicted_price: 1.0,
            profit,
        };

        let ranked = rank_by_profit(vec![
            entry("a", -5.0),
            entry("b", 12.0),
            entry("c", f64::NAN),
            entry("d", 3.0),
        ]);

        let symbols: Vec<&str> = ranked.iter().map(|e| e.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["b", "d", "a"]);
        assert!(ranked.windows(2).all(|w| w[0].profit >= w[1].profit));
    }

    #[test]
    fn test_validate_request() {
        assert!(validate_request(1000.0, 30).is_ok());
        assert!(validate_request(0.0, 30).is_err());
        assert!(validate_request(-1.0, 30).is_err());
        assert!(validate_request(f64::NAN, 30).is_err());
        assert!(validate_request(1000.0, 0).is_err());
    }
}
