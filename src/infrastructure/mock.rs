use crate::domain::errors::MarketDataError;
use crate::domain::market::price_series::PriceSeries;
use crate::domain::ports::PriceHistoryProvider;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

/// Synthetic daily closes for offline runs and tests.
///
/// Each symbol gets a reproducible random walk seeded from its name, so the
/// same symbol always yields the same series. Individual symbols can be made
/// to fail, be shortened, or be replaced with a fixed series.
pub struct MockPriceHistoryProvider {
    default_length: usize,
    lengths: HashMap<String, usize>,
    fixed: HashMap<String, PriceSeries>,
    failing: HashSet<String>,
    fetches: AtomicUsize,
}

impl MockPriceHistoryProvider {
    pub fn new() -> Self {
        Self {
            default_length: 500,
            lengths: HashMap::new(),
            fixed: HashMap::new(),
            failing: HashSet::new(),
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn with_default_length(mut self, length: usize) -> Self {
        self.default_length = length;
        self
    }

    pub fn with_length(mut self, symbol: &str, length: usize) -> Self {
        self.lengths.insert(symbol.to_string(), length);
        self
    }

    pub fn with_series(mut self, series: PriceSeries) -> Self {
        self.fixed.insert(series.symbol().to_string(), series);
        self
    }

    pub fn with_failure(mut self, symbol: &str) -> Self {
        self.failing.insert(symbol.to_string());
        self
    }

    /// Number of fetches served so far, failed ones included.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::Relaxed)
    }

    fn synthetic(&self, symbol: &str, length: usize) -> PriceSeries {
        let seed = symbol
            .bytes()
            .fold(0xcbf2_9ce4_8422_2325u64, |h, b| {
                (h ^ u64::from(b)).wrapping_mul(0x0100_0000_01b3)
            });
        let mut rng = StdRng::seed_from_u64(seed);

        let drift = rng.random_range(-0.0005..0.0015);
        let mut price = rng.random_range(100.0..3000.0);
        let closes: Vec<f64> = (0..length)
            .map(|_| {
                price *= 1.0 + drift + rng.random_range(-0.02..0.02);
                price
            })
            .collect();

        let start = (Utc::now() - Duration::days(length as i64)).date_naive();
        PriceSeries::from_closes(symbol, start, &closes)
    }
}

impl Default for MockPriceHistoryProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PriceHistoryProvider for MockPriceHistoryProvider {
    async fn fetch_daily_closes(
        &self,
        symbol: &str,
        lookback_days: u32,
    ) -> Result<PriceSeries, MarketDataError> {
        self.fetches.fetch_add(1, Ordering::Relaxed);

        if self.failing.contains(symbol) {
            return Err(MarketDataError::Status {
                status: 404,
                body: format!("no such symbol: {}", symbol),
            });
        }

        if let Some(series) = self.fixed.get(symbol) {
            return Ok(series.clone());
        }

        let length = self
            .lengths
            .get(symbol)
            .copied()
            .unwrap_or(self.default_length)
            .min(lookback_days as usize);
        if length == 0 {
            return Err(MarketDataError::Empty {
                symbol: symbol.to_string(),
            });
        }

        debug!("MockPriceHistoryProvider: {} synthetic closes for {}", length, symbol);
        Ok(self.synthetic(symbol, length))
    }

    fn name(&self) -> &str {
        "mock"
    }
}
