use crate::application::forecasting::{
    ForecasterSettings, RankerSettings, RecommendationRanker, SingleStockForecaster,
};
use crate::config::Config;
use crate::domain::errors::ForecastError;
use crate::domain::forecast::{Forecast, RecommendationEntry};
use crate::domain::ports::PriceHistoryProvider;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::warn;

type SymbolLocks = Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>;

fn lock_map(locks: &SymbolLocks) -> MutexGuard<'_, HashMap<String, Arc<tokio::sync::Mutex<()>>>> {
    match locks.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// A caller's claim on one symbol's forecast lock. The map entry is removed
/// when the last claim goes away.
struct InFlightSlot<'a> {
    locks: &'a SymbolLocks,
    symbol: String,
    lock: Arc<tokio::sync::Mutex<()>>,
}

impl Drop for InFlightSlot<'_> {
    fn drop(&mut self) {
        let mut locks = lock_map(self.locks);
        // Clones are only taken under the map lock, so the count is stable here.
        let last_claim = locks
            .get(&self.symbol)
            .is_some_and(|current| {
                Arc::ptr_eq(current, &self.lock) && Arc::strong_count(&self.lock) == 2
            });
        if last_claim {
            locks.remove(&self.symbol);
        }
    }
}

/// Entry point for presentation layers (CLI, UI).
///
/// Wraps the forecaster and the ranker behind the two calls the outside
/// world uses, and keeps at most one forecast in flight per symbol.
pub struct ForecastClient {
    forecaster: SingleStockForecaster,
    ranker: RecommendationRanker,
    in_flight: SymbolLocks,
}

impl ForecastClient {
    pub fn new(forecaster: SingleStockForecaster, ranker: RecommendationRanker) -> Self {
        Self {
            forecaster,
            ranker,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Both components share one provider.
    pub fn with_settings(
        provider: Arc<dyn PriceHistoryProvider>,
        forecaster: ForecasterSettings,
        ranker: RankerSettings,
    ) -> Self {
        Self::new(
            SingleStockForecaster::new(provider.clone(), forecaster),
            RecommendationRanker::new(provider, ranker),
        )
    }

    pub fn from_config(provider: Arc<dyn PriceHistoryProvider>, config: &Config) -> Self {
        Self::with_settings(
            provider,
            config.forecaster_settings(),
            config.ranker_settings(),
        )
    }

    pub fn candidates(&self) -> &[String] {
        self.ranker.candidates()
    }

    pub fn forecaster(&self) -> &SingleStockForecaster {
        &self.forecaster
    }

    fn claim(&self, symbol: &str) -> InFlightSlot<'_> {
        let lock = lock_map(&self.in_flight)
            .entry(symbol.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone();
        InFlightSlot {
            locks: &self.in_flight,
            symbol: symbol.to_string(),
            lock,
        }
    }

    /// Forecast one symbol, reporting why it failed if it did.
    pub async fn forecast(&self, symbol: &str) -> Result<Forecast, ForecastError> {
        let symbol = symbol.trim().to_uppercase();
        if symbol.is_empty() {
            return Err(ForecastError::InvalidRequest {
                reason: "symbol must not be empty".to_string(),
            });
        }

        let slot = self.claim(&symbol);
        let _guard = slot.lock.lock().await;
        self.forecaster.predict(&symbol).await
    }

    /// Predicted and actual price runs for `symbol`, or `(None, None)` when
    /// no forecast could be produced.
    pub async fn predict_single_stock(&self, symbol: &str) -> (Option<Vec<f64>>, Option<Vec<f64>>) {
        match self.forecast(symbol).await {
            Ok(forecast) => (Some(forecast.predicted), Some(forecast.actual)),
            Err(e) => {
                warn!(
                    "ForecastClient: no forecast for {} ({}): {}",
                    symbol,
                    e.tag(),
                    e
                );
                (None, None)
            }
        }
    }

    /// Rank the candidate universe, reporting invalid requests.
    pub async fn recommend(
        &self,
        investment_amount: f64,
        horizon_days: u32,
    ) -> Result<Vec<RecommendationEntry>, ForecastError> {
        self.ranker.recommend(investment_amount, horizon_days).await
    }

    /// Candidates ranked by expected profit, best first. Empty when the
    /// request is invalid or no candidate had usable data.
    pub async fn predict_all_stocks(
        &self,
        investment_amount: f64,
        horizon_days: u32,
    ) -> Vec<RecommendationEntry> {
        match self.recommend(investment_amount, horizon_days).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!("ForecastClient: recommendation rejected: {}", e);
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ml::ModelConfig;
    use crate::application::ml::optimizer::AdamConfig;
    use crate::infrastructure::mock::MockPriceHistoryProvider;

    fn client(provider: MockPriceHistoryProvider) -> ForecastClient {
        let forecaster = ForecasterSettings {
            lookback_days: 730,
            model: ModelConfig {
                input_len: 60,
                output_len: 10,
                hidden_units: 4,
                epochs: 1,
                batch_size: 32,
                optimizer: AdamConfig::default(),
            },
            seed: Some(3),
        };
        let ranker = RankerSettings {
            candidates: vec!["TCS.NS".to_string()],
            lookback_days: 730,
            min_observations: 10,
            seed: Some(3),
        };
        ForecastClient::with_settings(Arc::new(provider), forecaster, ranker)
    }

    fn tracked(client: &ForecastClient) -> usize {
        lock_map(&client.in_flight).len()
    }

    #[test]
    fn test_claims_share_one_lock_until_released() {
        let client = client(MockPriceHistoryProvider::new());

        let first = client.claim("TCS.NS");
        let second = client.claim("TCS.NS");
        let other = client.claim("INFY.NS");
        assert!(Arc::ptr_eq(&first.lock, &second.lock));
        assert_eq!(tracked(&client), 2);

        drop(first);
        assert_eq!(tracked(&client), 2);
        drop(second);
        assert_eq!(tracked(&client), 1);
        drop(other);
        assert_eq!(tracked(&client), 0);
    }

    #[tokio::test]
    async fn test_finished_forecasts_leave_no_lock_behind() {
        let provider = MockPriceHistoryProvider::new()
            .with_default_length(5)
            .with_failure("GONE.NS");
        let client = client(provider);

        for i in 0..20 {
            let _ = client.forecast(&format!("SYM{}.NS", i)).await;
        }
        assert!(client.forecast("TCS.NS").await.is_err());
        assert!(client.forecast("GONE.NS").await.is_err());

        assert_eq!(tracked(&client), 0);
    }
}
