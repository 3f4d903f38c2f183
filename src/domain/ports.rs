use crate::domain::errors::MarketDataError;
use crate::domain::market::price_series::PriceSeries;
use async_trait::async_trait;

/// Read-only source of historical daily closes.
///
/// Implementations perform one query per call and do not retry; a failure
/// is reported straight back so the caller can skip the symbol.
#[async_trait]
pub trait PriceHistoryProvider: Send + Sync {
    /// Daily closes for `symbol` over the trailing `lookback_days`, ending today.
    async fn fetch_daily_closes(
        &self,
        symbol: &str,
        lookback_days: u32,
    ) -> Result<PriceSeries, MarketDataError>;

    /// Provider name for logs
    fn name(&self) -> &str;
}
