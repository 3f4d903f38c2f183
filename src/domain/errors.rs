use thiserror::Error;

/// Errors surfaced by the forecasting and ranking engine.
///
/// Every variant is recoverable: callers skip the symbol or report a
/// "no result" state, never abort the process.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ForecastError {
    #[error("No data available for {symbol}: {reason}")]
    NoDataAvailable { symbol: String, reason: String },

    #[error("Insufficient history for {symbol}: need {required} observations, got {available}")]
    InsufficientHistory {
        symbol: String,
        required: usize,
        available: usize,
    },

    #[error("Training failed for {symbol}: {reason}")]
    TrainingFailed { symbol: String, reason: String },

    #[error("Invalid request: {reason}")]
    InvalidRequest { reason: String },
}

impl ForecastError {
    /// Short machine-friendly tag, used in logs and CLI output.
    pub fn tag(&self) -> &'static str {
        match self {
            ForecastError::NoDataAvailable { .. } => "no_data_available",
            ForecastError::InsufficientHistory { .. } => "insufficient_history",
            ForecastError::TrainingFailed { .. } => "training_failed",
            ForecastError::InvalidRequest { .. } => "invalid_request",
        }
    }
}

/// Errors raised by market data provider adapters
#[derive(Debug, Error)]
pub enum MarketDataError {
    #[error("Request to market data provider failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Market data provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed response for {symbol}: {reason}")]
    Decode { symbol: String, reason: String },

    #[error("Empty price series returned for {symbol}")]
    Empty { symbol: String },
}

impl MarketDataError {
    /// Collapse a provider failure into the engine's per-symbol error.
    pub fn into_forecast_error(self, symbol: &str) -> ForecastError {
        ForecastError::NoDataAvailable {
            symbol: symbol.to_string(),
            reason: self.to_string(),
        }
    }
}
