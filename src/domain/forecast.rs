use serde::{Deserialize, Serialize};

/// Outcome of anchoring a forecast to the last observed close.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Calibration {
    /// Every predicted value was multiplied by `factor`.
    Anchored { factor: f64 },
    /// Forecast left uncalibrated: no actual prices, or the first predicted
    /// value was too close to zero to divide by.
    Skipped,
}

/// A multi-day price forecast for one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub symbol: String,
    /// Predicted closes for the next `predicted.len()` trading days.
    pub predicted: Vec<f64>,
    /// Most recent known closes, oldest first. May be empty.
    pub actual: Vec<f64>,
    pub calibration: Calibration,
}

impl Forecast {
    /// Last predicted close minus last known close; 0 without actuals.
    pub fn projected_change(&self) -> f64 {
        match (self.predicted.last(), self.actual.last()) {
            (Some(predicted), Some(actual)) => predicted - actual,
            _ => 0.0,
        }
    }

    pub fn horizon_days(&self) -> u32 {
        self.predicted.len() as u32
    }

    pub fn ticker(&self) -> &str {
        ticker_of(&self.symbol)
    }
}

/// Symbol without its exchange suffix (`TCS.NS` -> `TCS`), the form shown
/// to users and stored in prediction history.
pub fn ticker_of(symbol: &str) -> &str {
    symbol
        .split_once('.')
        .map(|(ticker, _)| ticker)
        .unwrap_or(symbol)
}

/// One ranked candidate produced by the recommendation ranker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationEntry {
    pub symbol: String,
    pub current_price: f64,
    pub predicted_price: f64,
    pub profit: f64,
}

impl RecommendationEntry {
    pub fn ticker(&self) -> &str {
        ticker_of(&self.symbol)
    }

    /// Expected profit as a percentage of the invested amount.
    pub fn return_pct(&self, investment_amount: f64) -> f64 {
        if investment_amount == 0.0 {
            return 0.0;
        }
        self.profit / investment_amount * 100.0
    }
}
