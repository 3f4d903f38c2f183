use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What kind of request produced a stored prediction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PredictionKind {
    Single { horizon_days: u32 },
    Recommendation { investment_amount: f64, horizon_days: u32 },
}

impl PredictionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PredictionKind::Single { .. } => "single",
            PredictionKind::Recommendation { .. } => "recommendation",
        }
    }

    pub fn horizon_days(&self) -> u32 {
        match self {
            PredictionKind::Single { horizon_days }
            | PredictionKind::Recommendation { horizon_days, .. } => *horizon_days,
        }
    }

    pub fn investment_amount(&self) -> Option<f64> {
        match self {
            PredictionKind::Single { .. } => None,
            PredictionKind::Recommendation {
                investment_amount, ..
            } => Some(*investment_amount),
        }
    }
}

/// A forecast outcome persisted on behalf of a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub user_id: String,
    pub symbol: String,
    pub kind: PredictionKind,
    pub predicted_profit: f64,
    pub created_at: DateTime<Utc>,
}

impl PredictionRecord {
    pub fn single(user_id: &str, symbol: &str, horizon_days: u32, predicted_profit: f64) -> Self {
        Self {
            user_id: user_id.to_string(),
            symbol: symbol.to_string(),
            kind: PredictionKind::Single { horizon_days },
            predicted_profit: sanitize(predicted_profit),
            created_at: Utc::now(),
        }
    }

    pub fn recommendation(
        user_id: &str,
        symbol: &str,
        investment_amount: f64,
        horizon_days: u32,
        predicted_profit: f64,
    ) -> Self {
        Self {
            user_id: user_id.to_string(),
            symbol: symbol.to_string(),
            kind: PredictionKind::Recommendation {
                investment_amount: sanitize(investment_amount),
                horizon_days,
            },
            predicted_profit: sanitize(predicted_profit),
            created_at: Utc::now(),
        }
    }
}

// Non-finite values are stored as 0, matching how missing values were persisted.
fn sanitize(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}
