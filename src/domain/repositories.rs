//! Repository abstractions for prediction history.
//!
//! The forecasting engine never touches storage. The presentation layer
//! records outcomes through `PredictionRepository` and reads them back for
//! the history view.

use crate::domain::history::PredictionRecord;
use anyhow::Result;
use async_trait::async_trait;

#[async_trait]
pub trait PredictionRepository: Send + Sync {
    /// Persist one prediction outcome
    async fn save(&self, record: &PredictionRecord) -> Result<()>;

    /// Most recent predictions for a user, newest first, at most `limit` per kind.
    async fn history(&self, user_id: &str, limit: usize) -> Result<Vec<PredictionRecord>>;
}
