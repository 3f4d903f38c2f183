//! In-memory prediction history.
//!
//! Thread-safe via `Arc<RwLock>`. Data is lost on restart; intended for
//! tests and for running without a database.

use crate::domain::history::PredictionRecord;
use crate::domain::repositories::PredictionRepository;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

pub struct InMemoryPredictionRepository {
    records: Arc<RwLock<Vec<PredictionRecord>>>,
}

impl InMemoryPredictionRepository {
    pub fn new() -> Self {
        Self {
            records: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub async fn count(&self) -> usize {
        self.records.read().await.len()
    }
}

impl Default for InMemoryPredictionRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PredictionRepository for InMemoryPredictionRepository {
    async fn save(&self, record: &PredictionRecord) -> Result<()> {
        self.records.write().await.push(record.clone());
        Ok(())
    }

    async fn history(&self, user_id: &str, limit: usize) -> Result<Vec<PredictionRecord>> {
        let records = self.records.read().await;

        let mut newest_first: Vec<&PredictionRecord> =
            records.iter().filter(|r| r.user_id == user_id).collect();
        // Later inserts win ties, as in the database's id ordering.
        newest_first.reverse();
        newest_first.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let mut singles = 0;
        let mut recommendations = 0;
        let history = newest_first
            .into_iter()
            .filter(|r| {
                let seen = match r.kind.as_str() {
                    "single" => &mut singles,
                    _ => &mut recommendations,
                };
                *seen += 1;
                *seen <= limit
            })
            .cloned()
            .collect();
        Ok(history)
    }
}
