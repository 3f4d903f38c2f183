use crate::config::{Config, ProviderKind};
use crate::domain::ports::PriceHistoryProvider;
use crate::domain::repositories::PredictionRepository;
use crate::infrastructure::mock::MockPriceHistoryProvider;
use crate::infrastructure::persistence::{Database, SqlitePredictionRepository};
use crate::infrastructure::yahoo::YahooPriceHistoryProvider;
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub struct ServiceFactory;

impl ServiceFactory {
    pub fn create_provider(config: &Config) -> Arc<dyn PriceHistoryProvider> {
        let market = &config.market_data;
        let provider: Arc<dyn PriceHistoryProvider> = match market.provider {
            ProviderKind::Yahoo => Arc::new(YahooPriceHistoryProvider::new(
                market.base_url.clone(),
                Duration::from_secs(market.fetch_timeout_secs),
            )),
            ProviderKind::Mock => Arc::new(MockPriceHistoryProvider::new()),
        };
        info!("ServiceFactory: using {} price history", provider.name());
        provider
    }

    pub async fn create_repository(config: &Config) -> Result<Arc<dyn PredictionRepository>> {
        let db = Database::new(&config.persistence.database_url).await?;
        Ok(Arc::new(SqlitePredictionRepository::new(db.pool)))
    }
}
