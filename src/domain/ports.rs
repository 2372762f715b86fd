use crate::domain::errors::MarketDataError;
use crate::domain::types::{DataSource, PriceSeries};
use async_trait::async_trait;

// Need async_trait for async functions in traits
#[async_trait]
pub trait RateProvider: Send + Sync {
    /// Resolves a currency pair to a daily close history covering roughly
    /// `period_days` calendar days, oldest point first. All blocking I/O
    /// lives behind this trait; the engine only consumes the result.
    async fn fetch(&self, pair: &str, period_days: usize) -> Result<PriceSeries, MarketDataError>;

    fn source(&self) -> DataSource;

    fn name(&self) -> &str;
}
