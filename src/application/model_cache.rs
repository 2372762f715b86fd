//! Process-wide registry of the most recent fit per pair.
//!
//! Entries live for the process lifetime. The only invalidation is a fresh
//! train for the same pair, which replaces the entry; concurrent writers are
//! last-writer-wins, which is safe because training is deterministic for a
//! given series and seed.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::application::trainer::{ModelTrainer, TrainedModel};
use crate::domain::errors::TrainingError;
use crate::domain::types::PriceSeries;

pub struct ModelCache {
    entries: RwLock<HashMap<String, Arc<TrainedModel>>>,
}

impl ModelCache {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub async fn get(&self, pair: &str) -> Option<Arc<TrainedModel>> {
        self.entries.read().await.get(pair).cloned()
    }

    pub async fn insert(&self, pair: &str, model: Arc<TrainedModel>) {
        self.entries.write().await.insert(pair.to_string(), model);
    }

    /// A cache hit is a pure read; a miss trains synchronously and publishes
    /// the result before returning.
    pub async fn get_or_train(
        &self,
        pair: &str,
        series: &PriceSeries,
        trainer: &ModelTrainer,
    ) -> Result<Arc<TrainedModel>, TrainingError> {
        if let Some(model) = self.get(pair).await {
            return Ok(model);
        }
        let model = Arc::new(trainer.train(series)?);
        self.insert(pair, model.clone()).await;
        Ok(model)
    }

    /// Fits a fresh model and replaces any cached entry for the pair.
    pub async fn retrain(
        &self,
        pair: &str,
        series: &PriceSeries,
        trainer: &ModelTrainer,
    ) -> Result<Arc<TrainedModel>, TrainingError> {
        let model = Arc::new(trainer.train(series)?);
        self.insert(pair, model.clone()).await;
        Ok(model)
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl Default for ModelCache {
    fn default() -> Self {
        Self::new()
    }
}
