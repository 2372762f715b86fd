//! Engine facade: lazy-fit, cached, clamped multi-day forecasts with a
//! heuristic fallback when no model can be produced.

use chrono::{NaiveDate, Utc};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

use crate::application::forecaster::{ForecastPolicy, Forecaster};
use crate::application::heuristic::{self, HeuristicForecaster};
use crate::application::model_cache::ModelCache;
use crate::application::trainer::{DEFAULT_SEED, ModelTrainer};
use crate::config::default_base_rates;
use crate::domain::errors::{ForecastError, MarketDataError, TrainingError};
use crate::domain::features::FeatureProfile;
use crate::domain::ports::RateProvider;
use crate::domain::types::{DataSource, Forecast, PriceSeries};

pub const DEFAULT_MAX_HORIZON: u32 = 30;
pub const DEFAULT_HISTORY_DAYS: usize = 730;
/// Anchor for pairs missing from the fallback-rate table.
const FALLBACK_ANCHOR: f64 = 100.0;
/// Length of the synthesized trailing window on the no-data path.
const SYNTHETIC_WINDOW_LEN: usize = 30;

/// Construction-time knobs for [`ForecastService`].
#[derive(Debug, Clone)]
pub struct ForecastServiceConfig {
    pub profile: FeatureProfile,
    pub policy: ForecastPolicy,
    pub max_horizon: u32,
    pub history_days: usize,
    pub seed: u64,
    /// Anchors used to synthesize a window when the market-data collaborator
    /// is unavailable. Injected rather than ambient so tests can isolate it.
    pub fallback_rates: HashMap<String, f64>,
}

impl Default for ForecastServiceConfig {
    fn default() -> Self {
        let profile = FeatureProfile::Full;
        Self {
            profile,
            policy: ForecastPolicy::for_profile(profile),
            max_horizon: DEFAULT_MAX_HORIZON,
            history_days: DEFAULT_HISTORY_DAYS,
            seed: DEFAULT_SEED,
            fallback_rates: default_base_rates(),
        }
    }
}

impl ForecastServiceConfig {
    pub fn for_profile(profile: FeatureProfile) -> Self {
        Self {
            profile,
            policy: ForecastPolicy::for_profile(profile),
            ..Self::default()
        }
    }
}

pub struct ForecastService {
    provider: Arc<dyn RateProvider>,
    cache: Arc<ModelCache>,
    trainer: ModelTrainer,
    forecaster: Forecaster,
    heuristic: HeuristicForecaster,
    config: ForecastServiceConfig,
}

impl ForecastService {
    pub fn new(
        provider: Arc<dyn RateProvider>,
        cache: Arc<ModelCache>,
        config: ForecastServiceConfig,
    ) -> Self {
        Self {
            provider,
            cache,
            trainer: ModelTrainer::with_seed(config.profile, config.seed),
            forecaster: Forecaster::new(config.policy),
            heuristic: HeuristicForecaster::new(config.policy),
            config,
        }
    }

    /// Pairs the fallback table can anchor, sorted for stable presentation.
    pub fn supported_pairs(&self) -> Vec<String> {
        let mut pairs: Vec<String> = self.config.fallback_rates.keys().cloned().collect();
        pairs.sort();
        pairs
    }

    /// Fetches history through the provider and forecasts `horizon` days.
    ///
    /// An unavailable provider is recovered locally: the heuristic strategy
    /// projects from a synthesized window instead of failing the request.
    pub async fn forecast(&self, pair: &str, horizon: u32) -> Result<Forecast, ForecastError> {
        self.check_horizon(horizon)?;
        let today = Utc::now().date_naive();

        match self.provider.fetch(pair, self.config.history_days).await {
            Ok(series) => self.forecast_series(pair, &series, horizon, today).await,
            Err(err @ MarketDataError::InvalidData { .. }) => Err(err.into()),
            Err(err) => {
                warn!("market data unavailable for {pair}: {err}; using heuristic fallback");
                Ok(self.heuristic_forecast(pair, None, horizon, today))
            }
        }
    }

    /// Forecasts from a caller-supplied series, bypassing the provider. This
    /// is the engine's transport-free contract: series in, predictions out.
    pub async fn forecast_series(
        &self,
        pair: &str,
        series: &PriceSeries,
        horizon: u32,
        today: NaiveDate,
    ) -> Result<Forecast, ForecastError> {
        self.check_horizon(horizon)?;

        match self.cache.get_or_train(pair, series, &self.trainer).await {
            Ok(model) => {
                let steps =
                    self.forecaster
                        .project(&model, &self.trainer.feature_names(), horizon, today)?;
                Ok(Forecast {
                    pair: pair.to_string(),
                    current_price: model.last_close(),
                    source: self.provider.source(),
                    validation_mae: Some(model.mae()),
                    steps,
                })
            }
            Err(TrainingError::InsufficientData { usable, required }) => {
                warn!(
                    "insufficient history for {pair} ({usable} usable rows, need {required}); using heuristic fallback"
                );
                Ok(self.heuristic_forecast(pair, Some(series), horizon, today))
            }
            Err(other) => Err(other.into()),
        }
    }

    fn check_horizon(&self, horizon: u32) -> Result<(), ForecastError> {
        if horizon == 0 || horizon > self.config.max_horizon {
            return Err(ForecastError::InvalidHorizon {
                requested: horizon,
                max: self.config.max_horizon,
            });
        }
        Ok(())
    }

    fn heuristic_forecast(
        &self,
        pair: &str,
        series: Option<&PriceSeries>,
        horizon: u32,
        today: NaiveDate,
    ) -> Forecast {
        let mut rng = StdRng::seed_from_u64(self.config.seed);

        let (window, source) = match series {
            Some(series) if !series.is_empty() => (series.closes(), self.provider.source()),
            _ => {
                let anchor = self
                    .config
                    .fallback_rates
                    .get(pair)
                    .copied()
                    .unwrap_or(FALLBACK_ANCHOR);
                (
                    heuristic::synthesize_window(anchor, SYNTHETIC_WINDOW_LEN, &mut rng),
                    DataSource::Simulated,
                )
            }
        };
        let current = window.last().copied().unwrap_or(FALLBACK_ANCHOR);
        let steps = self.heuristic.project(&window, horizon, today, &mut rng);

        Forecast {
            pair: pair.to_string(),
            current_price: current,
            source,
            validation_mae: None,
            steps,
        }
    }
}
