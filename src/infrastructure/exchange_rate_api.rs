//! Live spot rates from the exchangerate-api JSON endpoint.
//!
//! The upstream API serves current rates against a USD base but no daily
//! candles, so the provider derives the requested pair's spot and
//! synthesizes a daily random-walk history ending at that spot. Every
//! failure maps to `MarketDataError::Unavailable` so callers can fall back
//! to the heuristic path.

use async_trait::async_trait;
use chrono::Utc;
use rand::Rng;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::info;

use crate::domain::errors::MarketDataError;
use crate::domain::ports::RateProvider;
use crate::domain::types::{DataSource, PricePoint, PriceSeries};

const DEFAULT_ENDPOINT: &str = "https://api.exchangerate-api.com/v4/latest/USD";
const REQUEST_TIMEOUT_SECS: u64 = 5;
const HISTORY_STEP_JITTER: f64 = 0.01;

#[derive(Debug, Deserialize)]
struct ExchangeRateResponse {
    base: String,
    rates: HashMap<String, f64>,
}

pub struct LiveRateProvider {
    client: Client,
    url: String,
}

impl LiveRateProvider {
    pub fn new() -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
                .build()
                .unwrap_or_default(),
            url: DEFAULT_ENDPOINT.to_string(),
        }
    }

    pub fn with_endpoint(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    async fn fetch_spot(&self, pair: &str) -> Result<f64, MarketDataError> {
        let unavailable = |reason: String| MarketDataError::Unavailable {
            pair: pair.to_string(),
            reason,
        };

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| unavailable(format!("request failed: {e}")))?;
        if !response.status().is_success() {
            return Err(unavailable(format!(
                "endpoint returned status {}",
                response.status()
            )));
        }

        let body: ExchangeRateResponse = response
            .json()
            .await
            .map_err(|e| unavailable(format!("malformed response: {e}")))?;
        info!(
            "fetched {} rates against {} base",
            body.rates.len(),
            body.base
        );

        derive_spot(pair, &body.rates).ok_or_else(|| unavailable("pair not derivable".to_string()))
    }
}

impl Default for LiveRateProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RateProvider for LiveRateProvider {
    async fn fetch(&self, pair: &str, period_days: usize) -> Result<PriceSeries, MarketDataError> {
        let spot = self.fetch_spot(pair).await?;
        Ok(synthesize_history(pair, spot, period_days))
    }

    fn source(&self) -> DataSource {
        DataSource::Live
    }

    fn name(&self) -> &str {
        "exchangerate-api"
    }
}

/// Derives a pair's spot from USD-based rates.
fn derive_spot(pair: &str, rates: &HashMap<String, f64>) -> Option<f64> {
    match pair {
        "USD/JPY" => rates.get("JPY").copied(),
        "EUR/JPY" => {
            let eur = rates.get("EUR").copied()?;
            let jpy = rates.get("JPY").copied()?;
            if eur == 0.0 { None } else { Some(jpy / eur) }
        }
        "EUR/USD" => {
            let eur = rates.get("EUR").copied()?;
            if eur == 0.0 { None } else { Some(1.0 / eur) }
        }
        _ => None,
    }
}

/// Daily random walk anchored so its final close is the live spot.
fn synthesize_history(pair: &str, spot: f64, period_days: usize) -> PriceSeries {
    let mut rng = rand::rng();
    let now = Utc::now().timestamp();
    let days = period_days.max(1);

    let mut closes = Vec::with_capacity(days);
    let mut rate = spot;
    for _ in 0..days - 1 {
        rate *= 1.0 + rng.random_range(-HISTORY_STEP_JITTER..=HISTORY_STEP_JITTER);
        closes.push(rate);
    }
    closes.reverse();
    closes.push(spot);

    let points = closes
        .into_iter()
        .enumerate()
        .map(|(i, close)| PricePoint {
            timestamp: now - (days - 1 - i) as i64 * 86_400,
            close,
        })
        .collect();
    PriceSeries::new(pair, points)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usd_rates() -> HashMap<String, f64> {
        HashMap::from([("JPY".to_string(), 150.0), ("EUR".to_string(), 0.925)])
    }

    #[test]
    fn derives_the_supported_pairs() {
        let rates = usd_rates();
        assert_eq!(derive_spot("USD/JPY", &rates), Some(150.0));
        let eur_jpy = derive_spot("EUR/JPY", &rates).unwrap();
        assert!((eur_jpy - 150.0 / 0.925).abs() < 1e-9);
        let eur_usd = derive_spot("EUR/USD", &rates).unwrap();
        assert!((eur_usd - 1.0 / 0.925).abs() < 1e-9);
    }

    #[test]
    fn unsupported_pair_is_not_derivable() {
        assert_eq!(derive_spot("GBP/USD", &usd_rates()), None);
    }

    #[test]
    fn missing_base_rate_is_not_derivable() {
        let rates = HashMap::from([("JPY".to_string(), 150.0)]);
        assert_eq!(derive_spot("EUR/JPY", &rates), None);
    }

    #[test]
    fn synthesized_history_ends_at_the_spot() {
        let series = synthesize_history("USD/JPY", 150.0, 60);
        assert_eq!(series.len(), 60);
        assert_eq!(series.last_close(), Some(150.0));
        assert!(series.validate().is_ok());
    }
}
