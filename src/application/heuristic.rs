//! Trend/oscillator fallback strategy.
//!
//! Used whenever no model can be fitted: the market-data collaborator is
//! unavailable, or the available history is below the training floor. Shares
//! the clamp policy with the model-driven path and reports a decaying 0-100
//! confidence score instead of a validation MAE.

use chrono::{Duration, NaiveDate};
use rand::Rng;
use rand::rngs::StdRng;

use crate::application::forecaster::ForecastPolicy;
use crate::application::indicators;
use crate::domain::types::PredictionStep;

const SHORT_MA_WINDOW: usize = 5;
const LONG_MA_WINDOW: usize = 10;
const RSI_WINDOW: usize = 14;
const UPTREND_MULTIPLIER: f64 = 1.001;
const DOWNTREND_MULTIPLIER: f64 = 0.999;
const OVERBOUGHT_RSI: f64 = 70.0;
const OVERSOLD_RSI: f64 = 30.0;
const OVERBOUGHT_DAMPING: f64 = 0.998;
const OVERSOLD_BOOST: f64 = 1.002;
const BASE_CONFIDENCE: f64 = 85.0;
const CONFIDENCE_DECAY_PER_DAY: f64 = 2.0;
const MIN_CONFIDENCE: f64 = 60.0;
/// Uncertainty grows with the day offset: the perturbation drawn for day k
/// is scaled by `1 + k * UNCERTAINTY_GROWTH_PER_DAY`.
const UNCERTAINTY_GROWTH_PER_DAY: f64 = 0.002;
const DEFAULT_PERTURBATION: f64 = 0.005;
const SYNTHETIC_STEP_JITTER: f64 = 0.01;

pub struct HeuristicForecaster {
    policy: ForecastPolicy,
    perturbation: f64,
}

impl HeuristicForecaster {
    pub fn new(policy: ForecastPolicy) -> Self {
        Self {
            policy,
            perturbation: DEFAULT_PERTURBATION,
        }
    }

    /// Overrides the bounded random perturbation magnitude; zero disables it.
    pub fn with_perturbation(mut self, magnitude: f64) -> Self {
        self.perturbation = magnitude;
        self
    }

    /// Projects `horizon` days from a trailing close window (oldest first).
    ///
    /// Short windows are padded by repeating the first value. The change
    /// baseline is always the latest close: the trend multiplier itself
    /// compounds over the horizon, so each step is an independent projection
    /// from today rather than from the previous step.
    pub fn project(
        &self,
        window: &[f64],
        horizon: u32,
        today: NaiveDate,
        rng: &mut StdRng,
    ) -> Vec<PredictionStep> {
        let padded = pad_window(window, SHORT_MA_WINDOW);
        let Some(&current) = padded.last() else {
            return Vec::new();
        };

        let ma_short = indicators::trailing_mean(&padded, SHORT_MA_WINDOW);
        let ma_long = indicators::trailing_mean(&padded, LONG_MA_WINDOW);
        let rsi = indicators::trailing_rsi(&padded, RSI_WINDOW);

        let mut multiplier = if ma_short > ma_long {
            UPTREND_MULTIPLIER
        } else if ma_short < ma_long {
            DOWNTREND_MULTIPLIER
        } else {
            1.0
        };
        if rsi > OVERBOUGHT_RSI {
            multiplier *= OVERBOUGHT_DAMPING;
        } else if rsi < OVERSOLD_RSI {
            multiplier *= OVERSOLD_BOOST;
        }

        let mut steps = Vec::with_capacity(horizon as usize);
        for day in 1..=horizon {
            let uncertainty = 1.0 + f64::from(day) * UNCERTAINTY_GROWTH_PER_DAY;
            let noise = if self.perturbation > 0.0 {
                rng.random_range(-self.perturbation..=self.perturbation) * uncertainty
            } else {
                0.0
            };
            let raw = current * multiplier.powi(day as i32) * (1.0 + noise);
            let price = self.policy.clamp(raw, current);
            let confidence =
                (BASE_CONFIDENCE - f64::from(day) * CONFIDENCE_DECAY_PER_DAY).max(MIN_CONFIDENCE);

            steps.push(PredictionStep {
                day,
                date: today + Duration::days(i64::from(day)),
                predicted_price: price,
                change: price - current,
                change_pct: (price - current) / current * 100.0,
                confidence: Some(confidence),
            });
        }
        steps
    }
}

/// Random-walk trailing window ending near `anchor`, oldest first. Used when
/// no history at all is available for a pair.
pub fn synthesize_window(anchor: f64, len: usize, rng: &mut StdRng) -> Vec<f64> {
    let mut rates = Vec::with_capacity(len);
    let mut rate = anchor;
    for _ in 0..len {
        rate *= 1.0 + rng.random_range(-SYNTHETIC_STEP_JITTER..=SYNTHETIC_STEP_JITTER);
        rates.push(rate);
    }
    rates
}

fn pad_window(window: &[f64], min_len: usize) -> Vec<f64> {
    let mut padded = window.to_vec();
    if let Some(&first) = window.first() {
        while padded.len() < min_len {
            padded.insert(0, first);
        }
    }
    padded
}
