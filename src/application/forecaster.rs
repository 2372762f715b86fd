//! Iterative multi-day projection from a fitted model.

use anyhow::Result;
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::application::trainer::TrainedModel;
use crate::domain::errors::ForecastError;
use crate::domain::features::FeatureProfile;
use crate::domain::types::PredictionStep;

/// Baseline used when reporting per-step change.
///
/// The per-step clamp always works against the rolling price; this only
/// selects what `change`/`change_pct` are measured from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeBaseline {
    /// Every step reports change vs the last known close.
    Initial,
    /// Every step reports change vs the previous projected price.
    Rolling,
}

impl FromStr for ChangeBaseline {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "initial" => Ok(ChangeBaseline::Initial),
            "rolling" => Ok(ChangeBaseline::Rolling),
            _ => anyhow::bail!(
                "Invalid CHANGE_BASELINE: {}. Must be 'initial' or 'rolling'",
                s
            ),
        }
    }
}

/// Per-step projection policy shared by both prediction strategies.
#[derive(Debug, Clone, Copy)]
pub struct ForecastPolicy {
    /// Maximum permitted fractional change for one step.
    pub clamp_ceiling: f64,
    pub baseline: ChangeBaseline,
}

impl ForecastPolicy {
    pub fn for_profile(profile: FeatureProfile) -> Self {
        Self {
            clamp_ceiling: profile.clamp_ceiling(),
            baseline: ChangeBaseline::Rolling,
        }
    }

    /// Clips `raw` so the change rate vs `current` never exceeds the
    /// ceiling, sign preserved.
    pub fn clamp(&self, raw: f64, current: f64) -> f64 {
        let change_rate = (raw - current) / current;
        if change_rate.abs() > self.clamp_ceiling {
            let bounded = if change_rate > 0.0 {
                self.clamp_ceiling
            } else {
                -self.clamp_ceiling
            };
            current * (1.0 + bounded)
        } else {
            raw
        }
    }
}

/// Projects N days ahead by repeatedly feeding the model's seed feature row
/// through the forest and clamping each step against the rolling price.
pub struct Forecaster {
    policy: ForecastPolicy,
}

impl Forecaster {
    pub fn new(policy: ForecastPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> ForecastPolicy {
        self.policy
    }

    pub fn project(
        &self,
        model: &TrainedModel,
        expected_features: &[String],
        horizon: u32,
        today: NaiveDate,
    ) -> Result<Vec<PredictionStep>, ForecastError> {
        let initial = model.last_close();
        let mut current = initial;
        let mut steps = Vec::with_capacity(horizon as usize);

        for day in 1..=horizon {
            let raw = model.predict_next(expected_features)?;
            let price = self.policy.clamp(raw, current);
            let base = match self.policy.baseline {
                ChangeBaseline::Initial => initial,
                ChangeBaseline::Rolling => current,
            };
            steps.push(PredictionStep {
                day,
                date: today + Duration::days(i64::from(day)),
                predicted_price: price,
                change: price - base,
                change_pct: (price - base) / base * 100.0,
                confidence: None,
            });
            current = price;
        }

        Ok(steps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::trainer::ModelTrainer;
    use crate::domain::types::{PricePoint, PriceSeries};

    fn policy(ceiling: f64, baseline: ChangeBaseline) -> ForecastPolicy {
        ForecastPolicy {
            clamp_ceiling: ceiling,
            baseline,
        }
    }

    fn trained() -> (ModelTrainer, crate::application::trainer::TrainedModel) {
        let trainer = ModelTrainer::new(FeatureProfile::Lightweight);
        let points = (0..120)
            .map(|i| PricePoint {
                timestamp: i as i64 * 86_400,
                close: 150.0 + (i as f64 * 0.25).sin() * 1.2 + i as f64 * 0.005,
            })
            .collect();
        let model = trainer
            .train(&PriceSeries::new("USD/JPY", points))
            .unwrap();
        (trainer, model)
    }

    #[test]
    fn clamp_limits_the_change_rate_exactly() {
        let p = policy(0.05, ChangeBaseline::Rolling);
        assert_eq!(p.clamp(200.0, 100.0), 105.0);
        assert_eq!(p.clamp(50.0, 100.0), 95.0);
        // within the band the raw value passes through untouched
        assert_eq!(p.clamp(103.0, 100.0), 103.0);
    }

    #[test]
    fn projection_yields_one_step_per_day() {
        let (trainer, model) = trained();
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let steps = Forecaster::new(policy(0.05, ChangeBaseline::Rolling))
            .project(&model, &trainer.feature_names(), 10, today)
            .unwrap();
        assert_eq!(steps.len(), 10);
        for (i, step) in steps.iter().enumerate() {
            assert_eq!(step.day, i as u32 + 1);
            assert_eq!(step.date, today + Duration::days(i as i64 + 1));
            assert!(step.confidence.is_none());
        }
    }

    #[test]
    fn clamp_invariant_holds_for_every_step() {
        let (trainer, model) = trained();
        let ceiling = 0.05;
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let steps = Forecaster::new(policy(ceiling, ChangeBaseline::Rolling))
            .project(&model, &trainer.feature_names(), 10, today)
            .unwrap();
        let mut current = model.last_close();
        for step in &steps {
            let rate = (step.predicted_price - current) / current;
            assert!(rate.abs() <= ceiling + 1e-12);
            current = step.predicted_price;
        }
    }

    #[test]
    fn initial_baseline_reports_change_from_last_close() {
        let (trainer, model) = trained();
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let steps = Forecaster::new(policy(0.05, ChangeBaseline::Initial))
            .project(&model, &trainer.feature_names(), 5, today)
            .unwrap();
        for step in &steps {
            let expected = step.predicted_price - model.last_close();
            assert!((step.change - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn mismatched_features_fail_the_whole_projection() {
        let (_, model) = trained();
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let wrong: Vec<String> = FeatureProfile::Full
            .feature_names()
            .iter()
            .map(|s| s.to_string())
            .collect();
        let result = Forecaster::new(policy(0.05, ChangeBaseline::Rolling))
            .project(&model, &wrong, 5, today);
        assert!(matches!(result, Err(ForecastError::FeatureMismatch { .. })));
    }

    #[test]
    fn baseline_parses_from_str() {
        assert_eq!(
            "rolling".parse::<ChangeBaseline>().unwrap(),
            ChangeBaseline::Rolling
        );
        assert_eq!(
            "Initial".parse::<ChangeBaseline>().unwrap(),
            ChangeBaseline::Initial
        );
        assert!("pinned".parse::<ChangeBaseline>().is_err());
    }
}
