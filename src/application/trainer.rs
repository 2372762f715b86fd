//! Random-forest regression fit over the feature matrix.

use smartcore::ensemble::random_forest_regressor::{
    RandomForestRegressor, RandomForestRegressorParameters,
};
use smartcore::linalg::basic::matrix::DenseMatrix;
use tracing::info;

use crate::application::features::FeatureBuilder;
use crate::domain::errors::{ForecastError, TrainingError};
use crate::domain::features::FeatureProfile;
use crate::domain::types::PriceSeries;

/// Training floor: fewer usable rows than this is `InsufficientData`.
pub const MIN_TRAINING_ROWS: usize = 30;
/// Trailing slice held out for the error metric.
const HOLDOUT_FRACTION: f64 = 0.2;
/// Fixed seed so a refit over the same series reproduces the same forest.
pub const DEFAULT_SEED: u64 = 42;

/// Fitted state for one pair: the forest, the feature list it was trained
/// on, its held-out MAE, and the most recent feature row and close at fit
/// time. Immutable once created; a later fit for the same pair replaces the
/// cache entry instead of mutating this.
#[derive(Debug)]
pub struct TrainedModel {
    forest: RandomForestRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>>,
    feature_names: Vec<String>,
    mae: f64,
    last_close: f64,
    latest_row: Vec<f64>,
}

impl TrainedModel {
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Mean absolute error on the held-out trailing slice.
    pub fn mae(&self) -> f64 {
        self.mae
    }

    pub fn last_close(&self) -> f64 {
        self.last_close
    }

    /// Predicts the next close from the stored seed row, after checking that
    /// the caller's declared feature list matches the one the forest was
    /// fitted on.
    pub fn predict_next(&self, expected_features: &[String]) -> Result<f64, ForecastError> {
        if self.feature_names != expected_features {
            return Err(ForecastError::FeatureMismatch {
                expected: self.feature_names.clone(),
                actual: expected_features.to_vec(),
            });
        }

        let input = DenseMatrix::from_2d_vec(&vec![self.latest_row.clone()]).map_err(|e| {
            ForecastError::PredictionFailed {
                reason: e.to_string(),
            }
        })?;
        let predictions =
            self.forest
                .predict(&input)
                .map_err(|e| ForecastError::PredictionFailed {
                    reason: e.to_string(),
                })?;
        predictions
            .first()
            .copied()
            .ok_or_else(|| ForecastError::PredictionFailed {
                reason: "no prediction returned".to_string(),
            })
    }
}

/// Fits a random forest on indicator features against next-day close.
pub struct ModelTrainer {
    builder: FeatureBuilder,
    n_trees: usize,
    max_depth: u16,
    seed: u64,
}

impl ModelTrainer {
    pub fn new(profile: FeatureProfile) -> Self {
        Self::with_seed(profile, DEFAULT_SEED)
    }

    pub fn with_seed(profile: FeatureProfile, seed: u64) -> Self {
        Self {
            builder: FeatureBuilder::new(profile),
            n_trees: profile.n_trees(),
            max_depth: profile.max_depth(),
            seed,
        }
    }

    pub fn profile(&self) -> FeatureProfile {
        self.builder.profile()
    }

    pub fn feature_names(&self) -> Vec<String> {
        self.builder.feature_names()
    }

    pub fn train(&self, series: &PriceSeries) -> Result<TrainedModel, TrainingError> {
        let matrix = self.builder.build(series)?;
        let usable = matrix.rows.len();
        if usable < MIN_TRAINING_ROWS {
            return Err(TrainingError::InsufficientData {
                usable,
                required: MIN_TRAINING_ROWS,
            });
        }

        // Chronological split; shuffling would leak future rows into training.
        let split = (usable as f64 * (1.0 - HOLDOUT_FRACTION)).floor() as usize;
        let x_train = matrix.rows[..split].to_vec();
        let y_train = matrix.targets[..split].to_vec();
        let x_test = matrix.rows[split..].to_vec();
        let y_test = matrix.targets[split..].to_vec();

        let x_matrix =
            DenseMatrix::from_2d_vec(&x_train).map_err(|e| TrainingError::FitFailed {
                reason: e.to_string(),
            })?;
        let params = RandomForestRegressorParameters::default()
            .with_n_trees(self.n_trees)
            .with_max_depth(self.max_depth)
            .with_seed(self.seed);
        let forest = RandomForestRegressor::fit(&x_matrix, &y_train, params).map_err(|e| {
            TrainingError::FitFailed {
                reason: e.to_string(),
            }
        })?;

        let x_test_matrix =
            DenseMatrix::from_2d_vec(&x_test).map_err(|e| TrainingError::FitFailed {
                reason: e.to_string(),
            })?;
        let predicted = forest
            .predict(&x_test_matrix)
            .map_err(|e| TrainingError::FitFailed {
                reason: e.to_string(),
            })?;
        let mae = predicted
            .iter()
            .zip(y_test.iter())
            .map(|(p, t)| (p - t).abs())
            .sum::<f64>()
            / predicted.len() as f64;

        info!(
            "model for {} trained on {} rows ({} held out), MAE {:.6}",
            series.pair,
            split,
            usable - split,
            mae
        );

        Ok(TrainedModel {
            forest,
            feature_names: matrix.feature_names,
            mae,
            last_close: matrix.last_close,
            latest_row: matrix.latest_row,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::PricePoint;

    fn series(len: usize) -> PriceSeries {
        let points = (0..len)
            .map(|i| PricePoint {
                timestamp: i as i64 * 86_400,
                close: 150.0 + (i as f64 * 0.25).sin() * 1.2 + i as f64 * 0.005,
            })
            .collect();
        PriceSeries::new("USD/JPY", points)
    }

    #[test]
    fn training_produces_a_finite_mae() {
        let model = ModelTrainer::new(FeatureProfile::Lightweight)
            .train(&series(120))
            .unwrap();
        assert!(model.mae().is_finite());
        assert!(model.mae() >= 0.0);
        assert_eq!(model.feature_names().len(), 7);
    }

    #[test]
    fn training_is_deterministic_for_a_fixed_seed() {
        let trainer = ModelTrainer::new(FeatureProfile::Lightweight);
        let input = series(120);
        let first = trainer.train(&input).unwrap();
        let second = trainer.train(&input).unwrap();
        assert_eq!(first.mae().to_bits(), second.mae().to_bits());
    }

    #[test]
    fn short_series_reports_insufficient_data() {
        let err = ModelTrainer::new(FeatureProfile::Lightweight)
            .train(&series(3))
            .unwrap_err();
        assert!(matches!(err, TrainingError::InsufficientData { .. }));
    }

    #[test]
    fn prediction_rejects_a_mismatched_feature_list() {
        let model = ModelTrainer::new(FeatureProfile::Lightweight)
            .train(&series(120))
            .unwrap();
        let full_names: Vec<String> = FeatureProfile::Full
            .feature_names()
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert!(matches!(
            model.predict_next(&full_names),
            Err(ForecastError::FeatureMismatch { .. })
        ));
    }

    #[test]
    fn prediction_from_seed_row_is_finite() {
        let trainer = ModelTrainer::new(FeatureProfile::Lightweight);
        let model = trainer.train(&series(120)).unwrap();
        let predicted = model.predict_next(&trainer.feature_names()).unwrap();
        assert!(predicted.is_finite());
    }
}
