use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::errors::SeriesError;

/// A single close observation. Timestamps are unix seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub timestamp: i64,
    pub close: f64,
}

/// Chronological close-price history for one currency pair.
///
/// The engine treats a series as read-only input. Validation rejects
/// out-of-order or duplicate timestamps and non-finite closes instead of
/// coercing them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceSeries {
    pub pair: String,
    pub points: Vec<PricePoint>,
}

impl PriceSeries {
    pub fn new(pair: impl Into<String>, points: Vec<PricePoint>) -> Self {
        Self {
            pair: pair.into(),
            points,
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.close).collect()
    }

    pub fn last_close(&self) -> Option<f64> {
        self.points.last().map(|p| p.close)
    }

    pub fn validate(&self) -> Result<(), SeriesError> {
        if self.points.is_empty() {
            return Err(SeriesError::Empty {
                pair: self.pair.clone(),
            });
        }
        for (i, point) in self.points.iter().enumerate() {
            if !point.close.is_finite() {
                return Err(SeriesError::NonFinite {
                    pair: self.pair.clone(),
                    index: i,
                });
            }
            if i > 0 {
                let prev = self.points[i - 1].timestamp;
                if point.timestamp == prev {
                    return Err(SeriesError::DuplicateTimestamp {
                        pair: self.pair.clone(),
                        timestamp: point.timestamp,
                    });
                }
                if point.timestamp < prev {
                    return Err(SeriesError::OutOfOrder {
                        pair: self.pair.clone(),
                        index: i,
                    });
                }
            }
        }
        Ok(())
    }
}

/// Where the closes behind a forecast came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataSource {
    Live,
    Simulated,
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::Live => write!(f, "LIVE"),
            DataSource::Simulated => write!(f, "SIMULATED"),
        }
    }
}

/// One projected day of a forecast.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionStep {
    pub day: u32,
    pub date: NaiveDate,
    pub predicted_price: f64,
    pub change: f64,
    pub change_pct: f64,
    /// Heuristic-path confidence score (0-100). `None` on the model path,
    /// which reports its validation MAE on the enclosing [`Forecast`].
    pub confidence: Option<f64>,
}

/// Complete forecast for one pair over a horizon, ordered by ascending day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Forecast {
    pub pair: String,
    pub current_price: f64,
    pub source: DataSource,
    /// Held-out mean absolute error of the fitted model. `None` when the
    /// heuristic strategy produced the steps.
    pub validation_mae: Option<f64>,
    pub steps: Vec<PredictionStep>,
}

/// Display name for a supported pair, as rendered by presentation layers.
pub fn pair_display_name(pair: &str) -> Option<&'static str> {
    match pair {
        "USD/JPY" => Some("USD/JPY (US Dollar/Japanese Yen)"),
        "EUR/JPY" => Some("EUR/JPY (Euro/Japanese Yen)"),
        "EUR/USD" => Some("EUR/USD (Euro/US Dollar)"),
        _ => None,
    }
}
