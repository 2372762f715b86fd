//! Feature matrix assembly for the regression path.

use crate::application::indicators;
use crate::application::trainer::MIN_TRAINING_ROWS;
use crate::domain::errors::TrainingError;
use crate::domain::features::FeatureProfile;
use crate::domain::types::PriceSeries;

pub const RSI_WINDOW: usize = 14;
pub const VOLATILITY_WINDOW: usize = 20;
const MACD_FAST: usize = 12;
const MACD_SLOW: usize = 26;
const MACD_SIGNAL: usize = 9;
const BOLLINGER_WINDOW: usize = 20;
const BOLLINGER_STD_DEVS: f64 = 2.0;

/// Tabular training data: one row per usable historical step, a parallel
/// next-day close target, and the latest row used to seed projection.
///
/// Invariant: `rows.len() == targets.len()`, and every row is laid out in
/// `feature_names` order.
#[derive(Debug, Clone)]
pub struct FeatureMatrix {
    pub feature_names: Vec<String>,
    pub rows: Vec<Vec<f64>>,
    pub targets: Vec<f64>,
    pub latest_row: Vec<f64>,
    pub last_close: f64,
}

/// Assembles indicator outputs and lagged closes/returns into a
/// [`FeatureMatrix`] for one declared [`FeatureProfile`].
pub struct FeatureBuilder {
    profile: FeatureProfile,
}

impl FeatureBuilder {
    pub fn new(profile: FeatureProfile) -> Self {
        Self { profile }
    }

    pub fn profile(&self) -> FeatureProfile {
        self.profile
    }

    /// Canonical feature-name list for this configuration. Stored with every
    /// trained model and compared at prediction time.
    pub fn feature_names(&self) -> Vec<String> {
        self.profile
            .feature_names()
            .iter()
            .map(|name| name.to_string())
            .collect()
    }

    pub fn build(&self, series: &PriceSeries) -> Result<FeatureMatrix, TrainingError> {
        series.validate()?;
        let closes = series.closes();
        let n = closes.len();

        let raw = self.columns(&closes);
        debug_assert_eq!(raw.len(), self.profile.feature_names().len());

        // Warm-up rows (any indicator still undefined) are excluded, matching
        // the declared edge policy. Residual interior gaps are then filled
        // forward/backward per column.
        let warmup = raw
            .iter()
            .map(|col| col.iter().position(|cell| cell.is_some()).unwrap_or(n))
            .max()
            .unwrap_or(n);
        if warmup + 1 >= n {
            return Err(TrainingError::InsufficientData {
                usable: 0,
                required: MIN_TRAINING_ROWS,
            });
        }

        let mut dense = Vec::with_capacity(raw.len());
        for col in &raw {
            match fill_column(col) {
                Some(filled) => dense.push(filled),
                None => {
                    return Err(TrainingError::InsufficientData {
                        usable: 0,
                        required: MIN_TRAINING_ROWS,
                    });
                }
            }
        }

        // The final close has no next-day target; its row becomes the seed
        // for iterative projection instead.
        let mut rows = Vec::with_capacity(n - warmup - 1);
        let mut targets = Vec::with_capacity(n - warmup - 1);
        for i in warmup..n - 1 {
            rows.push(dense.iter().map(|col| col[i]).collect());
            targets.push(closes[i + 1]);
        }
        let latest_row = dense.iter().map(|col| col[n - 1]).collect();

        Ok(FeatureMatrix {
            feature_names: self.feature_names(),
            rows,
            targets,
            latest_row,
            last_close: closes[n - 1],
        })
    }

    /// Indicator columns in canonical `feature_names` order.
    fn columns(&self, closes: &[f64]) -> Vec<Vec<Option<f64>>> {
        let rets = indicators::returns(closes);
        let volatility = indicators::rolling_volatility(&rets, VOLATILITY_WINDOW);

        match self.profile {
            FeatureProfile::Lightweight => {
                let mut cols = vec![
                    indicators::sma(closes, 5),
                    indicators::sma(closes, 20),
                    indicators::rsi(closes, RSI_WINDOW),
                    volatility,
                ];
                for &lag in self.profile.lags() {
                    cols.push(lag_closes(closes, lag));
                }
                cols
            }
            FeatureProfile::Full => {
                let (macd_line, macd_signal) =
                    indicators::macd(closes, MACD_FAST, MACD_SLOW, MACD_SIGNAL);
                let (bb_upper, bb_lower) =
                    indicators::bollinger(closes, BOLLINGER_WINDOW, BOLLINGER_STD_DEVS);
                let mut cols = vec![
                    indicators::sma(closes, 5),
                    indicators::sma(closes, 20),
                    indicators::sma(closes, 50),
                    indicators::rsi(closes, RSI_WINDOW),
                    macd_line,
                    macd_signal,
                    bb_upper,
                    bb_lower,
                    volatility,
                ];
                for &lag in self.profile.lags() {
                    cols.push(lag_closes(closes, lag));
                }
                for &lag in self.profile.lags() {
                    cols.push(lag_values(&rets, lag));
                }
                cols
            }
        }
    }
}

fn lag_closes(closes: &[f64], lag: usize) -> Vec<Option<f64>> {
    (0..closes.len())
        .map(|i| if i >= lag { Some(closes[i - lag]) } else { None })
        .collect()
}

fn lag_values(values: &[Option<f64>], lag: usize) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|i| if i >= lag { values[i - lag] } else { None })
        .collect()
}

/// Forward fill then backward fill. `None` for a column with no defined
/// cells at all, which cannot be filled.
fn fill_column(col: &[Option<f64>]) -> Option<Vec<f64>> {
    col.iter().find_map(|cell| *cell)?;

    let mut filled = col.to_vec();
    let mut last = None;
    for cell in filled.iter_mut() {
        if cell.is_some() {
            last = *cell;
        } else {
            *cell = last;
        }
    }
    let mut next = None;
    for cell in filled.iter_mut().rev() {
        if cell.is_some() {
            next = *cell;
        } else {
            *cell = next;
        }
    }
    Some(filled.into_iter().flatten().collect())
}
