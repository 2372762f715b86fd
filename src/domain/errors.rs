use thiserror::Error;

/// Validation failures on an input price series
#[derive(Debug, Error)]
pub enum SeriesError {
    #[error("price series for {pair} is empty")]
    Empty { pair: String },

    #[error("price series for {pair} is not chronological at index {index}")]
    OutOfOrder { pair: String, index: usize },

    #[error("duplicate timestamp {timestamp} in price series for {pair}")]
    DuplicateTimestamp { pair: String, timestamp: i64 },

    #[error("non-finite close at index {index} in price series for {pair}")]
    NonFinite { pair: String, index: usize },
}

/// Errors raised while fitting a model
#[derive(Debug, Error)]
pub enum TrainingError {
    #[error("insufficient data: {usable} usable rows, need at least {required}")]
    InsufficientData { usable: usize, required: usize },

    #[error("invalid series: {0}")]
    InvalidSeries(#[from] SeriesError),

    #[error("model fit failed: {reason}")]
    FitFailed { reason: String },
}

/// Errors from the market-data collaborator
#[derive(Debug, Error)]
pub enum MarketDataError {
    #[error("market data unavailable for {pair}: {reason}")]
    Unavailable { pair: String, reason: String },

    #[error("invalid market data for {pair}: {reason}")]
    InvalidData { pair: String, reason: String },
}

/// Errors surfaced by a forecast request
#[derive(Debug, Error)]
pub enum ForecastError {
    #[error("horizon must be between 1 and {max} days, got {requested}")]
    InvalidHorizon { requested: u32, max: u32 },

    #[error("feature mismatch: model was trained on {expected:?}, current configuration declares {actual:?}")]
    FeatureMismatch {
        expected: Vec<String>,
        actual: Vec<String>,
    },

    #[error(transparent)]
    Training(#[from] TrainingError),

    #[error(transparent)]
    MarketData(#[from] MarketDataError),

    #[error("prediction failed: {reason}")]
    PredictionFailed { reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_data_formatting() {
        let err = TrainingError::InsufficientData {
            usable: 12,
            required: 30,
        };
        let msg = err.to_string();
        assert!(msg.contains("12"));
        assert!(msg.contains("30"));
    }

    #[test]
    fn series_error_converts_into_training_error() {
        let err: TrainingError = SeriesError::Empty {
            pair: "EUR/USD".to_string(),
        }
        .into();
        assert!(err.to_string().contains("EUR/USD"));
    }

    #[test]
    fn feature_mismatch_lists_both_sides() {
        let err = ForecastError::FeatureMismatch {
            expected: vec!["sma_5".to_string()],
            actual: vec!["rsi_14".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("sma_5"));
        assert!(msg.contains("rsi_14"));
    }
}
