use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Ordered feature list for the lightweight profile.
/// The order MUST match the column order produced by the feature builder.
/// Any change here is a breaking change for cached models.
pub const LIGHTWEIGHT_FEATURES: &[&str] = &[
    "sma_5",
    "sma_20",
    "rsi_14",
    "volatility_20",
    "close_lag_1",
    "close_lag_2",
    "close_lag_3",
];

/// Ordered feature list for the full profile.
pub const FULL_FEATURES: &[&str] = &[
    "sma_5",
    "sma_20",
    "sma_50",
    "rsi_14",
    "macd",
    "macd_signal",
    "bb_upper",
    "bb_lower",
    "volatility_20",
    "close_lag_1",
    "close_lag_2",
    "close_lag_3",
    "close_lag_5",
    "returns_lag_1",
    "returns_lag_2",
    "returns_lag_3",
    "returns_lag_5",
];

/// Declared feature set a model is trained and predicts with.
///
/// The profile fixes the feature names and order, the minimum history the
/// indicators need, the lag set, the per-step clamp ceiling and the forest
/// hyper-parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeatureProfile {
    Lightweight,
    Full,
}

impl FeatureProfile {
    pub fn feature_names(&self) -> &'static [&'static str] {
        match self {
            FeatureProfile::Lightweight => LIGHTWEIGHT_FEATURES,
            FeatureProfile::Full => FULL_FEATURES,
        }
    }

    /// Largest indicator window the profile requires.
    pub fn min_window(&self) -> usize {
        match self {
            FeatureProfile::Lightweight => 20,
            FeatureProfile::Full => 50,
        }
    }

    /// Close/return lag offsets included as features.
    pub fn lags(&self) -> &'static [usize] {
        match self {
            FeatureProfile::Lightweight => &[1, 2, 3],
            FeatureProfile::Full => &[1, 2, 3, 5],
        }
    }

    /// Maximum permitted fractional change for a single projected step.
    pub fn clamp_ceiling(&self) -> f64 {
        match self {
            FeatureProfile::Lightweight => 0.05,
            FeatureProfile::Full => 0.10,
        }
    }

    pub fn n_trees(&self) -> usize {
        match self {
            FeatureProfile::Lightweight => 50,
            FeatureProfile::Full => 100,
        }
    }

    pub fn max_depth(&self) -> u16 {
        match self {
            FeatureProfile::Lightweight => 8,
            FeatureProfile::Full => 10,
        }
    }
}

impl FromStr for FeatureProfile {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "lightweight" | "light" => Ok(FeatureProfile::Lightweight),
            "full" => Ok(FeatureProfile::Full),
            _ => anyhow::bail!(
                "Invalid FEATURE_PROFILE: {}. Must be 'lightweight' or 'full'",
                s
            ),
        }
    }
}

impl fmt::Display for FeatureProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureProfile::Lightweight => write!(f, "lightweight"),
            FeatureProfile::Full => write!(f, "full"),
        }
    }
}
