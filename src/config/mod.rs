//! Configuration module for fxcast.
//!
//! Structured configuration loading from environment variables: feature
//! profile, projection policy, provider selection and reproducibility knobs.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::env;
use std::str::FromStr;

use crate::application::forecaster::{ChangeBaseline, ForecastPolicy};
use crate::application::service::{
    DEFAULT_HISTORY_DAYS, DEFAULT_MAX_HORIZON, ForecastServiceConfig,
};
use crate::application::trainer::DEFAULT_SEED;
use crate::domain::features::FeatureProfile;

/// Which market-data implementation to construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderMode {
    Live,
    Simulated,
}

impl FromStr for ProviderMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "live" => Ok(ProviderMode::Live),
            "simulated" | "sim" => Ok(ProviderMode::Simulated),
            _ => anyhow::bail!("Invalid PROVIDER_MODE: {}. Must be 'live' or 'simulated'", s),
        }
    }
}

/// Default anchors for the supported pairs, used by the simulated provider
/// and the no-data heuristic fallback.
pub fn default_base_rates() -> HashMap<String, f64> {
    HashMap::from([
        ("USD/JPY".to_string(), 150.0),
        ("EUR/JPY".to_string(), 160.0),
        ("EUR/USD".to_string(), 1.08),
    ])
}

/// Engine configuration loaded from the environment.
#[derive(Debug, Clone)]
pub struct ForecastEnvConfig {
    pub provider_mode: ProviderMode,
    pub profile: FeatureProfile,
    pub baseline: ChangeBaseline,
    /// Overrides the profile's clamp ceiling when set.
    pub clamp_override: Option<f64>,
    pub max_horizon: u32,
    pub history_days: usize,
    pub seed: u64,
}

impl ForecastEnvConfig {
    pub fn from_env() -> Result<Self> {
        let provider_mode = env::var("PROVIDER_MODE")
            .unwrap_or_else(|_| "simulated".to_string())
            .parse::<ProviderMode>()?;
        let profile = env::var("FEATURE_PROFILE")
            .unwrap_or_else(|_| "full".to_string())
            .parse::<FeatureProfile>()?;
        let baseline = env::var("CHANGE_BASELINE")
            .unwrap_or_else(|_| "rolling".to_string())
            .parse::<ChangeBaseline>()?;

        let clamp_override = match env::var("CLAMP_CEILING_OVERRIDE") {
            Ok(raw) => {
                let ceiling = raw
                    .parse::<f64>()
                    .context("Failed to parse CLAMP_CEILING_OVERRIDE - must be a fraction")?;
                if !(0.0..1.0).contains(&ceiling) || ceiling == 0.0 {
                    anyhow::bail!(
                        "CLAMP_CEILING_OVERRIDE must be a fraction in (0, 1), got {}",
                        ceiling
                    );
                }
                Some(ceiling)
            }
            Err(_) => None,
        };

        Ok(Self {
            provider_mode,
            profile,
            baseline,
            clamp_override,
            max_horizon: parse_u32("MAX_HORIZON_DAYS", DEFAULT_MAX_HORIZON)?,
            history_days: parse_usize("HISTORY_DAYS", DEFAULT_HISTORY_DAYS)?,
            seed: parse_u64("FORECAST_SEED", DEFAULT_SEED)?,
        })
    }

    pub fn policy(&self) -> ForecastPolicy {
        ForecastPolicy {
            clamp_ceiling: self
                .clamp_override
                .unwrap_or_else(|| self.profile.clamp_ceiling()),
            baseline: self.baseline,
        }
    }

    pub fn service_config(&self) -> ForecastServiceConfig {
        ForecastServiceConfig {
            profile: self.profile,
            policy: self.policy(),
            max_horizon: self.max_horizon,
            history_days: self.history_days,
            seed: self.seed,
            fallback_rates: default_base_rates(),
        }
    }
}

fn parse_u32(key: &str, default: u32) -> Result<u32> {
    match env::var(key) {
        Ok(raw) => raw
            .parse::<u32>()
            .with_context(|| format!("Failed to parse {key} - must be a positive integer")),
        Err(_) => Ok(default),
    }
}

fn parse_usize(key: &str, default: usize) -> Result<usize> {
    match env::var(key) {
        Ok(raw) => raw
            .parse::<usize>()
            .with_context(|| format!("Failed to parse {key} - must be a positive integer")),
        Err(_) => Ok(default),
    }
}

fn parse_u64(key: &str, default: u64) -> Result<u64> {
    match env::var(key) {
        Ok(raw) => raw
            .parse::<u64>()
            .with_context(|| format!("Failed to parse {key} - must be a non-negative integer")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_mode_parses_from_str() {
        assert_eq!("live".parse::<ProviderMode>().unwrap(), ProviderMode::Live);
        assert_eq!(
            "SIM".parse::<ProviderMode>().unwrap(),
            ProviderMode::Simulated
        );
        assert!("oracle".parse::<ProviderMode>().is_err());
    }

    #[test]
    fn base_rate_table_covers_supported_pairs() {
        let rates = default_base_rates();
        assert_eq!(rates.get("USD/JPY"), Some(&150.0));
        assert_eq!(rates.get("EUR/JPY"), Some(&160.0));
        assert_eq!(rates.get("EUR/USD"), Some(&1.08));
    }

    #[test]
    fn policy_prefers_the_override_ceiling() {
        let config = ForecastEnvConfig {
            provider_mode: ProviderMode::Simulated,
            profile: FeatureProfile::Full,
            baseline: ChangeBaseline::Rolling,
            clamp_override: Some(0.02),
            max_horizon: DEFAULT_MAX_HORIZON,
            history_days: DEFAULT_HISTORY_DAYS,
            seed: DEFAULT_SEED,
        };
        assert_eq!(config.policy().clamp_ceiling, 0.02);

        let without_override = ForecastEnvConfig {
            clamp_override: None,
            ..config
        };
        assert_eq!(without_override.policy().clamp_ceiling, 0.10);
    }
}
