//! Estimator configuration
//!
//! Read from `<config_dir>/creditcast/config.toml` unless a path is given.
//! Every field has a default so a partial file is valid.

use crate::analytics::MAX_PROJECTION_MONTHS;
use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Tunables shared by every command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    /// USD per credit
    pub credit_cost: f64,
    /// Days of history requested from the usage source
    pub lookback_days: u32,
    /// Monthly growth rate for projections (0.25 = 25%)
    pub growth_rate: f64,
    /// Months projected forward
    pub projection_months: u32,
    /// Fixed variance band, bypassing the confidence-derived one
    pub variance_override: Option<f64>,
    /// Safety buffer added on top of the upper annual bound
    pub budget_buffer: f64,
    /// Freshness window of the fetch cache
    pub cache_ttl_secs: u64,
    /// Maximum cached fetch results
    pub cache_max_entries: u64,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            credit_cost: 3.00,
            lookback_days: 30,
            growth_rate: 0.25,
            projection_months: 12,
            variance_override: None,
            budget_buffer: 0.15,
            cache_ttl_secs: 300,
            cache_max_entries: 10,
        }
    }
}

impl EstimatorConfig {
    /// `<config_dir>/creditcast/config.toml`, if the platform has a config dir
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("creditcast").join("config.toml"))
    }

    /// Load from an explicit path; a missing file is an error
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                CoreError::FileNotFound {
                    path: path.to_path_buf(),
                }
            } else {
                CoreError::FileRead {
                    path: path.to_path_buf(),
                    source: e,
                }
            }
        })?;

        Self::from_toml(&content, path)
    }

    /// Load from the default location, falling back to defaults when absent
    pub fn load_or_default() -> Result<Self, CoreError> {
        match Self::default_path() {
            Some(path) if path.exists() => {
                tracing::debug!(path = %path.display(), "Loading config");
                Self::load(&path)
            }
            _ => Ok(Self::default()),
        }
    }

    fn from_toml(content: &str, path: &Path) -> Result<Self, CoreError> {
        let config: Self = toml::from_str(content).map_err(|e| CoreError::ConfigParse {
            path: path.to_path_buf(),
            message: e.message().to_string(),
            source: e,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the engine cannot work with
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.credit_cost.is_nan() || self.credit_cost <= 0.0 {
            return Err(invalid(format!(
                "credit_cost must be positive (got {})",
                self.credit_cost
            )));
        }
        if self.lookback_days == 0 {
            return Err(invalid("lookback_days must be at least 1".to_string()));
        }
        if let Some(variance) = self.variance_override {
            if variance.is_nan() || variance <= 0.0 || variance >= 1.0 {
                return Err(invalid(format!(
                    "variance_override must be between 0 and 1 (got {})",
                    variance
                )));
            }
        }
        if self.growth_rate.is_nan() || self.growth_rate <= -1.0 {
            return Err(CoreError::InvalidGrowthRate {
                rate: self.growth_rate,
            });
        }
        if self.projection_months > MAX_PROJECTION_MONTHS {
            return Err(CoreError::InvalidHorizon {
                months: self.projection_months,
                max: MAX_PROJECTION_MONTHS,
            });
        }
        if self.budget_buffer < 0.0 {
            return Err(invalid(format!(
                "budget_buffer cannot be negative (got {})",
                self.budget_buffer
            )));
        }
        Ok(())
    }
}

fn invalid(message: String) -> CoreError {
    CoreError::InvalidConfig { message }
}
