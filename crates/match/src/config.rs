use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to parse match config: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid threshold: {0}")]
    InvalidThreshold(String),
}

/// Thresholds for the duplicate detector.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DuplicateConfig {
    /// Absolute amount difference treated as "the same amount" (exclusive).
    pub amount_tolerance: Decimal,
    /// Maximum calendar-day gap treated as "the same date" (inclusive).
    pub date_window_days: i64,
    /// Minimum normalized name length for partial recipient matching.
    pub min_recipient_len: usize,
}

impl Default for DuplicateConfig {
    fn default() -> Self {
        Self {
            amount_tolerance: Decimal::ONE,
            date_window_days: 2,
            min_recipient_len: 3,
        }
    }
}

/// Thresholds for the recurring matcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecurringConfig {
    /// Candidates scoring below this are not considered matches at all.
    pub min_score: f64,
    /// Relative amount tolerance worth full points (inclusive).
    pub tight_amount_pct: f64,
    /// Relative amount tolerance worth half points (inclusive).
    pub loose_amount_pct: f64,
    /// Fraction of the frequency interval treated as the almost-due grace
    /// window.
    pub grace_fraction: f64,
    /// Minimum normalized name length for partial recipient matching.
    pub min_recipient_len: usize,
}

impl Default for RecurringConfig {
    fn default() -> Self {
        Self {
            min_score: 40.0,
            tight_amount_pct: 0.10,
            loose_amount_pct: 0.20,
            grace_fraction: 0.20,
            min_recipient_len: 3,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    pub duplicate: DuplicateConfig,
    pub recurring: RecurringConfig,
}

impl MatchConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: MatchConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.duplicate.amount_tolerance < Decimal::ZERO {
            return Err(ConfigError::InvalidThreshold(
                "duplicate.amount_tolerance must be non-negative".to_string(),
            ));
        }
        if self.duplicate.date_window_days < 0 {
            return Err(ConfigError::InvalidThreshold(
                "duplicate.date_window_days must be non-negative".to_string(),
            ));
        }
        if self.recurring.tight_amount_pct > self.recurring.loose_amount_pct {
            return Err(ConfigError::InvalidThreshold(
                "recurring.tight_amount_pct must not exceed loose_amount_pct".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.recurring.grace_fraction) {
            return Err(ConfigError::InvalidThreshold(
                "recurring.grace_fraction must be within 0..=1".to_string(),
            ));
        }
        if !(0.0..=100.0).contains(&self.recurring.min_score) {
            return Err(ConfigError::InvalidThreshold(
                "recurring.min_score must be within 0..=100".to_string(),
            ));
        }
        Ok(())
    }
}
