//! Configuration structures for the extraction engine.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{BillsenseError, Result};

/// Main configuration for the billsense engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BillsenseConfig {
    /// Units and amount extraction configuration.
    pub extraction: ExtractionConfig,

    /// Date normalization configuration.
    pub dates: DateConfig,
}

/// Numeric sanity bounds applied to every units/amount candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Smallest accepted consumption value.
    pub min_units: f64,

    /// Largest accepted consumption value.
    pub max_units: f64,

    /// Smallest accepted payable amount.
    pub min_amount: f64,

    /// Largest accepted payable amount.
    pub max_amount: f64,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            min_units: 1.0,
            max_units: 100_000.0,
            min_amount: 50.0,
            max_amount: 1_000_000.0,
        }
    }
}

const MAX_FUTURE_DAYS: i64 = 366;
const MAX_AGE_YEARS: u32 = 100;
const MAX_LOOKBACK_YEARS: i32 = 50;

/// Plausibility window for bill dates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DateConfig {
    /// Earliest year a bill date may carry.
    pub min_year: i32,

    /// Latest year a bill date may carry.
    pub max_year: i32,

    /// How many days past "today" a bill date may lie.
    pub max_future_days: i64,

    /// How many years before "today" a bill date may lie.
    pub max_age_years: u32,

    /// Number of years before the current one considered when repairing a
    /// corrupted year by digit overlap.
    pub repair_lookback_years: i32,
}

impl Default for DateConfig {
    fn default() -> Self {
        Self {
            min_year: 2000,
            max_year: 2050,
            max_future_days: 1,
            max_age_years: 10,
            repair_lookback_years: 5,
        }
    }
}

impl BillsenseConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self =
            serde_json::from_str(&content).map_err(|e| BillsenseError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| BillsenseError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject inverted or empty ranges.
    pub fn validate(&self) -> Result<()> {
        let e = &self.extraction;
        if !(e.min_units <= e.max_units) {
            return Err(BillsenseError::Config(format!(
                "min_units {} exceeds max_units {}",
                e.min_units, e.max_units
            )));
        }
        if !(e.min_amount <= e.max_amount) {
            return Err(BillsenseError::Config(format!(
                "min_amount {} exceeds max_amount {}",
                e.min_amount, e.max_amount
            )));
        }
        let d = &self.dates;
        if d.min_year > d.max_year {
            return Err(BillsenseError::Config(format!(
                "min_year {} exceeds max_year {}",
                d.min_year, d.max_year
            )));
        }
        if !(0..=MAX_FUTURE_DAYS).contains(&d.max_future_days) {
            return Err(BillsenseError::Config(format!(
                "max_future_days must be between 0 and {}",
                MAX_FUTURE_DAYS
            )));
        }
        if d.max_age_years > MAX_AGE_YEARS {
            return Err(BillsenseError::Config(format!(
                "max_age_years must be at most {}",
                MAX_AGE_YEARS
            )));
        }
        if !(0..=MAX_LOOKBACK_YEARS).contains(&d.repair_lookback_years) {
            return Err(BillsenseError::Config(format!(
                "repair_lookback_years must be between 0 and {}",
                MAX_LOOKBACK_YEARS
            )));
        }
        Ok(())
    }
}
