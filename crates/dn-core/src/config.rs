//! Run configuration for the interest calculation
//!
//! The configuration is an immutable scalar bundle passed into every core
//! call; defaults belong to this boundary layer, never to the transformation
//! logic itself.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

/// How the `interst working` column is derived.
///
/// Two variants of this system exist in the field: one carries a fixed
/// working-day constant into every row, the other derives working days from
/// each row's age. The policy is an explicit configuration choice because it
/// changes the interest amount system-wide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkingDaysPolicy {
    /// `interst working` = the configured constant for every row
    #[default]
    Fixed,
    /// `interst working` = `Age - Due days` per row, uncapped
    Dynamic,
}

impl std::str::FromStr for WorkingDaysPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "fixed" => Ok(Self::Fixed),
            "dynamic" => Ok(Self::Dynamic),
            other => Err(format!(
                "unknown working-days policy '{other}' (expected 'fixed' or 'dynamic')"
            )),
        }
    }
}

/// Scalar configuration for one transformation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterestConfig {
    /// Days after which a row is considered for interest (1-365)
    pub due_days_threshold: i64,
    /// Daily interest rate in percent (0.01-1.0)
    pub per_day_interest_rate: f64,
    /// Working days in the current interest period (1-31)
    pub interest_working_days: i64,
    /// Age assigned to "Customer Opening Balance" entries (150-500)
    pub opening_balance_age: i64,
    /// Derivation policy for the `interst working` column
    pub working_days_policy: WorkingDaysPolicy,
}

impl Default for InterestConfig {
    fn default() -> Self {
        Self {
            due_days_threshold: 150,
            per_day_interest_rate: 0.06,
            interest_working_days: 31,
            opening_balance_age: 300,
            working_days_policy: WorkingDaysPolicy::Fixed,
        }
    }
}

impl InterestConfig {
    /// Check every scalar against its documented range
    ///
    /// Runs before any row processing; an out-of-range value is fatal.
    pub fn validate(&self) -> Result<()> {
        range_check("due_days_threshold", self.due_days_threshold as f64, 1.0, 365.0)?;
        range_check(
            "per_day_interest_rate",
            self.per_day_interest_rate,
            0.01,
            1.0,
        )?;
        range_check(
            "interest_working_days",
            self.interest_working_days as f64,
            1.0,
            31.0,
        )?;
        range_check(
            "opening_balance_age",
            self.opening_balance_age as f64,
            150.0,
            500.0,
        )?;
        Ok(())
    }

    /// Load a configuration from JSON and validate it
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| Error::FileRead {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save the configuration to JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }
}

fn range_check(field: &'static str, value: f64, min: f64, max: f64) -> Result<()> {
    if value < min || value > max {
        return Err(Error::ConfigOutOfRange {
            field,
            value,
            min,
            max,
        });
    }
    Ok(())
}
