//! Zone risk classification.
//!
//! Bins a continuous zone risk score into the three ordinal `RiskBand`s.
//! Both thresholds are inclusive upper bounds:
//!
//! ```text
//!   score <= low_max     →  LOW
//!   score <= medium_max  →  MEDIUM
//!   else                 →  HIGH
//! ```

use serde::{Deserialize, Serialize};

use crate::model::{AlertError, RiskBand};

pub const DEFAULT_LOW_MAX: f64 = 45.0;
pub const DEFAULT_MEDIUM_MAX: f64 = 65.0;

/// Upper bounds of the LOW and MEDIUM bands.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskThresholds {
    pub low_max: f64,
    pub medium_max: f64,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            low_max: DEFAULT_LOW_MAX,
            medium_max: DEFAULT_MEDIUM_MAX,
        }
    }
}

impl RiskThresholds {
    pub fn validate(&self) -> Result<(), AlertError> {
        if !self.low_max.is_finite() || !self.medium_max.is_finite() {
            return Err(AlertError::Config("risk thresholds must be finite".to_string()));
        }
        if self.low_max >= self.medium_max {
            return Err(AlertError::Config(format!(
                "risk low_max ({}) must be below medium_max ({})",
                self.low_max, self.medium_max
            )));
        }
        Ok(())
    }

    /// Classifies a score. NaN compares false against both bounds and so
    /// lands in HIGH, the most sensitive band.
    pub fn classify(&self, score: f64) -> RiskBand {
        if score <= self.low_max {
            RiskBand::Low
        } else if score <= self.medium_max {
            RiskBand::Medium
        } else {
            RiskBand::High
        }
    }
}

/// Classifies with the default thresholds.
pub fn classify(score: f64) -> RiskBand {
    RiskThresholds::default().classify(score)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
