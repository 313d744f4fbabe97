/// Sensor level mapping.
///
/// The water-level probe is read through the device's ADC and reported as a
/// voltage (nominally 0-3.3 V). The service quantizes that voltage into the
/// four-step `SensorLevel` scale with three ascending breakpoints:
///
/// ```text
///   v <= b0  →  0 (dry)
///   v <= b1  →  1 (low)
///   v <= b2  →  2 (medium)
///   else     →  3 (high)
/// ```
///
/// Breakpoints are calibration data supplied through configuration; the
/// defaults below are the last calibration recorded for the deployed probe.

use serde::{Deserialize, Serialize};

use crate::model::{AlertError, SensorLevel};

/// Default upper bound (inclusive) of each of the first three levels, volts.
pub const DEFAULT_BREAKPOINTS_V: [f64; 3] = [0.75, 1.5, 2.25];

/// Three ascending voltage breakpoints separating the four sensor levels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SensorBreakpoints([f64; 3]);

impl Default for SensorBreakpoints {
    fn default() -> Self {
        SensorBreakpoints(DEFAULT_BREAKPOINTS_V)
    }
}

impl SensorBreakpoints {
    /// Builds a validated breakpoint set.
    pub fn new(breakpoints: [f64; 3]) -> Result<Self, AlertError> {
        let candidate = SensorBreakpoints(breakpoints);
        candidate.validate()?;
        Ok(candidate)
    }

    /// Breakpoints must be finite and strictly ascending, otherwise some
    /// level would be unreachable.
    pub fn validate(&self) -> Result<(), AlertError> {
        if self.0.iter().any(|b| !b.is_finite()) {
            return Err(AlertError::Config(format!(
                "sensor breakpoints must be finite, got {:?}",
                self.0
            )));
        }
        if !(self.0[0] < self.0[1] && self.0[1] < self.0[2]) {
            return Err(AlertError::Config(format!(
                "sensor breakpoints must be strictly ascending, got {:?}",
                self.0
            )));
        }
        Ok(())
    }

    pub fn values(&self) -> [f64; 3] {
        self.0
    }

    /// Maps a voltage to its sensor level.
    ///
    /// Total over `f64`: anything above the last breakpoint, including NaN,
    /// falls through to the highest level. Callers reject non-numeric input
    /// before this point.
    pub fn level_for(&self, voltage: f64) -> SensorLevel {
        let [b0, b1, b2] = self.0;
        if voltage <= b0 {
            SensorLevel::DRY
        } else if voltage <= b1 {
            SensorLevel::LOW
        } else if voltage <= b2 {
            SensorLevel::MEDIUM
        } else {
            SensorLevel::HIGH
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
