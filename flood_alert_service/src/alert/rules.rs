//! Alert decision table.
//!
//! Combines the zone's risk band with the current sensor level into a
//! traffic-light alert. The zone band sets the sensitivity: the riskier the
//! zone, the lower the water level needed to escalate.
//!
//! | band   | 0     | 1      | 2      | 3      |
//! |--------|-------|--------|--------|--------|
//! | LOW    | GREEN | GREEN  | GREEN  | YELLOW |
//! | MEDIUM | GREEN | GREEN  | YELLOW | RED    |
//! | HIGH   | GREEN | YELLOW | RED    | RED    |
//!
//! Within a band, severity never decreases as the sensor level rises. A
//! retuned table supplied through configuration must keep that property.

use serde::{Deserialize, Serialize};

use crate::model::{AlertColor, AlertError, RiskBand, SensorLevel};

use crate::model::AlertColor::{Green, Red, Yellow};

/// One row per risk band, one column per sensor level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionTable {
    #[serde(rename = "bajo", alias = "low")]
    low: [AlertColor; 4],
    #[serde(rename = "medio", alias = "medium")]
    medium: [AlertColor; 4],
    #[serde(rename = "alto", alias = "high")]
    high: [AlertColor; 4],
}

pub const DEFAULT_TABLE: DecisionTable = DecisionTable {
    low: [Green, Green, Green, Yellow],
    medium: [Green, Green, Yellow, Red],
    high: [Green, Yellow, Red, Red],
};

impl Default for DecisionTable {
    fn default() -> Self {
        DEFAULT_TABLE
    }
}

impl DecisionTable {
    /// Builds a table from explicit rows, rejecting it unless every cell is
    /// a real alert and each row is non-decreasing in severity.
    pub fn new(
        low: [AlertColor; 4],
        medium: [AlertColor; 4],
        high: [AlertColor; 4],
    ) -> Result<Self, AlertError> {
        let table = DecisionTable { low, medium, high };
        table.validate()?;
        Ok(table)
    }

    pub fn validate(&self) -> Result<(), AlertError> {
        for band in RiskBand::ALL {
            let row = self.row(band);
            let mut previous = 0u8;
            for (level, color) in row.iter().enumerate() {
                let severity = color.severity().ok_or_else(|| {
                    AlertError::Config(format!(
                        "decision table row {} level {} uses the {} sentinel",
                        band, level, color
                    ))
                })?;
                if severity < previous {
                    return Err(AlertError::Config(format!(
                        "decision table row {} decreases in severity at level {}",
                        band, level
                    )));
                }
                previous = severity;
            }
        }
        Ok(())
    }

    fn row(&self, band: RiskBand) -> &[AlertColor; 4] {
        match band {
            RiskBand::Low => &self.low,
            RiskBand::Medium => &self.medium,
            RiskBand::High => &self.high,
        }
    }

    /// Looks up the alert for a validated sensor level.
    pub fn decide(&self, band: RiskBand, level: SensorLevel) -> AlertColor {
        self.row(band)[usize::from(level.value())]
    }

    /// Looks up the alert for a raw level, failing with
    /// `InvalidSensorLevel` instead of clamping when it is out of range.
    pub fn decide_raw(&self, band: RiskBand, level: u8) -> Result<AlertColor, AlertError> {
        let level = SensorLevel::new(level)?;
        Ok(self.decide(band, level))
    }
}

/// Decides with the default table.
pub fn decide(band: RiskBand, level: u8) -> Result<AlertColor, AlertError> {
    DEFAULT_TABLE.decide_raw(band, level)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn row(band: RiskBand) -> Vec<AlertColor> {
        (0..=3).map(|n| decide(band, n).expect("0..=3 is valid")).collect()
    }

    #[test]
    fn test_low_band_row() {
        assert_eq!(row(RiskBand::Low), vec![Green, Green, Green, Yellow]);
    }

    #[test]
    fn test_medium_band_row() {
        assert_eq!(row(RiskBand::Medium), vec![Green, Green, Yellow, Red]);
    }

    #[test]
    fn test_high_band_row() {
        assert_eq!(row(RiskBand::High), vec![Green, Yellow, Red, Red]);
    }

    #[test]
    fn test_out_of_range_level_is_rejected_not_clamped() {
        for band in RiskBand::ALL {
            match decide(band, 4) {
                Err(AlertError::InvalidSensorLevel(4)) => {}
                other => panic!("band {}: expected InvalidSensorLevel(4), got {:?}", band, other),
            }
            assert!(decide(band, u8::MAX).is_err());
        }
    }

    #[test]
    fn test_default_table_is_valid() {
        assert!(DEFAULT_TABLE.validate().is_ok());
    }

    #[test]
    fn test_non_monotonic_table_is_rejected() {
        let result = DecisionTable::new(
            [Green, Yellow, Green, Yellow],
            [Green, Green, Yellow, Red],
            [Green, Yellow, Red, Red],
        );
        assert!(result.is_err(), "row LOW drops from YELLOW to GREEN");
    }

    #[test]
    fn test_table_with_gray_cell_is_rejected() {
        let result = DecisionTable::new(
            [Green, Green, Green, Yellow],
            [Green, Green, Yellow, Red],
            [AlertColor::Gray, Yellow, Red, Red],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_retuned_table_deserializes_from_toml() {
        let table: DecisionTable = toml::from_str(
            r#"
            bajo = ["VERDE", "VERDE", "AMARILLO", "AMARILLO"]
            medio = ["VERDE", "AMARILLO", "AMARILLO", "ROJO"]
            alto = ["AMARILLO", "ROJO", "ROJO", "ROJO"]
            "#,
        )
        .expect("table should parse");
        assert!(table.validate().is_ok());
        assert_eq!(table.decide(RiskBand::High, SensorLevel::DRY), Yellow);
    }

    proptest! {
        #[test]
        fn prop_severity_non_decreasing_in_sensor_level(band_idx in 0usize..3, a in 0u8..=3, b in 0u8..=3) {
            let band = RiskBand::ALL[band_idx];
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            let lo_sev = decide(band, lo).unwrap().severity();
            let hi_sev = decide(band, hi).unwrap().severity();
            prop_assert!(lo_sev <= hi_sev);
        }

        #[test]
        fn prop_riskier_band_never_less_severe(level in 0u8..=3) {
            let low = decide(RiskBand::Low, level).unwrap().severity();
            let medium = decide(RiskBand::Medium, level).unwrap().severity();
            let high = decide(RiskBand::High, level).unwrap().severity();
            prop_assert!(low <= medium && medium <= high);
        }
    }
}
