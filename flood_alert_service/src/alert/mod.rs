//! Alert evaluation.
//!
//! Submodules:
//! - `zone_risk`: resolves a coordinate to a continuous zone risk score.
//! - `classify`: bins the score into a `RiskBand`.
//! - `rules`: the (band, sensor level) → `AlertColor` decision table.
//!
//! `AlertEngine` chains them with the sensor level mapper into the full
//! per-reading pipeline.

pub mod classify;
pub mod rules;
pub mod zone_risk;

use chrono::Utc;

use crate::ingest::reading::SensorReading;
use crate::model::{AlertColor, Coordinate, PredictionResult, RiskBand, SensorLevel};
use crate::sensor::SensorBreakpoints;

use classify::RiskThresholds;
use rules::DecisionTable;
use zone_risk::{ZoneRisk, ZoneRiskLookup};

/// The complete voltage + coordinate → alert pipeline.
///
/// Stateless apart from its read-only calibration and reference data, so a
/// shared reference can evaluate readings from any thread.
pub struct AlertEngine {
    breakpoints: SensorBreakpoints,
    lookup: ZoneRiskLookup,
    thresholds: RiskThresholds,
    table: DecisionTable,
}

/// Zone assessment for a coordinate, independent of any reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoneAssessment {
    pub risk: ZoneRisk,
    pub band: RiskBand,
}

impl AlertEngine {
    pub fn new(lookup: ZoneRiskLookup) -> Self {
        Self {
            breakpoints: SensorBreakpoints::default(),
            lookup,
            thresholds: RiskThresholds::default(),
            table: DecisionTable::default(),
        }
    }

    pub fn with_breakpoints(mut self, breakpoints: SensorBreakpoints) -> Self {
        self.breakpoints = breakpoints;
        self
    }

    pub fn with_thresholds(mut self, thresholds: RiskThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn with_table(mut self, table: DecisionTable) -> Self {
        self.table = table;
        self
    }

    pub fn lookup(&self) -> &ZoneRiskLookup {
        &self.lookup
    }

    pub fn thresholds(&self) -> &RiskThresholds {
        &self.thresholds
    }

    pub fn sensor_level(&self, voltage: f64) -> SensorLevel {
        self.breakpoints.level_for(voltage)
    }

    /// Resolves and classifies the zone risk for `coordinate`.
    pub fn assess_zone(&self, coordinate: &Coordinate) -> ZoneAssessment {
        let risk = self.lookup.resolve(coordinate);
        ZoneAssessment {
            risk,
            band: self.thresholds.classify(risk.score),
        }
    }

    pub fn decide(&self, band: RiskBand, level: SensorLevel) -> AlertColor {
        self.table.decide(band, level)
    }

    /// Runs the full pipeline for one reading at `coordinate`.
    pub fn evaluate(&self, coordinate: &Coordinate, reading: &SensorReading) -> PredictionResult {
        let sensor_level = self.sensor_level(reading.voltage);
        self.evaluate_level(coordinate, sensor_level, reading.voltage, reading.percent)
    }

    /// Pipeline from an already-quantized sensor level.
    pub fn evaluate_level(
        &self,
        coordinate: &Coordinate,
        sensor_level: SensorLevel,
        voltage: f64,
        percent: f64,
    ) -> PredictionResult {
        let zone = self.assess_zone(coordinate);
        PredictionResult {
            alert: self.decide(zone.band, sensor_level),
            risk_band: zone.band,
            risk_score: zone.risk.score,
            score_source: zone.risk.source,
            sensor_level,
            coordinate: *coordinate,
            voltage,
            percent,
            computed_at: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ScoreSource, ZoneRecord};
    use crate::regression::RiskModel;
    use crate::zones::ZoneTable;

    struct FixedModel(f64);

    impl RiskModel for FixedModel {
        fn predict(&self, _coordinate: &Coordinate) -> f64 {
            self.0
        }
    }

    fn engine_with_model_score(score: f64) -> AlertEngine {
        let zones = ZoneTable::new(vec![ZoneRecord {
            coordinate: Coordinate::new(19.5061618036, -99.1047492201),
            rainfall_mm: 57.0,
            floodable_area_pct: 12.5,
            risk_score: 39.2,
            risk_band: RiskBand::Low,
        }]);
        AlertEngine::new(ZoneRiskLookup::new(zones, Box::new(FixedModel(score))))
    }

    fn reading(voltage: f64) -> SensorReading {
        SensorReading { voltage, percent: 50.0 }
    }

    #[test]
    fn test_low_zone_examples() {
        let engine = engine_with_model_score(42.2);
        let here = Coordinate::new(19.43, -99.13);
        assert_eq!(engine.evaluate(&here, &reading(2.0)).alert, AlertColor::Green);
        assert_eq!(engine.evaluate(&here, &reading(3.0)).alert, AlertColor::Yellow);
    }

    #[test]
    fn test_high_zone_examples() {
        let engine = engine_with_model_score(70.0);
        let here = Coordinate::new(19.43, -99.13);
        let alerts: Vec<_> = [0.1, 1.0, 2.0, 3.0]
            .iter()
            .map(|&v| engine.evaluate(&here, &reading(v)).alert)
            .collect();
        assert_eq!(
            alerts,
            vec![AlertColor::Green, AlertColor::Yellow, AlertColor::Red, AlertColor::Red]
        );
    }

    #[test]
    fn test_result_carries_full_context() {
        let engine = engine_with_model_score(70.0);
        let surveyed = Coordinate::new(19.5061618036, -99.1047492201);
        let result = engine.evaluate(&surveyed, &reading(3.1));
        assert_eq!(result.risk_score, 39.2);
        assert_eq!(result.score_source, ScoreSource::Dataset);
        assert_eq!(result.risk_band, RiskBand::Low);
        assert_eq!(result.sensor_level, SensorLevel::HIGH);
        assert_eq!(result.alert, AlertColor::Yellow);
        assert_eq!(result.coordinate, surveyed);
        assert_eq!(result.voltage, 3.1);
    }

    #[test]
    fn test_custom_calibration_flows_through() {
        let engine = engine_with_model_score(70.0)
            .with_breakpoints(SensorBreakpoints::new([0.2, 0.4, 0.6]).unwrap())
            .with_thresholds(RiskThresholds { low_max: 75.0, medium_max: 90.0 });
        let result = engine.evaluate(&Coordinate::new(19.43, -99.13), &reading(1.0));
        assert_eq!(result.sensor_level, SensorLevel::HIGH);
        assert_eq!(result.risk_band, RiskBand::Low);
        assert_eq!(result.alert, AlertColor::Yellow);
    }
}
