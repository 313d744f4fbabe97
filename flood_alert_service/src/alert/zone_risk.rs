//! Zone risk resolution.
//!
//! Resolves a coordinate to a continuous risk score in two ordered steps:
//!
//! 1. **Survey match.** The first `ZoneRecord` lying within the match
//!    tolerance in both axes wins, and its stored score is returned
//!    verbatim even when the model would disagree.
//! 2. **Model fallback.** Otherwise the regression model predicts a score.
//!
//! Coordinates outside the service region are still resolved; the lookup
//! only logs an advisory warning because the model was trained on CDMX data.

use std::path::Path;

use crate::logging::{self, Component};
use crate::model::{AlertError, Coordinate, ScoreSource};
use crate::regression::{ModelArtifact, RiskModel};
use crate::zones::{BoundingBox, ZoneTable, DEFAULT_MATCH_TOLERANCE_DEG};

/// A resolved score and the step that produced it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoneRisk {
    pub score: f64,
    pub source: ScoreSource,
    pub in_region: bool,
}

pub struct ZoneRiskLookup {
    zones: ZoneTable,
    model: Box<dyn RiskModel>,
    region: BoundingBox,
    tolerance_deg: f64,
}

impl ZoneRiskLookup {
    pub fn new(zones: ZoneTable, model: Box<dyn RiskModel>) -> Self {
        Self {
            zones,
            model,
            region: BoundingBox::default(),
            tolerance_deg: DEFAULT_MATCH_TOLERANCE_DEG,
        }
    }

    pub fn with_region(mut self, region: BoundingBox) -> Self {
        self.region = region;
        self
    }

    pub fn with_tolerance(mut self, tolerance_deg: f64) -> Self {
        self.tolerance_deg = tolerance_deg;
        self
    }

    /// Loads the reference table and the trained artifact from disk.
    ///
    /// Fails with `DataUnavailable` or `ModelUnavailable`; the service must
    /// not start without both.
    pub fn load(dataset_path: &Path, model_path: &Path) -> Result<Self, AlertError> {
        let zones = ZoneTable::load(dataset_path)?;
        logging::info(
            Component::Dataset,
            Some(&dataset_path.display().to_string()),
            &format!("Loaded {} zone records", zones.len()),
        );

        let artifact = ModelArtifact::load(model_path)?;
        logging::info(
            Component::Model,
            Some(&model_path.display().to_string()),
            &format!(
                "Loaded regression tree (trained {} on {} rows)",
                artifact.trained_at.format("%Y-%m-%d %H:%M UTC"),
                artifact.training_rows
            ),
        );

        Ok(Self::new(zones, Box::new(artifact)))
    }

    pub fn zones(&self) -> &ZoneTable {
        &self.zones
    }

    pub fn model(&self) -> &dyn RiskModel {
        self.model.as_ref()
    }

    pub fn region(&self) -> &BoundingBox {
        &self.region
    }

    /// Resolves the zone risk score for `coordinate`.
    pub fn resolve(&self, coordinate: &Coordinate) -> ZoneRisk {
        let subject = coordinate.to_string();
        let in_region = self.region.contains(coordinate);
        if !in_region {
            logging::warn(
                Component::Zone,
                Some(&subject),
                &format!(
                    "Coordinate outside service region (lat {}..{}, lon {}..{}); prediction may be unreliable",
                    self.region.lat_min, self.region.lat_max, self.region.lon_min, self.region.lon_max
                ),
            );
        }

        if let Some(record) = self.zones.find_match(coordinate, self.tolerance_deg) {
            logging::debug(
                Component::Zone,
                Some(&subject),
                &format!("Survey match → score {:.1}", record.risk_score),
            );
            return ZoneRisk {
                score: record.risk_score,
                source: ScoreSource::Dataset,
                in_region,
            };
        }

        let score = self.model.predict(coordinate);
        logging::debug(
            Component::Model,
            Some(&subject),
            &format!("No survey match → model score {:.1}", score),
        );
        ZoneRisk {
            score,
            source: ScoreSource::Model,
            in_region,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{RiskBand, ZoneRecord};

    /// Model that always answers the same score, so tests can tell the two
    /// resolution steps apart.
    struct FixedModel(f64);

    impl RiskModel for FixedModel {
        fn predict(&self, _coordinate: &Coordinate) -> f64 {
            self.0
        }
    }

    fn record(lat: f64, lon: f64, score: f64, band: RiskBand) -> ZoneRecord {
        ZoneRecord {
            coordinate: Coordinate::new(lat, lon),
            rainfall_mm: 57.0,
            floodable_area_pct: 12.5,
            risk_score: score,
            risk_band: band,
        }
    }

    fn lookup() -> ZoneRiskLookup {
        let zones = ZoneTable::new(vec![
            record(19.5061618036, -99.1047492201, 39.2, RiskBand::Low),
            record(19.5228166649, -99.1678551529, 74.6, RiskBand::High),
        ]);
        ZoneRiskLookup::new(zones, Box::new(FixedModel(48.4)))
    }

    #[test]
    fn test_survey_score_wins_over_model() {
        let risk = lookup().resolve(&Coordinate::new(19.5061618036, -99.1047492201));
        assert_eq!(risk.score, 39.2, "stored score must be returned verbatim, not the model's 48.4");
        assert_eq!(risk.source, ScoreSource::Dataset);
        assert!(risk.in_region);
    }

    #[test]
    fn test_unsurveyed_coordinate_uses_model() {
        let risk = lookup().resolve(&Coordinate::new(19.4326, -99.1332));
        assert_eq!(risk.score, 48.4);
        assert_eq!(risk.source, ScoreSource::Model);
    }

    #[test]
    fn test_outside_region_still_resolves() {
        let risk = lookup().resolve(&Coordinate::new(40.7128, -74.0060));
        assert!(!risk.in_region);
        assert_eq!(risk.source, ScoreSource::Model);
        assert_eq!(risk.score, 48.4);
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let lookup = lookup();
        let coordinate = Coordinate::new(19.45, -99.2);
        let first = lookup.resolve(&coordinate);
        for _ in 0..5 {
            assert_eq!(lookup.resolve(&coordinate), first);
        }
    }

    #[test]
    fn test_custom_tolerance() {
        let wide = lookup().with_tolerance(0.01);
        let risk = wide.resolve(&Coordinate::new(19.5100, -99.1000));
        assert_eq!(risk.source, ScoreSource::Dataset);
        assert_eq!(risk.score, 39.2);
    }

    #[test]
    fn test_custom_region() {
        let region = BoundingBox { lat_min: 40.0, lat_max: 41.0, lon_min: -75.0, lon_max: -73.0 };
        let lookup = lookup().with_region(region);
        assert!(lookup.resolve(&Coordinate::new(40.7128, -74.0060)).in_region);
        assert!(!lookup.resolve(&Coordinate::new(19.4326, -99.1332)).in_region);
    }
}
