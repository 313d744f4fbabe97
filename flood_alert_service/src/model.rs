/// Core data types for the flood alert service.
///
/// This module defines the shared domain model imported by all other modules:
/// coordinates, reference-table records, the ordinal risk and sensor scales,
/// alert colors, the computed prediction, and the crate error type.
/// It contains no I/O.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Geography
// ---------------------------------------------------------------------------

/// A WGS84 point in decimal degrees.
///
/// Serialized with the dashboard's field names (`latitud`, `longitud`);
/// the English names are accepted as aliases in configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    #[serde(rename = "latitud", alias = "latitude")]
    pub latitude: f64,
    #[serde(rename = "longitud", alias = "longitude")]
    pub longitude: f64,
}

impl Coordinate {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Checks that both components are finite and inside the valid
    /// latitude/longitude ranges.
    pub fn validate(&self) -> Result<(), AlertError> {
        if !self.latitude.is_finite() || !self.longitude.is_finite() {
            return Err(AlertError::InvalidCoordinate(format!(
                "non-finite coordinate ({}, {})",
                self.latitude, self.longitude
            )));
        }
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(AlertError::InvalidCoordinate(format!(
                "latitude {} outside [-90, 90]",
                self.latitude
            )));
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err(AlertError::InvalidCoordinate(format!(
                "longitude {} outside [-180, 180]",
                self.longitude
            )));
        }
        Ok(())
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}, {:.6})", self.latitude, self.longitude)
    }
}

/// One row of the processed zone reference table.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneRecord {
    pub coordinate: Coordinate,
    /// Rainfall intensity midpoint, mm per 24 h.
    pub rainfall_mm: f64,
    /// Floodable-area percentage midpoint, 0-100.
    pub floodable_area_pct: f64,
    pub risk_score: f64,
    pub risk_band: RiskBand,
}

// ---------------------------------------------------------------------------
// Ordinal scales
// ---------------------------------------------------------------------------

/// Zone risk band, in ascending order of risk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskBand {
    #[serde(rename = "BAJO")]
    Low,
    #[serde(rename = "MEDIO")]
    Medium,
    #[serde(rename = "ALTO")]
    High,
}

impl RiskBand {
    pub const ALL: [RiskBand; 3] = [RiskBand::Low, RiskBand::Medium, RiskBand::High];

    /// Wire/dataset label.
    pub fn label(&self) -> &'static str {
        match self {
            RiskBand::Low => "BAJO",
            RiskBand::Medium => "MEDIO",
            RiskBand::High => "ALTO",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim() {
            "BAJO" => Some(RiskBand::Low),
            "MEDIO" => Some(RiskBand::Medium),
            "ALTO" => Some(RiskBand::High),
            _ => None,
        }
    }
}

impl fmt::Display for RiskBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Quantized water level: 0 (dry) to 3 (high).
///
/// The constructor enforces the domain, so a `SensorLevel` held by value is
/// always a valid rule-table column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(into = "u8")]
pub struct SensorLevel(u8);

impl SensorLevel {
    pub const MAX: u8 = 3;
    pub const DRY: SensorLevel = SensorLevel(0);
    pub const LOW: SensorLevel = SensorLevel(1);
    pub const MEDIUM: SensorLevel = SensorLevel(2);
    pub const HIGH: SensorLevel = SensorLevel(3);
    pub const ALL: [SensorLevel; 4] = [Self::DRY, Self::LOW, Self::MEDIUM, Self::HIGH];

    pub fn new(level: u8) -> Result<Self, AlertError> {
        if level > Self::MAX {
            return Err(AlertError::InvalidSensorLevel(level));
        }
        Ok(SensorLevel(level))
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

impl From<SensorLevel> for u8 {
    fn from(level: SensorLevel) -> u8 {
        level.0
    }
}

impl fmt::Display for SensorLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Traffic-light alert delivered to end users.
///
/// `Gray` is the sentinel reported before the first valid reading and never
/// appears in the decision table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlertColor {
    #[serde(rename = "VERDE")]
    Green,
    #[serde(rename = "AMARILLO")]
    Yellow,
    #[serde(rename = "ROJO")]
    Red,
    #[serde(rename = "GRIS")]
    Gray,
}

impl AlertColor {
    pub fn label(&self) -> &'static str {
        match self {
            AlertColor::Green => "VERDE",
            AlertColor::Yellow => "AMARILLO",
            AlertColor::Red => "ROJO",
            AlertColor::Gray => "GRIS",
        }
    }

    /// Severity rank of a real alert. `None` for the `Gray` sentinel.
    pub fn severity(&self) -> Option<u8> {
        match self {
            AlertColor::Green => Some(0),
            AlertColor::Yellow => Some(1),
            AlertColor::Red => Some(2),
            AlertColor::Gray => None,
        }
    }

    /// Short operator guidance for this alert.
    pub fn guidance(&self) -> &'static str {
        match self {
            AlertColor::Green => "Condiciones normales - no se requiere acción",
            AlertColor::Yellow => "Precaución - monitoreo continuo recomendado",
            AlertColor::Red => "Peligro - tomar medidas de seguridad inmediatas",
            AlertColor::Gray => "Esperando datos del sensor",
        }
    }
}

impl fmt::Display for AlertColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Computed outcome
// ---------------------------------------------------------------------------

/// Where a zone risk score came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreSource {
    /// Stored score of a reference record within the match tolerance.
    Dataset,
    /// Regression model inference.
    Model,
}

/// The full outcome of one ingested reading.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionResult {
    pub alert: AlertColor,
    pub risk_band: RiskBand,
    pub risk_score: f64,
    pub score_source: ScoreSource,
    pub sensor_level: SensorLevel,
    pub coordinate: Coordinate,
    pub voltage: f64,
    pub percent: f64,
    pub computed_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors raised by the alert pipeline and its supporting artifacts.
#[derive(Debug, thiserror::Error)]
pub enum AlertError {
    /// The zone reference table could not be loaded.
    #[error("dataset unavailable at {path}: {reason}")]
    DataUnavailable { path: String, reason: String },
    /// The trained regression artifact is missing or unreadable.
    #[error("model unavailable at {path}: {reason}")]
    ModelUnavailable { path: String, reason: String },
    /// A sensor level outside 0..=3 reached the decision table.
    #[error("invalid sensor level {0} (expected 0..=3)")]
    InvalidSensorLevel(u8),
    #[error("invalid coordinate: {0}")]
    InvalidCoordinate(String),
    #[error("configuration error: {0}")]
    Config(String),
    /// The configured coordinate could not be read from or written to disk.
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("parse error: {0}")]
    Parse(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sensor_level_rejects_values_above_three() {
        for level in 0..=3 {
            assert!(SensorLevel::new(level).is_ok(), "level {} should be valid", level);
        }
        match SensorLevel::new(4) {
            Err(AlertError::InvalidSensorLevel(4)) => {}
            other => panic!("expected InvalidSensorLevel(4), got {:?}", other),
        }
    }

    #[test]
    fn test_risk_band_labels_round_trip() {
        for band in RiskBand::ALL {
            assert_eq!(RiskBand::from_label(band.label()), Some(band));
        }
        assert_eq!(RiskBand::from_label("EXTREMO"), None);
    }

    #[test]
    fn test_risk_band_ordering_is_ascending() {
        assert!(RiskBand::Low < RiskBand::Medium);
        assert!(RiskBand::Medium < RiskBand::High);
    }

    #[test]
    fn test_gray_has_no_severity() {
        assert_eq!(AlertColor::Gray.severity(), None);
        assert!(AlertColor::Green.severity() < AlertColor::Yellow.severity());
        assert!(AlertColor::Yellow.severity() < AlertColor::Red.severity());
    }

    #[test]
    fn test_coordinate_serializes_with_dashboard_field_names() {
        let json = serde_json::to_value(Coordinate::new(19.5, -99.1)).unwrap();
        assert_eq!(json["latitud"], 19.5);
        assert_eq!(json["longitud"], -99.1);
    }

    #[test]
    fn test_coordinate_accepts_english_aliases() {
        let c: Coordinate = serde_json::from_str(r#"{"latitude": 19.4, "longitude": -99.2}"#).unwrap();
        assert_eq!(c, Coordinate::new(19.4, -99.2));
    }

    #[test]
    fn test_coordinate_validation_bounds() {
        assert!(Coordinate::new(19.43, -99.13).validate().is_ok());
        assert!(Coordinate::new(91.0, 0.0).validate().is_err());
        assert!(Coordinate::new(0.0, -181.0).validate().is_err());
        assert!(Coordinate::new(f64::NAN, 0.0).validate().is_err());
    }

    #[test]
    fn test_alert_color_wire_labels() {
        assert_eq!(serde_json::to_string(&AlertColor::Yellow).unwrap(), "\"AMARILLO\"");
        assert_eq!(serde_json::to_string(&AlertColor::Gray).unwrap(), "\"GRIS\"");
        assert_eq!(serde_json::to_string(&RiskBand::Medium).unwrap(), "\"MEDIO\"");
    }
}
