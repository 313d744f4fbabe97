/// Device payload decoding.
///
/// The field device posts `{"v": <volts>, "pct": <percent>}` to `/ingest` on
/// a fixed schedule and retries on any non-200 answer. Ingestion is therefore
/// best-effort: anything that does not decode to two finite numbers is
/// dropped here with a reason, and the caller acknowledges it anyway.
///
/// `pct` is the device's own 0-100 interpretation of the voltage. It is
/// validated and logged but does not take part in the alert decision.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A decoded, numerically valid sensor sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    #[serde(rename = "v")]
    pub voltage: f64,
    #[serde(rename = "pct")]
    pub percent: f64,
}

/// Why a payload was dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    NotJson,
    NotAnObject,
    Missing(&'static str),
    NotNumeric(&'static str),
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rejection::NotJson => write!(f, "body is not JSON"),
            Rejection::NotAnObject => write!(f, "body is not a JSON object"),
            Rejection::Missing(field) => write!(f, "missing field '{}'", field),
            Rejection::NotNumeric(field) => write!(f, "field '{}' is not a finite number", field),
        }
    }
}

impl SensorReading {
    /// Whether `pct` lies in the device's nominal 0-100 range.
    pub fn percent_in_range(&self) -> bool {
        (0.0..=100.0).contains(&self.percent)
    }
}

/// Decodes a raw request body into a reading.
pub fn decode_reading(body: &[u8]) -> Result<SensorReading, Rejection> {
    let value: Value = serde_json::from_slice(body).map_err(|_| Rejection::NotJson)?;
    let object = value.as_object().ok_or(Rejection::NotAnObject)?;

    let number = |field: &'static str| -> Result<f64, Rejection> {
        let raw = object.get(field).ok_or(Rejection::Missing(field))?;
        match raw.as_f64() {
            Some(n) if n.is_finite() => Ok(n),
            _ => Err(Rejection::NotNumeric(field)),
        }
    };

    Ok(SensorReading {
        voltage: number("v")?,
        percent: number("pct")?,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
