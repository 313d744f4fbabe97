/// Zone reference table for the Mexico City flood alert service.
///
/// Holds the processed survey of flood-prone locations: one `ZoneRecord`
/// per surveyed coordinate with its rainfall intensity, floodable-area
/// percentage, and precomputed risk score. The table is loaded once at
/// startup and is read-only afterwards. It is the first step of zone risk
/// resolution: a coordinate that matches a surveyed point uses the surveyed
/// score verbatim.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::model::{AlertError, Coordinate, RiskBand, ZoneRecord};

/// Default match tolerance, degrees in each axis (≈ 10 m).
pub const DEFAULT_MATCH_TOLERANCE_DEG: f64 = 0.0001;

/// Header of the processed dataset, in column order.
pub const DATASET_HEADER: [&str; 6] = [
    "latitud",
    "longitud",
    "intensidad_mm",
    "area_inundable_pct",
    "riesgo_zona_score",
    "nivel_riesgo_zona",
];

// ---------------------------------------------------------------------------
// Service region
// ---------------------------------------------------------------------------

/// Rectangular region in which model predictions are considered reliable.
/// Bounds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoundingBox {
    pub lat_min: f64,
    pub lat_max: f64,
    pub lon_min: f64,
    pub lon_max: f64,
}

/// Approximate extent of CDMX covered by the survey.
pub const CDMX_BOUNDS: BoundingBox = BoundingBox {
    lat_min: 19.35,
    lat_max: 19.65,
    lon_min: -99.35,
    lon_max: -98.95,
};

impl Default for BoundingBox {
    fn default() -> Self {
        CDMX_BOUNDS
    }
}

impl BoundingBox {
    pub fn contains(&self, coordinate: &Coordinate) -> bool {
        (self.lat_min..=self.lat_max).contains(&coordinate.latitude)
            && (self.lon_min..=self.lon_max).contains(&coordinate.longitude)
    }

    pub fn validate(&self) -> Result<(), AlertError> {
        let all_finite = [self.lat_min, self.lat_max, self.lon_min, self.lon_max]
            .iter()
            .all(|v| v.is_finite());
        if !all_finite || self.lat_min >= self.lat_max || self.lon_min >= self.lon_max {
            return Err(AlertError::Config(format!(
                "invalid service region: lat {}..{}, lon {}..{}",
                self.lat_min, self.lat_max, self.lon_min, self.lon_max
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Reference table
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ZoneTable {
    records: Vec<ZoneRecord>,
}

impl ZoneTable {
    pub fn new(records: Vec<ZoneRecord>) -> Self {
        Self { records }
    }

    /// Loads the processed dataset CSV.
    ///
    /// Fails with `DataUnavailable` if the file cannot be read, the header
    /// is not the processed-dataset header, or no row could be parsed.
    /// Individual malformed rows are skipped.
    pub fn load(path: &Path) -> Result<Self, AlertError> {
        let unavailable = |reason: String| AlertError::DataUnavailable {
            path: path.display().to_string(),
            reason,
        };

        let text = fs::read_to_string(path).map_err(|e| unavailable(e.to_string()))?;
        let (table, skipped) = Self::parse_csv(&text).map_err(|e| unavailable(e.to_string()))?;
        if table.is_empty() {
            return Err(unavailable("no usable rows".to_string()));
        }
        crate::logging::log_batch_summary(
            crate::logging::Component::Dataset,
            "Dataset load",
            table.len() + skipped,
            table.len(),
            skipped,
        );
        Ok(table)
    }

    /// Parses processed-dataset CSV text. Returns the table and the number
    /// of skipped rows.
    pub fn parse_csv(text: &str) -> Result<(Self, usize), AlertError> {
        let mut lines = text.lines().filter(|l| !l.trim().is_empty());
        let header = lines
            .next()
            .ok_or_else(|| AlertError::Parse("empty dataset".to_string()))?;
        let columns: Vec<String> = split_csv_line(header.trim_start_matches('\u{feff}'))
            .into_iter()
            .map(|c| c.trim().to_string())
            .collect();
        if columns != DATASET_HEADER {
            return Err(AlertError::Parse(format!(
                "unexpected dataset header: {:?}",
                columns
            )));
        }

        let mut records = Vec::new();
        let mut skipped = 0;
        for line in lines {
            match parse_record(line) {
                Some(record) => records.push(record),
                None => skipped += 1,
            }
        }
        Ok((Self { records }, skipped))
    }

    pub fn records(&self) -> &[ZoneRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// First record, in table order, lying strictly within `tolerance`
    /// degrees of `coordinate` in both axes.
    pub fn find_match(&self, coordinate: &Coordinate, tolerance: f64) -> Option<&ZoneRecord> {
        self.records.iter().find(|r| {
            (r.coordinate.latitude - coordinate.latitude).abs() < tolerance
                && (r.coordinate.longitude - coordinate.longitude).abs() < tolerance
        })
    }

    /// Training samples `(coordinate, risk score)` for the regression model.
    pub fn samples(&self) -> Vec<(Coordinate, f64)> {
        self.records.iter().map(|r| (r.coordinate, r.risk_score)).collect()
    }
}

fn parse_record(line: &str) -> Option<ZoneRecord> {
    let fields = split_csv_line(line);
    if fields.len() < DATASET_HEADER.len() {
        return None;
    }
    let number = |i: usize| -> Option<f64> {
        let value: f64 = fields[i].trim().parse().ok()?;
        value.is_finite().then_some(value)
    };

    Some(ZoneRecord {
        coordinate: Coordinate::new(number(0)?, number(1)?),
        rainfall_mm: number(2)?,
        floodable_area_pct: number(3)?,
        risk_score: number(4)?,
        risk_band: RiskBand::from_label(&fields[5])?,
    })
}

/// Formats a record as a processed-dataset CSV row.
pub fn format_record(record: &ZoneRecord) -> String {
    format!(
        "{},{},{},{},{},{}",
        record.coordinate.latitude,
        record.coordinate.longitude,
        record.rainfall_mm,
        record.floodable_area_pct,
        record.risk_score,
        record.risk_band.label()
    )
}

/// Splits one CSV line on commas, honouring double-quoted fields (with `""`
/// as an escaped quote). Quotes are removed from the returned fields.
pub fn split_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.trim_end_matches(['\r', '\n']).chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => fields.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    fields.push(current);
    fields
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
