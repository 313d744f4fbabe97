/// Raw survey preprocessing.
///
/// Turns the municipal flood survey export into the processed zone table
/// consumed by `zones::ZoneTable`. The raw export has one row per surveyed
/// point with three relevant columns:
///
///   coordinates   quoted "lat,lon" string
///   intens_mm     rainfall intensity as a range label ("54 a 60")
///   %_área        floodable area percentage as a range label ("0 a 25")
///
/// Range labels are replaced by their midpoints, combined into a weighted
/// risk score and banded with the risk classifier. Rows whose labels are
/// not recognised or whose coordinates do not parse are skipped. Exact
/// duplicates are removed, keeping the first occurrence.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

use crate::alert::classify::RiskThresholds;
use crate::logging::{self, Component};
use crate::model::{AlertError, Coordinate, RiskBand, ZoneRecord};
use crate::zones::{format_record, split_csv_line, DATASET_HEADER};

// ---------------------------------------------------------------------------
// Label maps and score weights
// ---------------------------------------------------------------------------

pub const RAINFALL_WEIGHT: f64 = 0.6;
pub const AREA_WEIGHT: f64 = 0.4;

const RAW_COORDINATES: &str = "coordinates";
const RAW_RAINFALL: &str = "intens_mm";
const RAW_AREA: &str = "%_área";

/// Midpoint in millimetres for a rainfall intensity range label.
pub fn rainfall_midpoint(label: &str) -> Option<f64> {
    match label.trim() {
        "41 a 54" => Some(47.5),
        "54 a 60" => Some(57.0),
        "60 a 64" => Some(62.0),
        "64 a 70" => Some(67.0),
        _ => None,
    }
}

/// Midpoint percentage for a floodable-area range label.
pub fn area_midpoint(label: &str) -> Option<f64> {
    match label.trim() {
        "0 a 25" => Some(12.5),
        "26 a 49" => Some(37.5),
        "50 a 72" => Some(61.0),
        "73 a 99" => Some(86.0),
        "100" => Some(100.0),
        _ => None,
    }
}

pub fn risk_score(rainfall_mm: f64, floodable_area_pct: f64) -> f64 {
    rainfall_mm * RAINFALL_WEIGHT + floodable_area_pct * AREA_WEIGHT
}

// ---------------------------------------------------------------------------
// Preprocessing
// ---------------------------------------------------------------------------

/// Counters and ranges reported after a preprocessing run.
#[derive(Debug, Clone, PartialEq)]
pub struct PrepareSummary {
    pub rows_read: usize,
    pub skipped: usize,
    pub duplicates: usize,
    pub kept: usize,
    pub score_range: Option<(f64, f64)>,
    pub band_counts: BTreeMap<RiskBand, usize>,
}

impl PrepareSummary {
    pub fn print(&self) {
        println!("Rows read:          {}", self.rows_read);
        println!("Rows skipped:       {}", self.skipped);
        println!("Duplicates removed: {}", self.duplicates);
        println!("Rows kept:          {}", self.kept);
        if let Some((min, max)) = self.score_range {
            println!("Score range:        {:.1} - {:.1}", min, max);
        }
        for (band, count) in &self.band_counts {
            println!("  {:<6} {}", band.label(), count);
        }
    }
}

/// Processes raw survey CSV text into zone records.
pub fn prepare_records(
    text: &str,
    thresholds: &RiskThresholds,
) -> Result<(Vec<ZoneRecord>, PrepareSummary), AlertError> {
    let mut lines = text.lines().filter(|l| !l.trim().is_empty());
    let header = lines
        .next()
        .ok_or_else(|| AlertError::Parse("raw survey is empty".to_string()))?;
    let columns: Vec<String> = split_csv_line(header.trim_start_matches('\u{feff}'))
        .into_iter()
        .map(|c| c.trim().to_string())
        .collect();

    let column = |name: &str| -> Result<usize, AlertError> {
        columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| AlertError::Parse(format!("raw survey has no '{}' column", name)))
    };
    let coord_col = column(RAW_COORDINATES)?;
    let rain_col = column(RAW_RAINFALL)?;
    let area_col = column(RAW_AREA)?;

    let mut records = Vec::new();
    let mut seen = HashSet::new();
    let mut rows_read = 0;
    let mut skipped = 0;
    let mut duplicates = 0;

    for (line_no, line) in lines.enumerate() {
        rows_read += 1;
        let fields = split_csv_line(line);
        let field = |i: usize| fields.get(i).map(String::as_str).unwrap_or("");

        let parsed = parse_coordinates(field(coord_col)).and_then(|coordinate| {
            let rainfall_mm = rainfall_midpoint(field(rain_col))?;
            let floodable_area_pct = area_midpoint(field(area_col))?;
            let score = risk_score(rainfall_mm, floodable_area_pct);
            Some(ZoneRecord {
                coordinate,
                rainfall_mm,
                floodable_area_pct,
                risk_score: score,
                risk_band: thresholds.classify(score),
            })
        });

        let Some(record) = parsed else {
            skipped += 1;
            logging::debug(
                Component::Dataset,
                Some(&format!("row {}", line_no + 2)),
                "Skipping row with unparseable coordinates or unknown range label",
            );
            continue;
        };

        if !seen.insert(format_record(&record)) {
            duplicates += 1;
            continue;
        }
        records.push(record);
    }

    let summary = summarize(&records, rows_read, skipped, duplicates);
    Ok((records, summary))
}

/// Reads a raw survey file, preprocesses it and writes the processed CSV.
///
/// The survey export is Latin-1 encoded; UTF-8 input is accepted too.
pub fn prepare_file(
    input: &Path,
    output: &Path,
    thresholds: &RiskThresholds,
) -> Result<PrepareSummary, AlertError> {
    let bytes = fs::read(input).map_err(|e| AlertError::DataUnavailable {
        path: input.display().to_string(),
        reason: e.to_string(),
    })?;
    let text = decode_text(&bytes);

    let (records, summary) = prepare_records(&text, thresholds)?;
    if records.is_empty() {
        return Err(AlertError::DataUnavailable {
            path: input.display().to_string(),
            reason: "no usable rows".to_string(),
        });
    }

    let mut out = DATASET_HEADER.join(",");
    out.push('\n');
    for record in &records {
        out.push_str(&format_record(record));
        out.push('\n');
    }
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| AlertError::Persistence(e.to_string()))?;
    }
    fs::write(output, out).map_err(|e| {
        AlertError::Persistence(format!("failed to write {}: {}", output.display(), e))
    })?;

    logging::log_batch_summary(
        Component::Dataset,
        "Survey preprocessing",
        summary.rows_read,
        summary.kept,
        summary.skipped + summary.duplicates,
    );
    Ok(summary)
}

fn parse_coordinates(raw: &str) -> Option<Coordinate> {
    let (lat, lon) = raw.trim().trim_matches('"').split_once(',')?;
    let coordinate = Coordinate::new(lat.trim().parse().ok()?, lon.trim().parse().ok()?);
    coordinate.validate().ok()?;
    Some(coordinate)
}

fn decode_text(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

fn summarize(records: &[ZoneRecord], rows_read: usize, skipped: usize, duplicates: usize) -> PrepareSummary {
    let score_range = records.iter().map(|r| r.risk_score).fold(None, |acc, s| match acc {
        None => Some((s, s)),
        Some((min, max)) => Some((f64::min(min, s), f64::max(max, s))),
    });
    let mut band_counts = BTreeMap::new();
    for record in records {
        *band_counts.entry(record.risk_band).or_insert(0) += 1;
    }
    PrepareSummary {
        rows_read,
        skipped,
        duplicates,
        kept: records.len(),
        score_range,
        band_counts,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
