//! Model Verification Module
//!
//! Checks a trained regression model against the zone dataset, both over
//! every row and over the seeded held-out rows, then runs a fixed set of
//! probe coordinates through the full zone pipeline. Used after `train` and
//! before deploying a new artifact.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::alert::AlertEngine;
use crate::config::DEFAULT_LOCATION;
use crate::model::{AlertColor, Coordinate, RiskBand, ScoreSource, SensorLevel};
use crate::regression::{evaluate, train_test_split, FeatureImportance, FitMetrics, HoldoutSplit};

// ============================================================================
// Report types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationReport {
    pub timestamp: String,
    /// Every row of the zone table.
    pub fit: FitMetrics,
    /// Only the rows the seeded split holds out of training.
    pub holdout: Option<FitMetrics>,
    pub feature_importances: Vec<FeatureImportance>,
    pub band_agreement: BandAgreement,
    pub probes: Vec<ProbeResult>,
}

/// How often the model's predicted band matches the surveyed band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandAgreement {
    pub total: usize,
    pub matching: usize,
}

impl BandAgreement {
    pub fn ratio(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.matching as f64 / self.total as f64
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeResult {
    pub name: String,
    pub coordinate: Coordinate,
    pub in_region: bool,
    pub source: ScoreSource,
    pub score: f64,
    pub band: RiskBand,
    /// Alert for sensor levels 0..=3, in order.
    pub alerts: [AlertColor; 4],
}

// ============================================================================
// Probe coordinates
// ============================================================================

pub struct Probe {
    pub name: &'static str,
    pub coordinate: Coordinate,
}

/// Reference points: the city centre, the historic sensor locations, the
/// default monitored location, two far-away cities and the corners of the
/// service region.
pub static PROBES: &[Probe] = &[
    Probe { name: "CDMX centro", coordinate: Coordinate::new(19.4326, -99.1332) },
    Probe { name: "Sensor GAM (riesgo bajo)", coordinate: Coordinate::new(19.5061618036, -99.1047492201) },
    Probe { name: "Sensor Azcapotzalco (riesgo alto)", coordinate: Coordinate::new(19.5228166649, -99.1678551529) },
    Probe { name: "Ubicación por defecto", coordinate: DEFAULT_LOCATION },
    Probe { name: "UPIITA", coordinate: Coordinate::new(19.5113119, -99.1251155) },
    Probe { name: "Nueva York", coordinate: Coordinate::new(40.7128, -74.0060) },
    Probe { name: "Monterrey", coordinate: Coordinate::new(25.7617, -100.3016) },
    Probe { name: "Esquina SO", coordinate: Coordinate::new(19.35, -99.35) },
    Probe { name: "Esquina NE", coordinate: Coordinate::new(19.65, -98.95) },
];

// ============================================================================
// Verification
// ============================================================================

pub fn probe(engine: &AlertEngine, name: &str, coordinate: Coordinate) -> ProbeResult {
    let zone = engine.assess_zone(&coordinate);
    ProbeResult {
        name: name.to_string(),
        coordinate,
        in_region: zone.risk.in_region,
        source: zone.risk.source,
        score: zone.risk.score,
        band: zone.band,
        alerts: SensorLevel::ALL.map(|level| engine.decide(zone.band, level)),
    }
}

/// Evaluates the engine's model against its own zone table, overall and on
/// the rows `split` holds out, and runs every probe in `PROBES`.
pub fn run_verification(engine: &AlertEngine, split: &HoldoutSplit) -> VerificationReport {
    let lookup = engine.lookup();
    let samples = lookup.zones().samples();
    let fit = evaluate(lookup.model(), &samples);
    let (_, test) = train_test_split(&samples, split);
    let holdout = (!test.is_empty()).then(|| evaluate(lookup.model(), &test));

    let mut agreement = BandAgreement { total: 0, matching: 0 };
    for record in lookup.zones().records() {
        let predicted = engine.thresholds().classify(lookup.model().predict(&record.coordinate));
        agreement.total += 1;
        if predicted == record.risk_band {
            agreement.matching += 1;
        }
    }

    let probes = PROBES
        .iter()
        .map(|p| probe(engine, p.name, p.coordinate))
        .collect();

    VerificationReport {
        timestamp: Utc::now().to_rfc3339(),
        fit,
        holdout,
        feature_importances: lookup.model().feature_importances().to_vec(),
        band_agreement: agreement,
        probes,
    }
}

pub fn print_summary(report: &VerificationReport) {
    println!("\n═══════════════════════════════════════════════════════════");
    println!("📊 MODEL VERIFICATION");
    println!("═══════════════════════════════════════════════════════════");
    println!();
    println!("All rows ({}):", report.fit.samples);
    print_metrics(&report.fit);
    match &report.holdout {
        Some(holdout) => {
            println!("Held-out rows ({}):", holdout.samples);
            print_metrics(holdout);
        }
        None => println!("Held-out rows:   none"),
    }
    if !report.feature_importances.is_empty() {
        println!("Feature importance:");
        for f in &report.feature_importances {
            println!("  {:<12} {:.3}", format!("{:?}", f.feature).to_lowercase(), f.importance);
        }
    }
    println!(
        "Band agreement:  {:.1}% ({}/{})",
        report.band_agreement.ratio() * 100.0,
        report.band_agreement.matching,
        report.band_agreement.total
    );
    println!();
    println!("Probe coordinates:");
    for p in &report.probes {
        let marker = if p.in_region { "✓" } else { "⚠" };
        let alerts: Vec<&str> = p.alerts.iter().map(|a| a.label()).collect();
        println!(
            "  {} {:<36} {} {:>5.1} {:<5} via {:<7} [{}]",
            marker,
            p.name,
            p.coordinate,
            p.score,
            p.band.label(),
            format!("{:?}", p.source).to_lowercase(),
            alerts.join(", ")
        );
    }
    println!("═══════════════════════════════════════════════════════════");
}

pub fn print_metrics(metrics: &FitMetrics) {
    println!("  MSE:           {:.3}", metrics.mse);
    println!("  RMSE:          {:.3}", metrics.rmse);
    println!("  R²:            {:.4}", metrics.r2);
}

// ============================================================================
// Tests
// ============================================================================
