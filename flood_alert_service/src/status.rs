/// Status and ingestion façade.
///
/// `StatusService` owns the only mutable state of the service: the
/// configured sensor coordinate and the most recent `PredictionResult`.
/// Both live behind one mutex so a status read never observes a result
/// computed for one coordinate paired with another, and an ingest always
/// evaluates against the coordinate current at the moment it runs.
///
/// Only the latest result is kept. Before the first valid reading the
/// status is the GRAY sentinel.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Mutex, MutexGuard};

use crate::alert::AlertEngine;
use crate::ingest::reading::{decode_reading, Rejection, SensorReading};
use crate::logging::{self, Component};
use crate::model::{
    AlertColor, AlertError, Coordinate, PredictionResult, RiskBand, ScoreSource, SensorLevel,
};
use crate::store::CoordinateStore;

// ---------------------------------------------------------------------------
// Wire representation
// ---------------------------------------------------------------------------

/// Body of `GET /api/status`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusResponse {
    pub alerta: AlertColor,
    pub riesgo_zona: Option<RiskBand>,
    pub riesgo_score: Option<f64>,
    pub nivel_sensor: Option<SensorLevel>,
    pub coordenadas: Coordinate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fuente: Option<ScoreSource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actualizado: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mensaje: Option<String>,
}

impl StatusResponse {
    /// Sentinel reported before any valid reading has been ingested.
    pub fn waiting(coordinate: Coordinate) -> Self {
        Self {
            alerta: AlertColor::Gray,
            riesgo_zona: None,
            riesgo_score: None,
            nivel_sensor: None,
            coordenadas: coordinate,
            fuente: None,
            actualizado: None,
            mensaje: Some(AlertColor::Gray.guidance().to_string()),
        }
    }

    pub fn from_result(result: &PredictionResult) -> Self {
        Self {
            alerta: result.alert,
            riesgo_zona: Some(result.risk_band),
            riesgo_score: Some(round_one_decimal(result.risk_score)),
            nivel_sensor: Some(result.sensor_level),
            coordenadas: result.coordinate,
            fuente: Some(result.score_source),
            actualizado: Some(result.computed_at),
            mensaje: None,
        }
    }
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

/// What happened to one ingested payload. The HTTP layer acknowledges both.
#[derive(Debug, Clone, PartialEq)]
pub enum IngestOutcome {
    Accepted(PredictionResult),
    Discarded(Rejection),
}

struct ServiceState {
    coordinate: Coordinate,
    last: Option<PredictionResult>,
}

pub struct StatusService {
    engine: AlertEngine,
    store: CoordinateStore,
    state: Mutex<ServiceState>,
}

impl StatusService {
    /// Creates the service, restoring the persisted coordinate when one
    /// exists. An unreadable coordinate file is reported and replaced by
    /// `default_coordinate` rather than preventing startup.
    pub fn new(engine: AlertEngine, store: CoordinateStore, default_coordinate: Coordinate) -> Self {
        let coordinate = store.load_or(default_coordinate);

        Self {
            engine,
            store,
            state: Mutex::new(ServiceState { coordinate, last: None }),
        }
    }

    pub fn engine(&self) -> &AlertEngine {
        &self.engine
    }

    fn state(&self) -> MutexGuard<'_, ServiceState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Best-effort ingestion of a raw device payload. Malformed payloads
    /// are logged and leave the stored result untouched.
    pub fn ingest(&self, body: &[u8]) -> IngestOutcome {
        match decode_reading(body) {
            Ok(reading) => IngestOutcome::Accepted(self.ingest_reading(&reading)),
            Err(rejection) => {
                logging::log_discarded_reading(body, &rejection.to_string());
                IngestOutcome::Discarded(rejection)
            }
        }
    }

    /// Evaluates a decoded reading against the configured coordinate and
    /// replaces the stored result.
    pub fn ingest_reading(&self, reading: &SensorReading) -> PredictionResult {
        logging::info(
            Component::Sensor,
            None,
            &format!("v={:.3} V | pct={:.2} %", reading.voltage, reading.percent),
        );
        if !reading.percent_in_range() {
            logging::warn(
                Component::Sensor,
                None,
                &format!("pct={:.2} outside 0-100; ignored by the alert decision", reading.percent),
            );
        }

        let mut state = self.state();
        let result = self.engine.evaluate(&state.coordinate, reading);
        logging::info(
            Component::Sensor,
            Some(&result.coordinate.to_string()),
            &format!(
                "Nivel sensor: {} → zona {} ({:.1}) → alerta {}",
                result.sensor_level, result.risk_band, result.risk_score, result.alert
            ),
        );
        state.last = Some(result.clone());
        result
    }

    pub fn last_result(&self) -> Option<PredictionResult> {
        self.state().last.clone()
    }

    /// Current status for the dashboard.
    pub fn status(&self) -> StatusResponse {
        let state = self.state();
        match &state.last {
            Some(result) => StatusResponse::from_result(result),
            None => StatusResponse::waiting(state.coordinate),
        }
    }

    pub fn coordinates(&self) -> Coordinate {
        self.state().coordinate
    }

    /// Persists and applies a new coordinate. The in-memory coordinate only
    /// changes once the file has been written.
    pub fn set_coordinates(&self, coordinate: Coordinate) -> Result<(), AlertError> {
        coordinate.validate()?;
        let mut state = self.state();
        self.store.save(&coordinate)?;
        state.coordinate = coordinate;
        drop(state);

        logging::info(
            Component::System,
            Some(&coordinate.to_string()),
            "Configured coordinate updated",
        );
        if !self.engine.lookup().region().contains(&coordinate) {
            logging::warn(
                Component::Zone,
                Some(&coordinate.to_string()),
                "New coordinate lies outside the service region",
            );
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
