/// Service configuration.
///
/// Loaded from a TOML file (`flood_alert.toml` by default) in which every
/// key is optional, then patched from the environment. `.env` is read first
/// so local overrides do not need to be exported by hand.
///
/// Environment overrides:
///   FLOOD_ALERT_BIND          [server] bind
///   FLOOD_ALERT_DATASET       [paths] dataset
///   FLOOD_ALERT_MODEL         [paths] model
///   FLOOD_ALERT_COORDS_FILE   [paths] coordinates
///   FLOOD_ALERT_LOG_FILE      [paths] log_file

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::alert::classify::RiskThresholds;
use crate::alert::rules::DecisionTable;
use crate::model::{AlertError, Coordinate};
use crate::regression::{HoldoutSplit, TreeParams};
use crate::sensor::SensorBreakpoints;
use crate::zones::{BoundingBox, DEFAULT_MATCH_TOLERANCE_DEG};

pub const DEFAULT_CONFIG_FILE: &str = "flood_alert.toml";
pub const DEFAULT_BIND: &str = "0.0.0.0:5000";
pub const DEFAULT_DATASET_PATH: &str = "data/dataset_procesado.csv";
pub const DEFAULT_MODEL_PATH: &str = "data/modelo_riesgo.json";
pub const DEFAULT_COORDS_PATH: &str = "data/coordenadas.json";

/// Configured sensor location used until one is set through the dashboard.
pub const DEFAULT_LOCATION: Coordinate = Coordinate::new(19.5041017692, -99.0986932319);

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind: DEFAULT_BIND.to_string() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub dataset: PathBuf,
    pub model: PathBuf,
    pub coordinates: PathBuf,
    pub log_file: Option<PathBuf>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            dataset: PathBuf::from(DEFAULT_DATASET_PATH),
            model: PathBuf::from(DEFAULT_MODEL_PATH),
            coordinates: PathBuf::from(DEFAULT_COORDS_PATH),
            log_file: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    pub breakpoints: SensorBreakpoints,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionConfig {
    #[serde(flatten)]
    pub bounds: BoundingBox,
    pub match_tolerance_deg: f64,
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self {
            bounds: BoundingBox::default(),
            match_tolerance_deg: DEFAULT_MATCH_TOLERANCE_DEG,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationConfig {
    pub latitude: f64,
    pub longitude: f64,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            latitude: DEFAULT_LOCATION.latitude,
            longitude: DEFAULT_LOCATION.longitude,
        }
    }
}

impl LocationConfig {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }
}

// ---------------------------------------------------------------------------
// Top level
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub paths: PathsConfig,
    pub sensor: SensorConfig,
    pub risk: RiskThresholds,
    pub region: RegionConfig,
    pub location: LocationConfig,
    pub model: TreeParams,
    /// Held-out rows used by `train` and `verify`.
    pub evaluation: HoldoutSplit,
    /// Overrides the built-in decision table when present.
    pub rules: Option<DecisionTable>,
}

impl Config {
    /// Loads configuration from `path`, or from `FLOOD_ALERT_CONFIG` /
    /// `flood_alert.toml` when no path is given.
    ///
    /// An explicitly named file must exist. The default file is optional.
    pub fn load(path: Option<&Path>) -> Result<Self, AlertError> {
        dotenv::dotenv().ok();

        let (path, required) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => match std::env::var("FLOOD_ALERT_CONFIG") {
                Ok(p) => (PathBuf::from(p), true),
                Err(_) => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
            },
        };

        let mut config = match fs::read_to_string(&path) {
            Ok(text) => Self::from_toml(&text)
                .map_err(|e| AlertError::Config(format!("{}: {}", path.display(), e)))?,
            Err(e) if e.kind() == ErrorKind::NotFound && !required => Self::default(),
            Err(e) => {
                return Err(AlertError::Config(format!(
                    "cannot read {}: {}",
                    path.display(),
                    e
                )));
            }
        };

        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Parses and validates a TOML document without touching the environment.
    pub fn from_toml(text: &str) -> Result<Self, AlertError> {
        let config: Config =
            toml::from_str(text).map_err(|e| AlertError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Applies overrides from a variable lookup (the process environment in
    /// production, a map in tests).
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(bind) = lookup("FLOOD_ALERT_BIND") {
            self.server.bind = bind;
        }
        if let Some(p) = lookup("FLOOD_ALERT_DATASET") {
            self.paths.dataset = PathBuf::from(p);
        }
        if let Some(p) = lookup("FLOOD_ALERT_MODEL") {
            self.paths.model = PathBuf::from(p);
        }
        if let Some(p) = lookup("FLOOD_ALERT_COORDS_FILE") {
            self.paths.coordinates = PathBuf::from(p);
        }
        if let Some(p) = lookup("FLOOD_ALERT_LOG_FILE") {
            self.paths.log_file = Some(PathBuf::from(p));
        }
    }

    pub fn validate(&self) -> Result<(), AlertError> {
        if self.server.bind.trim().is_empty() {
            return Err(AlertError::Config("server.bind must not be empty".to_string()));
        }
        self.sensor.breakpoints.validate()?;
        self.risk.validate()?;
        self.region.bounds.validate()?;
        if !(self.region.match_tolerance_deg.is_finite() && self.region.match_tolerance_deg > 0.0) {
            return Err(AlertError::Config(format!(
                "region.match_tolerance_deg must be a positive number, got {}",
                self.region.match_tolerance_deg
            )));
        }
        self.location
            .coordinate()
            .validate()
            .map_err(|e| AlertError::Config(format!("location: {}", e)))?;
        self.model.validate()?;
        self.evaluation.validate()?;
        if let Some(table) = &self.rules {
            table.validate()?;
        }
        Ok(())
    }

    pub fn decision_table(&self) -> DecisionTable {
        self.rules.unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
