/// Persistence of the configured sensor coordinate.
///
/// The coordinate is stored as a single JSON object, `{"latitud": .., "longitud": ..}`,
/// so it survives restarts. Writes go to a sibling temporary file that is
/// then renamed over the target, so a crash mid-write leaves the previous
/// coordinate intact.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::logging::{self, Component};
use crate::model::{AlertError, Coordinate};

#[derive(Debug, Clone)]
pub struct CoordinateStore {
    path: PathBuf,
}

impl CoordinateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the persisted coordinate. `Ok(None)` when nothing has been
    /// saved yet.
    pub fn load(&self) -> Result<Option<Coordinate>, AlertError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.error("read", e)),
        };
        let coordinate: Coordinate = serde_json::from_str(&text).map_err(|e| self.error("parse", e))?;
        coordinate.validate()?;
        Ok(Some(coordinate))
    }

    /// The persisted coordinate, or `default` when none was saved or the
    /// file cannot be used. An unusable file is logged as a warning.
    pub fn load_or(&self, default: Coordinate) -> Coordinate {
        let subject = self.path.display().to_string();
        match self.load() {
            Ok(Some(saved)) => {
                logging::info(
                    Component::System,
                    Some(&subject),
                    &format!("Restored configured coordinate {}", saved),
                );
                saved
            }
            Ok(None) => default,
            Err(e) => {
                logging::warn(
                    Component::System,
                    Some(&subject),
                    &format!("Ignoring saved coordinate ({}); using {}", e, default),
                );
                default
            }
        }
    }

    pub fn save(&self, coordinate: &Coordinate) -> Result<(), AlertError> {
        coordinate.validate()?;
        let json = serde_json::to_string_pretty(coordinate).map_err(|e| self.error("encode", e))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.error("create directory for", e))?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|e| self.error("write", e))?;
        fs::rename(&tmp, &self.path).map_err(|e| self.error("replace", e))
    }

    fn error(&self, action: &str, err: impl std::fmt::Display) -> AlertError {
        AlertError::Persistence(format!("failed to {} {}: {}", action, self.path.display(), err))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = CoordinateStore::new(dir.path().join("coordenadas.json"));
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = CoordinateStore::new(dir.path().join("nested").join("coordenadas.json"));
        let coordinate = Coordinate::new(19.5113119, -99.1251155);
        store.save(&coordinate).expect("save should succeed");
        assert_eq!(store.load().unwrap(), Some(coordinate));
        assert!(!store.path().with_extension("json.tmp").exists(), "temp file should be renamed away");
    }

    #[test]
    fn test_file_uses_dashboard_field_names() {
        let dir = tempfile::tempdir().unwrap();
        let store = CoordinateStore::new(dir.path().join("coordenadas.json"));
        store.save(&Coordinate::new(19.5, -99.1)).unwrap();
        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(raw["latitud"], 19.5);
        assert_eq!(raw["longitud"], -99.1);
    }

    #[test]
    fn test_save_overwrites_previous_value() {
        let dir = tempfile::tempdir().unwrap();
        let store = CoordinateStore::new(dir.path().join("coordenadas.json"));
        store.save(&Coordinate::new(19.5, -99.1)).unwrap();
        store.save(&Coordinate::new(19.4, -99.2)).unwrap();
        assert_eq!(store.load().unwrap(), Some(Coordinate::new(19.4, -99.2)));
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("coordenadas.json");
        fs::write(&path, "{\"latitud\": \"norte\"}").unwrap();
        assert!(matches!(CoordinateStore::new(path).load(), Err(AlertError::Persistence(_))));
    }

    #[test]
    fn test_load_or_falls_back_on_missing_and_corrupt_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = CoordinateStore::new(dir.path().join("coordenadas.json"));
        let default = Coordinate::new(19.5041017692, -99.0986932319);
        assert_eq!(store.load_or(default), default);

        fs::write(store.path(), "{ broken").unwrap();
        assert_eq!(store.load_or(default), default);

        store.save(&Coordinate::new(19.4, -99.2)).unwrap();
        assert_eq!(store.load_or(default), Coordinate::new(19.4, -99.2));
    }

    #[test]
    fn test_invalid_coordinate_is_not_saved() {
        let dir = tempfile::tempdir().unwrap();
        let store = CoordinateStore::new(dir.path().join("coordenadas.json"));
        assert!(store.save(&Coordinate::new(123.0, 0.0)).is_err());
        assert!(!store.path().exists());
    }
}
