//! JSON configuration shared by the CLI and embedding applications.

use boardsight_calib::{CalibrationParams, CalibrationStore};
use boardsight_moves::SessionParams;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

#[derive(thiserror::Error, Debug)]
pub enum ConfigIoError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

fn default_mappings_dir() -> PathBuf {
    PathBuf::from("chessboard_mappings")
}

/// Every tunable of the pipeline in one file. Missing sections fall back to
/// their defaults, so `{}` is a valid config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardsightConfig {
    #[serde(default)]
    pub calibration: CalibrationParams,
    #[serde(default)]
    pub session: SessionParams,
    /// Directory holding `<token>_mapping.json` calibration files.
    #[serde(default = "default_mappings_dir")]
    pub mappings_dir: PathBuf,
}

impl Default for BoardsightConfig {
    fn default() -> Self {
        Self {
            calibration: CalibrationParams::default(),
            session: SessionParams::default(),
            mappings_dir: default_mappings_dir(),
        }
    }
}

impl BoardsightConfig {
    /// Load a JSON config from disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ConfigIoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ConfigIoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn store(&self) -> CalibrationStore {
        CalibrationStore::new(&self.mappings_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use boardsight_calib::OutputSize;
    use boardsight_moves::PreviousUpdate;

    #[test]
    fn empty_object_is_the_default_config() {
        let cfg: BoardsightConfig = serde_json::from_str("{}").expect("parse");
        assert_eq!(cfg, BoardsightConfig::default());
        assert_eq!(cfg.store().dir(), Path::new("chessboard_mappings"));
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let raw = r#"{
            "calibration": { "check_empty": false, "emptiness": { "threshold": 0.3 } },
            "session": { "previous_update": "on_move" },
            "mappings_dir": "maps"
        }"#;
        let cfg: BoardsightConfig = serde_json::from_str(raw).expect("parse");
        assert!(!cfg.calibration.check_empty);
        assert_eq!(cfg.calibration.emptiness.threshold, 0.3);
        assert_eq!(
            cfg.calibration.output_size,
            OutputSize::Fixed {
                width: 640,
                height: 640
            }
        );
        assert_eq!(cfg.session.previous_update, PreviousUpdate::OnMove);
        assert_eq!(cfg.session.tracker.iou_threshold, 0.3);
        assert_eq!(cfg.mappings_dir, PathBuf::from("maps"));
    }

    #[test]
    fn config_survives_a_file_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("boardsight.json");
        let mut cfg = BoardsightConfig::default();
        cfg.calibration.grid.hough_vote_threshold = 80;
        cfg.write_json(&path).expect("write");
        assert_eq!(BoardsightConfig::load_json(&path).expect("load"), cfg);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = BoardsightConfig::load_json("/nonexistent/boardsight.json").unwrap_err();
        assert!(matches!(err, ConfigIoError::Io(_)));
    }
}
