//! One JSON file per game token: `<dir>/<token>_mapping.json`.

use crate::record::{Calibration, CalibrationRecord};
use log::{debug, info};
use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("no calibration stored for token {token:?}")]
    NotFound { token: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("calibration for token {token:?} was not successful")]
    Unsuccessful { token: String },
    #[error("invalid calibration record: {0}")]
    Invalid(String),
    #[error("game token {token:?} cannot be used as a file name")]
    InvalidToken { token: String },
}

#[derive(Clone, Debug)]
pub struct CalibrationStore {
    dir: PathBuf,
}

impl CalibrationStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File of `token` inside the store directory. Tokens that are empty or
    /// contain path separators or `..` are rejected.
    pub fn path_for(&self, token: &str) -> Result<PathBuf, StoreError> {
        if token.is_empty() || token.contains(['/', '\\']) || token.contains("..") {
            return Err(StoreError::InvalidToken {
                token: token.to_string(),
            });
        }
        Ok(self.dir.join(format!("{token}_mapping.json")))
    }

    /// Write a successful record as pretty JSON, creating the directory if
    /// needed. Failed records are never persisted.
    pub fn save(&self, record: &CalibrationRecord) -> Result<PathBuf, StoreError> {
        if !record.success {
            return Err(StoreError::Unsuccessful {
                token: record.game_token.clone(),
            });
        }
        let path = self.path_for(&record.game_token)?;
        fs::create_dir_all(&self.dir)?;
        let json = serde_json::to_string_pretty(record)?;
        fs::write(&path, json)?;
        info!("calibration saved to {}", path.display());
        Ok(path)
    }

    pub fn load(&self, token: &str) -> Result<CalibrationRecord, StoreError> {
        let path = self.path_for(token)?;
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("no calibration at {}", path.display());
                return Err(StoreError::NotFound {
                    token: token.to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_str(&raw)?)
    }

    /// Load and validate the record for `token`.
    pub fn load_calibration(&self, token: &str) -> Result<Calibration, StoreError> {
        Calibration::try_from(self.load(token)?)
    }

    pub fn contains(&self, token: &str) -> bool {
        self.path_for(token).is_ok_and(|path| path.is_file())
    }
}

impl Default for CalibrationStore {
    fn default() -> Self {
        Self::new("chessboard_mappings")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_name_follows_the_token() {
        let store = CalibrationStore::new("/tmp/maps");
        assert_eq!(
            store.path_for("abc").expect("plain token"),
            PathBuf::from("/tmp/maps/abc_mapping.json")
        );
    }

    #[test]
    fn tokens_cannot_leave_the_store_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = CalibrationStore::new(dir.path().join("maps"));
        for token in ["../x", "a/b", "a\\b", "..", ""] {
            assert!(
                matches!(store.path_for(token), Err(StoreError::InvalidToken { .. })),
                "{token:?}"
            );
            assert!(!store.contains(token));
            assert!(matches!(
                store.load(token),
                Err(StoreError::InvalidToken { .. })
            ));
        }
        assert!(store.path_for("game-7.v2").is_ok());
    }

    #[test]
    fn missing_token_is_not_found() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = CalibrationStore::new(dir.path());
        assert!(!store.contains("nope"));
        assert!(matches!(
            store.load("nope"),
            Err(StoreError::NotFound { token }) if token == "nope"
        ));
    }

    #[test]
    fn unsuccessful_records_are_not_written() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = CalibrationStore::new(dir.path().join("nested"));
        let record = CalibrationRecord::pending("t1");
        assert!(matches!(
            store.save(&record),
            Err(StoreError::Unsuccessful { .. })
        ));
        assert!(!store.dir().exists());
    }

    #[test]
    fn corrupt_json_is_a_hard_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = CalibrationStore::new(dir.path());
        fs::write(store.path_for("bad").expect("path"), "{not json").expect("write");
        assert!(matches!(store.load("bad"), Err(StoreError::Json(_))));
    }
}
