//! Offline replay of recorded detector output through a game session.

use crate::config::ConfigIoError;
use boardsight_core::Detection;
use boardsight_moves::{FrameReport, GameSession, RulesEngine};
use log::info;
use std::{fs, path::Path};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Load a replay file: a JSON array of frames, each an array of detections.
pub fn load_detection_frames(path: impl AsRef<Path>) -> Result<Vec<Vec<Detection>>, ConfigIoError> {
    let raw = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

/// Feed every frame to `session` in order and collect the reports.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip_all, fields(token = session.token(), frames = frames.len()))
)]
pub fn replay<R: RulesEngine>(
    session: &mut GameSession<R>,
    frames: &[Vec<Detection>],
) -> Vec<FrameReport> {
    let reports: Vec<FrameReport> = frames.iter().map(|f| session.observe(f)).collect();
    let moves = reports.iter().filter(|r| r.move_uci.is_some()).count();
    info!(
        "{}: replayed {} frames, {moves} moves",
        session.token(),
        reports.len()
    );
    reports
}

#[cfg(test)]
mod tests {
    use super::*;
    use boardsight_core::BBox;

    #[test]
    fn frames_are_read_from_nested_arrays() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("frames.json");
        let raw = r#"[
            [{"class_name": "white-pawn", "bbox": [10, 20, 50, 90], "confidence": 0.9, "class_id": 0}],
            [],
            [{"class_name": "black-king", "bbox": [0, 0, 5, 5], "confidence": 0.5, "track_id": 7}]
        ]"#;
        fs::write(&path, raw).expect("write");

        let frames = load_detection_frames(&path).expect("load");
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0][0].bbox, BBox::new(10, 20, 50, 90));
        assert!(frames[1].is_empty());
        assert_eq!(frames[2][0].track_id, Some(7));
        assert_eq!(frames[2][0].class_id, 0);
    }

    #[test]
    fn malformed_frames_are_a_json_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("frames.json");
        fs::write(&path, "[{\"not\": \"a frame\"}]").expect("write");
        assert!(matches!(
            load_detection_frames(&path),
            Err(ConfigIoError::Json(_))
        ));
    }
}
