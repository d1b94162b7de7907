//! Calibration pipeline: board boundary -> rectification -> square grid ->
//! emptiness check.

use crate::boundary::{BoardBoundaryDetector, BoardSegmenter};
use crate::emptiness::check_empty;
use crate::grid::{extract_grid, GridError};
use crate::params::CalibrationParams;
use crate::record::{Calibration, CalibrationRecord};
use crate::rectify::rectify_board;
use crate::store::{CalibrationStore, StoreError};
use boardsight_core::{order_corners, to_gray};
use image::DynamicImage;
use log::{info, warn};
use thiserror::Error;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Why a calibration attempt was rejected. None of these are fatal; the
/// caller may retry with another frame.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CalibrationFailure {
    #[error("board boundaries not found")]
    BoardNotFound,
    #[error("square corners not found: {0}")]
    GridNotFound(#[from] GridError),
    #[error("board is not empty (confidence {confidence:.2})")]
    NotEmpty { confidence: f32 },
    #[error("board corners are degenerate, no homography")]
    Homography,
}

pub struct Calibrator {
    params: CalibrationParams,
    detector: BoardBoundaryDetector,
}

impl Calibrator {
    pub fn new(params: CalibrationParams) -> Self {
        let detector = BoardBoundaryDetector::new(params.board.clone());
        Self { params, detector }
    }

    pub fn with_segmenter(mut self, segmenter: Box<dyn BoardSegmenter>) -> Self {
        self.detector = self.detector.with_segmenter(segmenter);
        self
    }

    pub fn params(&self) -> &CalibrationParams {
        &self.params
    }

    /// Calibrate from one frame of an empty board.
    pub fn run(&self, frame: &DynamicImage, token: &str) -> Result<Calibration, CalibrationFailure> {
        let mut record = CalibrationRecord::pending(token);
        self.attempt(frame, &mut record)
    }

    /// Like [`Calibrator::run`], but always produces a record. On failure the
    /// record carries the stages that completed and a readable error.
    #[cfg_attr(feature = "tracing", instrument(level = "info", skip(self, frame)))]
    pub fn calibrate(&self, frame: &DynamicImage, token: &str) -> CalibrationRecord {
        let mut record = CalibrationRecord::pending(token);
        match self.attempt(frame, &mut record) {
            Ok(_) => {
                record.success = true;
                info!("calibration for {token} succeeded");
            }
            Err(failure) => {
                warn!("calibration for {token} failed: {failure}");
                record.error = Some(failure.to_string());
            }
        }
        record
    }

    /// Calibrate and persist the record when it succeeded.
    pub fn calibrate_and_store(
        &self,
        frame: &DynamicImage,
        token: &str,
        store: &CalibrationStore,
    ) -> Result<CalibrationRecord, StoreError> {
        let record = self.calibrate(frame, token);
        if record.success {
            store.save(&record)?;
        }
        Ok(record)
    }

    fn attempt(
        &self,
        frame: &DynamicImage,
        record: &mut CalibrationRecord,
    ) -> Result<Calibration, CalibrationFailure> {
        let gray = to_gray(frame);
        let found = self
            .detector
            .detect(&gray)
            .ok_or(CalibrationFailure::BoardNotFound)?;
        let ordered = order_corners(&found.corners);
        record.board_corners = Some(ordered.iter().map(|p| [p.x, p.y]).collect());

        let rectified = rectify_board(&gray, &ordered, self.params.output_size)
            .ok_or(CalibrationFailure::Homography)?;
        let channels = frame.color().channel_count() as u32;
        record.perspective_matrix = Some(rectified.homography.to_array());
        record.warped_image_shape = Some(vec![rectified.height(), rectified.width(), channels]);

        let grid = extract_grid(&rectified.image, &self.params.grid)?;
        record.square_corners = Some(grid.to_nested());

        let mut empty_confidence = None;
        if self.params.check_empty {
            let report = check_empty(&rectified.image, &grid, self.params.emptiness.threshold);
            record.is_empty = Some(report.is_empty);
            record.empty_confidence = Some(report.confidence);
            if !report.is_empty {
                return Err(CalibrationFailure::NotEmpty {
                    confidence: report.confidence,
                });
            }
            empty_confidence = Some(report.confidence);
        }

        Ok(Calibration {
            game_token: record.game_token.clone(),
            timestamp: record.timestamp,
            board_corners: rectified.corners,
            grid,
            homography: rectified.homography,
            width: rectified.width(),
            height: rectified.height(),
            channels,
            empty_confidence,
        })
    }
}

impl Default for Calibrator {
    fn default() -> Self {
        Self::new(CalibrationParams::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    #[test]
    fn blank_frame_fails_without_a_board() {
        let frame = DynamicImage::ImageLuma8(GrayImage::from_pixel(160, 120, Luma([128])));
        let calibrator = Calibrator::default();
        assert_eq!(
            calibrator.run(&frame, "blank").unwrap_err(),
            CalibrationFailure::BoardNotFound
        );

        let record = calibrator.calibrate(&frame, "blank");
        assert!(!record.success);
        assert_eq!(record.game_token, "blank");
        assert_eq!(record.error.as_deref(), Some("board boundaries not found"));
        assert!(record.board_corners.is_none());
        assert!(record.perspective_matrix.is_none());
    }

    #[test]
    fn failed_calibration_is_not_stored() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = CalibrationStore::new(dir.path());
        let frame = DynamicImage::ImageLuma8(GrayImage::from_pixel(64, 64, Luma([10])));
        let record = Calibrator::default()
            .calibrate_and_store(&frame, "g", &store)
            .expect("no io error");
        assert!(!record.success);
        assert!(!store.contains("g"));
    }

    #[test]
    fn failure_messages_are_readable() {
        let err = CalibrationFailure::NotEmpty { confidence: 0.25 };
        assert_eq!(err.to_string(), "board is not empty (confidence 0.25)");
        let err = CalibrationFailure::from(GridError::TooFewIntersections {
            found: 70,
            required: 81,
        });
        assert_eq!(
            err.to_string(),
            "square corners not found: not enough line intersections: found 70, need 81"
        );
    }
}
