//! Persistent calibration record and its validated in-memory view.

use crate::grid::SquareGrid;
use crate::rectify::warp_with;
use crate::store::StoreError;
use boardsight_core::{Homography, Quad};
use chrono::{DateTime, Utc};
use image::{ImageBuffer, Pixel};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// Outcome of one calibration attempt, in its on-disk JSON shape.
///
/// Stages that did not run (or failed) leave their fields `None`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalibrationRecord {
    pub success: bool,
    pub game_token: String,
    pub timestamp: DateTime<Utc>,
    pub error: Option<String>,
    pub is_empty: Option<bool>,
    pub empty_confidence: Option<f32>,
    pub board_corners: Option<Vec<[f32; 2]>>,
    pub square_corners: Option<Vec<Vec<[f32; 2]>>>,
    /// Source frame -> rectified image.
    pub perspective_matrix: Option<[[f64; 3]; 3]>,
    /// `[height, width, channels]` of the rectified image.
    pub warped_image_shape: Option<Vec<u32>>,
}

impl CalibrationRecord {
    /// Fresh record with every stage still pending.
    pub fn pending(game_token: impl Into<String>) -> Self {
        Self {
            success: false,
            game_token: game_token.into(),
            timestamp: Utc::now(),
            error: None,
            is_empty: None,
            empty_confidence: None,
            board_corners: None,
            square_corners: None,
            perspective_matrix: None,
            warped_image_shape: None,
        }
    }
}

/// A successful calibration, validated and ready to rectify frames.
#[derive(Clone, Debug, PartialEq)]
pub struct Calibration {
    pub game_token: String,
    pub timestamp: DateTime<Utc>,
    /// Board corners in the source frame, `[TL, TR, BR, BL]`.
    pub board_corners: Quad,
    /// Square corners in rectified coordinates.
    pub grid: SquareGrid,
    pub homography: Homography,
    pub width: u32,
    pub height: u32,
    pub channels: u32,
    pub empty_confidence: Option<f32>,
}

impl Calibration {
    /// Rectify a new frame with the stored homography at the stored size.
    pub fn rectify<P>(&self, frame: &ImageBuffer<P, Vec<u8>>) -> Option<ImageBuffer<P, Vec<u8>>>
    where
        P: Pixel<Subpixel = u8>,
    {
        warp_with(frame, &self.homography, self.width, self.height)
    }

    pub fn to_record(&self) -> CalibrationRecord {
        CalibrationRecord {
            success: true,
            game_token: self.game_token.clone(),
            timestamp: self.timestamp,
            error: None,
            is_empty: self.empty_confidence.map(|_| true),
            empty_confidence: self.empty_confidence,
            board_corners: Some(self.board_corners.iter().map(|p| [p.x, p.y]).collect()),
            square_corners: Some(self.grid.to_nested()),
            perspective_matrix: Some(self.homography.to_array()),
            warped_image_shape: Some(vec![self.height, self.width, self.channels]),
        }
    }
}

impl TryFrom<&CalibrationRecord> for Calibration {
    type Error = StoreError;

    fn try_from(record: &CalibrationRecord) -> Result<Self, Self::Error> {
        if !record.success {
            return Err(StoreError::Unsuccessful {
                token: record.game_token.clone(),
            });
        }
        let invalid = |what: &str| StoreError::Invalid(format!("{}: {what}", record.game_token));

        let corners = record
            .board_corners
            .as_deref()
            .ok_or_else(|| invalid("missing board_corners"))?;
        let board_corners: Quad = match corners {
            [a, b, c, d] => [a, b, c, d].map(|p| Point2::new(p[0], p[1])),
            _ => return Err(invalid("board_corners must hold 4 points")),
        };

        let grid = record
            .square_corners
            .as_deref()
            .ok_or_else(|| invalid("missing square_corners"))
            .and_then(|rows| {
                SquareGrid::from_nested(rows).ok_or_else(|| invalid("square_corners is not square"))
            })?;

        let homography = record
            .perspective_matrix
            .map(Homography::from_array)
            .ok_or_else(|| invalid("missing perspective_matrix"))?;
        if homography.inverse().is_none() {
            return Err(invalid("perspective_matrix is singular"));
        }

        let (height, width, channels) = match record.warped_image_shape.as_deref() {
            Some([h, w]) => (*h, *w, 1),
            Some([h, w, c]) => (*h, *w, *c),
            _ => return Err(invalid("warped_image_shape must be [h, w] or [h, w, c]")),
        };
        if width == 0 || height == 0 {
            return Err(invalid("warped_image_shape is empty"));
        }

        Ok(Self {
            game_token: record.game_token.clone(),
            timestamp: record.timestamp,
            board_corners,
            grid,
            homography,
            width,
            height,
            channels,
            empty_confidence: record.empty_confidence,
        })
    }
}

impl TryFrom<CalibrationRecord> for Calibration {
    type Error = StoreError;

    fn try_from(record: CalibrationRecord) -> Result<Self, Self::Error> {
        Self::try_from(&record)
    }
}
