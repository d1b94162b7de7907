//! Chessboard calibration from a single camera frame.
//!
//! The pipeline finds the board's outer corners, warps the board to a
//! canonical top-down image, locates the `9 x 9` square-corner grid on that
//! image and checks that no pieces are present yet:
//!
//! ```no_run
//! use boardsight_calib::{CalibrationStore, Calibrator};
//!
//! let frame = image::open("empty_board.jpg").unwrap();
//! let store = CalibrationStore::new("chessboard_mappings");
//! let record = Calibrator::default()
//!     .calibrate_and_store(&frame, "game-42", &store)
//!     .unwrap();
//! println!("success: {}", record.success);
//! ```
//!
//! Successful records are persisted as JSON and reloaded with
//! [`CalibrationStore::load_calibration`], which yields a [`Calibration`]
//! able to rectify later frames of the same game.

mod boundary;
mod calibrate;
mod emptiness;
mod filters;
mod grid;
mod lines;
mod params;
mod record;
mod rectify;
mod segments;
mod store;
mod ward;

pub use boundary::{
    detect_board, BoardBoundaryDetector, BoardCorners, BoardSegmenter, BoundarySource,
};
pub use calibrate::{CalibrationFailure, Calibrator};
pub use emptiness::{check_empty, EmptinessReport};
pub use grid::{extract_grid, GridError, SquareGrid};
pub use lines::{
    cluster_lines, intersect, intersections, split_by_orientation, GridLine,
    LineOrientation,
};
pub use params::{BoardDetectParams, CalibrationParams, EmptinessParams, GridParams, OutputSize};
pub use record::{Calibration, CalibrationRecord};
pub use rectify::{canonical_corners, rectify_board, resolve_output_size, warp_with, RectifiedBoard};
pub use store::{CalibrationStore, StoreError};
pub use ward::ward_centroids;

// Re-export core types for convenience.
pub use boardsight_core::{Homography, Quad};
