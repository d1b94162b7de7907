//! Core types and utilities for chessboard vision.
//!
//! This crate is small and purely geometric: corner ordering, the
//! point-in-quad test, 4-point homographies and perspective warps, plus the
//! board-state vocabulary (pieces, occupancy matrices, detections) shared by
//! the calibration and move-inference crates. It does not run any detector.

mod detection;
mod geometry;
mod homography;
mod logger;
mod occupancy;
mod piece;
mod raster;

pub use detection::{BBox, Detection};
pub use geometry::{
    distance, order_corners, point_in_quad, polygon_area, quad_centroid, quad_extent, Quad,
};
pub use homography::{warp_perspective, Homography};
pub use occupancy::{BoardSquare, InvalidPieceId, Occupancy, BOARD_SIZE, EMPTY_ID};
pub use piece::{Piece, Role, Side};
pub use raster::{sample_bilinear, sample_pixel, to_gray};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::init_with_level;
