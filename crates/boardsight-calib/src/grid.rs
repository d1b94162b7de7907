//! Square-corner grid extraction from a rectified board image.

use crate::filters::{dilate3, edge_map};
use crate::lines::{
    cluster_lines, hugs_border, intersections, split_by_orientation, suppress_duplicates, GridLine,
};
use crate::params::GridParams;
use crate::ward::ward_centroids;
use boardsight_core::Quad;
use image::GrayImage;
use imageproc::hough::{detect_lines, LineDetectionOptions};
use log::debug;
use nalgebra::Point2;
use thiserror::Error;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Half width of the band of edge pixels a Hough line is re-centred on.
const OFFSET_BAND_PX: f32 = 3.0;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum GridError {
    #[error("not enough grid lines: {horizontal} horizontal, {vertical} vertical (need {required} each)")]
    TooFewLines {
        horizontal: usize,
        vertical: usize,
        required: usize,
    },
    #[error("not enough line intersections: found {found}, need {required}")]
    TooFewIntersections { found: usize, required: usize },
    #[error("intersection clustering produced {found} points instead of {required}")]
    Clustering { found: usize, required: usize },
}

/// `(n + 1) x (n + 1)` square corners of an `n x n` board, row-major from
/// the top row, each row ordered left to right.
#[derive(Clone, Debug, PartialEq)]
pub struct SquareGrid {
    side: usize,
    points: Vec<Point2<f32>>,
}

impl SquareGrid {
    /// Build from row-major points; `None` unless there are `side * side`
    /// of them.
    pub fn new(side: usize, points: Vec<Point2<f32>>) -> Option<Self> {
        (side >= 2 && points.len() == side * side).then_some(Self { side, points })
    }

    /// Corner points per side (9 for a standard board).
    pub fn side(&self) -> usize {
        self.side
    }

    /// Squares per side.
    pub fn squares(&self) -> usize {
        self.side - 1
    }

    pub fn points(&self) -> &[Point2<f32>] {
        &self.points
    }

    pub fn point(&self, row: usize, col: usize) -> Point2<f32> {
        self.points[row * self.side + col]
    }

    /// Corners of square `(row, col)` as `[TL, TR, BR, BL]`.
    pub fn cell(&self, row: usize, col: usize) -> Quad {
        [
            self.point(row, col),
            self.point(row, col + 1),
            self.point(row + 1, col + 1),
            self.point(row + 1, col),
        ]
    }

    /// All squares, row-major.
    pub fn cells(&self) -> impl Iterator<Item = ((usize, usize), Quad)> + '_ {
        let n = self.squares();
        (0..n).flat_map(move |r| (0..n).map(move |c| ((r, c), self.cell(r, c))))
    }

    pub fn to_nested(&self) -> Vec<Vec<[f32; 2]>> {
        self.points
            .chunks(self.side)
            .map(|row| row.iter().map(|p| [p.x, p.y]).collect())
            .collect()
    }

    /// Inverse of [`SquareGrid::to_nested`]; rows must be square and
    /// equally long.
    pub fn from_nested(rows: &[Vec<[f32; 2]>]) -> Option<Self> {
        let side = rows.len();
        if rows.iter().any(|r| r.len() != side) {
            return None;
        }
        let points = rows
            .iter()
            .flatten()
            .map(|&[x, y]| Point2::new(x, y))
            .collect();
        Self::new(side, points)
    }
}

/// Find the `(squares + 1)^2` square corners of a rectified board.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip(rectified, params), fields(width = rectified.width(), height = rectified.height()))
)]
pub fn extract_grid(rectified: &GrayImage, params: &GridParams) -> Result<SquareGrid, GridError> {
    let n = params.squares;
    let side = n + 1;

    let edges = dilate3(&edge_map(rectified, params.canny_low, params.canny_high), 1);
    let polar = detect_lines(
        &edges,
        LineDetectionOptions {
            vote_threshold: params.hough_vote_threshold,
            suppression_radius: params.hough_suppression_radius,
        },
    );
    let (horizontal, vertical) = split_by_orientation(&polar);
    let (width, height) = rectified.dimensions();
    let edge_points = edge_pixels(&edges);
    let radius = params.hough_suppression_radius as f32;
    let clean = |bucket: Vec<GridLine>| -> Vec<GridLine> {
        let inside: Vec<GridLine> = bucket
            .into_iter()
            .filter(|l| l.axis_deviation_deg() <= params.max_axis_deviation_deg)
            .filter(|l| !hugs_border(l, width, height, params.border_margin_px))
            .collect();
        suppress_duplicates(&inside, |l| line_support(&edge_points, l), radius, radius)
            .iter()
            .map(|l| recenter(&edge_points, l, OFFSET_BAND_PX))
            .collect()
    };
    let (horizontal, vertical) = (clean(horizontal), clean(vertical));
    debug!(
        "hough: {} lines, {} horizontal, {} vertical",
        polar.len(),
        horizontal.len(),
        vertical.len()
    );
    if horizontal.len() < n || vertical.len() < n {
        return Err(GridError::TooFewLines {
            horizontal: horizontal.len(),
            vertical: vertical.len(),
            required: n,
        });
    }

    let horizontal = cluster_lines(&horizontal, side, params.merge_tolerance_px);
    let vertical = cluster_lines(&vertical, side, params.merge_tolerance_px);
    if horizontal.len() < side || vertical.len() < side {
        return Err(GridError::TooFewLines {
            horizontal: horizontal.len(),
            vertical: vertical.len(),
            required: side,
        });
    }

    let points = intersections(&horizontal, &vertical, width, height);
    let required = side * side;
    if points.len() < required {
        return Err(GridError::TooFewIntersections {
            found: points.len(),
            required,
        });
    }

    let points = ward_centroids(&points, required);
    if points.len() != required {
        return Err(GridError::Clustering {
            found: points.len(),
            required,
        });
    }
    let grid = sort_into_rows(points, side);
    debug!("grid extracted: {side}x{side} corners");
    SquareGrid::new(side, grid).ok_or(GridError::Clustering {
        found: required,
        required,
    })
}

fn edge_pixels(edges: &GrayImage) -> Vec<Point2<f32>> {
    edges
        .enumerate_pixels()
        .filter(|(_, _, p)| p[0] > 0)
        .map(|(x, y, _)| Point2::new(x as f32, y as f32))
        .collect()
}

/// Edge pixels within one pixel of the line.
fn line_support(edge_points: &[Point2<f32>], line: &GridLine) -> usize {
    let (sin, cos) = line.theta.sin_cos();
    edge_points
        .iter()
        .filter(|p| (p.x * cos + p.y * sin - line.rho).abs() <= 1.0)
        .count()
}

/// Move the line onto the mean offset of the edge pixels within `band` of
/// it. Hough offsets are whole pixels, truncated, and ties in the
/// accumulator go to the smaller offset, so a dilated edge band comes back
/// at its near side.
fn recenter(edge_points: &[Point2<f32>], line: &GridLine, band: f32) -> GridLine {
    let (sin, cos) = line.theta.sin_cos();
    let (sum, count) = edge_points
        .iter()
        .map(|p| p.x * cos + p.y * sin)
        .filter(|d| (d - line.rho).abs() <= band)
        .fold((0.0f64, 0usize), |(sum, n), d| (sum + d as f64, n + 1));
    if count == 0 {
        return *line;
    }
    GridLine::new((sum / count as f64) as f32, line.theta)
}

/// Sort by y, cut into bands of `side` points, sort each band by x.
fn sort_into_rows(mut points: Vec<Point2<f32>>, side: usize) -> Vec<Point2<f32>> {
    points.sort_by(|a, b| a.y.total_cmp(&b.y));
    for band in points.chunks_mut(side) {
        band.sort_by(|a, b| a.x.total_cmp(&b.x));
    }
    points
}
