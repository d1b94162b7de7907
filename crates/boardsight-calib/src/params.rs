use serde::{Deserialize, Serialize};

/// Parameters of the board boundary detector.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct BoardDetectParams {
    /// Smallest board area as a fraction of the frame area.
    pub min_area_ratio: f32,
    /// Largest board area as a fraction of the frame area.
    pub max_area_ratio: f32,
    /// Neighbourhood size of the Gaussian adaptive threshold (odd).
    pub adaptive_block_size: u32,
    /// Constant subtracted from the local mean.
    pub adaptive_c: f32,
    pub canny_low: f32,
    pub canny_high: f32,
    /// How many of the largest contours are tried.
    pub max_contour_candidates: usize,
    /// Polygon approximation tolerance as a fraction of the perimeter.
    pub poly_epsilon_frac: f64,
    /// Accepted range of max(width, height) / min(width, height).
    pub min_aspect: f32,
    pub max_aspect: f32,
    /// Hough accumulator votes needed by the line fallback.
    pub line_vote_threshold: u32,
    /// Largest gap bridged inside one line segment, in pixels.
    pub max_line_gap: u32,
}

impl Default for BoardDetectParams {
    fn default() -> Self {
        Self {
            min_area_ratio: 0.1,
            max_area_ratio: 0.9,
            adaptive_block_size: 11,
            adaptive_c: 2.0,
            canny_low: 50.0,
            canny_high: 150.0,
            max_contour_candidates: 5,
            poly_epsilon_frac: 0.02,
            min_aspect: 0.7,
            max_aspect: 1.3,
            line_vote_threshold: 100,
            max_line_gap: 50,
        }
    }
}

/// Parameters of the square grid extractor.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct GridParams {
    /// Squares per board side.
    pub squares: usize,
    pub canny_low: f32,
    pub canny_high: f32,
    pub hough_vote_threshold: u32,
    /// Non-maximum suppression radius in the (rho, theta) accumulator.
    pub hough_suppression_radius: u32,
    /// Lines whose offsets differ by less than this many pixels are merged.
    pub merge_tolerance_px: f32,
    /// Lines this close to the image border are warp artifacts, not board
    /// lines.
    pub border_margin_px: f32,
    /// Lines tilted further than this from the image axes are dropped.
    /// Corner diagonals of the checkerboard collect many votes as well.
    pub max_axis_deviation_deg: f32,
}

impl Default for GridParams {
    fn default() -> Self {
        Self {
            squares: 8,
            canny_low: 50.0,
            canny_high: 150.0,
            hough_vote_threshold: 100,
            hough_suppression_radius: 15,
            merge_tolerance_px: 10.0,
            border_margin_px: 4.0,
            max_axis_deviation_deg: 15.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct EmptinessParams {
    /// Mean coefficient of variation below which the board counts as empty.
    pub threshold: f32,
}

impl Default for EmptinessParams {
    fn default() -> Self {
        Self { threshold: 0.15 }
    }
}

/// Size of the rectified board image.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputSize {
    Fixed { width: u32, height: u32 },
    /// Longest pair of opposite quad edges.
    Auto,
}

impl Default for OutputSize {
    fn default() -> Self {
        OutputSize::Fixed {
            width: 640,
            height: 640,
        }
    }
}

/// Everything the calibration pipeline needs.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CalibrationParams {
    pub board: BoardDetectParams,
    pub grid: GridParams,
    pub emptiness: EmptinessParams,
    /// Reject calibrations taken with pieces on the board.
    pub check_empty: bool,
    pub output_size: OutputSize,
}

impl Default for CalibrationParams {
    fn default() -> Self {
        Self {
            board: BoardDetectParams::default(),
            grid: GridParams::default(),
            emptiness: EmptinessParams::default(),
            check_empty: true,
            output_size: OutputSize::default(),
        }
    }
}
