//! Statistical check that a rectified board carries no pieces.
//!
//! An empty square is close to uniform, so the coefficient of variation
//! (population std / mean) of its pixels is small. The board is empty when
//! the average over all squares stays below a threshold.

use crate::grid::SquareGrid;
use boardsight_core::{point_in_quad, Quad};
use image::GrayImage;
use log::debug;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EmptinessReport {
    pub is_empty: bool,
    /// `1 - min(mean_variation / threshold, 1)`, in `[0, 1]`.
    pub confidence: f32,
    /// Mean per-square coefficient of variation.
    pub mean_variation: f32,
}

impl EmptinessReport {
    fn undecided() -> Self {
        Self {
            is_empty: false,
            confidence: 0.0,
            mean_variation: 0.0,
        }
    }
}

#[cfg_attr(feature = "tracing", instrument(level = "info", skip(rectified, grid)))]
pub fn check_empty(rectified: &GrayImage, grid: &SquareGrid, threshold: f32) -> EmptinessReport {
    let variations: Vec<f64> = grid
        .cells()
        .filter_map(|(_, quad)| cell_variation(rectified, &quad))
        .collect();
    if variations.is_empty() || threshold <= 0.0 {
        return EmptinessReport::undecided();
    }

    let mean_variation = (variations.iter().sum::<f64>() / variations.len() as f64) as f32;
    let ratio = (mean_variation / threshold).min(1.0);
    let report = EmptinessReport {
        is_empty: mean_variation < threshold,
        confidence: (1.0 - ratio).clamp(0.0, 1.0),
        mean_variation,
    };
    debug!(
        "emptiness over {} squares: variation {:.4}, empty {}",
        variations.len(),
        report.mean_variation,
        report.is_empty
    );
    report
}

/// Coefficient of variation of the pixels covered by `quad`, with corners
/// truncated to whole pixels. `None` if the square covers no pixel.
fn cell_variation(img: &GrayImage, quad: &Quad) -> Option<f64> {
    let quad: Quad = quad.map(|p| Point2::new(p.x.trunc(), p.y.trunc()));
    let (w, h) = (img.width() as i64, img.height() as i64);
    let min_x = quad.iter().map(|p| p.x as i64).min()?.max(0);
    let max_x = quad.iter().map(|p| p.x as i64).max()?.min(w - 1);
    let min_y = quad.iter().map(|p| p.y as i64).min()?.max(0);
    let max_y = quad.iter().map(|p| p.y as i64).max()?.min(h - 1);

    let mut values = Vec::new();
    for y in min_y..=max_y {
        for x in min_x..=max_x {
            if point_in_quad(Point2::new(x as f32, y as f32), &quad) {
                values.push(img.get_pixel(x as u32, y as u32)[0] as f64);
            }
        }
    }
    if values.is_empty() {
        return None;
    }

    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    Some(var.sqrt() / (mean + 1e-5))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn grid_over(size: u32) -> SquareGrid {
        let step = (size - 1) as f32 / 8.0;
        let points = (0..9)
            .flat_map(|r| (0..9).map(move |c| Point2::new(c as f32 * step, r as f32 * step)))
            .collect();
        SquareGrid::new(9, points).expect("9x9")
    }

    #[test]
    fn uniform_board_is_empty_with_full_confidence() {
        let img = GrayImage::from_pixel(161, 161, Luma([140]));
        let report = check_empty(&img, &grid_over(161), 0.15);
        assert!(report.is_empty);
        assert_eq!(report.confidence, 1.0);
        assert_eq!(report.mean_variation, 0.0);
    }

    #[test]
    fn high_contrast_squares_are_not_empty() {
        // Alternating 40/220 columns inside every square.
        let img = GrayImage::from_fn(161, 161, |x, _| Luma([if x % 2 == 0 { 40 } else { 220 }]));
        let report = check_empty(&img, &grid_over(161), 0.15);
        assert!(!report.is_empty);
        assert_eq!(report.confidence, 0.0);
        assert!(report.mean_variation > 0.5);
    }

    #[test]
    fn grid_outside_the_image_is_undecided() {
        let img = GrayImage::from_pixel(20, 20, Luma([100]));
        let points = (0..9)
            .flat_map(|r| (0..9).map(move |c| Point2::new(500.0 + c as f32, 500.0 + r as f32)))
            .collect();
        let grid = SquareGrid::new(9, points).expect("9x9");
        assert_eq!(check_empty(&img, &grid, 0.15), EmptinessReport::undecided());
    }

    #[test]
    fn variation_is_population_std_over_mean() {
        let img = GrayImage::from_fn(4, 4, |x, _| Luma([if x < 2 { 100 } else { 200 }]));
        let quad = [
            Point2::new(0.0, 0.0),
            Point2::new(3.0, 0.0),
            Point2::new(3.0, 3.0),
            Point2::new(0.0, 3.0),
        ];
        let v = cell_variation(&img, &quad).expect("pixels");
        assert!((v - 50.0 / 150.0).abs() < 1e-6, "{v}");
    }
}
