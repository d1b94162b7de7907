//! Board boundary detection in a raw camera frame.
//!
//! Three strategies are tried in order:
//!
//! 1. an optional [`BoardSegmenter`] (e.g. a neural segmentation model),
//! 2. the largest roughly square 4-vertex contour of an adaptive threshold,
//! 3. the convex hull of long line segments found on a Canny edge map.
//!
//! The first candidate that passes the area (and, for contours, aspect)
//! checks wins. Not finding a board is a normal outcome and yields `None`.

use crate::filters::{adaptive_threshold_inv, close3, dilate3, edge_map, open3};
use crate::params::BoardDetectParams;
use crate::segments::{detect_segments, Segment};
use boardsight_core::{order_corners, polygon_area, quad_extent, Quad};
use image::GrayImage;
use imageproc::contours::{find_contours, BorderType};
use imageproc::geometry::{approximate_polygon_dp, arc_length, convex_hull};
use imageproc::point::Point;
use log::{debug, info};
use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// External board segmentation collaborator.
pub trait BoardSegmenter {
    /// Four board corners in any order, or `None` when nothing was found.
    fn segment(&self, frame: &GrayImage) -> Option<Quad>;
}

impl<F> BoardSegmenter for F
where
    F: Fn(&GrayImage) -> Option<Quad>,
{
    fn segment(&self, frame: &GrayImage) -> Option<Quad> {
        self(frame)
    }
}

/// Strategy that produced a board candidate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundarySource {
    Segmenter,
    Contour,
    Lines,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoardCorners {
    /// Corners in the order the strategy produced them; the rectifier
    /// orders them.
    pub corners: Quad,
    pub source: BoundarySource,
}

pub struct BoardBoundaryDetector {
    params: BoardDetectParams,
    segmenter: Option<Box<dyn BoardSegmenter>>,
}

impl BoardBoundaryDetector {
    pub fn new(params: BoardDetectParams) -> Self {
        Self {
            params,
            segmenter: None,
        }
    }

    pub fn with_segmenter(mut self, segmenter: Box<dyn BoardSegmenter>) -> Self {
        self.segmenter = Some(segmenter);
        self
    }

    pub fn params(&self) -> &BoardDetectParams {
        &self.params
    }

    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, frame), fields(width = frame.width(), height = frame.height()))
    )]
    pub fn detect(&self, frame: &GrayImage) -> Option<BoardCorners> {
        let bounds = AreaBounds::for_frame(frame, &self.params);

        let found = self
            .from_segmenter(frame, &bounds)
            .map(|corners| (corners, BoundarySource::Segmenter))
            .or_else(|| {
                self.from_contours(frame, &bounds)
                    .map(|corners| (corners, BoundarySource::Contour))
            })
            .or_else(|| {
                self.from_lines(frame, &bounds)
                    .map(|corners| (corners, BoundarySource::Lines))
            });

        match found {
            Some((corners, source)) => {
                info!("board found by {source:?}: {corners:?}");
                Some(BoardCorners { corners, source })
            }
            None => {
                info!(
                    "no board in {}x{} frame",
                    frame.width(),
                    frame.height()
                );
                None
            }
        }
    }

    fn from_segmenter(&self, frame: &GrayImage, bounds: &AreaBounds) -> Option<Quad> {
        let candidate = self.segmenter.as_ref()?.segment(frame)?;
        let (w, h) = quad_extent(&order_corners(&candidate));
        let area = w * h;
        if bounds.contains(area) {
            Some(candidate)
        } else {
            debug!("segmenter candidate rejected, area {area:.0}");
            None
        }
    }

    fn from_contours(&self, frame: &GrayImage, bounds: &AreaBounds) -> Option<Quad> {
        let p = &self.params;
        let binary = adaptive_threshold_inv(frame, p.adaptive_block_size, p.adaptive_c);
        let binary = open3(&close3(&binary, 2), 1);

        let mut candidates: Vec<(f32, Vec<Point<i32>>)> = find_contours::<i32>(&binary)
            .into_iter()
            .filter(|c| c.parent.is_none() && c.border_type == BorderType::Outer)
            .filter(|c| c.points.len() >= 3)
            .map(|c| (polygon_area(&to_points(&c.points)), c.points))
            .filter(|(area, _)| bounds.contains(*area))
            .collect();
        if candidates.is_empty() {
            debug!("no contour within area bounds");
            return None;
        }
        candidates.sort_by(|a, b| b.0.total_cmp(&a.0));

        for (area, points) in candidates.iter().take(p.max_contour_candidates) {
            let Some(rough) = approximate_quad(points, p.poly_epsilon_frac) else {
                debug!("contour of area {area:.0} is not a quadrilateral");
                continue;
            };
            let quad = refine_quad(&to_points(points), &rough).unwrap_or(rough);
            if !bounds.contains(polygon_area(&quad)) {
                continue;
            }
            let (w, h) = quad_extent(&quad);
            let short = w.min(h);
            if short <= 0.0 {
                continue;
            }
            let aspect = w.max(h) / short;
            if (p.min_aspect..=p.max_aspect).contains(&aspect) {
                return Some(quad);
            }
            debug!("contour quad rejected, aspect {aspect:.2}");
        }
        None
    }

    fn from_lines(&self, frame: &GrayImage, bounds: &AreaBounds) -> Option<Quad> {
        let p = &self.params;
        let edges = edge_map(frame, p.canny_low, p.canny_high);
        let edges = close3(&dilate3(&edges, 2), 3);

        let min_length = frame.width().min(frame.height()) as f32 / 4.0;
        let segments = detect_segments(&edges, p.line_vote_threshold, min_length, p.max_line_gap);
        let (horizontal, vertical): (Vec<&Segment>, Vec<&Segment>) =
            segments.iter().partition(|s| s.is_horizontal_like());
        debug!(
            "line fallback: {} horizontal-like, {} vertical-like segments",
            horizontal.len(),
            vertical.len()
        );
        if horizontal.len() < 2 || vertical.len() < 2 || segments.len() < 4 {
            return None;
        }

        let endpoints: Vec<Point<i32>> = segments
            .iter()
            .flat_map(|s| [s.a, s.b])
            .map(|p| Point::new(p.x.round() as i32, p.y.round() as i32))
            .collect();
        let hull = convex_hull(endpoints.as_slice());
        if hull.len() < 4 {
            return None;
        }
        let quad = approximate_quad(&hull, p.poly_epsilon_frac)?;
        bounds.contains(polygon_area(&quad)).then_some(quad)
    }
}

impl Default for BoardBoundaryDetector {
    fn default() -> Self {
        Self::new(BoardDetectParams::default())
    }
}

/// Convenience wrapper for a one-off detection without a segmenter.
pub fn detect_board(frame: &GrayImage, params: &BoardDetectParams) -> Option<BoardCorners> {
    BoardBoundaryDetector::new(params.clone()).detect(frame)
}

struct AreaBounds {
    min: f32,
    max: f32,
}

impl AreaBounds {
    fn for_frame(frame: &GrayImage, params: &BoardDetectParams) -> Self {
        let area = frame.width() as f32 * frame.height() as f32;
        Self {
            min: area * params.min_area_ratio,
            max: area * params.max_area_ratio,
        }
    }

    fn contains(&self, area: f32) -> bool {
        area >= self.min && area <= self.max
    }
}

fn to_points(points: &[Point<i32>]) -> Vec<Point2<f32>> {
    points
        .iter()
        .map(|p| Point2::new(p.x as f32, p.y as f32))
        .collect()
}

/// Douglas-Peucker simplification of a closed curve; `Some` only when the
/// result has exactly four vertices.
fn approximate_quad(curve: &[Point<i32>], epsilon_frac: f64) -> Option<Quad> {
    let epsilon = epsilon_frac * arc_length(curve, true);
    if curve.len() < 4 || epsilon <= 0.0 {
        return None;
    }
    let poly = approximate_polygon_dp(curve, epsilon, true);
    let [a, b, c, d] = poly.as_slice() else {
        return None;
    };
    Some([a, b, c, d].map(|p| Point2::new(p.x as f32, p.y as f32)))
}

/// Part of each side, at both ends, left out of the side fit.
const SIDE_TRIM: f32 = 0.15;

/// Snap the corners of a rough quad onto its contour.
///
/// Douglas-Peucker keeps contour points as vertices, and on a digitized
/// outline the kept point can sit several pixels along a side from the real
/// corner. Each side is re-fitted to the contour points lying along it and
/// neighbouring fits are intersected. The first pass accepts points within
/// a fraction of the side length, the second only those close to the first
/// fit. `None` when a side has too few points or two fits are parallel.
fn refine_quad(curve: &[Point2<f32>], rough: &Quad) -> Option<Quad> {
    let mut quad = *rough;
    for pass in 0..2 {
        let mut sides = Vec::with_capacity(4);
        for i in 0..4 {
            let (a, b) = (quad[i], quad[(i + 1) % 4]);
            let tolerance = if pass == 0 {
                (0.08 * (b - a).norm()).max(3.0)
            } else {
                3.0
            };
            sides.push(fit_side(curve, a, b, tolerance)?);
        }
        for i in 0..4 {
            quad[i] = sides[(i + 3) % 4].intersect(&sides[i])?;
        }
    }
    Some(quad)
}

/// Total least squares line through a point set.
#[derive(Clone, Copy, Debug)]
struct FittedLine {
    point: Point2<f32>,
    dir: Vector2<f32>,
}

impl FittedLine {
    fn intersect(&self, other: &FittedLine) -> Option<Point2<f32>> {
        let cross = |u: Vector2<f32>, v: Vector2<f32>| u.x * v.y - u.y * v.x;
        let denom = cross(self.dir, other.dir);
        if denom.abs() < 1e-6 {
            return None;
        }
        let s = cross(other.point - self.point, other.dir) / denom;
        Some(self.point + self.dir * s)
    }
}

fn fit_side(
    curve: &[Point2<f32>],
    a: Point2<f32>,
    b: Point2<f32>,
    tolerance: f32,
) -> Option<FittedLine> {
    let len = (b - a).norm();
    if len <= 0.0 {
        return None;
    }
    let along = (b - a) / len;
    let normal = Vector2::new(-along.y, along.x);
    let near: Vec<Point2<f32>> = curve
        .iter()
        .filter(|p| {
            let d = **p - a;
            let t = d.dot(&along) / len;
            (SIDE_TRIM..=1.0 - SIDE_TRIM).contains(&t) && d.dot(&normal).abs() <= tolerance
        })
        .copied()
        .collect();
    if near.len() < 2 {
        return None;
    }

    let n = near.len() as f32;
    let cx = near.iter().map(|p| p.x).sum::<f32>() / n;
    let cy = near.iter().map(|p| p.y).sum::<f32>() / n;
    let (mut sxx, mut sxy, mut syy) = (0.0f32, 0.0f32, 0.0f32);
    for p in &near {
        let (dx, dy) = (p.x - cx, p.y - cy);
        sxx += dx * dx;
        sxy += dx * dy;
        syy += dy * dy;
    }
    let phi = 0.5 * (2.0 * sxy).atan2(sxx - syy);
    Some(FittedLine {
        point: Point2::new(cx, cy),
        dir: Vector2::new(phi.cos(), phi.sin()),
    })
}
