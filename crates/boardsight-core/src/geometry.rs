//! Planar helpers shared by the calibration and mapping stages.
//!
//! Everything here works on `nalgebra::Point2<f32>` in pixel coordinates
//! (x to the right, y down).

use nalgebra::Point2;

/// Four corners of a quadrilateral.
///
/// When produced by [`order_corners`] the order is
/// `[top-left, top-right, bottom-right, bottom-left]`.
pub type Quad = [Point2<f32>; 4];

/// Order four points as `[TL, TR, BR, BL]`.
///
/// Points are sorted by x, split into the two left-most and two right-most
/// points, and each pair is sorted by y. The result does not depend on the
/// input order as long as the x coordinates are distinct. Duplicate or
/// collinear inputs produce an unspecified (but deterministic) order.
pub fn order_corners(points: &Quad) -> Quad {
    let mut by_x = *points;
    by_x.sort_by(|a, b| a.x.total_cmp(&b.x));

    let mut left = [by_x[0], by_x[1]];
    let mut right = [by_x[2], by_x[3]];
    left.sort_by(|a, b| a.y.total_cmp(&b.y));
    right.sort_by(|a, b| a.y.total_cmp(&b.y));

    let [top_left, bottom_left] = left;
    let [top_right, bottom_right] = right;
    [top_left, top_right, bottom_right, bottom_left]
}

/// Euclidean distance between two points.
#[inline]
pub fn distance(p: Point2<f32>, q: Point2<f32>) -> f32 {
    let dx = p.x - q.x;
    let dy = p.y - q.y;
    (dx * dx + dy * dy).sqrt()
}

/// Signed area of the parallelogram spanned by `(a - c)` and `(b - c)`.
#[inline]
fn edge_sign(a: Point2<f32>, b: Point2<f32>, c: Point2<f32>) -> f32 {
    (a.x - c.x) * (b.y - c.y) - (b.x - c.x) * (a.y - c.y)
}

/// Point-in-quadrilateral test by edge sign consistency.
///
/// The point is inside when the four edge signs are not mixed. A zero sign
/// never counts against the point, so points exactly on an edge (or a
/// vertex) are inside. Cell assignment near square boundaries depends on
/// this policy.
pub fn point_in_quad(p: Point2<f32>, quad: &Quad) -> bool {
    let mut has_neg = false;
    let mut has_pos = false;
    for k in 0..4 {
        let d = edge_sign(p, quad[k], quad[(k + 1) % 4]);
        has_neg |= d < 0.0;
        has_pos |= d > 0.0;
    }
    !(has_neg && has_pos)
}

/// Absolute polygon area via the shoelace formula.
pub fn polygon_area(points: &[Point2<f32>]) -> f32 {
    if points.len() < 3 {
        return 0.0;
    }
    let mut acc = 0.0_f64;
    for (k, p) in points.iter().enumerate() {
        let q = points[(k + 1) % points.len()];
        acc += p.x as f64 * q.y as f64 - q.x as f64 * p.y as f64;
    }
    (acc.abs() * 0.5) as f32
}

/// Width and height of an ordered quad, each the longer of the two
/// opposite sides.
pub fn quad_extent(quad: &Quad) -> (f32, f32) {
    let width = distance(quad[0], quad[1]).max(distance(quad[2], quad[3]));
    let height = distance(quad[0], quad[3]).max(distance(quad[1], quad[2]));
    (width, height)
}

/// Mean of the four vertices.
pub fn quad_centroid(quad: &Quad) -> Point2<f32> {
    let (sx, sy) = quad
        .iter()
        .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
    Point2::new(sx / 4.0, sy / 4.0)
}
