//! Polar grid lines: orientation buckets, offset clustering and pairwise
//! intersections.

use imageproc::hough::PolarLine;
use nalgebra::{Matrix2, Point2, Vector2};

/// Infinite line `x cos(theta) + y sin(theta) = rho`, theta in radians.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridLine {
    pub rho: f32,
    pub theta: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LineOrientation {
    /// Normal close to the y axis.
    Horizontal,
    /// Normal within 45 degrees of the x axis.
    Vertical,
}

impl GridLine {
    pub fn new(rho: f32, theta: f32) -> Self {
        Self { rho, theta }
    }

    pub fn from_polar(line: &PolarLine) -> Self {
        Self::new(line.r, (line.angle_in_degrees as f32).to_radians())
    }

    pub fn orientation(&self) -> LineOrientation {
        let deg = self.theta.to_degrees();
        if !(45.0..=135.0).contains(&deg) {
            LineOrientation::Vertical
        } else {
            LineOrientation::Horizontal
        }
    }

    /// Angle between the line and the image axis it runs along, in degrees.
    pub fn axis_deviation_deg(&self) -> f32 {
        let deg = self.theta.to_degrees();
        match self.orientation() {
            LineOrientation::Horizontal => (deg - 90.0).abs(),
            LineOrientation::Vertical => {
                let deg = deg.rem_euclid(180.0);
                deg.min(180.0 - deg)
            }
        }
    }

    /// Same line with `theta` folded into `(-90, 90]` degrees, so that
    /// near-vertical lines on both sides of theta = 0 share one `rho` axis.
    pub fn folded(self) -> Self {
        if self.theta.to_degrees() > 135.0 {
            Self::new(-self.rho, self.theta - std::f32::consts::PI)
        } else {
            self
        }
    }
}

/// Split Hough lines into `(horizontal, vertical)` buckets. Vertical lines
/// are [`GridLine::folded`].
pub fn split_by_orientation(lines: &[PolarLine]) -> (Vec<GridLine>, Vec<GridLine>) {
    let mut horizontal = Vec::new();
    let mut vertical = Vec::new();
    for line in lines.iter().map(GridLine::from_polar) {
        match line.orientation() {
            LineOrientation::Horizontal => horizontal.push(line),
            LineOrientation::Vertical => vertical.push(line.folded()),
        }
    }
    (horizontal, vertical)
}

/// Non-maximum suppression inside one orientation bucket.
///
/// The Hough accumulator is not wrapped at theta = 0 / 180 degrees, so a
/// near-vertical line shows up a second time just below 180 degrees. After
/// folding, such pairs are within `radius_px` and `radius_deg` of each other;
/// only the line with the larger `support` survives. Ties keep the earlier
/// line.
pub fn suppress_duplicates<F>(
    lines: &[GridLine],
    support: F,
    radius_px: f32,
    radius_deg: f32,
) -> Vec<GridLine>
where
    F: Fn(&GridLine) -> usize,
{
    let mut ranked: Vec<(usize, GridLine)> = lines.iter().map(|l| (support(l), *l)).collect();
    ranked.sort_by(|a, b| b.0.cmp(&a.0));

    let mut kept: Vec<GridLine> = Vec::with_capacity(ranked.len());
    for (_, line) in ranked {
        let duplicate = kept.iter().any(|k| {
            (k.rho - line.rho).abs() <= radius_px
                && (k.theta - line.theta).abs().to_degrees() <= radius_deg
        });
        if !duplicate {
            kept.push(line);
        }
    }
    kept
}

/// Whether the line runs within `margin` pixels of the image border it is
/// parallel to, measured through the image centre.
pub fn hugs_border(line: &GridLine, width: u32, height: u32, margin: f32) -> bool {
    let (w, h) = (width as f32, height as f32);
    let (sin, cos) = line.theta.sin_cos();
    let (pos, extent) = match line.orientation() {
        LineOrientation::Vertical => ((line.rho - 0.5 * h * sin) / cos, w),
        LineOrientation::Horizontal => ((line.rho - 0.5 * w * cos) / sin, h),
    };
    pos < margin || pos > extent - 1.0 - margin
}

/// Reduce a bucket of parallel lines to at most `target` representatives.
///
/// Inputs with `target` or fewer lines are returned unchanged (not even
/// sorted). Otherwise lines are sorted by `rho`, runs whose consecutive
/// offsets differ by less than `tolerance` are averaged, and if more than
/// `target` clusters remain, `target` of them are picked at evenly spaced
/// indices (truncated), keeping the first and the last.
pub fn cluster_lines(lines: &[GridLine], target: usize, tolerance: f32) -> Vec<GridLine> {
    if lines.len() <= target {
        return lines.to_vec();
    }

    let mut sorted = lines.to_vec();
    sorted.sort_by(|a, b| a.rho.total_cmp(&b.rho));

    let mut clusters = Vec::new();
    let mut current: Vec<GridLine> = Vec::new();
    for line in sorted {
        if let Some(last) = current.last() {
            if (line.rho - last.rho).abs() >= tolerance {
                clusters.push(mean_line(&current));
                current.clear();
            }
        }
        current.push(line);
    }
    if !current.is_empty() {
        clusters.push(mean_line(&current));
    }

    if clusters.len() > target {
        clusters = linspace_indices(clusters.len(), target)
            .into_iter()
            .map(|i| clusters[i])
            .collect();
    }
    clusters
}

fn mean_line(lines: &[GridLine]) -> GridLine {
    let n = lines.len() as f32;
    let rho = lines.iter().map(|l| l.rho).sum::<f32>() / n;
    let theta = lines.iter().map(|l| l.theta).sum::<f32>() / n;
    GridLine::new(rho, theta)
}

/// `count` evenly spaced indices over `0..len`, truncated toward zero.
fn linspace_indices(len: usize, count: usize) -> Vec<usize> {
    match count {
        0 => Vec::new(),
        1 => vec![0],
        _ => {
            let step = (len - 1) as f64 / (count - 1) as f64;
            (0..count)
                .map(|i| ((i as f64 * step) as usize).min(len - 1))
                .collect()
        }
    }
}

/// Intersection of two lines, `None` when they are (nearly) parallel.
pub fn intersect(a: &GridLine, b: &GridLine) -> Option<Point2<f32>> {
    let m = Matrix2::new(
        a.theta.cos() as f64,
        a.theta.sin() as f64,
        b.theta.cos() as f64,
        b.theta.sin() as f64,
    );
    if m.determinant().abs() < 1e-9 {
        return None;
    }
    let rhs = Vector2::new(a.rho as f64, b.rho as f64);
    let p = m.lu().solve(&rhs)?;
    Some(Point2::new(p.x as f32, p.y as f32))
}

/// All horizontal x vertical intersections inside `[0, width) x [0, height)`.
pub fn intersections(
    horizontal: &[GridLine],
    vertical: &[GridLine],
    width: u32,
    height: u32,
) -> Vec<Point2<f32>> {
    let (w, h) = (width as f32, height as f32);
    horizontal
        .iter()
        .flat_map(|hl| vertical.iter().filter_map(move |vl| intersect(hl, vl)))
        .filter(|p| p.x >= 0.0 && p.x < w && p.y >= 0.0 && p.y < h)
        .collect()
}
