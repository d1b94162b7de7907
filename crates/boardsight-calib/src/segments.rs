//! Finite line segments recovered from Hough lines of an edge map.
//!
//! Each strong infinite line is walked across the image and split into runs
//! of edge pixels; runs separated by at most `max_gap` pixels are joined and
//! runs shorter than `min_length` are dropped.

use image::GrayImage;
use imageproc::hough::{detect_lines, LineDetectionOptions, PolarLine};
use nalgebra::Point2;

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Segment {
    pub(crate) a: Point2<f32>,
    pub(crate) b: Point2<f32>,
}

impl Segment {
    /// Direction angle in degrees, `(-180, 180]`.
    pub(crate) fn angle_deg(&self) -> f32 {
        (self.b.y - self.a.y).atan2(self.b.x - self.a.x).to_degrees()
    }

    /// Within 45 degrees of the x axis.
    pub(crate) fn is_horizontal_like(&self) -> bool {
        let angle = self.angle_deg().abs();
        angle < 45.0 || angle > 135.0
    }
}

pub(crate) fn detect_segments(
    edges: &GrayImage,
    vote_threshold: u32,
    min_length: f32,
    max_gap: u32,
) -> Vec<Segment> {
    let options = LineDetectionOptions {
        vote_threshold,
        suppression_radius: 8,
    };
    let mut out = Vec::new();
    for line in detect_lines(edges, options) {
        trace_line(edges, &line, min_length, max_gap as f32, &mut out);
    }
    out
}

fn trace_line(
    edges: &GrayImage,
    line: &PolarLine,
    min_length: f32,
    max_gap: f32,
    out: &mut Vec<Segment>,
) {
    let (w, h) = (edges.width() as i64, edges.height() as i64);
    let theta = (line.angle_in_degrees as f32).to_radians();
    let (cos, sin) = (theta.cos(), theta.sin());
    // The accumulator truncates offsets toward zero; walk the middle of the
    // bin instead of its edge.
    let rho = line.r + 0.5 * line.r.signum();
    // Foot of the normal from the origin, then walk along the line direction.
    let foot = Point2::new(rho * cos, rho * sin);
    let dir = (-sin, cos);
    let at = |t: f32| Point2::new(foot.x + t * dir.0, foot.y + t * dir.1);
    let is_edge = |x: f32, y: f32| {
        let (xi, yi) = (x.round() as i64, y.round() as i64);
        xi >= 0 && yi >= 0 && xi < w && yi < h && edges.get_pixel(xi as u32, yi as u32)[0] > 0
    };

    let reach = ((w * w + h * h) as f32).sqrt();
    let mut run: Option<(f32, f32)> = None;
    let mut t = -reach;
    while t <= reach {
        let p = at(t);
        // One pixel of slack on either side of the line.
        let hit = [0.0, -1.0, 1.0]
            .iter()
            .any(|off| is_edge(p.x + off * cos, p.y + off * sin));

        if hit {
            run = match run {
                Some((start, last)) if t - last <= max_gap => Some((start, t)),
                Some((start, last)) => {
                    push_run(start, last, min_length, &at, out);
                    Some((t, t))
                }
                None => Some((t, t)),
            };
        }
        t += 1.0;
    }
    if let Some((start, last)) = run {
        push_run(start, last, min_length, &at, out);
    }
}

fn push_run(
    start: f32,
    end: f32,
    min_length: f32,
    at: &impl Fn(f32) -> Point2<f32>,
    out: &mut Vec<Segment>,
) {
    if end - start >= min_length {
        out.push(Segment {
            a: at(start),
            b: at(end),
        });
    }
}
