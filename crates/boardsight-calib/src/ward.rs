//! Agglomerative clustering of 2D points with Ward's minimum-variance
//! criterion.

use nalgebra::Point2;

#[derive(Clone, Copy, Debug)]
struct Cluster {
    sum_x: f64,
    sum_y: f64,
    size: usize,
}

impl Cluster {
    fn centroid(&self) -> (f64, f64) {
        let n = self.size as f64;
        (self.sum_x / n, self.sum_y / n)
    }

    /// Increase of the within-cluster sum of squares caused by merging.
    fn merge_cost(&self, other: &Cluster) -> f64 {
        let (ax, ay) = self.centroid();
        let (bx, by) = other.centroid();
        let (na, nb) = (self.size as f64, other.size as f64);
        na * nb / (na + nb) * ((ax - bx).powi(2) + (ay - by).powi(2))
    }

    fn absorb(&mut self, other: &Cluster) {
        self.sum_x += other.sum_x;
        self.sum_y += other.sum_y;
        self.size += other.size;
    }
}

/// Merge `points` bottom-up until `k` clusters remain and return their
/// centroids. Inputs with at most `k` points are returned as they are.
pub fn ward_centroids(points: &[Point2<f32>], k: usize) -> Vec<Point2<f32>> {
    if points.len() <= k {
        return points.to_vec();
    }
    if k == 0 {
        return Vec::new();
    }

    let mut clusters: Vec<Cluster> = points
        .iter()
        .map(|p| Cluster {
            sum_x: p.x as f64,
            sum_y: p.y as f64,
            size: 1,
        })
        .collect();

    while clusters.len() > k {
        let mut best = (0, 1, f64::INFINITY);
        for i in 0..clusters.len() {
            for j in (i + 1)..clusters.len() {
                let cost = clusters[i].merge_cost(&clusters[j]);
                if cost < best.2 {
                    best = (i, j, cost);
                }
            }
        }
        let (i, j, _) = best;
        let absorbed = clusters.swap_remove(j);
        clusters[i].absorb(&absorbed);
    }

    clusters
        .iter()
        .map(|c| {
            let (x, y) = c.centroid();
            Point2::new(x as f32, y as f32)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn small_inputs_pass_through() {
        let pts = vec![Point2::new(1.0, 2.0), Point2::new(3.0, 4.0)];
        assert_eq!(ward_centroids(&pts, 2), pts);
        assert_eq!(ward_centroids(&pts, 5), pts);
    }

    #[test]
    fn duplicated_intersections_collapse_to_their_means() {
        let mut pts = Vec::new();
        for (cx, cy) in [(10.0, 10.0), (90.0, 10.0), (10.0, 90.0), (90.0, 90.0)] {
            pts.push(Point2::new(cx - 1.0, cy));
            pts.push(Point2::new(cx + 1.0, cy));
            pts.push(Point2::new(cx, cy + 3.0));
        }
        let mut centroids = ward_centroids(&pts, 4);
        centroids.sort_by(|a, b| (a.y, a.x).partial_cmp(&(b.y, b.x)).unwrap());
        let expected = [(10.0, 11.0), (90.0, 11.0), (10.0, 91.0), (90.0, 91.0)];
        assert_eq!(centroids.len(), 4);
        for (c, (x, y)) in centroids.iter().zip(expected) {
            assert_relative_eq!(c.x, x, epsilon = 1e-4);
            assert_relative_eq!(c.y, y, epsilon = 1e-4);
        }
    }
}
