use crate::Piece;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// Axis-aligned box in pixel coordinates, `(x1, y1)` top-left and
/// `(x2, y2)` bottom-right. Serialized as `[x1, y1, x2, y2]`.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(from = "[i32; 4]", into = "[i32; 4]")]
pub struct BBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl BBox {
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn center(&self) -> Point2<f32> {
        let mid = |a: i32, b: i32| (i64::from(a) + i64::from(b)) as f32 / 2.0;
        Point2::new(mid(self.x1, self.x2), mid(self.y1, self.y2))
    }

    pub fn area(&self) -> f32 {
        span(self.x1, self.x2) * span(self.y1, self.y2)
    }

    /// Intersection over union. Zero when the union is empty.
    pub fn iou(&self, other: &BBox) -> f32 {
        let ix1 = self.x1.max(other.x1);
        let iy1 = self.y1.max(other.y1);
        let ix2 = self.x2.min(other.x2);
        let iy2 = self.y2.min(other.y2);
        let inter = span(ix1, ix2) * span(iy1, iy2);
        let union = self.area() + other.area() - inter;
        if union <= 0.0 {
            return 0.0;
        }
        inter / union
    }
}

/// Non-negative length of `[lo, hi]`, computed without `i32` overflow.
fn span(lo: i32, hi: i32) -> f32 {
    (i64::from(hi) - i64::from(lo)).max(0) as f32
}

impl From<[i32; 4]> for BBox {
    fn from(v: [i32; 4]) -> Self {
        Self::new(v[0], v[1], v[2], v[3])
    }
}

impl From<BBox> for [i32; 4] {
    fn from(b: BBox) -> Self {
        [b.x1, b.y1, b.x2, b.y2]
    }
}

/// One object reported by the external detector for a frame.
///
/// Coordinates are in the rectified board image. `track_id` is present only
/// when the detector runs its own tracker.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub class_name: String,
    pub bbox: BBox,
    pub confidence: f32,
    #[serde(default)]
    pub class_id: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track_id: Option<u32>,
}

impl Detection {
    pub fn new(class_name: impl Into<String>, bbox: BBox, confidence: f32) -> Self {
        let class_name = class_name.into();
        let class_id = Piece::from_class_name(&class_name).map_or(-1, |p| p.id() as i32);
        Self {
            class_name,
            bbox,
            confidence,
            class_id,
            track_id: None,
        }
    }

    pub fn with_track_id(mut self, id: u32) -> Self {
        self.track_id = Some(id);
        self
    }

    /// Piece kind for recognized labels.
    pub fn piece(&self) -> Option<Piece> {
        Piece::from_class_name(&self.class_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn iou_of_identical_and_disjoint_boxes() {
        let a = BBox::new(0, 0, 10, 10);
        assert_relative_eq!(a.iou(&a), 1.0);
        assert_relative_eq!(a.iou(&BBox::new(20, 20, 30, 30)), 0.0);
    }

    #[test]
    fn iou_of_half_overlap() {
        let a = BBox::new(0, 0, 10, 10);
        let b = BBox::new(5, 0, 15, 10);
        assert_relative_eq!(a.iou(&b), 50.0 / 150.0, epsilon = 1e-6);
    }

    #[test]
    fn degenerate_boxes_have_zero_iou() {
        let p = BBox::new(3, 3, 3, 3);
        assert_eq!(p.iou(&p), 0.0);
    }

    #[test]
    fn extreme_coordinates_do_not_overflow() {
        let wide = BBox::new(i32::MIN, i32::MIN, i32::MAX, i32::MAX);
        assert_eq!(wide.center(), Point2::new(-0.5, -0.5));
        assert_relative_eq!(wide.iou(&wide), 1.0);

        let small = BBox::new(0, 0, 10, 10);
        let iou = wide.iou(&small);
        assert!((0.0..1e-9).contains(&iou), "iou {iou}");

        let edge = BBox::new(i32::MAX - 4, 0, i32::MAX, 2);
        assert!(edge.center().x > 2.0e9);
        assert_eq!(edge.area(), 8.0);
    }

    #[test]
    fn detection_json_uses_flat_bbox() {
        let json = r#"{"class_name":"white-knight","bbox":[10,20,50,70],"confidence":0.9,"class_id":3}"#;
        let det: Detection = serde_json::from_str(json).expect("parse");
        assert_eq!(det.bbox, BBox::new(10, 20, 50, 70));
        assert_eq!(det.track_id, None);
        assert_eq!(det.piece(), Some(Piece::WhiteKnight));
        assert_eq!(det.bbox.center(), Point2::new(30.0, 45.0));
    }
}
