//! Detections to board squares.

use boardsight_calib::SquareGrid;
use boardsight_core::{point_in_quad, Detection, Occupancy, BOARD_SIZE};
use log::debug;
use nalgebra::Point2;

/// First board cell, row-major, whose quad contains `point`.
pub fn find_cell(point: Point2<f32>, grid: &SquareGrid) -> Option<(usize, usize)> {
    grid.cells()
        .filter(|((r, c), _)| *r < BOARD_SIZE && *c < BOARD_SIZE)
        .find(|(_, quad)| point_in_quad(point, quad))
        .map(|(cell, _)| cell)
}

/// Occupancy matrix for one frame of rectified-image detections.
///
/// Each recognized detection lands on the cell containing its box center.
/// A cell already claimed by an earlier detection keeps its piece.
/// Unknown labels and centers outside the board are dropped.
pub fn map_occupancy(detections: &[Detection], grid: &SquareGrid) -> Occupancy {
    let mut occupancy = Occupancy::empty();
    for det in detections {
        let Some(piece) = det.piece() else {
            debug!("ignoring unknown label {:?}", det.class_name);
            continue;
        };
        let Some((row, col)) = find_cell(det.bbox.center(), grid) else {
            continue;
        };
        if occupancy.is_empty_at(row, col) {
            occupancy.set(row, col, Some(piece));
        }
    }
    occupancy
}

#[cfg(test)]
mod tests {
    use super::*;
    use boardsight_core::{BBox, Piece};

    fn grid(step: f32) -> SquareGrid {
        let points = (0..9)
            .flat_map(|r| (0..9).map(move |c| Point2::new(c as f32 * step, r as f32 * step)))
            .collect();
        SquareGrid::new(9, points).expect("9x9")
    }

    fn boxed(class: &str, cx: i32, cy: i32) -> Detection {
        Detection::new(class, BBox::new(cx - 10, cy - 20, cx + 10, cy + 20), 0.9)
    }

    #[test]
    fn distinct_detections_land_on_distinct_cells() {
        let dets = [boxed("white-pawn", 340, 540), boxed("black-king", 300, 30)];
        let occ = map_occupancy(&dets, &grid(80.0));
        assert_eq!(occ.get(6, 4), Some(Piece::WhitePawn));
        assert_eq!(occ.get(0, 3), Some(Piece::BlackKing));
        assert_eq!(occ.occupied_count(), 2);
    }

    #[test]
    fn first_detection_keeps_a_shared_cell() {
        let dets = [boxed("white-queen", 100, 100), boxed("black-rook", 110, 110)];
        let occ = map_occupancy(&dets, &grid(80.0));
        assert_eq!(occ.get(1, 1), Some(Piece::WhiteQueen));
        assert_eq!(occ.occupied_count(), 1);
    }

    #[test]
    fn unknown_labels_and_off_board_centers_are_ignored() {
        let dets = [boxed("hand", 100, 100), boxed("white-pawn", 700, 100)];
        assert_eq!(map_occupancy(&dets, &grid(80.0)), Occupancy::empty());
    }

    #[test]
    fn center_on_a_shared_edge_goes_to_the_earlier_cell() {
        assert_eq!(find_cell(Point2::new(80.0, 40.0), &grid(80.0)), Some((0, 0)));
        assert_eq!(find_cell(Point2::new(-1.0, 40.0), &grid(80.0)), None);
    }
}
