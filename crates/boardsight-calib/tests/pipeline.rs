use boardsight_calib::{
    detect_board, extract_grid, rectify_board, BoardDetectParams, BoundarySource,
    CalibrationFailure, CalibrationParams, CalibrationStore, Calibrator, GridParams, OutputSize,
    SquareGrid,
};
use boardsight_core::{order_corners, Homography, Quad};
use image::{DynamicImage, GrayImage, Luma};
use nalgebra::Point2;

const FRAME_UNITS: f32 = 20.0;
const SQUARE_UNITS: f32 = 50.0;
const BOARD_UNITS: f32 = 2.0 * FRAME_UNITS + 8.0 * SQUARE_UNITS;

/// Board model value at `(u, v)` in board units: dark frame around an 8x8
/// checkerboard with a light a8 square.
fn board_value(u: f32, v: f32) -> Option<u8> {
    if !(0.0..BOARD_UNITS).contains(&u) || !(0.0..BOARD_UNITS).contains(&v) {
        return None;
    }
    let inner = BOARD_UNITS - FRAME_UNITS;
    if u < FRAME_UNITS || v < FRAME_UNITS || u >= inner || v >= inner {
        return Some(60);
    }
    let col = ((u - FRAME_UNITS) / SQUARE_UNITS) as u32;
    let row = ((v - FRAME_UNITS) / SQUARE_UNITS) as u32;
    Some(if (row + col) % 2 == 0 { 230 } else { 30 })
}

fn model_corners() -> Quad {
    [
        Point2::new(0.0, 0.0),
        Point2::new(BOARD_UNITS, 0.0),
        Point2::new(BOARD_UNITS, BOARD_UNITS),
        Point2::new(0.0, BOARD_UNITS),
    ]
}

fn frame_corners() -> Quad {
    [
        Point2::new(170.0, 80.0),
        Point2::new(610.0, 100.0),
        Point2::new(640.0, 540.0),
        Point2::new(140.0, 520.0),
    ]
}

/// 800x600 camera frame of the board seen in perspective on a light table.
fn camera_frame() -> GrayImage {
    let to_model =
        Homography::from_quads(&frame_corners(), &model_corners()).expect("valid board quad");
    GrayImage::from_fn(800, 600, |x, y| {
        let m = to_model.apply(Point2::new(x as f32 + 0.5, y as f32 + 0.5));
        Luma([board_value(m.x, m.y).unwrap_or(220)])
    })
}

/// Already rectified 640x640 checkerboard with a gray margin.
fn rectified_checkerboard() -> GrayImage {
    GrayImage::from_fn(640, 640, |x, y| {
        if !(40..600).contains(&x) || !(40..600).contains(&y) {
            return Luma([128]);
        }
        let (col, row) = ((x - 40) / 70, (y - 40) / 70);
        Luma([if (row + col) % 2 == 0 { 230 } else { 30 }])
    })
}

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn assert_regular(grid: &SquareGrid, origin: f32, step: f32, tol: f32) {
    assert_eq!(grid.side(), 9);
    for r in 0..9 {
        for c in 0..9 {
            let p = grid.point(r, c);
            let (ex, ey) = (origin + c as f32 * step, origin + r as f32 * step);
            assert!(
                (p.x - ex).abs() < tol && (p.y - ey).abs() < tol,
                "corner ({r},{c}) at ({:.1},{:.1}), expected ({ex:.1},{ey:.1})",
                p.x,
                p.y
            );
        }
    }
}

#[test]
fn grid_of_a_rectified_checkerboard_is_regular() {
    let grid = extract_grid(&rectified_checkerboard(), &GridParams::default()).expect("grid");
    assert_regular(&grid, 40.0, 70.0, 3.0);

    for r in 0..8 {
        for c in 0..8 {
            let cell = grid.cell(r, c);
            let w = cell[1].x - cell[0].x;
            let h = cell[3].y - cell[0].y;
            assert!((w - 70.0).abs() < 4.0 && (h - 70.0).abs() < 4.0);
        }
    }
}

#[test]
fn board_outline_is_found_in_perspective() {
    let found = detect_board(&camera_frame(), &BoardDetectParams::default()).expect("board");
    assert_eq!(found.source, BoundarySource::Contour);
    let ordered = order_corners(&found.corners);
    for (got, want) in ordered.iter().zip(frame_corners()) {
        assert!(
            (got.x - want.x).abs() < 5.0 && (got.y - want.y).abs() < 5.0,
            "corner {got:?} vs {want:?}"
        );
    }
}

#[test]
fn rectified_frame_puts_the_board_on_the_canonical_square() {
    let rectified = rectify_board(
        &camera_frame(),
        &frame_corners(),
        OutputSize::Fixed {
            width: 640,
            height: 640,
        },
    )
    .expect("rectified");
    // Frame color just inside every corner, light a8 square near the top left.
    for (x, y) in [(5, 5), (634, 5), (634, 634), (5, 634)] {
        assert_eq!(rectified.image.get_pixel(x, y)[0], 60, "({x},{y})");
    }
    let scale = 640.0 / BOARD_UNITS;
    let a8 = ((FRAME_UNITS + 0.5 * SQUARE_UNITS) * scale) as u32;
    assert_eq!(rectified.image.get_pixel(a8, a8)[0], 230);
    assert_eq!(rectified.image.get_pixel(a8 + (SQUARE_UNITS * scale) as u32, a8)[0], 30);
}

#[test]
fn full_calibration_of_a_camera_frame() {
    init_logging();
    let frame = DynamicImage::ImageLuma8(camera_frame());
    let params = CalibrationParams {
        check_empty: false,
        ..CalibrationParams::default()
    };
    let calibration = Calibrator::new(params).run(&frame, "synthetic").expect("calibrated");

    assert_eq!((calibration.width, calibration.height), (640, 640));
    assert_eq!(calibration.channels, 1);
    let scale = 640.0 / BOARD_UNITS;
    assert_regular(
        &calibration.grid,
        FRAME_UNITS * scale,
        SQUARE_UNITS * scale,
        6.0,
    );

    // The stored homography takes frame points to the rectified grid.
    let center = calibration.homography.apply(Point2::new(390.0, 310.0));
    assert!(center.x > 0.0 && center.x < 640.0 && center.y > 0.0 && center.y < 640.0);
}

#[test]
fn checkered_squares_do_not_pass_the_emptiness_check() {
    init_logging();
    let frame = DynamicImage::ImageLuma8(camera_frame());
    let record = Calibrator::default().calibrate(&frame, "busy");
    assert!(!record.success);
    assert_eq!(record.is_empty, Some(false));
    assert!(record.square_corners.is_some());
    assert!(record
        .error
        .as_deref()
        .is_some_and(|e| e.starts_with("board is not empty")));
    match Calibrator::default().run(&frame, "busy") {
        Err(CalibrationFailure::NotEmpty { confidence }) => assert!(confidence < 0.5),
        other => panic!("expected NotEmpty, got {other:?}"),
    }
}

#[test]
fn stored_calibration_reloads_and_rectifies() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = CalibrationStore::new(dir.path().join("maps"));
    let frame = DynamicImage::ImageLuma8(camera_frame());
    let params = CalibrationParams {
        check_empty: false,
        ..CalibrationParams::default()
    };

    let record = Calibrator::new(params)
        .calibrate_and_store(&frame, "g-7", &store)
        .expect("io");
    assert!(record.success);
    assert!(store.path_for("g-7").expect("path").is_file());

    let loaded = store.load("g-7").expect("load");
    assert_eq!(loaded.game_token, "g-7");
    assert_eq!(loaded.warped_image_shape, Some(vec![640, 640, 1]));

    let calibration = store.load_calibration("g-7").expect("valid");
    let again = calibration.rectify(&camera_frame()).expect("invertible");
    assert_eq!(again.dimensions(), (640, 640));
    assert_eq!(again.get_pixel(5, 5)[0], 60);
}
