//! High-level facade for the `boardsight-*` workspace.
//!
//! This crate provides:
//! - re-exports of the core, calibration and move-inference crates
//! - a JSON [`BoardsightConfig`] covering every tunable
//! - offline [`replay`] of recorded detections
//! - the `boardsight` command-line tool (feature `cli`)
//!
//! ## Quickstart
//!
//! ```no_run
//! use boardsight::{BoardsightConfig, Calibrator, GameSession};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = BoardsightConfig::default();
//! let store = config.store();
//! let frame = image::open("empty_board.jpg")?;
//! let record = Calibrator::new(config.calibration.clone())
//!     .calibrate_and_store(&frame, "game-42", &store)?;
//! assert!(record.success);
//!
//! let calibration = store.load_calibration("game-42")?;
//! let mut session = GameSession::standard("game-42", Some(calibration), config.session);
//! let report = session.observe(&[]);
//! println!("{}", serde_json::to_string(&report)?);
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `boardsight::core`: geometry, homography, pieces, occupancy, detections.
//! - `boardsight::calib`: boundary detection, rectification, grid, store.
//! - `boardsight::moves`: mapper, tracker, rules engine, inference, sessions.

pub use boardsight_calib as calib;
pub use boardsight_core as core;
pub use boardsight_moves as moves;

pub use boardsight_calib::{
    Calibration, CalibrationFailure, CalibrationParams, CalibrationRecord, CalibrationStore,
    Calibrator, StoreError,
};
pub use boardsight_core::{BBox, Detection, Occupancy, Piece};
pub use boardsight_moves::{
    infer_move, map_occupancy, ChessRules, FrameReport, GameSession, InferredMove, RulesEngine,
    SessionParams, SessionRegistry,
};

pub mod config;
pub mod replay;

pub use config::{BoardsightConfig, ConfigIoError};
pub use replay::{load_detection_frames, replay};
