//! Move inference for a calibrated chessboard video.
//!
//! Each frame's piece detections (in rectified-board coordinates) are mapped
//! onto the calibrated square grid, producing an 8x8 [`Occupancy`] matrix.
//! Two consecutive matrices that differ in exactly two squares are resolved
//! into a single legal move by a [`RulesEngine`]:
//!
//! ```
//! use boardsight_core::Occupancy;
//! use boardsight_moves::{infer_move, ChessRules};
//!
//! let before = Occupancy::starting_position();
//! let mut after = before;
//! after.set(4, 4, before.get(6, 4));
//! after.set(6, 4, None);
//!
//! let mv = infer_move(&before, &after, &ChessRules::new()).unwrap();
//! assert_eq!((mv.uci.as_str(), mv.san.as_str()), ("e2e4", "e4"));
//! ```
//!
//! [`GameSession`] strings the steps together per game and keeps the
//! position, the tracker and the last occupancy between frames.
//!
//! [`Occupancy`]: boardsight_core::Occupancy

mod inference;
mod mapper;
mod rules;
mod session;
mod tracker;

pub use inference::{infer_move, AmbiguousMove, InferredMove};
pub use mapper::{find_cell, map_occupancy};
pub use rules::{BoardMove, ChessRules, InvalidFen, RulesEngine};
pub use session::{
    FrameReport, FrameStatus, GameSession, PreviousUpdate, SessionParams, SessionRegistry,
    TrackReport, UNCALIBRATED_MESSAGE,
};
pub use tracker::{IouTracker, Track, TrackState, TrackerParams};
