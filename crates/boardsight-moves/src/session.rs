//! Per-game frame processing: tracking, occupancy, move inference.

use crate::inference::{infer_move, InferredMove};
use crate::mapper::map_occupancy;
use crate::rules::{ChessRules, RulesEngine};
use crate::tracker::{IouTracker, TrackerParams};
use boardsight_calib::{Calibration, CalibrationStore, StoreError};
use boardsight_core::{BBox, Detection, Occupancy};
use image::{ImageBuffer, Pixel};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Shown in every report of a session that has no calibration yet.
pub const UNCALIBRATED_MESSAGE: &str =
    "Mapping not found. Please calibrate the board first by sending a frame with an empty board.";

/// When the retained "previous" occupancy is replaced.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreviousUpdate {
    /// After every observed frame.
    #[default]
    EveryFrame,
    /// Only after a move (and for the very first frame).
    OnMove,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionParams {
    /// Occupancy assumed before the first frame. Without it the first
    /// frame only seeds the comparison.
    pub initial_occupancy: Option<Occupancy>,
    pub previous_update: PreviousUpdate,
    pub tracker: TrackerParams,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameStatus {
    Processed,
}

/// One tracked object in a [`FrameReport`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrackReport {
    pub bbox: BBox,
    #[serde(rename = "class")]
    pub class_name: String,
    pub confidence: f32,
}

/// Result of observing one frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FrameReport {
    pub status: FrameStatus,
    /// Keyed by track id.
    pub tracks: BTreeMap<String, TrackReport>,
    pub board_state: Occupancy,
    pub tracks_count: usize,
    #[serde(rename = "move", default, skip_serializing_if = "Option::is_none")]
    pub move_uci: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub move_san: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl FrameReport {
    fn uncalibrated() -> Self {
        Self {
            status: FrameStatus::Processed,
            tracks: BTreeMap::new(),
            board_state: Occupancy::empty(),
            tracks_count: 0,
            move_uci: None,
            move_san: None,
            message: Some(UNCALIBRATED_MESSAGE.to_string()),
        }
    }
}

/// State of one game: calibration, tracker, last occupancy and position.
#[derive(Clone, Debug)]
pub struct GameSession<R: RulesEngine = ChessRules> {
    token: String,
    calibration: Option<Calibration>,
    params: SessionParams,
    tracker: IouTracker,
    previous: Option<Occupancy>,
    rules: R,
    history: Vec<InferredMove>,
}

impl GameSession<ChessRules> {
    /// Session on the standard starting position.
    pub fn standard(
        token: impl Into<String>,
        calibration: Option<Calibration>,
        params: SessionParams,
    ) -> Self {
        Self::new(token, calibration, ChessRules::new(), params)
    }
}

impl<R: RulesEngine> GameSession<R> {
    pub fn new(
        token: impl Into<String>,
        calibration: Option<Calibration>,
        rules: R,
        params: SessionParams,
    ) -> Self {
        Self {
            token: token.into(),
            calibration,
            tracker: IouTracker::new(params.tracker.clone()),
            previous: params.initial_occupancy,
            params,
            rules,
            history: Vec::new(),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn is_calibrated(&self) -> bool {
        self.calibration.is_some()
    }

    pub fn calibration(&self) -> Option<&Calibration> {
        self.calibration.as_ref()
    }

    /// Replace the calibration, e.g. after the camera moved. Tracks and the
    /// previous occupancy are kept.
    pub fn set_calibration(&mut self, calibration: Calibration) {
        self.calibration = Some(calibration);
    }

    pub fn params(&self) -> &SessionParams {
        &self.params
    }

    pub fn rules(&self) -> &R {
        &self.rules
    }

    pub fn tracker(&self) -> &IouTracker {
        &self.tracker
    }

    /// Occupancy the next frame is compared against.
    pub fn previous(&self) -> Option<&Occupancy> {
        self.previous.as_ref()
    }

    /// Moves played so far, oldest first.
    pub fn history(&self) -> &[InferredMove] {
        &self.history
    }

    /// Rectify a camera frame with the session's calibration.
    pub fn rectify<P>(&self, frame: &ImageBuffer<P, Vec<u8>>) -> Option<ImageBuffer<P, Vec<u8>>>
    where
        P: Pixel<Subpixel = u8>,
    {
        self.calibration.as_ref()?.rectify(frame)
    }

    /// Process one frame of detections in rectified-image coordinates.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, detections), fields(token = %self.token, detections = detections.len()))
    )]
    pub fn observe(&mut self, detections: &[Detection]) -> FrameReport {
        let Some(calibration) = self.calibration.as_ref() else {
            debug!("{}: frame skipped, no calibration", self.token);
            return FrameReport::uncalibrated();
        };

        let detections = if detections.iter().any(|d| d.track_id.is_some()) {
            detections.to_vec()
        } else {
            self.tracker.assign_ids(detections)
        };
        let occupancy = map_occupancy(&detections, &calibration.grid);

        let mut played = None;
        if let Some(previous) = self.previous.as_ref() {
            match infer_move(previous, &occupancy, &self.rules) {
                Ok(mv) => {
                    if self.rules.apply(&mv.board_move()) {
                        info!("{}: move {} ({})", self.token, mv.uci, mv.san);
                        played = Some(mv);
                    } else {
                        warn!("{}: rules engine refused {}", self.token, mv.uci);
                    }
                }
                Err(reason) => debug!("{}: no move, {reason}", self.token),
            }
        }

        let replace_previous = match self.params.previous_update {
            PreviousUpdate::EveryFrame => true,
            PreviousUpdate::OnMove => self.previous.is_none() || played.is_some(),
        };
        if replace_previous {
            self.previous = Some(occupancy);
        }

        let tracks = detections
            .iter()
            .filter_map(|d| {
                let id = d.track_id?;
                let report = TrackReport {
                    bbox: d.bbox,
                    class_name: d.class_name.clone(),
                    confidence: d.confidence,
                };
                Some((id.to_string(), report))
            })
            .collect();

        let report = FrameReport {
            status: FrameStatus::Processed,
            tracks,
            board_state: occupancy,
            tracks_count: detections.len(),
            move_uci: played.as_ref().map(|m| m.uci.clone()),
            move_san: played.as_ref().map(|m| m.san.clone()),
            message: None,
        };
        if let Some(mv) = played {
            self.history.push(mv);
        }
        report
    }
}

/// One [`GameSession`] per game token, created on first use with the
/// calibration found in the store.
#[derive(Debug)]
pub struct SessionRegistry {
    store: CalibrationStore,
    params: SessionParams,
    sessions: HashMap<String, GameSession>,
}

impl SessionRegistry {
    pub fn new(store: CalibrationStore, params: SessionParams) -> Self {
        Self {
            store,
            params,
            sessions: HashMap::new(),
        }
    }

    pub fn store(&self) -> &CalibrationStore {
        &self.store
    }

    /// Session for `token`, loading its calibration on first use.
    ///
    /// A missing calibration file yields an uncalibrated session. Unreadable
    /// or invalid files are errors.
    pub fn session(&mut self, token: &str) -> Result<&mut GameSession, StoreError> {
        if !self.sessions.contains_key(token) {
            let calibration = match self.store.load_calibration(token) {
                Ok(c) => Some(c),
                Err(StoreError::NotFound { .. }) => {
                    info!("{token}: no calibration on disk yet");
                    None
                }
                Err(e) => return Err(e),
            };
            let session = GameSession::standard(token, calibration, self.params.clone());
            self.sessions.insert(token.to_string(), session);
        }
        self.sessions
            .get_mut(token)
            .ok_or_else(|| StoreError::NotFound {
                token: token.to_string(),
            })
    }

    pub fn get(&self, token: &str) -> Option<&GameSession> {
        self.sessions.get(token)
    }

    /// Install a fresh calibration for `token`, creating the session if
    /// needed.
    pub fn calibrate(&mut self, calibration: Calibration) -> &mut GameSession {
        let token = calibration.game_token.clone();
        let params = &self.params;
        let session = self
            .sessions
            .entry(token.clone())
            .or_insert_with(|| GameSession::standard(token, None, params.clone()));
        session.set_calibration(calibration);
        session
    }

    pub fn remove(&mut self, token: &str) -> Option<GameSession> {
        self.sessions.remove(token)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.sessions.keys().map(String::as_str)
    }
}
