//! Frame-to-frame identity for detectors that do not track on their own.
//!
//! Association is greedy: tracks are visited in id order and each takes the
//! best-overlapping unused detection of the same class. Tracks that find no
//! partner are kept as [`TrackState::Stale`] and can be picked up again
//! later; nothing is ever deleted.

use boardsight_core::{BBox, Detection};
use log::trace;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerParams {
    /// Minimum IoU (exclusive) for a detection to continue a track.
    pub iou_threshold: f32,
}

impl Default for TrackerParams {
    fn default() -> Self {
        Self { iou_threshold: 0.3 }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackState {
    /// Matched in the latest update.
    Active,
    /// Not matched in the latest update; box frozen, confidence zero.
    Stale,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: u32,
    pub class_name: String,
    pub bbox: BBox,
    pub confidence: f32,
    pub state: TrackState,
    /// Consecutive updates without a match.
    pub frames_since_match: u32,
}

#[derive(Clone, Debug)]
pub struct IouTracker {
    params: TrackerParams,
    tracks: Vec<Track>,
    next_id: u32,
}

impl Default for IouTracker {
    fn default() -> Self {
        Self::new(TrackerParams::default())
    }
}

impl IouTracker {
    pub fn new(params: TrackerParams) -> Self {
        Self {
            params,
            tracks: Vec::new(),
            next_id: 1,
        }
    }

    pub fn params(&self) -> &TrackerParams {
        &self.params
    }

    /// All tracks ever created, ordered by id.
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// Associate one frame of detections and return the full track list.
    pub fn update(&mut self, detections: &[Detection]) -> Vec<Track> {
        self.associate(detections);
        self.tracks.clone()
    }

    /// Associate one frame and return the detections with `track_id` set.
    pub fn assign_ids(&mut self, detections: &[Detection]) -> Vec<Detection> {
        let ids = self.associate(detections);
        detections
            .iter()
            .zip(ids)
            .map(|(det, id)| det.clone().with_track_id(id))
            .collect()
    }

    /// Track id for every detection, in input order.
    fn associate(&mut self, detections: &[Detection]) -> Vec<u32> {
        let mut assigned: Vec<Option<u32>> = vec![None; detections.len()];

        for track in self.tracks.iter_mut() {
            let mut best: Option<(usize, f32)> = None;
            for (i, det) in detections.iter().enumerate() {
                if assigned[i].is_some() || det.class_name != track.class_name {
                    continue;
                }
                let iou = track.bbox.iou(&det.bbox);
                if best.is_none_or(|(_, b)| iou > b) {
                    best = Some((i, iou));
                }
            }

            match best {
                Some((i, iou)) if iou > self.params.iou_threshold => {
                    let det = &detections[i];
                    track.bbox = det.bbox;
                    track.confidence = det.confidence;
                    track.state = TrackState::Active;
                    track.frames_since_match = 0;
                    assigned[i] = Some(track.id);
                }
                _ => {
                    track.confidence = 0.0;
                    track.state = TrackState::Stale;
                    track.frames_since_match += 1;
                }
            }
        }

        for (i, det) in detections.iter().enumerate() {
            if assigned[i].is_some() {
                continue;
            }
            let id = self.next_id;
            self.next_id += 1;
            trace!("new track {id} for {}", det.class_name);
            self.tracks.push(Track {
                id,
                class_name: det.class_name.clone(),
                bbox: det.bbox,
                confidence: det.confidence,
                state: TrackState::Active,
                frames_since_match: 0,
            });
            assigned[i] = Some(id);
        }

        assigned.into_iter().flatten().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pawn(x: i32) -> Detection {
        Detection::new("white-pawn", BBox::new(x, 0, x + 10, 10), 0.8)
    }

    #[test]
    fn stationary_detection_keeps_its_id() {
        let mut tracker = IouTracker::default();
        for _ in 0..3 {
            let tracks = tracker.update(&[pawn(0)]);
            assert_eq!(tracks.len(), 1);
            assert_eq!(tracks[0].id, 1);
            assert_eq!(tracks[0].state, TrackState::Active);
        }
    }

    #[test]
    fn small_shift_continues_and_large_shift_spawns() {
        let mut tracker = IouTracker::default();
        tracker.update(&[pawn(0)]);
        // 8/12 overlap: IoU 0.67.
        let tracks = tracker.update(&[pawn(2)]);
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].bbox, BBox::new(2, 0, 12, 10));

        // 4/16 overlap: IoU 0.25.
        let tracks = tracker.update(&[pawn(8)]);
        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[1].id, 2);
        assert_eq!(tracks[0].state, TrackState::Stale);
    }

    #[test]
    fn unmatched_track_goes_stale_and_counts_frames() {
        let mut tracker = IouTracker::default();
        tracker.update(&[pawn(0)]);
        tracker.update(&[]);
        let tracks = tracker.update(&[]);
        assert_eq!(tracks[0].state, TrackState::Stale);
        assert_eq!(tracks[0].frames_since_match, 2);
        assert_eq!(tracks[0].confidence, 0.0);
        assert_eq!(tracks[0].bbox, BBox::new(0, 0, 10, 10));

        let tracks = tracker.update(&[pawn(1)]);
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].state, TrackState::Active);
        assert_eq!(tracks[0].frames_since_match, 0);
    }

    #[test]
    fn classes_never_share_a_track() {
        let mut tracker = IouTracker::default();
        tracker.update(&[pawn(0)]);
        let other = Detection::new("black-pawn", BBox::new(0, 0, 10, 10), 0.9);
        let tracks = tracker.update(&[other]);
        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[1].class_name, "black-pawn");
    }

    #[test]
    fn assigned_ids_follow_input_order() {
        let mut tracker = IouTracker::default();
        let first = tracker.assign_ids(&[pawn(0), pawn(100)]);
        assert_eq!(first[0].track_id, Some(1));
        assert_eq!(first[1].track_id, Some(2));
        let second = tracker.assign_ids(&[pawn(101), pawn(1)]);
        assert_eq!(second[0].track_id, Some(2));
        assert_eq!(second[1].track_id, Some(1));
    }
}
