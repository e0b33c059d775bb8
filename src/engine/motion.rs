//! In-process correlation backend driven by a Kalman motion model.
//!
//! Seeding associates the submitted boxes with the current tracks by IoU so
//! that an object seen by consecutive detection passes keeps its id. Between
//! seeds every track coasts on its estimated velocity.

use tracing::trace;

use super::backend::{CorrelationBackend, SeedBox, SeededTrack, TrackedBox};
use super::kalman_filter::{BoxKalman, KalmanState};
use super::matching;
use crate::config::MotionConfig;
use crate::frame::FrameSample;
use crate::tracker::{Rect, TrackId};

/// One track inside a [`MotionState`].
#[derive(Debug, Clone)]
pub struct MotionTrack {
    pub track_id: TrackId,
    pub kalman: KalmanState,
    /// Advances since the track was last confirmed by a seed.
    pub coasted: u32,
}

impl MotionTrack {
    pub fn rect(&self) -> Rect {
        self.kalman.rect()
    }
}

/// Handle of a [`MotionBackend`]: the working set of one engine instance.
#[derive(Debug, Default)]
pub struct MotionState {
    tracks: Vec<MotionTrack>,
    next_id: u32,
    dangerous: bool,
}

impl MotionState {
    pub fn tracks(&self) -> &[MotionTrack] {
        &self.tracks
    }

    fn next_track_id(&mut self) -> TrackId {
        let id = TrackId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        id
    }
}

#[derive(Debug, Clone, Default)]
pub struct MotionBackend {
    config: MotionConfig,
    kalman: BoxKalman,
}

impl MotionBackend {
    pub fn new(config: MotionConfig) -> Self {
        Self {
            config,
            kalman: BoxKalman::new(),
        }
    }

    /// A track is dangerous when the vehicle moves, the box sits in the
    /// central corridor, fills enough of the frame height and is not shrinking.
    fn is_track_dangerous(&self, track: &MotionTrack, frame: &FrameSample, speed: f64) -> bool {
        if speed <= 0.0 {
            return false;
        }
        let rect = track.rect();
        let frame_w = frame.width() as f32;
        let frame_h = frame.height() as f32;
        let (cx, _) = rect.center();
        let half_corridor = frame_w * self.config.danger_corridor / 2.0;

        (cx - frame_w / 2.0).abs() <= half_corridor
            && rect.height >= frame_h * self.config.danger_height_ratio
            && track.kalman.height_velocity() >= 0.0
    }
}

impl CorrelationBackend for MotionBackend {
    type Handle = MotionState;

    fn create(&mut self) -> MotionState {
        MotionState::default()
    }

    fn destroy(&mut self, handle: MotionState) {
        trace!(tracks = handle.tracks.len(), "motion state released");
    }

    fn seed(
        &mut self,
        handle: &mut MotionState,
        _frame: &FrameSample,
        boxes: &[SeedBox],
    ) -> Vec<SeededTrack> {
        let track_rects: Vec<Rect> = handle.tracks.iter().map(MotionTrack::rect).collect();
        let box_rects: Vec<Rect> = boxes.iter().map(|b| b.rect).collect();
        let dists = matching::iou_distance(&track_rects, &box_rects);
        let assignment = matching::linear_assignment(&dists, 1.0 - self.config.match_iou);

        let mut previous: Vec<Option<MotionTrack>> =
            handle.tracks.drain(..).map(Some).collect();
        let mut seeded: Vec<(usize, MotionTrack)> = Vec::with_capacity(boxes.len());

        for (itrack, ibox) in assignment.matches {
            if let Some(mut track) = previous[itrack].take() {
                if !self.kalman.update(&mut track.kalman, &boxes[ibox].rect) {
                    track.kalman = self.kalman.initiate(&boxes[ibox].rect);
                }
                track.coasted = 0;
                seeded.push((ibox, track));
            }
        }
        for ibox in assignment.unmatched_boxes {
            let track_id = handle.next_track_id();
            seeded.push((
                ibox,
                MotionTrack {
                    track_id,
                    kalman: self.kalman.initiate(&boxes[ibox].rect),
                    coasted: 0,
                },
            ));
        }
        // Keep submission order so advance results follow it too.
        seeded.sort_by_key(|(ibox, _)| *ibox);

        let result = seeded
            .iter()
            .map(|(ibox, track)| SeededTrack {
                track_id: track.track_id,
                token: boxes[*ibox].token,
                rect: boxes[*ibox].rect,
            })
            .collect();
        handle.tracks = seeded.into_iter().map(|(_, track)| track).collect();
        // Danger is only recomputed by an advance.
        result
    }

    fn advance(
        &mut self,
        handle: &mut MotionState,
        frame: &FrameSample,
        speed: f64,
    ) -> Vec<TrackedBox> {
        let frame_w = frame.width() as f32;
        let frame_h = frame.height() as f32;
        let max_coast = self.config.max_coast_frames;
        let kalman = &self.kalman;

        handle.tracks.retain_mut(|track| {
            kalman.predict(&mut track.kalman);
            track.coasted += 1;
            let rect = track.rect();
            track.coasted <= max_coast
                && rect.width > 0.0
                && rect.height > 0.0
                && rect.overlaps_frame(frame_w, frame_h)
        });

        handle.dangerous = handle
            .tracks
            .iter()
            .any(|track| self.is_track_dangerous(track, frame, speed));

        handle
            .tracks
            .iter()
            .map(|track| TrackedBox {
                track_id: track.track_id,
                rect: track.rect(),
            })
            .collect()
    }

    fn is_dangerous(&self, handle: &MotionState) -> bool {
        handle.dangerous
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;
    use crate::engine::SeedToken;

    fn frame() -> FrameSample {
        FrameSample::from_rgb(vec![0u8; 640 * 480 * 3], 640, 480, 640 * 3, Instant::now())
    }

    fn seed_box(token: usize, x: f32, y: f32, w: f32, h: f32) -> SeedBox {
        SeedBox {
            token: SeedToken(token),
            rect: Rect::new(x, y, w, h),
        }
    }

    #[test]
    fn test_seed_echoes_tokens_and_geometry() {
        let mut backend = MotionBackend::default();
        let mut state = backend.create();
        let boxes = [
            seed_box(0, 10.0, 10.0, 50.0, 50.0),
            seed_box(1, 200.0, 100.0, 30.0, 60.0),
        ];
        let seeded = backend.seed(&mut state, &frame(), &boxes);

        assert_eq!(seeded.len(), 2);
        for (track, submitted) in seeded.iter().zip(&boxes) {
            assert_eq!(track.token, submitted.token);
            assert_eq!(track.rect, submitted.rect);
        }
        assert_ne!(seeded[0].track_id, seeded[1].track_id);
    }

    #[test]
    fn test_reseed_keeps_identity_of_overlapping_box() {
        let mut backend = MotionBackend::default();
        let mut state = backend.create();
        let first = backend.seed(
            &mut state,
            &frame(),
            &[seed_box(0, 100.0, 100.0, 50.0, 50.0)],
        );
        let second = backend.seed(
            &mut state,
            &frame(),
            &[
                seed_box(0, 400.0, 300.0, 20.0, 20.0),
                seed_box(1, 104.0, 102.0, 50.0, 50.0),
            ],
        );

        assert_eq!(second[1].track_id, first[0].track_id);
        assert_ne!(second[0].track_id, first[0].track_id);
    }

    #[test]
    fn test_advance_keeps_tracks_until_coast_limit() {
        let mut backend = MotionBackend::new(MotionConfig {
            max_coast_frames: 2,
            ..MotionConfig::default()
        });
        let mut state = backend.create();
        backend.seed(&mut state, &frame(), &[seed_box(0, 10.0, 10.0, 50.0, 50.0)]);

        assert_eq!(backend.advance(&mut state, &frame(), 0.0).len(), 1);
        assert_eq!(backend.advance(&mut state, &frame(), 0.0).len(), 1);
        assert!(backend.advance(&mut state, &frame(), 0.0).is_empty());
    }

    #[test]
    fn test_advance_drops_tracks_outside_the_frame() {
        let mut backend = MotionBackend::default();
        let mut state = backend.create();
        backend.seed(&mut state, &frame(), &[seed_box(0, 700.0, 10.0, 50.0, 50.0)]);
        assert!(backend.advance(&mut state, &frame(), 0.0).is_empty());
    }

    #[test]
    fn test_large_centered_box_is_dangerous_only_while_moving() {
        let mut backend = MotionBackend::default();
        let mut state = backend.create();
        backend.seed(
            &mut state,
            &frame(),
            &[seed_box(0, 220.0, 200.0, 200.0, 250.0)],
        );

        backend.advance(&mut state, &frame(), 0.0);
        assert!(!backend.is_dangerous(&state));

        backend.advance(&mut state, &frame(), 30.0);
        assert!(backend.is_dangerous(&state));
    }

    #[test]
    fn test_reseed_keeps_danger_until_next_advance() {
        let mut backend = MotionBackend::default();
        let mut state = backend.create();
        let close = [seed_box(0, 220.0, 200.0, 200.0, 250.0)];
        backend.seed(&mut state, &frame(), &close);
        backend.advance(&mut state, &frame(), 30.0);
        assert!(backend.is_dangerous(&state));

        backend.seed(&mut state, &frame(), &[seed_box(0, 300.0, 200.0, 30.0, 30.0)]);
        assert!(backend.is_dangerous(&state));

        backend.advance(&mut state, &frame(), 30.0);
        assert!(!backend.is_dangerous(&state));
    }

    #[test]
    fn test_small_or_side_boxes_are_not_dangerous() {
        let mut backend = MotionBackend::default();
        let mut state = backend.create();
        backend.seed(
            &mut state,
            &frame(),
            &[
                seed_box(0, 300.0, 200.0, 30.0, 30.0),
                seed_box(1, 0.0, 100.0, 100.0, 300.0),
            ],
        );
        backend.advance(&mut state, &frame(), 50.0);
        assert!(!backend.is_dangerous(&state));
    }
}
