//! Reconciliation of detector output with correlation-engine output.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::config::TrackingConfig;
use crate::engine::{CorrelationBackend, CorrelationEngine, SeedBox, SeedToken};
use crate::error::TrackingError;
use crate::frame::FrameSample;
use crate::tracker::recognition::{RecognizedObject, TrackId, TrackSnapshot};

/// Authoritative `track id → object` set, paired with the engine that owns
/// the ids.
///
/// Tracks are only added by [`seed_from`](Self::seed_from); an
/// [`advance`](Self::advance) can only keep or drop them. Objects are held in
/// engine iteration order and every held object carries a unique track id.
pub struct TrackRegistry<B: CorrelationBackend> {
    engine: CorrelationEngine<B>,
    config: TrackingConfig,
    tracks: Vec<RecognizedObject>,
    pending_restore: Option<Vec<RecognizedObject>>,
}

impl<B: CorrelationBackend> TrackRegistry<B> {
    pub fn new(backend: B, config: TrackingConfig) -> Self {
        Self {
            engine: CorrelationEngine::new(backend),
            config,
            tracks: Vec::new(),
            pending_restore: None,
        }
    }

    pub fn needs_init(&self) -> bool {
        self.engine.needs_init()
    }

    pub fn init(&mut self) -> Result<(), TrackingError> {
        self.engine.init()
    }

    /// Release the engine handle and forget every track.
    pub fn free(&mut self) {
        self.engine.free();
        self.tracks.clear();
    }

    /// Replace the track set from a fresh detection pass on `frame`.
    ///
    /// Detections with a side shorter than the configured minimum are not
    /// submitted and never receive a track id. A backend answer that names a
    /// token which was not submitted, or names one twice, is a contract
    /// violation; the registry is left unchanged in that case.
    pub fn seed_from(
        &mut self,
        frame: &FrameSample,
        detections: Vec<RecognizedObject>,
    ) -> Result<&[RecognizedObject], TrackingError> {
        let min_side = self.config.min_box_side;
        let boxes: Vec<SeedBox> = detections
            .iter()
            .enumerate()
            .filter(|(_, det)| det.location.to_rect().has_min_side(min_side))
            .map(|(i, det)| SeedBox {
                token: SeedToken(i),
                rect: det.location.to_rect(),
            })
            .collect();

        let seeded = self.engine.seed(frame, &boxes)?;

        let mut submitted = vec![false; detections.len()];
        for b in &boxes {
            submitted[b.token.0] = true;
        }
        let mut candidates: Vec<Option<RecognizedObject>> =
            detections.into_iter().map(Some).collect();
        let mut assigned_ids = HashSet::with_capacity(seeded.len());
        let mut tracks = Vec::with_capacity(seeded.len());

        for track in seeded {
            let index = track.token.0;
            if !submitted.get(index).copied().unwrap_or(false) {
                return Err(TrackingError::UnknownSeedToken {
                    track_id: track.track_id,
                    token: track.token,
                });
            }
            let Some(mut object) = candidates[index].take() else {
                return Err(TrackingError::DuplicateSeedToken { token: track.token });
            };
            if !assigned_ids.insert(track.track_id) {
                return Err(TrackingError::DuplicateTrackId(track.track_id));
            }
            object.track_id = Some(track.track_id);
            tracks.push(object);
        }

        debug!(
            detections = submitted.len(),
            submitted = boxes.len(),
            tracked = tracks.len(),
            "seeded correlation engine"
        );
        self.tracks = tracks;
        Ok(&self.tracks)
    }

    /// Move every track forward by one frame.
    ///
    /// Tracks the engine still reports get their box updated in place; any
    /// other track is lost and removed. Ids the registry does not hold are
    /// ignored.
    pub fn advance(
        &mut self,
        frame: &FrameSample,
        speed: f64,
    ) -> Result<&[RecognizedObject], TrackingError> {
        let moved = self.engine.advance(frame, speed)?;

        let before = self.tracks.len();
        let mut previous: HashMap<TrackId, RecognizedObject> = self
            .tracks
            .drain(..)
            .filter_map(|obj| obj.track_id.map(|id| (id, obj)))
            .collect();

        for tracked in moved {
            if let Some(mut object) = previous.remove(&tracked.track_id) {
                object.location = tracked.rect.to_bounding_box();
                self.tracks.push(object);
            }
        }

        if !previous.is_empty() {
            let mut lost: Vec<TrackId> = previous.into_keys().collect();
            lost.sort();
            debug!(?lost, remaining = self.tracks.len(), before, "tracks lost");
        }
        Ok(&self.tracks)
    }

    /// Danger state reported by the engine after its last advance.
    pub fn is_dangerous(&self) -> Result<bool, TrackingError> {
        self.engine.is_dangerous()
    }

    /// Currently tracked objects, in engine order.
    pub fn visible(&self) -> &[RecognizedObject] {
        &self.tracks
    }

    pub fn track_ids(&self) -> Vec<TrackId> {
        self.tracks.iter().filter_map(|obj| obj.track_id).collect()
    }

    pub fn get(&self, id: TrackId) -> Option<&RecognizedObject> {
        self.tracks.iter().find(|obj| obj.track_id == Some(id))
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn snapshot(&self) -> TrackSnapshot {
        TrackSnapshot {
            tracks: self.tracks.clone(),
        }
    }

    /// Queue a snapshot to seed the engine with on the next processed frame.
    ///
    /// Track ids in the snapshot belonged to a previous engine and are
    /// discarded; the fresh engine assigns new ones.
    pub fn restore(&mut self, snapshot: TrackSnapshot) {
        if snapshot.is_empty() {
            self.pending_restore = None;
            return;
        }
        let objects = snapshot
            .tracks
            .into_iter()
            .map(|mut obj| {
                obj.track_id = None;
                obj
            })
            .collect();
        self.pending_restore = Some(objects);
    }

    pub fn take_pending_restore(&mut self) -> Option<Vec<RecognizedObject>> {
        self.pending_restore.take()
    }

    pub fn engine(&self) -> &CorrelationEngine<B> {
        &self.engine
    }
}
