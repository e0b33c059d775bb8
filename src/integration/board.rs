//! Shared read side for rendering and the live speed input.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::tracker::{RecognizedObject, TrackSnapshot};

/// The current recognition sequence, published by the worker and read by the
/// renderer. Reads never block the worker for longer than an `Arc` clone.
#[derive(Debug, Clone, Default)]
pub struct RecognitionBoard {
    current: Arc<RwLock<Arc<[RecognizedObject]>>>,
}

impl RecognitionBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, objects: &[RecognizedObject]) {
        let next: Arc<[RecognizedObject]> = Arc::from(objects);
        let previous = std::mem::replace(&mut *self.current.write(), next);
        drop(previous);
    }

    pub fn clear(&self) {
        self.publish(&[]);
    }

    /// Side-effect-free read of the current sequence.
    pub fn current(&self) -> Arc<[RecognizedObject]> {
        Arc::clone(&self.current.read())
    }

    pub fn snapshot(&self) -> TrackSnapshot {
        TrackSnapshot {
            tracks: self
                .current()
                .iter()
                .filter(|obj| obj.is_tracked())
                .cloned()
                .collect(),
        }
    }
}

/// Latest vehicle speed (km/h), written by the positioning collaborator and
/// read by the worker without locking.
#[derive(Debug, Clone, Default)]
pub struct SpeedGauge {
    bits: Arc<AtomicU64>,
}

impl SpeedGauge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, speed: f64) {
        self.bits.store(speed.to_bits(), Ordering::Relaxed);
    }

    pub fn get(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::{BoundingBox, TrackId};

    #[test]
    fn test_published_sequence_is_visible_to_clones() {
        let board = RecognitionBoard::new();
        let reader = board.clone();
        assert!(reader.current().is_empty());

        let mut obj = RecognizedObject::new("car", "Car", 0.9, BoundingBox::new(0.0, 0.0, 4.0, 4.0));
        let untracked = obj.clone();
        obj.track_id = Some(TrackId(2));
        board.publish(&[obj.clone(), untracked]);

        assert_eq!(reader.current().len(), 2);
        assert_eq!(reader.snapshot().tracks, vec![obj]);

        board.clear();
        assert!(reader.current().is_empty());
    }

    #[test]
    fn test_speed_gauge_roundtrips_f64() {
        let gauge = SpeedGauge::new();
        assert_eq!(gauge.get(), 0.0);
        gauge.clone().set(42.5);
        assert_eq!(gauge.get(), 42.5);
    }
}
