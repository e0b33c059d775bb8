use parking_lot::Mutex;

use super::FrameSample;

/// Double-slot frame holder decoupling capture cadence from inference cadence.
///
/// `latest` is overwritten on every capture callback; `detection` holds the
/// exact frame the running detection pass evaluates. Slots are overwritten,
/// never queued. Each write swaps a whole [`FrameSample`] (an `Arc` of pixels)
/// under a lock held for a pointer copy, so readers never observe a torn frame
/// and the capture thread never waits on inference.
#[derive(Debug, Default)]
pub struct FrameStore {
    latest: Mutex<Option<FrameSample>>,
    detection: Mutex<Option<FrameSample>>,
}

impl FrameStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the `latest` slot. Called from the capture path only.
    pub fn put_latest(&self, frame: FrameSample) {
        let previous = self.latest.lock().replace(frame);
        // Release the old pixels outside the lock.
        drop(previous);
    }

    /// Record the frame about to be handed to the detector. Boxes returned by
    /// that detection pass are defined against these pixels.
    pub fn mark_detection_frame(&self, frame: FrameSample) {
        let previous = self.detection.lock().replace(frame);
        drop(previous);
    }

    /// Most recently captured frame; may be one frame stale by the time the
    /// caller looks at it.
    pub fn read_latest(&self) -> Option<FrameSample> {
        self.latest.lock().clone()
    }

    pub fn read_detection_frame(&self) -> Option<FrameSample> {
        self.detection.lock().clone()
    }

    /// Empty both slots, e.g. at session end.
    pub fn clear(&self) {
        let latest = self.latest.lock().take();
        let detection = self.detection.lock().take();
        drop((latest, detection));
    }
}
