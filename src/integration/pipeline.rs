//! TrackingPipeline: one detection-or-advance cycle per accepted frame.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::{AlertSink, Detector, FrameJob, RecognitionBoard, SpeedGauge};
use crate::config::PipelineConfig;
use crate::engine::CorrelationBackend;
use crate::error::{FrameError, TrackingError};
use crate::frame::{FrameSample, FrameStore};
use crate::tracker::{AlertGate, TrackRegistry, TrackSnapshot};

/// What a cycle did with its frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// A detection pass re-seeded the engine.
    Detected { tracked: usize },
    /// Existing tracks were moved by one frame.
    Advanced { tracked: usize },
    /// A restored snapshot seeded the fresh engine.
    Restored { tracked: usize },
    /// The frame was unusable; nothing changed.
    Skipped(FrameError),
}

/// Bundles a detector, the track registry, the alert gate and the outputs
/// shared with capture and rendering.
///
/// All methods run on the single inference worker. Clone the handles returned
/// by [`store`](Self::store), [`board`](Self::board) and
/// [`speed_gauge`](Self::speed_gauge) before moving the pipeline there.
pub struct TrackingPipeline<D: Detector, B: CorrelationBackend, S: AlertSink> {
    detector: D,
    registry: TrackRegistry<B>,
    gate: AlertGate,
    sink: S,
    store: Arc<FrameStore>,
    board: RecognitionBoard,
    speed: SpeedGauge,
    detection_interval: u64,
    processed: u64,
}

impl<D: Detector, B: CorrelationBackend, S: AlertSink> TrackingPipeline<D, B, S> {
    pub fn new(config: &PipelineConfig, detector: D, backend: B, sink: S) -> Self {
        Self {
            detector,
            registry: TrackRegistry::new(backend, config.tracking.clone()),
            gate: AlertGate::new(config.alert.clone()),
            sink,
            store: Arc::new(FrameStore::new()),
            board: RecognitionBoard::new(),
            speed: SpeedGauge::new(),
            detection_interval: u64::from(config.scheduler.detection_interval.max(1)),
            processed: 0,
        }
    }

    /// Seed the engine from `snapshot` on the next processed frame.
    pub fn restore(&mut self, snapshot: TrackSnapshot) {
        self.registry.restore(snapshot);
    }

    /// Run one cycle on `frame`.
    ///
    /// Unusable frames are skipped. Detector failures fall back to an
    /// advance. Engine contract violations are returned and end the session.
    pub fn process_frame(&mut self, frame: FrameSample) -> Result<CycleOutcome, TrackingError> {
        if let Err(err) = frame.validate() {
            debug!(error = %err, "skipping unusable frame");
            return Ok(CycleOutcome::Skipped(err));
        }
        if self.registry.needs_init() {
            self.registry.init()?;
        }

        let speed = self.speed.get();
        let outcome = if let Some(objects) = self.registry.take_pending_restore() {
            let tracked = self.registry.seed_from(&frame, objects)?.len();
            info!(tracked, "restored track set into fresh engine");
            CycleOutcome::Restored { tracked }
        } else if self.processed % self.detection_interval == 0 {
            self.detect_and_seed(&frame, speed)?
        } else {
            let tracked = self.registry.advance(&frame, speed)?.len();
            CycleOutcome::Advanced { tracked }
        };
        self.processed += 1;

        // Danger is reported by an advance; seeds keep the previous answer.
        if matches!(outcome, CycleOutcome::Advanced { .. }) {
            self.gate.observe_danger(self.registry.is_dangerous()?);
        }
        if self.gate.evaluate(speed) {
            self.sink.emit(self.gate.tone());
        }
        self.board.publish(self.registry.visible());
        Ok(outcome)
    }

    fn detect_and_seed(
        &mut self,
        frame: &FrameSample,
        speed: f64,
    ) -> Result<CycleOutcome, TrackingError> {
        self.store.mark_detection_frame(frame.clone());
        match self.detector.detect(frame) {
            Ok(detections) => {
                let tracked = self.registry.seed_from(frame, detections)?.len();
                Ok(CycleOutcome::Detected { tracked })
            }
            Err(err) => {
                warn!(error = %err, "detection failed, advancing existing tracks");
                let tracked = self.registry.advance(frame, speed)?.len();
                Ok(CycleOutcome::Advanced { tracked })
            }
        }
    }

    /// Release the engine. Published recognitions stay readable.
    pub fn shutdown(&mut self) {
        self.registry.free();
    }

    /// Release the engine and withdraw everything it published. Used after a
    /// fatal error, when no track id of this engine may be shown or saved.
    pub fn abort(&mut self) {
        self.registry.free();
        self.board.clear();
    }

    pub fn store(&self) -> Arc<FrameStore> {
        Arc::clone(&self.store)
    }

    pub fn board(&self) -> RecognitionBoard {
        self.board.clone()
    }

    pub fn speed_gauge(&self) -> SpeedGauge {
        self.speed.clone()
    }

    pub fn registry(&self) -> &TrackRegistry<B> {
        &self.registry
    }

    pub fn gate(&self) -> &AlertGate {
        &self.gate
    }

    /// Frames that completed a cycle (skipped frames excluded).
    pub fn processed(&self) -> u64 {
        self.processed
    }
}

impl<D, B, S> FrameJob for TrackingPipeline<D, B, S>
where
    D: Detector + 'static,
    B: CorrelationBackend + 'static,
    S: AlertSink + 'static,
{
    fn run(&mut self, frame: FrameSample) -> Result<(), TrackingError> {
        self.process_frame(frame).map(|_| ())
    }

    fn abort(&mut self) {
        TrackingPipeline::abort(self);
    }

    fn shutdown(&mut self) {
        TrackingPipeline::shutdown(self);
    }
}
