//! Session: the capture-side entry point wiring store, board and worker.

use std::sync::Arc;

use tracing::{debug, info};

use super::{
    AlertSink, Detector, InferenceScheduler, RecognitionBoard, SchedulerStats, SpeedGauge,
    Submission, TrackingPipeline,
};
use crate::config::PipelineConfig;
use crate::engine::CorrelationBackend;
use crate::error::SessionError;
use crate::frame::{FrameSample, FrameStore};
use crate::tracker::{RecognizedObject, TrackSnapshot};

/// A running recognition session.
///
/// The capture callback calls [`on_frame`](Self::on_frame) for every camera
/// frame; rendering reads [`recognitions`](Self::recognitions). Neither ever
/// waits on inference.
pub struct Session {
    store: Arc<FrameStore>,
    board: RecognitionBoard,
    speed: SpeedGauge,
    scheduler: InferenceScheduler,
}

impl Session {
    pub fn start<D, B, S>(
        config: &PipelineConfig,
        detector: D,
        backend: B,
        sink: S,
    ) -> Result<Self, SessionError>
    where
        D: Detector + 'static,
        B: CorrelationBackend + 'static,
        S: AlertSink + 'static,
    {
        config.validate()?;
        let pipeline = TrackingPipeline::new(config, detector, backend, sink);
        Self::spawn(config, pipeline)
    }

    /// Start a session that first re-seeds a fresh engine from `snapshot`.
    pub fn resume<D, B, S>(
        config: &PipelineConfig,
        detector: D,
        backend: B,
        sink: S,
        snapshot: TrackSnapshot,
    ) -> Result<Self, SessionError>
    where
        D: Detector + 'static,
        B: CorrelationBackend + 'static,
        S: AlertSink + 'static,
    {
        config.validate()?;
        let mut pipeline = TrackingPipeline::new(config, detector, backend, sink);
        info!(tracks = snapshot.tracks.len(), "resuming from snapshot");
        pipeline.restore(snapshot);
        Self::spawn(config, pipeline)
    }

    fn spawn<D, B, S>(
        config: &PipelineConfig,
        pipeline: TrackingPipeline<D, B, S>,
    ) -> Result<Self, SessionError>
    where
        D: Detector + 'static,
        B: CorrelationBackend + 'static,
        S: AlertSink + 'static,
    {
        let store = pipeline.store();
        let board = pipeline.board();
        let speed = pipeline.speed_gauge();
        let scheduler = InferenceScheduler::start(&config.scheduler.thread_name, pipeline)?;
        Ok(Self {
            store,
            board,
            speed,
            scheduler,
        })
    }

    /// Hand a captured frame to the pipeline.
    ///
    /// The frame always becomes the latest frame. It is also offered to the
    /// worker, which drops it if a cycle is still running.
    pub fn on_frame(&self, frame: FrameSample) -> Submission {
        if let Err(err) = frame.validate() {
            debug!(error = %err, "rejecting unusable frame");
            return Submission::Rejected(err);
        }
        self.store.put_latest(frame.clone());
        self.scheduler.try_submit(frame)
    }

    /// Current vehicle speed in km/h, read by the next cycle.
    pub fn set_speed(&self, speed: f64) {
        self.speed.set(speed);
    }

    pub fn speed(&self) -> f64 {
        self.speed.get()
    }

    /// The recognitions published by the last completed cycle.
    pub fn recognitions(&self) -> Arc<[RecognizedObject]> {
        self.board.current()
    }

    pub fn latest_frame(&self) -> Option<FrameSample> {
        self.store.read_latest()
    }

    pub fn detection_frame(&self) -> Option<FrameSample> {
        self.store.read_detection_frame()
    }

    /// Whether the worker stopped on a fatal tracking error.
    pub fn is_failed(&self) -> bool {
        self.scheduler.is_failed()
    }

    pub fn is_running(&self) -> bool {
        self.scheduler.is_running()
    }

    pub fn stats(&self) -> SchedulerStats {
        self.scheduler.stats()
    }

    /// Stop the worker, release the engine and return the tracked objects
    /// for a later [`resume`](Self::resume). A failed session returns an
    /// empty snapshot.
    pub fn stop(mut self) -> TrackSnapshot {
        self.scheduler.shutdown();
        let snapshot = if self.scheduler.is_failed() {
            TrackSnapshot::default()
        } else {
            self.board.snapshot()
        };
        self.store.clear();
        info!(tracks = snapshot.tracks.len(), "session stopped");
        snapshot
    }
}
