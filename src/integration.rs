//! Wiring between capture, detection, tracking and rendering.
//!
//! Detection and alert emission are collaborators behind the [`Detector`] and
//! [`AlertSink`] traits. [`Session`] is the entry point for a capture loop.

mod alert_sink;
mod board;
mod builder;
mod detector;
mod pipeline;
mod scheduler;
mod session;

pub use alert_sink::{AlertSink, LogAlertSink};
pub use board::{RecognitionBoard, SpeedGauge};
pub use builder::RecognitionBuilder;
pub use detector::Detector;
pub use pipeline::{CycleOutcome, TrackingPipeline};
pub use scheduler::{FrameJob, InferenceScheduler, SchedulerStats, Submission};
pub use session::Session;
