//! Frame hand-off and track reconciliation for a dashboard-camera
//! perception pipeline.
//!
//! Capture produces frames faster than detection can consume them. A single
//! inference worker takes the newest frame when it is idle, runs a detection
//! pass every few frames and advances a correlation engine in between. The
//! track set is published for rendering and a debounced collision alert fires
//! when the engine reports danger while the vehicle is moving.
//!
//! ```ignore
//! use dashtrack::{LogAlertSink, MotionBackend, PipelineConfig, Session};
//!
//! let config = PipelineConfig::default();
//! let session = Session::start(&config, my_detector, MotionBackend::default(), LogAlertSink)?;
//! session.set_speed(32.0);
//! session.on_frame(frame);
//! for object in session.recognitions().iter() {
//!     println!("{object}");
//! }
//! let snapshot = session.stop();
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod frame;
pub mod integration;
pub mod tracker;

pub use config::PipelineConfig;
pub use engine::{CorrelationBackend, CorrelationEngine, MotionBackend};
pub use error::{ConfigError, FrameError, SessionError, TrackingError};
pub use frame::{FrameSample, FrameStore};
pub use integration::{
    AlertSink, Detector, LogAlertSink, RecognitionBuilder, Session, Submission, TrackingPipeline,
};
pub use tracker::{
    AlertGate, AlertTone, BoundingBox, RecognizedObject, Rect, TrackId, TrackRegistry,
    TrackSnapshot,
};
