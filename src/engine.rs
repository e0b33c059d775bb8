//! Correlation engine: the opaque tracker handle and its lifecycle.

mod backend;
mod correlation;
mod kalman_filter;
mod matching;
mod motion;

pub use backend::{CorrelationBackend, SeedBox, SeedToken, SeededTrack, TrackedBox};
pub use correlation::CorrelationEngine;
pub use kalman_filter::KalmanState;
pub use motion::{MotionBackend, MotionState, MotionTrack};
