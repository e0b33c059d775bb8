//! The primitive operations a correlation tracker must provide.

use serde::{Deserialize, Serialize};

use crate::frame::FrameSample;
use crate::tracker::{Rect, TrackId};

/// Opaque tag attached to each seeded box and echoed back by the backend.
///
/// Identity is recovered through this token rather than by comparing
/// rectangles, so a backend may clip or refine geometry freely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeedToken(pub usize);

impl std::fmt::Display for SeedToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A box submitted to [`CorrelationBackend::seed`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeedBox {
    pub token: SeedToken,
    pub rect: Rect,
}

/// Track opened (or kept) by a seed, tagged with the token of its source box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeededTrack {
    pub track_id: TrackId,
    pub token: SeedToken,
    pub rect: Rect,
}

/// Position of a still-valid track after one advance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackedBox {
    pub track_id: TrackId,
    pub rect: Rect,
}

/// A multi-object correlation tracker addressed through an opaque handle.
///
/// Implementations wrap a native engine or, like
/// [`MotionBackend`](super::MotionBackend), run in-process. The handle is
/// owned by exactly one [`CorrelationEngine`](super::CorrelationEngine) and is
/// only ever touched from one thread at a time.
///
/// The primitives are infallible once given valid input; callers filter
/// degenerate boxes before seeding.
pub trait CorrelationBackend: Send {
    type Handle: Send;

    fn create(&mut self) -> Self::Handle;

    fn destroy(&mut self, handle: Self::Handle);

    /// Replace the working set from a fresh detection pass. Every returned
    /// track carries the token of the box it came from.
    fn seed(
        &mut self,
        handle: &mut Self::Handle,
        frame: &FrameSample,
        boxes: &[SeedBox],
    ) -> Vec<SeededTrack>;

    /// Move every track forward by one frame. Tracks absent from the result
    /// are lost.
    fn advance(
        &mut self,
        handle: &mut Self::Handle,
        frame: &FrameSample,
        speed: f64,
    ) -> Vec<TrackedBox>;

    /// Whether the last advance left the scene in a collision-risk state.
    fn is_dangerous(&self, handle: &Self::Handle) -> bool;
}
