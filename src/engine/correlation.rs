use tracing::debug;

use super::backend::{CorrelationBackend, SeedBox, SeededTrack, TrackedBox};
use crate::error::TrackingError;
use crate::frame::FrameSample;

enum EngineState<H> {
    Uninitialized,
    Ready(H),
    Freed,
}

/// Owner of exactly one backend handle.
///
/// Lifecycle: Uninitialized → Ready (`init`) → Freed (`free`, terminal).
/// Using the engine outside the Ready state is a contract error. The handle
/// is destroyed exactly once, by `free` or on drop.
pub struct CorrelationEngine<B: CorrelationBackend> {
    backend: B,
    state: EngineState<B::Handle>,
}

impl<B: CorrelationBackend> CorrelationEngine<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            state: EngineState::Uninitialized,
        }
    }

    /// True until a handle has been created.
    pub fn needs_init(&self) -> bool {
        matches!(self.state, EngineState::Uninitialized)
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, EngineState::Ready(_))
    }

    /// Create the backend handle. A no-op when already Ready.
    pub fn init(&mut self) -> Result<(), TrackingError> {
        match self.state {
            EngineState::Uninitialized => {
                self.state = EngineState::Ready(self.backend.create());
                debug!("correlation engine initialized");
                Ok(())
            }
            EngineState::Ready(_) => Ok(()),
            EngineState::Freed => Err(TrackingError::EngineFreed),
        }
    }

    /// Release the handle. Idempotent; the engine cannot be re-initialized.
    pub fn free(&mut self) {
        if let EngineState::Ready(handle) =
            std::mem::replace(&mut self.state, EngineState::Freed)
        {
            self.backend.destroy(handle);
            debug!("correlation engine freed");
        }
    }

    pub fn seed(
        &mut self,
        frame: &FrameSample,
        boxes: &[SeedBox],
    ) -> Result<Vec<SeededTrack>, TrackingError> {
        let handle = ready_mut(&mut self.state)?;
        Ok(self.backend.seed(handle, frame, boxes))
    }

    pub fn advance(
        &mut self,
        frame: &FrameSample,
        speed: f64,
    ) -> Result<Vec<TrackedBox>, TrackingError> {
        let handle = ready_mut(&mut self.state)?;
        Ok(self.backend.advance(handle, frame, speed))
    }

    pub fn is_dangerous(&self) -> Result<bool, TrackingError> {
        match &self.state {
            EngineState::Ready(handle) => Ok(self.backend.is_dangerous(handle)),
            EngineState::Uninitialized => Err(TrackingError::EngineNotInitialized),
            EngineState::Freed => Err(TrackingError::EngineFreed),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}

fn ready_mut<H>(state: &mut EngineState<H>) -> Result<&mut H, TrackingError> {
    match state {
        EngineState::Ready(handle) => Ok(handle),
        EngineState::Uninitialized => Err(TrackingError::EngineNotInitialized),
        EngineState::Freed => Err(TrackingError::EngineFreed),
    }
}

impl<B: CorrelationBackend> Drop for CorrelationEngine<B> {
    fn drop(&mut self) {
        self.free();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Instant;

    use super::*;
    use crate::engine::SeedToken;
    use crate::tracker::{Rect, TrackId};

    #[derive(Default, Clone)]
    struct CountingBackend {
        created: Arc<AtomicUsize>,
        destroyed: Arc<AtomicUsize>,
    }

    impl CorrelationBackend for CountingBackend {
        type Handle = u32;

        fn create(&mut self) -> u32 {
            self.created.fetch_add(1, Ordering::SeqCst) as u32
        }

        fn destroy(&mut self, _handle: u32) {
            self.destroyed.fetch_add(1, Ordering::SeqCst);
        }

        fn seed(&mut self, _: &mut u32, _: &FrameSample, boxes: &[SeedBox]) -> Vec<SeededTrack> {
            boxes
                .iter()
                .map(|b| SeededTrack {
                    track_id: TrackId(b.token.0 as u32),
                    token: b.token,
                    rect: b.rect,
                })
                .collect()
        }

        fn advance(&mut self, _: &mut u32, _: &FrameSample, _: f64) -> Vec<TrackedBox> {
            Vec::new()
        }

        fn is_dangerous(&self, _: &u32) -> bool {
            true
        }
    }

    fn frame() -> FrameSample {
        FrameSample::from_rgb(vec![0u8; 12], 2, 2, 6, Instant::now())
    }

    #[test]
    fn test_use_before_init_is_rejected() {
        let mut engine = CorrelationEngine::new(CountingBackend::default());
        assert!(engine.needs_init());
        assert_eq!(
            engine.advance(&frame(), 0.0).unwrap_err(),
            TrackingError::EngineNotInitialized
        );
        assert_eq!(
            engine.is_dangerous().unwrap_err(),
            TrackingError::EngineNotInitialized
        );
    }

    #[test]
    fn test_init_is_idempotent() {
        let backend = CountingBackend::default();
        let mut engine = CorrelationEngine::new(backend.clone());
        engine.init().unwrap();
        engine.init().unwrap();
        assert!(engine.is_ready());
        assert!(!engine.needs_init());
        assert_eq!(backend.created.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_ready_engine_forwards_to_backend() {
        let mut engine = CorrelationEngine::new(CountingBackend::default());
        engine.init().unwrap();
        let seeded = engine
            .seed(
                &frame(),
                &[SeedBox {
                    token: SeedToken(4),
                    rect: Rect::new(0.0, 0.0, 5.0, 5.0),
                }],
            )
            .unwrap();
        assert_eq!(seeded[0].track_id, TrackId(4));
        assert!(engine.is_dangerous().unwrap());
    }

    #[test]
    fn test_freed_engine_is_terminal() {
        let backend = CountingBackend::default();
        let mut engine = CorrelationEngine::new(backend.clone());
        engine.init().unwrap();
        engine.free();
        engine.free();

        assert_eq!(backend.destroyed.load(Ordering::SeqCst), 1);
        assert!(!engine.needs_init());
        assert_eq!(engine.init().unwrap_err(), TrackingError::EngineFreed);
        assert_eq!(
            engine.seed(&frame(), &[]).unwrap_err(),
            TrackingError::EngineFreed
        );
    }

    #[test]
    fn test_drop_destroys_handle_once() {
        let backend = CountingBackend::default();
        {
            let mut engine = CorrelationEngine::new(backend.clone());
            engine.init().unwrap();
            engine.free();
        }
        {
            let mut engine = CorrelationEngine::new(backend.clone());
            engine.init().unwrap();
        }
        {
            let _never_initialized = CorrelationEngine::new(backend.clone());
        }
        assert_eq!(backend.created.load(Ordering::SeqCst), 2);
        assert_eq!(backend.destroyed.load(Ordering::SeqCst), 2);
    }
}
