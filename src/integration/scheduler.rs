//! Single-worker, drop-latest execution of frame jobs.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use tracing::{error, info, trace};

use crate::error::{FrameError, SessionError, TrackingError};
use crate::frame::FrameSample;

/// Work run on the inference thread, one frame at a time.
pub trait FrameJob: Send + 'static {
    /// Process one frame. An error is fatal and stops the worker.
    fn run(&mut self, frame: FrameSample) -> Result<(), TrackingError>;

    /// Called on the worker thread after a failed or panicking `run`, before
    /// `shutdown`. Discard any state that came from the failed session.
    fn abort(&mut self) {}

    /// Called once on the worker thread before it exits.
    fn shutdown(&mut self) {}
}

/// Result of offering a frame to the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// The worker was idle and took the frame.
    Accepted,
    /// The worker was busy; the frame was discarded.
    Dropped,
    /// The frame failed validation and was never offered.
    Rejected(FrameError),
    /// The worker has stopped.
    Closed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    pub accepted: u64,
    pub dropped: u64,
    pub completed: u64,
}

#[derive(Debug, Default)]
struct Shared {
    busy: AtomicBool,
    running: AtomicBool,
    failed: AtomicBool,
    accepted: AtomicU64,
    dropped: AtomicU64,
    completed: AtomicU64,
}

/// One background worker with a busy gate in front of it.
///
/// A frame offered while the worker is busy is dropped rather than queued,
/// so the worker always picks up the newest frame and the producer never
/// waits. Shutdown signals the worker, abandons work that has not started and
/// joins the thread.
pub struct InferenceScheduler {
    shared: Arc<Shared>,
    tx: Option<Sender<FrameSample>>,
    handle: Option<JoinHandle<()>>,
}

impl InferenceScheduler {
    pub fn start<J: FrameJob>(thread_name: &str, job: J) -> Result<Self, SessionError> {
        let (tx, rx) = bounded::<FrameSample>(1);
        let shared = Arc::new(Shared::default());
        shared.running.store(true, Ordering::Release);

        let worker_shared = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name(thread_name.to_string())
            .spawn(move || run_worker(job, rx, worker_shared))
            .map_err(SessionError::Spawn)?;

        info!(thread = thread_name, "inference worker started");
        Ok(Self {
            shared,
            tx: Some(tx),
            handle: Some(handle),
        })
    }

    /// Offer a frame without blocking.
    pub fn try_submit(&self, frame: FrameSample) -> Submission {
        let Some(tx) = &self.tx else {
            return Submission::Closed;
        };
        if !self.shared.running.load(Ordering::Acquire) {
            return Submission::Closed;
        }
        if self
            .shared
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            self.shared.dropped.fetch_add(1, Ordering::Relaxed);
            trace!("worker busy, frame dropped");
            return Submission::Dropped;
        }

        match tx.try_send(frame) {
            Ok(()) => {
                self.shared.accepted.fetch_add(1, Ordering::Relaxed);
                Submission::Accepted
            }
            // The slot still holds a frame the worker will clear busy for.
            Err(TrySendError::Full(_)) => {
                self.shared.dropped.fetch_add(1, Ordering::Relaxed);
                Submission::Dropped
            }
            Err(TrySendError::Disconnected(_)) => {
                self.shared.busy.store(false, Ordering::Release);
                Submission::Closed
            }
        }
    }

    pub fn is_busy(&self) -> bool {
        self.shared.busy.load(Ordering::Acquire)
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    /// Whether the worker stopped on a fatal error.
    pub fn is_failed(&self) -> bool {
        self.shared.failed.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> SchedulerStats {
        SchedulerStats {
            accepted: self.shared.accepted.load(Ordering::Relaxed),
            dropped: self.shared.dropped.load(Ordering::Relaxed),
            completed: self.shared.completed.load(Ordering::Relaxed),
        }
    }

    /// Stop the worker and wait for it. An in-progress job runs to completion;
    /// a queued one is abandoned.
    pub fn shutdown(&mut self) {
        self.shared.running.store(false, Ordering::Release);
        self.tx.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("inference worker panicked during shutdown");
            }
        }
    }
}

impl Drop for InferenceScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_worker<J: FrameJob>(mut job: J, rx: Receiver<FrameSample>, shared: Arc<Shared>) {
    while let Ok(frame) = rx.recv() {
        if !shared.running.load(Ordering::Acquire) {
            break;
        }

        let result = panic::catch_unwind(AssertUnwindSafe(|| job.run(frame)));
        shared.completed.fetch_add(1, Ordering::Relaxed);

        let failure = match result {
            Ok(Ok(())) => None,
            Ok(Err(err)) => Some(err.to_string()),
            Err(payload) => Some(panic_message(payload.as_ref())),
        };
        if let Some(reason) = failure {
            error!(%reason, "fatal tracking error, ending session");
            job.abort();
            shared.running.store(false, Ordering::Release);
            shared.failed.store(true, Ordering::Release);
            shared.busy.store(false, Ordering::Release);
            break;
        }
        shared.busy.store(false, Ordering::Release);
    }

    job.shutdown();
    shared.busy.store(false, Ordering::Release);
    info!("inference worker stopped");
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("job panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("job panicked: {s}")
    } else {
        "job panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use crossbeam_channel::Receiver;

    use super::*;

    /// Job that reports each frame and then waits for permission to finish.
    struct GatedJob {
        started: Sender<u8>,
        release: Receiver<Result<(), TrackingError>>,
        lifecycle: Sender<&'static str>,
    }

    impl FrameJob for GatedJob {
        fn run(&mut self, frame: FrameSample) -> Result<(), TrackingError> {
            let _ = self.started.send(frame.pixels()[0]);
            self.release.recv().unwrap_or(Ok(()))
        }

        fn abort(&mut self) {
            let _ = self.lifecycle.send("abort");
        }

        fn shutdown(&mut self) {
            let _ = self.lifecycle.send("shutdown");
        }
    }

    struct Harness {
        scheduler: InferenceScheduler,
        started: Receiver<u8>,
        release: Sender<Result<(), TrackingError>>,
        lifecycle: Receiver<&'static str>,
    }

    fn harness() -> Harness {
        let (started_tx, started) = crossbeam_channel::unbounded();
        let (release, release_rx) = crossbeam_channel::unbounded();
        let (lifecycle_tx, lifecycle) = crossbeam_channel::unbounded();
        let scheduler = InferenceScheduler::start(
            "test-inference",
            GatedJob {
                started: started_tx,
                release: release_rx,
                lifecycle: lifecycle_tx,
            },
        )
        .unwrap();
        Harness {
            scheduler,
            started,
            release,
            lifecycle,
        }
    }

    fn frame(tag: u8) -> FrameSample {
        FrameSample::from_rgb(vec![tag; 12], 2, 2, 6, Instant::now())
    }

    fn wait_idle(scheduler: &InferenceScheduler) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while scheduler.is_busy() {
            assert!(Instant::now() < deadline, "worker never went idle");
            thread::yield_now();
        }
    }

    #[test]
    fn test_busy_worker_drops_frames() {
        let h = harness();
        assert_eq!(h.scheduler.try_submit(frame(1)), Submission::Accepted);
        assert_eq!(h.started.recv().unwrap(), 1);

        assert_eq!(h.scheduler.try_submit(frame(2)), Submission::Dropped);
        assert_eq!(h.scheduler.try_submit(frame(3)), Submission::Dropped);

        h.release.send(Ok(())).unwrap();
        wait_idle(&h.scheduler);

        assert_eq!(h.scheduler.try_submit(frame(4)), Submission::Accepted);
        assert_eq!(h.started.recv().unwrap(), 4);
        h.release.send(Ok(())).unwrap();
        wait_idle(&h.scheduler);

        assert_eq!(
            h.scheduler.stats(),
            SchedulerStats {
                accepted: 2,
                dropped: 2,
                completed: 2
            }
        );
    }

    #[test]
    fn test_shutdown_joins_and_closes() {
        let mut h = harness();
        h.scheduler.shutdown();

        assert!(!h.scheduler.is_running());
        assert_eq!(h.scheduler.try_submit(frame(1)), Submission::Closed);
        assert_eq!(h.lifecycle.try_recv().unwrap(), "shutdown");
        assert!(h.lifecycle.try_recv().is_err());
    }

    #[test]
    fn test_fatal_job_error_stops_worker() {
        let mut h = harness();
        assert_eq!(h.scheduler.try_submit(frame(1)), Submission::Accepted);
        h.started.recv().unwrap();
        h.release.send(Err(TrackingError::EngineFreed)).unwrap();

        let timeout = Duration::from_secs(5);
        assert_eq!(h.lifecycle.recv_timeout(timeout).unwrap(), "abort");
        assert_eq!(h.lifecycle.recv_timeout(timeout).unwrap(), "shutdown");
        assert!(h.scheduler.is_failed());
        assert!(!h.scheduler.is_running());
        assert_eq!(h.scheduler.try_submit(frame(2)), Submission::Closed);
        h.scheduler.shutdown();
    }

    struct PanickingJob;

    impl FrameJob for PanickingJob {
        fn run(&mut self, _frame: FrameSample) -> Result<(), TrackingError> {
            panic!("native layer crashed");
        }
    }

    #[test]
    fn test_panicking_job_is_fatal() {
        let mut scheduler = InferenceScheduler::start("test-panic", PanickingJob).unwrap();
        assert_eq!(scheduler.try_submit(frame(1)), Submission::Accepted);

        let deadline = Instant::now() + Duration::from_secs(5);
        while !scheduler.is_failed() {
            assert!(Instant::now() < deadline, "worker never failed");
            thread::yield_now();
        }
        scheduler.shutdown();
        assert_eq!(scheduler.try_submit(frame(2)), Submission::Closed);
    }
}
