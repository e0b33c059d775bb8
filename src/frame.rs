//! Camera frames and the double-slot store that hands them to the worker.

mod sample;
mod store;

pub use sample::FrameSample;
pub use store::FrameStore;
