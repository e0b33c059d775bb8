//! Trait for object detection backends.

use std::convert::Infallible;

use crate::frame::FrameSample;
use crate::tracker::RecognizedObject;

/// Periodic, expensive object detection on a whole frame.
///
/// Returned objects carry boxes in frame pixel coordinates and no track id.
/// Any closure `FnMut(&FrameSample) -> Vec<RecognizedObject>` is a detector.
///
/// # Example
///
/// ```ignore
/// use dashtrack::{Detector, FrameSample, RecognizedObject};
///
/// struct MyModel { /* interpreter, labels */ }
///
/// impl Detector for MyModel {
///     type Error = std::io::Error;
///
///     fn detect(&mut self, frame: &FrameSample) -> Result<Vec<RecognizedObject>, Self::Error> {
///         // Run inference on frame.pixels()
///         Ok(vec![])
///     }
/// }
/// ```
pub trait Detector: Send {
    type Error: std::error::Error + Send + Sync + 'static;

    fn detect(&mut self, frame: &FrameSample) -> Result<Vec<RecognizedObject>, Self::Error>;
}

impl<F> Detector for F
where
    F: FnMut(&FrameSample) -> Vec<RecognizedObject> + Send,
{
    type Error = Infallible;

    fn detect(&mut self, frame: &FrameSample) -> Result<Vec<RecognizedObject>, Infallible> {
        Ok(self(frame))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;
    use crate::tracker::BoundingBox;

    #[test]
    fn test_closures_are_detectors() {
        let mut calls = 0;
        let mut detector = |_: &FrameSample| {
            calls += 1;
            vec![RecognizedObject::new(
                "car",
                "Car",
                0.7,
                BoundingBox::new(0.0, 0.0, 10.0, 10.0),
            )]
        };
        let frame = FrameSample::from_rgb(vec![0u8; 12], 2, 2, 6, Instant::now());

        let found = detector.detect(&frame).unwrap();
        assert_eq!(found.len(), 1);
        drop(detector);
        assert_eq!(calls, 1);
    }
}
