//! Builder for creating `RecognizedObject`s from detector outputs.

use crate::tracker::{BoundingBox, RecognizedObject};

/// Builds [`RecognizedObject`]s from the box formats detectors commonly emit.
#[derive(Debug, Clone, Default)]
pub struct RecognitionBuilder {
    label: String,
    display_name: Option<String>,
    confidence: f32,
    location: BoundingBox,
}

impl RecognitionBuilder {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Self::default()
        }
    }

    /// Human-readable name; defaults to the label.
    pub fn display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    /// Box as left, top, right, bottom.
    pub fn ltrb(mut self, left: f32, top: f32, right: f32, bottom: f32) -> Self {
        self.location = BoundingBox::new(left, top, right, bottom);
        self
    }

    /// Box as center x, center y, width, height.
    pub fn xywh(mut self, cx: f32, cy: f32, w: f32, h: f32) -> Self {
        self.location = BoundingBox::new(cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0);
        self
    }

    /// Box as left, top, width, height.
    pub fn ltwh(mut self, left: f32, top: f32, w: f32, h: f32) -> Self {
        self.location = BoundingBox::new(left, top, left + w, top + h);
        self
    }

    /// Box normalized to `[0, 1]`, scaled to a `width` x `height` frame.
    pub fn normalized_ltrb(
        self,
        left: f32,
        top: f32,
        right: f32,
        bottom: f32,
        width: u32,
        height: u32,
    ) -> Self {
        let (w, h) = (width as f32, height as f32);
        self.ltrb(left * w, top * h, right * w, bottom * h)
    }

    pub fn build(self) -> RecognizedObject {
        let display_name = self.display_name.unwrap_or_else(|| self.label.clone());
        RecognizedObject::new(self.label, display_name, self.confidence, self.location)
    }
}
