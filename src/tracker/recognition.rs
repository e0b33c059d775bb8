//! Recognized objects and their track identities.

use serde::{Deserialize, Serialize};

use crate::tracker::rect::BoundingBox;

/// Persistent identity of one physical object across frames.
///
/// Assigned by the correlation engine, distinct from the detected class label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackId(pub u32);

impl std::fmt::Display for TrackId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An object produced by the detector and refined by tracking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognizedObject {
    /// Class identity, not instance identity.
    pub label: String,
    pub display_name: String,
    /// Detector confidence in `[0, 1]`.
    pub confidence: f32,
    pub location: BoundingBox,
    /// `None` until the object is accepted into the correlation engine.
    pub track_id: Option<TrackId>,
}

impl RecognizedObject {
    pub fn new(
        label: impl Into<String>,
        display_name: impl Into<String>,
        confidence: f32,
        location: BoundingBox,
    ) -> Self {
        Self {
            label: label.into(),
            display_name: display_name.into(),
            confidence,
            location,
            track_id: None,
        }
    }

    pub fn is_tracked(&self) -> bool {
        self.track_id.is_some()
    }
}

impl std::fmt::Display for RecognizedObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}] {} ({:.1}%) {}",
            self.label,
            self.display_name,
            self.confidence * 100.0,
            self.location
        )?;
        if let Some(id) = self.track_id {
            write!(f, " {id}")?;
        }
        Ok(())
    }
}

/// Serializable content of a track set, carried across a pause/resume boundary.
///
/// Only the semantic objects are stored. Engine handles never leave the
/// process; a resumed session seeds a fresh engine from these boxes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackSnapshot {
    pub tracks: Vec<RecognizedObject>,
}

impl TrackSnapshot {
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
