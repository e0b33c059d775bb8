mod alert;
mod recognition;
mod rect;
mod registry;

pub use alert::{AlertGate, AlertTone};
pub use recognition::{RecognizedObject, TrackId, TrackSnapshot};
pub use rect::{BoundingBox, Rect, iou_batch};
pub use registry::TrackRegistry;
