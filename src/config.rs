//! Pipeline configuration.
//!
//! Every section has defaults matching the dashboard behaviour, so an empty
//! JSON object is a valid config. Use [`PipelineConfig::load`] to read one
//! from disk.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub tracking: TrackingConfig,
    pub alert: AlertConfig,
    pub scheduler: SchedulerConfig,
    pub motion: MotionConfig,
}

/// Registry-side reconciliation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// Detections narrower or shorter than this (pixels) are never seeded.
    pub min_box_side: f32,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self { min_box_side: 2.0 }
    }
}

/// Collision alert debounce settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Alerts only fire strictly above this speed (km/h).
    pub min_speed: f64,
    /// Minimum time between two fires.
    pub cooldown_ms: u64,
    pub tone_intensity: u32,
    pub tone_duration_ms: u64,
}

impl AlertConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            min_speed: 10.0,
            cooldown_ms: 300,
            tone_intensity: 150,
            tone_duration_ms: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// A detection pass runs on every Nth accepted frame, starting with the first.
    pub detection_interval: u32,
    pub thread_name: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            detection_interval: 10,
            thread_name: "inference".to_string(),
        }
    }
}

/// Parameters of the built-in [`MotionBackend`](crate::engine::MotionBackend).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    /// Minimum IoU for a seeded box to inherit an existing track id.
    pub match_iou: f32,
    /// Tracks are lost after this many advances without a re-seed.
    pub max_coast_frames: u32,
    /// Box height, as a fraction of frame height, from which a track in the
    /// corridor counts as dangerous.
    pub danger_height_ratio: f32,
    /// Width of the central corridor as a fraction of frame width.
    pub danger_corridor: f32,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            match_iou: 0.3,
            max_coast_frames: 30,
            danger_height_ratio: 0.4,
            danger_corridor: 0.5,
        }
    }
}

impl PipelineConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.tracking.min_box_side >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "tracking.min_box_side must be non-negative, got {}",
                self.tracking.min_box_side
            )));
        }
        if !self.alert.min_speed.is_finite() {
            return Err(ConfigError::Invalid(format!(
                "alert.min_speed must be finite, got {}",
                self.alert.min_speed
            )));
        }
        if self.scheduler.detection_interval == 0 {
            return Err(ConfigError::Invalid(
                "scheduler.detection_interval must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.motion.match_iou) {
            return Err(ConfigError::Invalid(format!(
                "motion.match_iou must lie in [0, 1], got {}",
                self.motion.match_iou
            )));
        }
        if !(0.0..=1.0).contains(&self.motion.danger_height_ratio) {
            return Err(ConfigError::Invalid(format!(
                "motion.danger_height_ratio must lie in [0, 1], got {}",
                self.motion.danger_height_ratio
            )));
        }
        if !(0.0..=1.0).contains(&self.motion.danger_corridor) {
            return Err(ConfigError::Invalid(format!(
                "motion.danger_corridor must lie in [0, 1], got {}",
                self.motion.danger_corridor
            )));
        }
        Ok(())
    }
}
