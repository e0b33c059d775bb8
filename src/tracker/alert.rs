//! Debounced collision warning.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::AlertConfig;

/// Intensity/duration pair handed to the alert emitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertTone {
    pub intensity: u32,
    pub duration: Duration,
}

/// Rate limiter between the engine's danger flag and the alert channel.
///
/// Fires iff the speed is above `min_speed`, the last observed danger state is
/// true and at least `cooldown` has passed since the previous fire.
#[derive(Debug, Clone)]
pub struct AlertGate {
    config: AlertConfig,
    danger: bool,
    last_fire: Option<Instant>,
}

impl AlertGate {
    pub fn new(config: AlertConfig) -> Self {
        Self {
            config,
            danger: false,
            last_fire: None,
        }
    }

    /// Record the engine's latest danger answer.
    pub fn observe_danger(&mut self, dangerous: bool) {
        self.danger = dangerous;
    }

    pub fn is_danger(&self) -> bool {
        self.danger
    }

    pub fn evaluate(&mut self, speed: f64) -> bool {
        self.evaluate_at(speed, Instant::now())
    }

    /// [`evaluate`](Self::evaluate) against an explicit clock reading.
    pub fn evaluate_at(&mut self, speed: f64, now: Instant) -> bool {
        if !(speed > self.config.min_speed && self.danger) {
            return false;
        }
        let cooled = self
            .last_fire
            .is_none_or(|last| now.saturating_duration_since(last) >= self.config.cooldown());
        if !cooled {
            return false;
        }
        self.last_fire = Some(now);
        info!(speed, "collision alert");
        true
    }

    pub fn last_fire(&self) -> Option<Instant> {
        self.last_fire
    }

    pub fn tone(&self) -> AlertTone {
        AlertTone {
            intensity: self.config.tone_intensity,
            duration: Duration::from_millis(self.config.tone_duration_ms),
        }
    }
}
