//! Alert emission collaborator.

use crossbeam_channel::{Sender, TrySendError};
use tracing::{trace, warn};

use crate::tracker::AlertTone;

/// Receives a tone every time the alert gate fires. Emission itself (audio,
/// haptics) happens outside the core.
pub trait AlertSink: Send {
    fn emit(&mut self, tone: AlertTone);
}

/// Sink that only logs the alert.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogAlertSink;

impl AlertSink for LogAlertSink {
    fn emit(&mut self, tone: AlertTone) {
        warn!(
            intensity = tone.intensity,
            duration_ms = tone.duration.as_millis() as u64,
            "collision warning"
        );
    }
}

/// Forwards tones to another thread. A full or closed channel drops the tone;
/// the next fire comes at most one cooldown later.
impl AlertSink for Sender<AlertTone> {
    fn emit(&mut self, tone: AlertTone) {
        match self.try_send(tone) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => trace!("alert channel full, tone dropped"),
            Err(TrySendError::Disconnected(_)) => trace!("alert receiver gone, tone dropped"),
        }
    }
}
