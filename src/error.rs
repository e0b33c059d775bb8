//! Error types for the tracking core.

use std::path::PathBuf;

use crate::engine::SeedToken;
use crate::tracker::TrackId;

/// Contract violations between the registry, the engine wrapper and the
/// correlation backend.
///
/// Every variant is fatal for the running session: the caller releases the
/// engine and stops the worker instead of carrying on with a track set whose
/// identities can no longer be trusted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TrackingError {
    #[error("correlation engine used before init")]
    EngineNotInitialized,

    #[error("correlation engine used after free")]
    EngineFreed,

    #[error("seed returned track {track_id} for unknown correlation token {token}")]
    UnknownSeedToken { track_id: TrackId, token: SeedToken },

    #[error("seed returned correlation token {token} more than once")]
    DuplicateSeedToken { token: SeedToken },

    #[error("seed assigned track {0} to more than one box")]
    DuplicateTrackId(TrackId),
}

/// A captured frame that cannot be processed. The cycle is skipped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    #[error("frame has no pixels ({width}x{height})")]
    Empty { width: u32, height: u32 },

    #[error("row stride {stride} is shorter than a packed row of {row} bytes")]
    StrideTooShort { stride: usize, row: usize },

    #[error("pixel buffer holds {actual} bytes, expected at least {expected}")]
    Truncated { expected: usize, actual: usize },
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("failed to spawn inference worker")]
    Spawn(#[source] std::io::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
