//! Station error types.

use gabarito_core::ConfigError;
use thiserror::Error;

use crate::storage::StorageError;

/// Errors that stop the station from starting or running.
///
/// Storage failures after boot are not fatal; the kiosk degrades instead.
#[derive(Debug, Error)]
pub enum StationError {
    /// Invalid kiosk or station configuration.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Device polling interval of zero.
    #[error("tick interval must be non-zero")]
    ZeroTick,

    /// Storage backend could not be opened.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Console or bench feed I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Bench feed line not understood.
    #[error("bad feed line {line:?}: {reason}")]
    Feed {
        /// Offending line.
        line: String,
        /// What was wrong with it.
        reason: String,
    },
}
