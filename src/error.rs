//! Top-level error type
//!
//! Only construction-time and startup failures end up here. Everything that
//! happens inside a reclamation step is captured in its report instead.

use crate::core::config::ConfigError;
use crate::telemetry::TelemetryError;

#[derive(Debug, thiserror::Error)]
pub enum ReclaimError {
    /// Invalid sampling or reclamation configuration
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The host is not the operating system this tool drives
    #[error("unsupported platform '{os}': only Windows is supported")]
    UnsupportedPlatform { os: String },

    /// Another reclamation pass is still running
    #[error("a reclamation pass is already in progress")]
    ReclamationInProgress,

    /// A telemetry reading failed outside of the sampling loop
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),

    /// The blocking worker running a pass panicked or was cancelled
    #[error("reclamation worker failed: {0}")]
    Worker(String),
}

pub type Result<T> = std::result::Result<T, ReclaimError>;
