//! memsweep
//!
//! Resource telemetry sampler and best-effort memory reclamation for Windows.
//!
//! ## Features
//!
//! - **Telemetry**: periodic CPU, RAM, disk and temperature samples kept in a
//!   bounded time window
//! - **Reclamation**: DNS flush, temp purge, working set trim, startup entry
//!   review, optional service suspension and standby list clearing
//! - **Reports**: every step reports what it touched and what it could not
//! - **Live monitor**: text dashboard fed from snapshots of the sample window
//!
//! ## Safety
//!
//! - Privileged steps are skipped, not attempted, without elevation
//! - Only one reclamation pass runs at a time
//! - Startup entries are listed, never modified

pub mod core;
pub mod error;
pub mod monitor;
pub mod platform;
pub mod reclaim;
pub mod telemetry;

#[cfg(test)]
pub(crate) mod testing;

// Re-exports
pub use crate::core::{AdminContext, AppConfig, ConfigError, Host};
pub use error::{ReclaimError, Result};
pub use monitor::{Coordinator, ReclamationEvent, SamplingHandle};
pub use reclaim::{CancelFlag, CleanupReport, ReclamationEngine, StepKind, StepReport};
pub use telemetry::{RingBuffer, Sample, TelemetryProvider, TelemetrySampler};
