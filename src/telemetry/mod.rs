//! Telemetry sampling pipeline
//!
//! `TelemetryProvider` → `TelemetrySampler` → `RingBuffer` → snapshot readers.

pub mod provider;
pub mod ring;
pub mod sample;
pub mod sampler;

pub use provider::{MemoryStats, ProcessEntry, SysinfoProvider, TelemetryError, TelemetryProvider};
pub use ring::RingBuffer;
pub use sample::Sample;
pub use sampler::{axis_bounds, axis_bounds_default, time_bounds, TelemetrySampler};
