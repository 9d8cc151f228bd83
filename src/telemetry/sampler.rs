//! Sample acquisition and derived plotting bounds

use chrono::{DateTime, Duration as ChronoDuration, Local};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::warn;

use super::provider::{TelemetryError, TelemetryProvider};
use super::sample::Sample;

pub const DEFAULT_PAD_FRACTION: f64 = 0.10;
pub const DEFAULT_MIN_PAD: f64 = 1.0;

/// Builds [`Sample`]s from a [`TelemetryProvider`].
pub struct TelemetrySampler {
    provider: Arc<dyn TelemetryProvider>,
    disk_path: PathBuf,
}

impl TelemetrySampler {
    pub fn new(provider: Arc<dyn TelemetryProvider>, disk_path: impl Into<PathBuf>) -> Self {
        Self {
            provider,
            disk_path: disk_path.into(),
        }
    }

    pub fn disk_path(&self) -> &Path {
        &self.disk_path
    }

    /// Take one reading of every metric.
    ///
    /// All four readings are attempted before any failure is acted on.
    /// A missing temperature is normal; a failed CPU, memory or disk reading
    /// fails the whole sample.
    pub fn sample(&self) -> Result<Sample, TelemetryError> {
        let timestamp = Local::now();
        let cpu = self.provider.cpu_percent();
        let memory = self.provider.memory_stats();
        let disk = self.provider.disk_free(&self.disk_path);
        let temperature_celsius = self.provider.temperature();

        for err in [cpu.as_ref().err(), memory.as_ref().err(), disk.as_ref().err()]
            .into_iter()
            .flatten()
        {
            warn!("Sample reading failed: {}", err);
        }

        Ok(Sample {
            timestamp,
            cpu_percent: cpu?,
            ram_available_bytes: memory?.available_bytes,
            disk_free_bytes: disk?,
            temperature_celsius,
        })
    }
}

/// Padded `(low, high)` bounds for plotting `values`.
///
/// `pad = max((max - min) * pad_fraction, min_pad)`; the low bound never
/// goes below zero. An empty series yields `(0, 1)`.
pub fn axis_bounds(values: &[f64], pad_fraction: f64, min_pad: f64) -> (f64, f64) {
    let finite = values.iter().copied().filter(|v| v.is_finite());
    let (lo, hi) = finite.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if lo > hi {
        return (0.0, 1.0);
    }
    let pad = ((hi - lo) * pad_fraction).max(min_pad);
    ((lo - pad).max(0.0), hi + pad)
}

/// [`axis_bounds`] with 10% padding and a minimum pad of 1.
pub fn axis_bounds_default(values: &[f64]) -> (f64, f64) {
    axis_bounds(values, DEFAULT_PAD_FRACTION, DEFAULT_MIN_PAD)
}

/// Time span covered by `samples`; a single sample gets one second either side.
pub fn time_bounds(samples: &[Sample]) -> Option<(DateTime<Local>, DateTime<Local>)> {
    match samples {
        [] => None,
        [only] => {
            let pad = ChronoDuration::seconds(1);
            Some((only.timestamp - pad, only.timestamp + pad))
        }
        [first, .., last] => Some((first.timestamp, last.timestamp)),
    }
}
