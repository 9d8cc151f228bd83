//! Timestamped telemetry reading

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

/// One bundle of readings taken at `timestamp`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: DateTime<Local>,
    pub ram_available_bytes: u64,
    pub disk_free_bytes: u64,
    pub cpu_percent: f32,
    /// `None` when no temperature sensor could be read
    pub temperature_celsius: Option<f32>,
}

impl Sample {
    pub fn ram_available_gb(&self) -> f64 {
        self.ram_available_bytes as f64 / BYTES_PER_GB
    }

    pub fn disk_free_gb(&self) -> f64 {
        self.disk_free_bytes as f64 / BYTES_PER_GB
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gb_conversions() {
        let sample = Sample {
            timestamp: Local::now(),
            ram_available_bytes: 3 * 1024 * 1024 * 1024,
            disk_free_bytes: 512 * 1024 * 1024,
            cpu_percent: 12.5,
            temperature_celsius: None,
        };
        assert_eq!(sample.ram_available_gb(), 3.0);
        assert_eq!(sample.disk_free_gb(), 0.5);
    }
}
