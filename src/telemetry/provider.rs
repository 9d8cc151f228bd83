//! System telemetry provider backed by `sysinfo`

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use sysinfo::{Components, Disks, ProcessesToUpdate, System};

/// A reading that could not be taken.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TelemetryError {
    #[error("{0} reading unavailable")]
    Unavailable(&'static str),

    #[error("no mounted volume contains {0}")]
    DiskNotFound(PathBuf),
}

/// Physical memory totals in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryStats {
    pub total_bytes: u64,
    pub available_bytes: u64,
}

impl MemoryStats {
    pub fn used_bytes(&self) -> u64 {
        self.total_bytes.saturating_sub(self.available_bytes)
    }

    /// Percentage of physical memory in use (0-100).
    pub fn load_percent(&self) -> f64 {
        if self.total_bytes == 0 {
            return 0.0;
        }
        self.used_bytes() as f64 / self.total_bytes as f64 * 100.0
    }
}

/// A live process as seen by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessEntry {
    pub pid: u32,
    pub name: String,
}

/// Source of raw machine readings.
///
/// Temperature is the only optional reading: `None` means no sensor could be
/// read, whatever the cause. Every other failure is an error.
pub trait TelemetryProvider: Send + Sync {
    /// Global CPU load since the previous call (0-100).
    fn cpu_percent(&self) -> Result<f32, TelemetryError>;

    fn memory_stats(&self) -> Result<MemoryStats, TelemetryError>;

    /// Free bytes on the volume containing `path`.
    fn disk_free(&self, path: &Path) -> Result<u64, TelemetryError>;

    fn temperature(&self) -> Option<f32>;

    fn list_processes(&self) -> Result<Vec<ProcessEntry>, TelemetryError>;
}

/// [`TelemetryProvider`] reading through `sysinfo`.
///
/// Keeps one `System` across calls so CPU usage is computed against the
/// previous refresh, like a non-blocking `cpu_percent` poll. Process listing
/// has its own `System`, so a full process refresh during a cleanup pass never
/// holds up a concurrent sample.
pub struct SysinfoProvider {
    system: Mutex<System>,
    processes: Mutex<System>,
}

impl SysinfoProvider {
    pub fn new() -> Self {
        let mut system = System::new();
        system.refresh_cpu_usage();
        Self {
            system: Mutex::new(system),
            processes: Mutex::new(System::new()),
        }
    }

    fn system(&self) -> MutexGuard<'_, System> {
        self.system.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn process_table(&self) -> MutexGuard<'_, System> {
        self.processes.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for SysinfoProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl TelemetryProvider for SysinfoProvider {
    fn cpu_percent(&self) -> Result<f32, TelemetryError> {
        let mut sys = self.system();
        sys.refresh_cpu_usage();
        if sys.cpus().is_empty() {
            return Err(TelemetryError::Unavailable("cpu"));
        }
        Ok(sys.global_cpu_usage())
    }

    fn memory_stats(&self) -> Result<MemoryStats, TelemetryError> {
        let mut sys = self.system();
        sys.refresh_memory();
        let total = sys.total_memory();
        if total == 0 {
            return Err(TelemetryError::Unavailable("memory"));
        }
        Ok(MemoryStats {
            total_bytes: total,
            available_bytes: sys.available_memory(),
        })
    }

    fn disk_free(&self, path: &Path) -> Result<u64, TelemetryError> {
        let disks = Disks::new_with_refreshed_list();
        disks
            .list()
            .iter()
            .filter(|disk| path.starts_with(disk.mount_point()))
            .max_by_key(|disk| disk.mount_point().as_os_str().len())
            .map(|disk| disk.available_space())
            .ok_or_else(|| TelemetryError::DiskNotFound(path.to_path_buf()))
    }

    fn temperature(&self) -> Option<f32> {
        let components = Components::new_with_refreshed_list();
        let readings: Vec<(String, f32)> = components
            .iter()
            .filter_map(|c| c.temperature().map(|t| (c.label().to_lowercase(), t)))
            .filter(|(_, t)| t.is_finite() && *t > 0.0)
            .collect();
        hottest_cpu_reading(&readings)
    }

    fn list_processes(&self) -> Result<Vec<ProcessEntry>, TelemetryError> {
        let mut sys = self.process_table();
        sys.refresh_processes(ProcessesToUpdate::All, true);
        let processes: Vec<ProcessEntry> = sys
            .processes()
            .iter()
            .map(|(pid, process)| ProcessEntry {
                pid: pid.as_u32(),
                name: process.name().to_string_lossy().to_string(),
            })
            .collect();
        if processes.is_empty() {
            return Err(TelemetryError::Unavailable("process list"));
        }
        Ok(processes)
    }
}

/// Hottest CPU-labelled sensor, else the hottest sensor of any kind.
fn hottest_cpu_reading(readings: &[(String, f32)]) -> Option<f32> {
    let is_cpu = |label: &str| {
        ["cpu", "core", "package", "tctl", "tdie"]
            .iter()
            .any(|k| label.contains(k))
    };

    max_reading(readings.iter().filter(|(l, _)| is_cpu(l)).map(|(_, t)| *t))
        .or_else(|| max_reading(readings.iter().map(|(_, t)| *t)))
}

fn max_reading(values: impl Iterator<Item = f32>) -> Option<f32> {
    values.fold(None, |acc, t| Some(acc.map_or(t, |prev: f32| prev.max(t))))
}
