//! Configuration for the sampler and the reclamation engine

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::platform::{RegistryHive, RegistryLocation};

/// Errors raised while building or loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("sampling interval must be greater than zero")]
    ZeroInterval,

    #[error("sampling window ({window_secs}s) is shorter than the interval ({interval_secs}s)")]
    WindowTooShort { window_secs: u64, interval_secs: u64 },

    #[error("ring buffer capacity must be greater than zero")]
    ZeroCapacity,

    #[error("window holds {capacity} samples, more than the limit of {max}")]
    WindowTooLong { capacity: u128, max: usize },

    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write config {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub sampling: SamplingConfig,
    pub reclaim: ReclaimConfig,
    /// Default log filter when `RUST_LOG` is unset
    pub log_level: String,
}

/// Telemetry sampling cadence and retention
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    /// Seconds between two samples
    pub interval_secs: u64,

    /// Seconds of history kept in the ring buffer
    pub window_secs: u64,

    /// Volume whose free space is sampled (system drive when unset)
    pub disk_path: Option<PathBuf>,
}

/// Reclamation step settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReclaimConfig {
    /// Directories whose immediate children are purged
    pub temp_roots: Vec<PathBuf>,

    /// Services stopped by the service suspension step
    pub optional_services: Vec<String>,

    /// Auto-start registry keys enumerated by the startup step
    pub startup_locations: Vec<RegistryLocation>,

    /// External standby-list clearing executable
    pub standby_tool: PathBuf,

    /// Pause between two steps of a full pass (milliseconds)
    pub step_pause_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            sampling: SamplingConfig::default(),
            reclaim: ReclaimConfig::default(),
            log_level: "info".into(),
        }
    }
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            interval_secs: 5,
            window_secs: 30 * 60,
            disk_path: None,
        }
    }
}

impl Default for ReclaimConfig {
    fn default() -> Self {
        Self {
            temp_roots: default_temp_roots(),
            optional_services: vec![
                "SysMain".into(),   // Superfetch
                "DiagTrack".into(), // Connected User Experiences and Telemetry
                "WSearch".into(),   // Windows Search
            ],
            startup_locations: default_startup_locations(),
            standby_tool: PathBuf::from("EmptyStandbyList.exe"),
            step_pause_ms: 1_000,
        }
    }
}

impl SamplingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    /// Number of samples that fit in the window.
    pub fn capacity(&self) -> Result<usize, ConfigError> {
        ring_capacity(self.window(), self.interval())
    }

    /// Volume sampled for free disk space.
    pub fn disk_path(&self) -> PathBuf {
        self.disk_path.clone().unwrap_or_else(system_root)
    }
}

impl ReclaimConfig {
    pub fn step_pause(&self) -> Duration {
        Duration::from_millis(self.step_pause_ms)
    }
}

impl AppConfig {
    /// Check every value that would otherwise fail later at construction.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.sampling.capacity().map(|_| ())
    }

    /// Load config from TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from an explicit path, or from the default location if a file
    /// exists there, or fall back to defaults.
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match default_config_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Save config to TOML file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = self.to_toml()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(path, content).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// Most samples a ring buffer may hold; a week of one-second samples fits.
pub const MAX_RING_CAPACITY: usize = 1 << 20;

/// `window / interval`, rejecting configurations that leave no room or that
/// would need an unreasonable amount of memory.
pub fn ring_capacity(window: Duration, interval: Duration) -> Result<usize, ConfigError> {
    if interval.is_zero() {
        return Err(ConfigError::ZeroInterval);
    }
    let capacity = window.as_millis() / interval.as_millis().max(1);
    if capacity == 0 {
        return Err(ConfigError::WindowTooShort {
            window_secs: window.as_secs(),
            interval_secs: interval.as_secs(),
        });
    }
    if capacity > MAX_RING_CAPACITY as u128 {
        return Err(ConfigError::WindowTooLong {
            capacity,
            max: MAX_RING_CAPACITY,
        });
    }
    Ok(capacity as usize)
}

/// `<config dir>/memsweep/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("memsweep").join("config.toml"))
}

/// `%TEMP%`, `%TMP%` and `%WINDIR%\Temp`, without duplicates.
pub fn default_temp_roots() -> Vec<PathBuf> {
    let mut roots: Vec<PathBuf> = Vec::new();
    let candidates = [
        std::env::var_os("TEMP").map(PathBuf::from),
        std::env::var_os("TMP").map(PathBuf::from),
        std::env::var_os("WINDIR").map(|w| PathBuf::from(w).join("Temp")),
    ];
    for path in candidates.into_iter().flatten() {
        if !path.as_os_str().is_empty() && !roots.contains(&path) {
            roots.push(path);
        }
    }
    roots
}

fn default_startup_locations() -> Vec<RegistryLocation> {
    const RUN: &str = r"Software\Microsoft\Windows\CurrentVersion\Run";
    const RUN_ONCE: &str = r"Software\Microsoft\Windows\CurrentVersion\RunOnce";

    [RegistryHive::LocalMachine, RegistryHive::CurrentUser]
        .into_iter()
        .flat_map(|hive| {
            [RUN, RUN_ONCE]
                .into_iter()
                .map(move |path| RegistryLocation::new(hive, path))
        })
        .collect()
}

/// Root of the system drive.
fn system_root() -> PathBuf {
    #[cfg(windows)]
    {
        let drive = std::env::var("SystemDrive").unwrap_or_else(|_| "C:".into());
        PathBuf::from(format!("{}\\", drive))
    }
    #[cfg(not(windows))]
    {
        PathBuf::from("/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_capacity_is_half_hour_of_five_second_samples() {
        let config = AppConfig::default();
        assert_eq!(config.sampling.capacity().unwrap(), 360);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_interval_rejected() {
        let sampling = SamplingConfig {
            interval_secs: 0,
            ..Default::default()
        };
        assert!(matches!(sampling.capacity(), Err(ConfigError::ZeroInterval)));
    }

    #[test]
    fn test_window_beyond_limit_rejected() {
        let sampling = SamplingConfig {
            interval_secs: 1,
            window_secs: u64::MAX,
            ..Default::default()
        };
        assert!(matches!(
            sampling.capacity(),
            Err(ConfigError::WindowTooLong { max: MAX_RING_CAPACITY, .. })
        ));

        let week = SamplingConfig {
            interval_secs: 1,
            window_secs: 7 * 24 * 3600,
            ..Default::default()
        };
        assert_eq!(week.capacity().unwrap(), 604_800);
    }

    #[test]
    fn test_window_shorter_than_interval_rejected() {
        let sampling = SamplingConfig {
            interval_secs: 10,
            window_secs: 5,
            ..Default::default()
        };
        assert!(matches!(
            sampling.capacity(),
            Err(ConfigError::WindowTooShort {
                window_secs: 5,
                interval_secs: 10
            })
        ));
    }

    #[test]
    fn test_default_startup_locations_cover_run_and_run_once() {
        let locations = default_startup_locations();
        assert_eq!(locations.len(), 4);
        assert!(locations
            .iter()
            .any(|l| l.hive == RegistryHive::CurrentUser && l.path.ends_with("RunOnce")));
        assert!(locations
            .iter()
            .any(|l| l.hive == RegistryHive::LocalMachine && l.path.ends_with(r"\Run")));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            log_level = "debug"

            [sampling]
            interval_secs = 2
            "#,
        )
        .unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.sampling.interval_secs, 2);
        assert_eq!(config.sampling.window_secs, 1800);
        assert_eq!(config.reclaim.optional_services.len(), 3);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = AppConfig::default();
        config.sampling.interval_secs = 10;
        config.reclaim.optional_services = vec!["Spooler".into()];
        config.save(&path).unwrap();

        let loaded = AppConfig::load(&path).unwrap();
        assert_eq!(loaded.sampling.interval_secs, 10);
        assert_eq!(loaded.reclaim.optional_services, vec!["Spooler".to_string()]);
        assert_eq!(
            loaded.reclaim.startup_locations,
            config.reclaim.startup_locations
        );
    }

    #[test]
    fn test_load_rejects_invalid_sampling() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[sampling]\ninterval_secs = 0\n").unwrap();
        assert!(matches!(
            AppConfig::load(&path),
            Err(ConfigError::ZeroInterval)
        ));
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.toml");
        assert!(matches!(
            AppConfig::load_or_default(Some(&missing)),
            Err(ConfigError::Read { .. })
        ));
    }
}
