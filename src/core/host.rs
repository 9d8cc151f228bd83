//! Host wiring
//!
//! Builds the privilege context and the native OS collaborators once at
//! startup. Everything downstream receives them explicitly.

use std::sync::Arc;

use crate::core::admin::AdminContext;
use crate::core::config::{AppConfig, ConfigError};
use crate::error::ReclaimError;
use crate::platform::ensure_supported_platform;
use crate::reclaim::{Collaborators, ReclamationEngine};
use crate::telemetry::{RingBuffer, TelemetrySampler};

pub struct Host {
    pub admin: AdminContext,
    pub collaborators: Collaborators,
}

impl Host {
    pub fn new(admin: AdminContext, collaborators: Collaborators) -> Self {
        Self {
            admin,
            collaborators,
        }
    }

    /// Refuses to start anywhere but Windows.
    pub fn detect() -> Result<Self, ReclaimError> {
        ensure_supported_platform()?;
        Self::native()
    }

    #[cfg(windows)]
    fn native() -> Result<Self, ReclaimError> {
        use crate::platform::win32::{ScmServiceControl, Win32ProcessControl, Win32RegistryReader};
        use crate::platform::{StdFileSystem, SystemCommandRunner};
        use crate::telemetry::SysinfoProvider;

        let collaborators = Collaborators {
            provider: Arc::new(SysinfoProvider::new()),
            fs: Arc::new(StdFileSystem),
            commands: Arc::new(SystemCommandRunner),
            processes: Arc::new(Win32ProcessControl),
            services: Arc::new(ScmServiceControl),
            registry: Arc::new(Win32RegistryReader),
        };
        Ok(Self::new(AdminContext::detect(), collaborators))
    }

    #[cfg(not(windows))]
    fn native() -> Result<Self, ReclaimError> {
        Err(ReclaimError::UnsupportedPlatform {
            os: crate::platform::platform_name().to_string(),
        })
    }

    pub fn engine(&self, config: &AppConfig) -> ReclamationEngine {
        ReclamationEngine::new(self.collaborators.clone(), &config.reclaim, self.admin)
    }

    pub fn sampler(&self, config: &AppConfig) -> TelemetrySampler {
        TelemetrySampler::new(
            Arc::clone(&self.collaborators.provider),
            config.sampling.disk_path(),
        )
    }

    pub fn ring_buffer(&self, config: &AppConfig) -> Result<RingBuffer, ConfigError> {
        RingBuffer::from_window(config.sampling.window(), config.sampling.interval())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reclaim::{CancelFlag, StepKind};
    use crate::testing::{
        FakeFileSystem, FakeProvider, FakeRegistry, FakeRunner, FakeServices,
        TrackingProcessControl,
    };

    fn fake_host() -> Host {
        Host::new(
            AdminContext::new(false),
            Collaborators {
                provider: Arc::new(FakeProvider::healthy()),
                fs: Arc::new(FakeFileSystem::default()),
                commands: Arc::new(FakeRunner::succeeding()),
                processes: Arc::new(TrackingProcessControl::default()),
                services: Arc::new(FakeServices::default()),
                registry: Arc::new(FakeRegistry::default()),
            },
        )
    }

    #[cfg(not(windows))]
    #[test]
    fn test_detect_refuses_non_windows() {
        assert!(matches!(
            Host::detect(),
            Err(ReclaimError::UnsupportedPlatform { .. })
        ));
    }

    #[test]
    fn test_builds_pipeline_from_config() {
        let host = fake_host();
        let config = AppConfig::default();

        let buffer = host.ring_buffer(&config).unwrap();
        assert_eq!(buffer.capacity(), 360);

        let sample = host.sampler(&config).sample().unwrap();
        assert_eq!(sample.cpu_percent, 25.0);

        let report = host
            .engine(&config)
            .run_step(StepKind::FlushDnsCache, &CancelFlag::new());
        assert!(report.succeeded);
    }
}
