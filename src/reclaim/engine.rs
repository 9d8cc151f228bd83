//! Reclamation engine
//!
//! Owns one instance of every step and runs them either individually or as
//! the fixed five-step `clean_all` sequence. A failing step never stops the
//! sequence.

use chrono::Local;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use super::{
    CancelFlag, ClearStandbyList, CleanupReport, EnumerateStartupEntries, FlushDnsCache,
    PurgeTempFiles, ReclamationStep, SkipReason, StepKind, StepReport, SuspendOptionalServices,
    TrimWorkingSets,
};
use crate::core::admin::AdminContext;
use crate::core::config::ReclaimConfig;
use crate::platform::{CommandRunner, FileSystem, ProcessControl, RegistryReader, ServiceControl};
use crate::telemetry::TelemetryProvider;

/// OS collaborators shared by the steps.
#[derive(Clone)]
pub struct Collaborators {
    pub provider: Arc<dyn TelemetryProvider>,
    pub fs: Arc<dyn FileSystem>,
    pub commands: Arc<dyn CommandRunner>,
    pub processes: Arc<dyn ProcessControl>,
    pub services: Arc<dyn ServiceControl>,
    pub registry: Arc<dyn RegistryReader>,
}

pub struct ReclamationEngine {
    flush_dns: FlushDnsCache,
    purge_temp: PurgeTempFiles,
    trim: TrimWorkingSets,
    startup: EnumerateStartupEntries,
    services: SuspendOptionalServices,
    standby: ClearStandbyList,
    provider: Arc<dyn TelemetryProvider>,
    step_pause: Duration,
}

impl ReclamationEngine {
    pub fn new(with: Collaborators, config: &ReclaimConfig, admin: AdminContext) -> Self {
        Self {
            flush_dns: FlushDnsCache::new(Arc::clone(&with.commands)),
            purge_temp: PurgeTempFiles::new(Arc::clone(&with.fs), config.temp_roots.clone()),
            trim: TrimWorkingSets::new(Arc::clone(&with.provider), with.processes),
            startup: EnumerateStartupEntries::new(
                with.registry,
                config.startup_locations.clone(),
                admin,
            ),
            services: SuspendOptionalServices::new(
                with.services,
                config.optional_services.clone(),
                admin,
            ),
            standby: ClearStandbyList::new(
                with.commands,
                with.fs,
                config.standby_tool.clone(),
                admin,
            ),
            provider: with.provider,
            step_pause: config.step_pause(),
        }
    }

    /// Override the pause between steps of a full pass.
    pub fn with_step_pause(mut self, pause: Duration) -> Self {
        self.step_pause = pause;
        self
    }

    pub fn step(&self, kind: StepKind) -> &dyn ReclamationStep {
        match kind {
            StepKind::FlushDnsCache => &self.flush_dns,
            StepKind::PurgeTempFiles => &self.purge_temp,
            StepKind::TrimWorkingSets => &self.trim,
            StepKind::EnumerateStartupEntries => &self.startup,
            StepKind::SuspendOptionalServices => &self.services,
            StepKind::ClearStandbyList => &self.standby,
        }
    }

    /// Every step, for presentation layers building a command list.
    pub fn steps(&self) -> impl Iterator<Item = &dyn ReclamationStep> {
        StepKind::ALL.into_iter().map(move |kind| self.step(kind))
    }

    /// Run a single step. A pass already cancelled yields a skipped report.
    pub fn run_step(&self, kind: StepKind, cancel: &CancelFlag) -> StepReport {
        if cancel.is_cancelled() {
            return StepReport::skipped(
                kind,
                SkipReason::Cancelled,
                "pass cancelled before this step started",
            );
        }

        info!("Running {}", kind.label());
        let started = Instant::now();
        let mut report = self.step(kind).run(cancel);
        report.duration_ms = started.elapsed().as_millis() as u64;

        if report.succeeded {
            info!("{} ({} ms)", report.summary(), report.duration_ms);
        } else {
            warn!("{} ({} ms)", report.summary(), report.duration_ms);
        }
        report
    }

    pub fn clean_all(&self, cancel: &CancelFlag) -> CleanupReport {
        self.clean_all_with(cancel, |_| {})
    }

    /// Full pass in [`StepKind::CLEAN_ALL_ORDER`], calling `on_step` after
    /// each step finishes.
    pub fn clean_all_with<F>(&self, cancel: &CancelFlag, mut on_step: F) -> CleanupReport
    where
        F: FnMut(&StepReport),
    {
        let started_at = Local::now();
        let memory_before = self.memory_reading("before");
        info!("=== Reclamation pass started ===");

        let mut steps = Vec::with_capacity(StepKind::CLEAN_ALL_ORDER.len());
        for (index, kind) in StepKind::CLEAN_ALL_ORDER.into_iter().enumerate() {
            if index > 0 && !self.step_pause.is_zero() && !cancel.is_cancelled() {
                std::thread::sleep(self.step_pause);
            }
            let report = self.run_step(kind, cancel);
            on_step(&report);
            steps.push(report);
        }

        let memory_after = self.memory_reading("after");
        let report = CleanupReport {
            started_at,
            steps,
            memory_before,
            memory_after,
        };
        match report.available_delta_bytes() {
            Some(delta) => info!(
                "=== Reclamation pass finished: available memory changed by {:.1} MB ===",
                delta as f64 / (1024.0 * 1024.0)
            ),
            None => info!("=== Reclamation pass finished ==="),
        }
        report
    }

    fn memory_reading(&self, when: &str) -> Option<crate::telemetry::MemoryStats> {
        match self.provider.memory_stats() {
            Ok(stats) => {
                info!(
                    "Memory {}: {:.2} GB available of {:.2} GB ({:.1}% used)",
                    when,
                    stats.available_bytes as f64 / GIB,
                    stats.total_bytes as f64 / GIB,
                    stats.load_percent()
                );
                Some(stats)
            }
            Err(err) => {
                warn!("Memory reading {} pass unavailable: {}", when, err);
                None
            }
        }
    }
}

const GIB: f64 = 1024.0 * 1024.0 * 1024.0;
