//! Step and pass reports
//!
//! Every sub-target outcome ends up here. Nothing a step encounters is
//! swallowed: failures are kept as [`TargetFailure`]s next to the success
//! count.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::platform::OsError;
use crate::telemetry::MemoryStats;

/// The reclamation operations, in `clean_all` order followed by the
/// on-demand-only standby clear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepKind {
    FlushDnsCache,
    PurgeTempFiles,
    TrimWorkingSets,
    EnumerateStartupEntries,
    SuspendOptionalServices,
    ClearStandbyList,
}

impl StepKind {
    /// Steps of a full pass, in execution order.
    pub const CLEAN_ALL_ORDER: [StepKind; 5] = [
        StepKind::FlushDnsCache,
        StepKind::PurgeTempFiles,
        StepKind::TrimWorkingSets,
        StepKind::EnumerateStartupEntries,
        StepKind::SuspendOptionalServices,
    ];

    pub const ALL: [StepKind; 6] = [
        StepKind::FlushDnsCache,
        StepKind::PurgeTempFiles,
        StepKind::TrimWorkingSets,
        StepKind::EnumerateStartupEntries,
        StepKind::SuspendOptionalServices,
        StepKind::ClearStandbyList,
    ];

    /// Identifier used on the command line and in JSON.
    pub fn name(&self) -> &'static str {
        match self {
            StepKind::FlushDnsCache => "flush-dns-cache",
            StepKind::PurgeTempFiles => "purge-temp-files",
            StepKind::TrimWorkingSets => "trim-working-sets",
            StepKind::EnumerateStartupEntries => "enumerate-startup-entries",
            StepKind::SuspendOptionalServices => "suspend-optional-services",
            StepKind::ClearStandbyList => "clear-standby-list",
        }
    }

    /// Human readable description.
    pub fn label(&self) -> &'static str {
        match self {
            StepKind::FlushDnsCache => "DNS cache flush",
            StepKind::PurgeTempFiles => "Temporary file cleanup",
            StepKind::TrimWorkingSets => "Process working set trim",
            StepKind::EnumerateStartupEntries => "Startup program analysis",
            StepKind::SuspendOptionalServices => "Optional service suspension",
            StepKind::ClearStandbyList => "Standby list clear",
        }
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StepKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        StepKind::ALL
            .into_iter()
            .find(|kind| kind.name() == wanted)
            .ok_or_else(|| {
                let names: Vec<&str> = StepKind::ALL.iter().map(|k| k.name()).collect();
                format!("unknown step '{}', expected one of: {}", s, names.join(", "))
            })
    }
}

/// Why a step did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SkipReason {
    /// The step needs administrator rights the process does not hold
    PrivilegeDenied,
    /// An optional external tool is not installed
    ExternalToolMissing,
    /// The pass was cancelled before the step started
    Cancelled,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::PrivilegeDenied => write!(f, "privilege denied"),
            SkipReason::ExternalToolMissing => write!(f, "external tool missing"),
            SkipReason::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// A sub-target (file, process, service, registry key) that failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetFailure {
    pub target: String,
    pub reason: String,
}

/// An auto-start registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartupEntry {
    /// Registry key the value was read from
    pub location: String,
    pub name: String,
    pub command: String,
}

/// Outcome of one step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepReport {
    pub kind: StepKind,
    /// False only when the step itself could not do its job
    pub succeeded: bool,
    /// Sub-targets successfully acted on
    pub items_affected: usize,
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<SkipReason>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<TargetFailure>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub startup_entries: Vec<StartupEntry>,
    pub duration_ms: u64,
}

impl StepReport {
    pub fn completed(kind: StepKind, items_affected: usize) -> Self {
        Self {
            kind,
            succeeded: true,
            items_affected,
            message: None,
            skipped: None,
            failures: Vec::new(),
            startup_entries: Vec::new(),
            duration_ms: 0,
        }
    }

    pub fn failed(kind: StepKind, message: impl Into<String>) -> Self {
        Self {
            succeeded: false,
            message: Some(message.into()),
            ..Self::completed(kind, 0)
        }
    }

    /// A step that deliberately did nothing. Only a cancellation counts as
    /// unsuccessful; a missing privilege or tool is an expected condition.
    pub fn skipped(kind: StepKind, reason: SkipReason, message: impl Into<String>) -> Self {
        Self {
            succeeded: reason != SkipReason::Cancelled,
            skipped: Some(reason),
            message: Some(message.into()),
            ..Self::completed(kind, 0)
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn is_skipped(&self) -> bool {
        self.skipped.is_some()
    }

    /// One-line description for logs and text output.
    pub fn summary(&self) -> String {
        let status = match (self.skipped, self.succeeded) {
            (Some(reason), _) => format!("skipped ({})", reason),
            (None, true) => "ok".to_string(),
            (None, false) => "failed".to_string(),
        };
        match &self.message {
            Some(message) => format!("{}: {} - {}", self.kind.label(), status, message),
            None => format!("{}: {}", self.kind.label(), status),
        }
    }
}

/// Accumulates per-sub-target results inside a step.
#[derive(Debug, Default)]
pub struct TargetTally {
    affected: usize,
    failures: Vec<TargetFailure>,
    cancelled: bool,
}

impl TargetTally {
    pub fn record(&mut self, target: impl fmt::Display, result: Result<(), OsError>) {
        match result {
            Ok(()) => self.affected += 1,
            Err(err) => self.record_failure(target, err),
        }
    }

    pub fn record_failure(&mut self, target: impl fmt::Display, err: impl fmt::Display) {
        let failure = TargetFailure {
            target: target.to_string(),
            reason: err.to_string(),
        };
        tracing::debug!("{} failed: {}", failure.target, failure.reason);
        self.failures.push(failure);
    }

    pub fn mark_cancelled(&mut self) {
        self.cancelled = true;
    }

    pub fn affected(&self) -> usize {
        self.affected
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    /// e.g. `"removed 5 entries, 1 skipped"`.
    pub fn describe(&self, done: &str, noun: &str, failed: &str) -> String {
        let mut text = format!("{} {} {}", done, self.affected, noun);
        if !self.failures.is_empty() {
            text.push_str(&format!(", {} {}", self.failures.len(), failed));
        }
        if self.cancelled {
            text.push_str(", cancelled before completion");
        }
        text
    }

    /// A successful report carrying the count and every failure.
    pub fn into_report(self, kind: StepKind, message: String) -> StepReport {
        StepReport {
            failures: self.failures,
            message: Some(message),
            ..StepReport::completed(kind, self.affected)
        }
    }
}

/// Result of a full `clean_all` pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanupReport {
    pub started_at: DateTime<Local>,
    /// One entry per step, in [`StepKind::CLEAN_ALL_ORDER`]
    pub steps: Vec<StepReport>,
    pub memory_before: Option<MemoryStats>,
    pub memory_after: Option<MemoryStats>,
}

impl CleanupReport {
    pub fn step(&self, kind: StepKind) -> Option<&StepReport> {
        self.steps.iter().find(|s| s.kind == kind)
    }

    pub fn all_succeeded(&self) -> bool {
        self.steps.iter().all(|s| s.succeeded)
    }

    pub fn failed_steps(&self) -> Vec<StepKind> {
        self.steps
            .iter()
            .filter(|s| !s.succeeded)
            .map(|s| s.kind)
            .collect()
    }

    /// Change in available physical memory across the pass (may be negative).
    pub fn available_delta_bytes(&self) -> Option<i64> {
        match (self.memory_before, self.memory_after) {
            (Some(before), Some(after)) => {
                Some(after.available_bytes as i64 - before.available_bytes as i64)
            }
            _ => None,
        }
    }
}
