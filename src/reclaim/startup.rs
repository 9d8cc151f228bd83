//! Startup entry enumeration
//!
//! Read-only. Lists auto-start registrations so the user can review them;
//! nothing is modified.

use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{
    CancelFlag, ReclamationStep, SkipReason, StartupEntry, StepKind, StepReport, TargetFailure,
};
use crate::core::admin::AdminContext;
use crate::platform::{OsError, RegistryLocation, RegistryReader};

pub struct EnumerateStartupEntries {
    registry: Arc<dyn RegistryReader>,
    locations: Vec<RegistryLocation>,
    admin: AdminContext,
}

impl EnumerateStartupEntries {
    pub fn new(
        registry: Arc<dyn RegistryReader>,
        locations: Vec<RegistryLocation>,
        admin: AdminContext,
    ) -> Self {
        Self {
            registry,
            locations,
            admin,
        }
    }
}

impl ReclamationStep for EnumerateStartupEntries {
    fn kind(&self) -> StepKind {
        StepKind::EnumerateStartupEntries
    }

    fn run(&self, cancel: &CancelFlag) -> StepReport {
        let mut entries = Vec::new();
        let mut failures = Vec::new();
        let mut not_attempted = Vec::new();
        let mut attempted = 0usize;
        let mut cancelled = false;

        for location in &self.locations {
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }
            if location.hive.is_machine_scope() && !self.admin.is_elevated() {
                not_attempted.push(location.to_string());
                continue;
            }
            attempted += 1;

            match self.registry.read_values(location) {
                Ok(values) => {
                    for value in values {
                        info!("Startup entry [{}] {} -> {}", location, value.name, value.data);
                        entries.push(StartupEntry {
                            location: location.to_string(),
                            name: value.name,
                            command: value.data,
                        });
                    }
                }
                // RunOnce keys routinely do not exist
                Err(OsError::NotFound(_)) => debug!("Startup key {} is absent", location),
                Err(err) => {
                    warn!("Cannot read {}: {}", location, err);
                    failures.push(TargetFailure {
                        target: location.to_string(),
                        reason: err.to_string(),
                    });
                }
            }
        }

        if attempted == 0 && !not_attempted.is_empty() && !cancelled {
            return StepReport::skipped(
                self.kind(),
                SkipReason::PrivilegeDenied,
                format!(
                    "administrator privileges required for {}",
                    not_attempted.join(", ")
                ),
            );
        }

        let mut message = format!("found {} startup entries", entries.len());
        if !failures.is_empty() {
            message.push_str(&format!(", {} locations unreadable", failures.len()));
        }
        if !not_attempted.is_empty() {
            message.push_str(&format!(
                "; not attempted without elevation: {}",
                not_attempted.join(", ")
            ));
        }
        if cancelled {
            message.push_str(", cancelled before completion");
        }

        let all_failed = attempted > 0 && failures.len() == attempted;
        StepReport {
            succeeded: !all_failed,
            items_affected: entries.len(),
            message: Some(message),
            failures,
            startup_entries: entries,
            ..StepReport::completed(self.kind(), 0)
        }
    }
}
