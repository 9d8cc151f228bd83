//! Optional service suspension

use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{CancelFlag, ReclamationStep, SkipReason, StepKind, StepReport, TargetTally};
use crate::core::admin::AdminContext;
use crate::platform::{ServiceControl, ServiceRunState};

/// Stops each configured service that is currently running.
///
/// Requires elevation. Without it the service manager is not contacted at all.
pub struct SuspendOptionalServices {
    services: Arc<dyn ServiceControl>,
    names: Vec<String>,
    admin: AdminContext,
}

impl SuspendOptionalServices {
    pub fn new(services: Arc<dyn ServiceControl>, names: Vec<String>, admin: AdminContext) -> Self {
        Self {
            services,
            names,
            admin,
        }
    }
}

impl ReclamationStep for SuspendOptionalServices {
    fn kind(&self) -> StepKind {
        StepKind::SuspendOptionalServices
    }

    fn run(&self, cancel: &CancelFlag) -> StepReport {
        if !self.admin.is_elevated() {
            warn!("Skipping service suspension: administrator privileges required");
            return StepReport::skipped(
                self.kind(),
                SkipReason::PrivilegeDenied,
                "administrator privileges required to stop services",
            );
        }

        let mut tally = TargetTally::default();
        let mut left_alone = 0usize;

        for name in &self.names {
            if cancel.is_cancelled() {
                tally.mark_cancelled();
                break;
            }
            match self.services.query_state(name) {
                Ok(ServiceRunState::Running) => {
                    let result = self.services.stop(name);
                    if result.is_ok() {
                        info!("Stop requested for service {}", name);
                    }
                    tally.record(name, result);
                }
                Ok(state) => {
                    debug!("Service {} is {}, not touching it", name, state);
                    left_alone += 1;
                }
                Err(err) => tally.record_failure(name, err),
            }
        }

        let mut message = tally.describe("stopped", "services", "failed");
        if left_alone > 0 {
            message.push_str(&format!(", {} not running", left_alone));
        }
        tally.into_report(self.kind(), message)
    }
}
