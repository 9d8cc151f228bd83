//! Working set trim
//!
//! Asks the OS to page out every accessible process. Each process handle is
//! opened and released inside its own attempt.

use std::sync::Arc;
use tracing::{info, warn};

use super::{CancelFlag, ReclamationStep, StepKind, StepReport, TargetTally};
use crate::platform::{OsError, ProcessControl};
use crate::telemetry::TelemetryProvider;

/// System idle process, never openable.
const IDLE_PID: u32 = 0;

pub struct TrimWorkingSets {
    provider: Arc<dyn TelemetryProvider>,
    processes: Arc<dyn ProcessControl>,
}

impl TrimWorkingSets {
    pub fn new(provider: Arc<dyn TelemetryProvider>, processes: Arc<dyn ProcessControl>) -> Self {
        Self {
            provider,
            processes,
        }
    }
}

/// The handle is dropped on every path out of this function.
fn trim_one(control: &dyn ProcessControl, pid: u32) -> Result<(), OsError> {
    let handle = control.open_for_trim(pid)?;
    handle.trim()
}

impl ReclamationStep for TrimWorkingSets {
    fn kind(&self) -> StepKind {
        StepKind::TrimWorkingSets
    }

    fn run(&self, cancel: &CancelFlag) -> StepReport {
        let processes = match self.provider.list_processes() {
            Ok(processes) => processes,
            Err(err) => {
                warn!("Cannot enumerate processes: {}", err);
                return StepReport::failed(
                    self.kind(),
                    format!("could not enumerate processes: {}", err),
                );
            }
        };

        let mut tally = TargetTally::default();
        for process in processes.iter().filter(|p| p.pid != IDLE_PID) {
            if cancel.is_cancelled() {
                tally.mark_cancelled();
                break;
            }
            tally.record(
                format!("{} ({})", process.name, process.pid),
                trim_one(self.processes.as_ref(), process.pid),
            );
        }

        info!(
            "Working set trim: {} trimmed, {} skipped",
            tally.affected(),
            tally.failed()
        );
        let message = tally.describe("trimmed", "processes", "skipped");
        tally.into_report(self.kind(), message)
    }
}
