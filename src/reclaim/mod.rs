//! Best-effort memory and resource reclamation
//!
//! Each operation is a [`ReclamationStep`]. Steps never return errors: every
//! outcome, including per-target failures, is folded into a [`StepReport`].

pub mod cancel;
pub mod dns;
pub mod engine;
pub mod report;
pub mod services;
pub mod standby;
pub mod startup;
pub mod temp;
pub mod working_set;

pub use cancel::CancelFlag;
pub use dns::FlushDnsCache;
pub use engine::{Collaborators, ReclamationEngine};
pub use report::{
    CleanupReport, SkipReason, StartupEntry, StepKind, StepReport, TargetFailure, TargetTally,
};
pub use services::SuspendOptionalServices;
pub use standby::ClearStandbyList;
pub use startup::EnumerateStartupEntries;
pub use temp::PurgeTempFiles;
pub use working_set::TrimWorkingSets;

/// A single reclamation operation.
pub trait ReclamationStep: Send + Sync {
    fn kind(&self) -> StepKind;

    fn label(&self) -> &'static str {
        self.kind().label()
    }

    /// Run to completion, checking `cancel` between sub-targets.
    fn run(&self, cancel: &CancelFlag) -> StepReport;
}
