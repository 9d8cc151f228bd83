//! Standby list clear through an external helper
//!
//! Windows exposes no supported API for this, so the step shells out to a
//! helper executable when one is installed. Only run on explicit request.

use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use super::{CancelFlag, ReclamationStep, SkipReason, StepKind, StepReport};
use crate::core::admin::AdminContext;
use crate::platform::{CommandRunner, FileSystem};

pub struct ClearStandbyList {
    runner: Arc<dyn CommandRunner>,
    fs: Arc<dyn FileSystem>,
    tool: PathBuf,
    admin: AdminContext,
}

impl ClearStandbyList {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        fs: Arc<dyn FileSystem>,
        tool: PathBuf,
        admin: AdminContext,
    ) -> Self {
        Self {
            runner,
            fs,
            tool,
            admin,
        }
    }
}

impl ReclamationStep for ClearStandbyList {
    fn kind(&self) -> StepKind {
        StepKind::ClearStandbyList
    }

    fn run(&self, _cancel: &CancelFlag) -> StepReport {
        if !self.admin.is_elevated() {
            return StepReport::skipped(
                self.kind(),
                SkipReason::PrivilegeDenied,
                "administrator privileges required to clear the standby list",
            );
        }
        if !self.fs.exists(&self.tool) {
            warn!("{} not found, standby list left as is", self.tool.display());
            return StepReport::skipped(
                self.kind(),
                SkipReason::ExternalToolMissing,
                format!("{} not found", self.tool.display()),
            );
        }

        match self.runner.run(&self.tool, &[]) {
            Ok(output) if output.success => {
                info!("Standby list cleared");
                StepReport::completed(self.kind(), 1).with_message("standby list cleared")
            }
            Ok(output) => StepReport::failed(
                self.kind(),
                format!(
                    "{} failed: {}",
                    self.tool.display(),
                    output.summary().unwrap_or_else(|| "no output".into())
                ),
            ),
            Err(err) => StepReport::failed(
                self.kind(),
                format!("could not run {}: {}", self.tool.display(), err),
            ),
        }
    }
}
