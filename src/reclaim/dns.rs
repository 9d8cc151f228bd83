//! DNS resolver cache flush

use std::path::Path;
use std::sync::Arc;
use tracing::info;

use super::{CancelFlag, ReclamationStep, StepKind, StepReport};
use crate::platform::CommandRunner;

pub struct FlushDnsCache {
    runner: Arc<dyn CommandRunner>,
}

impl FlushDnsCache {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }
}

impl ReclamationStep for FlushDnsCache {
    fn kind(&self) -> StepKind {
        StepKind::FlushDnsCache
    }

    fn run(&self, _cancel: &CancelFlag) -> StepReport {
        match self.runner.run(Path::new("ipconfig"), &["/flushdns"]) {
            Ok(output) if output.success => {
                info!("DNS resolver cache flushed");
                StepReport::completed(self.kind(), 1).with_message(
                    output
                        .summary()
                        .unwrap_or_else(|| "DNS resolver cache flushed".to_string()),
                )
            }
            Ok(output) => StepReport::failed(
                self.kind(),
                format!(
                    "ipconfig /flushdns exited with {}: {}",
                    output
                        .code
                        .map(|c| c.to_string())
                        .unwrap_or_else(|| "no code".into()),
                    output.summary().unwrap_or_default()
                ),
            ),
            Err(err) => StepReport::failed(self.kind(), format!("could not run ipconfig: {}", err)),
        }
    }
}
