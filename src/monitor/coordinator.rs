//! Background sampling and reclamation scheduling
//!
//! Two independent flows share the coordinator: a periodic sampling task
//! feeding the ring buffer, and on-demand reclamation passes executed on the
//! blocking pool. Readers never wait on either.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch, Semaphore};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::core::config::ConfigError;
use crate::error::{ReclaimError, Result};
use crate::reclaim::{CancelFlag, CleanupReport, ReclamationEngine, StepKind, StepReport};
use crate::telemetry::{RingBuffer, Sample, TelemetrySampler};

const EVENT_CAPACITY: usize = 64;

/// Progress pushed to subscribers while reclamation runs.
#[derive(Debug, Clone)]
pub enum ReclamationEvent {
    StepFinished(StepReport),
    PassFinished(CleanupReport),
}

pub struct Coordinator {
    sampler: Arc<TelemetrySampler>,
    buffer: Arc<RingBuffer>,
    engine: Arc<ReclamationEngine>,
    interval: Duration,
    /// Delay before the first reading
    warmup: Duration,
    /// Single permit: at most one reclamation in flight
    reclaiming: Arc<Semaphore>,
    cancel: CancelFlag,
    events: broadcast::Sender<ReclamationEvent>,
}

impl Coordinator {
    pub fn new(
        sampler: TelemetrySampler,
        buffer: RingBuffer,
        engine: ReclamationEngine,
        interval: Duration,
    ) -> std::result::Result<Self, ConfigError> {
        if interval.is_zero() {
            return Err(ConfigError::ZeroInterval);
        }
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Ok(Self {
            sampler: Arc::new(sampler),
            buffer: Arc::new(buffer),
            engine: Arc::new(engine),
            interval,
            warmup: Duration::ZERO,
            reclaiming: Arc::new(Semaphore::new(1)),
            cancel: CancelFlag::new(),
            events,
        })
    }

    /// Wait `warmup` before the first reading, so a CPU figure measured
    /// against the provider's initial refresh covers a meaningful span.
    pub fn with_warmup(mut self, warmup: Duration) -> Self {
        self.warmup = warmup;
        self
    }

    pub fn buffer(&self) -> Arc<RingBuffer> {
        Arc::clone(&self.buffer)
    }

    /// Consistent copy of the retained samples, oldest first.
    pub fn snapshot(&self) -> Vec<Sample> {
        self.buffer.snapshot()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReclamationEvent> {
        self.events.subscribe()
    }

    pub fn is_reclaiming(&self) -> bool {
        self.reclaiming.available_permits() == 0
    }

    /// Ask a running pass to stop at its next sub-target boundary.
    pub fn cancel_reclamation(&self) {
        if self.is_reclaiming() {
            info!("Cancellation requested for running reclamation pass");
        }
        self.cancel.cancel();
    }

    /// Spawn the periodic sampling task.
    ///
    /// Each reading runs on the blocking pool; a failed reading is logged and
    /// dropped without stopping the loop.
    pub fn start_sampling(&self) -> SamplingHandle {
        let (stop, mut stopped) = watch::channel(false);
        let sampler = Arc::clone(&self.sampler);
        let buffer = Arc::clone(&self.buffer);
        let interval = self.interval;
        let warmup = self.warmup;

        let task = tokio::spawn(async move {
            info!("Sampling every {:?} into {} slots", interval, buffer.capacity());
            if !warmup.is_zero() {
                tokio::select! {
                    _ = tokio::time::sleep(warmup) => {}
                    _ = stopped.changed() => {
                        info!("Sampling stopped before the first reading");
                        return;
                    }
                }
            }
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = stopped.changed() => break,
                }

                let sampler = Arc::clone(&sampler);
                match tokio::task::spawn_blocking(move || sampler.sample()).await {
                    Ok(Ok(sample)) => {
                        debug!(
                            "Sampled cpu={:.1}% ram_free={} disk_free={}",
                            sample.cpu_percent, sample.ram_available_bytes, sample.disk_free_bytes
                        );
                        if !buffer.push(sample) {
                            debug!("Dropped out-of-order sample");
                        }
                    }
                    Ok(Err(err)) => warn!("Sample skipped: {}", err),
                    Err(err) => error!("Sampling worker failed: {}", err),
                }
            }
            info!("Sampling stopped");
        });

        SamplingHandle { stop, task }
    }

    /// Run the full five-step pass on the blocking pool.
    ///
    /// Rejected with [`ReclaimError::ReclamationInProgress`] while another
    /// pass or step is running.
    pub async fn clean_all(&self) -> Result<CleanupReport> {
        let permit = Arc::clone(&self.reclaiming)
            .try_acquire_owned()
            .map_err(|_| ReclaimError::ReclamationInProgress)?;
        self.cancel.reset();

        let engine = Arc::clone(&self.engine);
        let cancel = self.cancel.clone();
        let events = self.events.clone();
        let report = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            engine.clean_all_with(&cancel, |step| {
                // No subscribers is fine
                let _ = events.send(ReclamationEvent::StepFinished(step.clone()));
            })
        })
        .await
        .map_err(|e| ReclaimError::Worker(e.to_string()))?;

        let _ = self.events.send(ReclamationEvent::PassFinished(report.clone()));
        Ok(report)
    }

    /// Run one step on demand, under the same exclusion as [`Self::clean_all`].
    pub async fn run_step(&self, kind: StepKind) -> Result<StepReport> {
        let permit = Arc::clone(&self.reclaiming)
            .try_acquire_owned()
            .map_err(|_| ReclaimError::ReclamationInProgress)?;
        self.cancel.reset();

        let engine = Arc::clone(&self.engine);
        let cancel = self.cancel.clone();
        let report = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            engine.run_step(kind, &cancel)
        })
        .await
        .map_err(|e| ReclaimError::Worker(e.to_string()))?;

        let _ = self.events.send(ReclamationEvent::StepFinished(report.clone()));
        Ok(report)
    }
}

/// Handle to the background sampling task.
///
/// Dropping it without calling [`SamplingHandle::shutdown`] also ends the
/// loop once the task observes the drop, without waiting for the next tick.
/// A reading already in flight still lands.
pub struct SamplingHandle {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SamplingHandle {
    /// Stop sampling and wait for an in-flight reading to land.
    pub async fn shutdown(self) {
        let _ = self.stop.send(true);
        if let Err(err) = self.task.await {
            error!("Sampling task ended abnormally: {}", err);
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
