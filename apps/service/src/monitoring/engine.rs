use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{Instant, timeout_at};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::executor::ProbeExecutor;
use super::inflight::InFlight;
use super::prober::Prober;
use super::scheduler::{CyclePhase, Scheduler, SchedulerStats};
use crate::database::MonitorDirectory;
use crate::error::ServiceError;
use crate::settings::{Settings, SettingsStore};
use crate::telemetry::Hub;

/// Engine tuning loaded from the `[engine]` config section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Upper bound on concurrently running probes
    pub probe_workers: usize,
    /// How long `stop` waits for outstanding probes
    pub shutdown_grace_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { probe_workers: 16, shutdown_grace_secs: 5 }
    }
}

impl EngineConfig {
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

struct RunningLoop {
    cancel: CancellationToken,
    handle: JoinHandle<JoinSet<()>>,
}

/// Probe engine - owns the scheduling loop and its worker pool
pub struct Engine {
    directory: Arc<dyn MonitorDirectory>,
    settings: Arc<dyn SettingsStore>,
    executor: Arc<ProbeExecutor>,
    inflight: Arc<InFlight>,
    stats: Arc<SchedulerStats>,
    config: EngineConfig,
    running: Mutex<Option<RunningLoop>>,
}

impl Engine {
    pub fn new(
        directory: Arc<dyn MonitorDirectory>,
        settings: Arc<dyn SettingsStore>,
        prober: Arc<dyn Prober>,
        hub: Hub,
        config: EngineConfig,
    ) -> Self {
        let executor = Arc::new(ProbeExecutor::new(Arc::clone(&directory), prober, hub));
        Self {
            directory,
            settings,
            executor,
            inflight: InFlight::new(),
            stats: Arc::new(SchedulerStats::default()),
            config,
            running: Mutex::new(None),
        }
    }

    /// Start the scheduling loop with `initial` as the active settings.
    ///
    /// `initial` is validated and persisted through the settings store before
    /// the first cycle. Calling `start` on a running engine is a no-op.
    pub async fn start(&self, initial: Settings) -> Result<(), ServiceError> {
        let mut running = self.running.lock().await;
        if running.is_some() {
            warn!("Engine already running, ignoring start");
            return Ok(());
        }

        let active = self.settings.ensure_defaults(initial).await?;

        let cancel = CancellationToken::new();
        let scheduler = Scheduler {
            directory: Arc::clone(&self.directory),
            settings: Arc::clone(&self.settings),
            executor: Arc::clone(&self.executor),
            inflight: Arc::clone(&self.inflight),
            workers: Arc::new(Semaphore::new(self.config.probe_workers.max(1))),
            stats: Arc::clone(&self.stats),
        };
        let handle = tokio::spawn(scheduler.run(cancel.clone()));

        info!(
            ping_interval_sec = active.ping_interval_sec,
            ping_timeout_sec = active.ping_timeout_sec,
            icmp_payload_size = active.icmp_payload_size,
            probe_workers = self.config.probe_workers,
            "Probe engine started"
        );

        *running = Some(RunningLoop { cancel, handle });
        Ok(())
    }

    /// Stop scheduling and wait up to the grace period for the loop to exit
    /// and outstanding probes to finish. Whatever is still running at the
    /// deadline is abandoned. Idempotent.
    pub async fn stop(&self) {
        let Some(RunningLoop { cancel, mut handle }) = self.running.lock().await.take() else {
            return;
        };

        cancel.cancel();
        let deadline = Instant::now() + self.config.shutdown_grace();

        let mut probes = match timeout_at(deadline, &mut handle).await {
            Ok(Ok(probes)) => probes,
            Ok(Err(e)) => {
                error!(error = %e, "Scheduling loop terminated abnormally");
                self.stats.set_phase(CyclePhase::Idle);
                return;
            }
            Err(_) => {
                warn!(
                    grace_secs = self.config.shutdown_grace_secs,
                    "Scheduling loop did not stop within the grace period, aborting it"
                );
                handle.abort();
                let _ = handle.await;
                self.stats.set_phase(CyclePhase::Idle);
                info!("Probe engine stopped");
                return;
            }
        };

        let drained = timeout_at(deadline, async {
            while probes.join_next().await.is_some() {}
        })
        .await;

        if drained.is_err() {
            warn!(
                abandoned = probes.len(),
                grace_secs = self.config.shutdown_grace_secs,
                "Grace period elapsed, abandoning outstanding probes"
            );
            probes.abort_all();
            while probes.join_next().await.is_some() {}
        }

        self.stats.set_phase(CyclePhase::Idle);
        info!("Probe engine stopped");
    }

    pub async fn is_running(&self) -> bool {
        self.running.lock().await.is_some()
    }

    pub fn in_flight_count(&self) -> usize {
        self.inflight.len()
    }

    pub fn is_in_flight(&self, monitor_id: &Uuid) -> bool {
        self.inflight.contains(monitor_id)
    }

    pub fn phase(&self) -> CyclePhase {
        self.stats.phase()
    }

    /// Completed dispatch cycles since the engine was created
    pub fn cycles(&self) -> u64 {
        self.stats.cycles()
    }

    /// Dispatches skipped because a probe was still outstanding
    pub fn skipped_dispatches(&self) -> u64 {
        self.stats.skipped()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        if let Some(running) = self.running.get_mut().take() {
            running.cancel.cancel();
            running.handle.abort();
        }
    }
}
