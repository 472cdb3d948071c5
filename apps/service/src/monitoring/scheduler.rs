use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use super::executor::ProbeExecutor;
use super::inflight::InFlight;
use crate::database::MonitorDirectory;
use crate::settings::{Settings, SettingsStore};

/// Where the scheduling loop currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CyclePhase {
    Idle,
    Scheduled,
    Dispatching,
    Draining,
}

impl CyclePhase {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Scheduled,
            2 => Self::Dispatching,
            3 => Self::Draining,
            _ => Self::Idle,
        }
    }
}

/// Counters shared between the loop and whoever observes it
#[derive(Debug, Default)]
pub struct SchedulerStats {
    phase: AtomicU8,
    cycles: AtomicU64,
    skipped: AtomicU64,
}

impl SchedulerStats {
    pub fn phase(&self) -> CyclePhase {
        CyclePhase::from_u8(self.phase.load(Ordering::Acquire))
    }

    pub(crate) fn set_phase(&self, phase: CyclePhase) {
        self.phase.store(phase as u8, Ordering::Release);
    }

    /// Completed dispatch cycles since start
    pub fn cycles(&self) -> u64 {
        self.cycles.load(Ordering::Acquire)
    }

    /// Dispatches skipped because the monitor still had a probe outstanding
    pub fn skipped(&self) -> u64 {
        self.skipped.load(Ordering::Acquire)
    }
}

/// Probe scheduler - one cycle per tick over every enabled monitor
pub struct Scheduler {
    pub(crate) directory: Arc<dyn MonitorDirectory>,
    pub(crate) settings: Arc<dyn SettingsStore>,
    pub(crate) executor: Arc<ProbeExecutor>,
    pub(crate) inflight: Arc<InFlight>,
    pub(crate) workers: Arc<Semaphore>,
    pub(crate) stats: Arc<SchedulerStats>,
}

impl Scheduler {
    /// Run cycles until `cancel` fires. The first cycle starts immediately;
    /// each following tick is one ping interval after the previous one, read
    /// from the settings snapshot taken at cycle start.
    ///
    /// Returns the set of probes still running so the caller can drain it.
    pub async fn run(self, cancel: CancellationToken) -> JoinSet<()> {
        let mut probes = JoinSet::new();
        let mut next_tick = Instant::now();

        loop {
            self.stats.set_phase(CyclePhase::Scheduled);
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = sleep_until(next_tick) => {}
            }

            let cycle_start = Instant::now();
            let settings = self.settings.get();
            let interval = settings.ping_interval();

            self.stats.set_phase(CyclePhase::Dispatching);
            if !self.dispatch_cycle(&mut probes, settings, &cancel).await {
                break;
            }

            while probes.try_join_next().is_some() {}

            let cycle = self.stats.cycles.fetch_add(1, Ordering::AcqRel) + 1;
            trace!(cycle, outstanding = probes.len(), "Cycle dispatched");

            next_tick = next_deadline(next_tick, cycle_start, interval);
        }

        self.stats.set_phase(CyclePhase::Draining);
        probes
    }

    /// Dispatch one cycle. Returns false if cancelled midway.
    async fn dispatch_cycle(
        &self,
        probes: &mut JoinSet<()>,
        settings: Settings,
        cancel: &CancellationToken,
    ) -> bool {
        let monitors = match self.directory.list_enabled().await {
            Ok(monitors) => monitors,
            Err(e) => {
                warn!(error = %e, "Failed to list enabled monitors, skipping cycle");
                return true;
            }
        };

        let mut dispatched = 0usize;
        for monitor in monitors {
            let Some(guard) = self.inflight.try_begin(monitor.id) else {
                self.stats.skipped.fetch_add(1, Ordering::AcqRel);
                debug!(monitor_id = %monitor.id, "Previous probe still outstanding, skipping");
                continue;
            };

            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => return false,
                permit = Arc::clone(&self.workers).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => return false,
                },
            };

            let executor = Arc::clone(&self.executor);
            probes.spawn(async move {
                let _permit = permit;
                executor.execute(monitor, settings, guard).await;
            });
            dispatched += 1;
        }

        debug!(dispatched, "Dispatched probes");
        true
    }
}

/// Next tick one interval after the previous one. A cycle that overran its
/// interval starts the next one right away instead of bursting to catch up.
fn next_deadline(previous: Instant, cycle_start: Instant, interval: Duration) -> Instant {
    let candidate = previous + interval;
    if candidate < cycle_start {
        cycle_start
    } else {
        candidate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_deadline_follows_interval() {
        let start = Instant::now();
        let next = next_deadline(start, start, Duration::from_secs(5));
        assert_eq!(next, start + Duration::from_secs(5));
    }

    #[test]
    fn test_next_deadline_does_not_burst_after_overrun() {
        let start = Instant::now();
        let late = start + Duration::from_secs(12);
        let next = next_deadline(start, late, Duration::from_secs(5));
        assert_eq!(next, late);
    }

    #[test]
    fn test_phase_round_trip() {
        let stats = SchedulerStats::default();
        assert_eq!(stats.phase(), CyclePhase::Idle);
        for phase in [CyclePhase::Scheduled, CyclePhase::Dispatching, CyclePhase::Draining, CyclePhase::Idle] {
            stats.set_phase(phase);
            assert_eq!(stats.phase(), phase);
        }
    }
}
