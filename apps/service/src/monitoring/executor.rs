use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::inflight::InFlightGuard;
use super::prober::Prober;
use super::types::{MonitorStatus, ProbeOutcome, TelemetryEvent};
use crate::database::{Monitor, MonitorDirectory};
use crate::error::ServiceError;
use crate::settings::Settings;
use crate::telemetry::{Hub, HubMessage};

/// Probe executor - runs one probe and records its outcome
pub struct ProbeExecutor {
    directory: Arc<dyn MonitorDirectory>,
    prober: Arc<dyn Prober>,
    hub: Hub,
}

impl ProbeExecutor {
    pub fn new(directory: Arc<dyn MonitorDirectory>, prober: Arc<dyn Prober>, hub: Hub) -> Self {
        Self { directory, prober, hub }
    }

    /// Probe `monitor` with the given settings snapshot, fold the outcome into
    /// its aggregate state and publish the resulting event.
    ///
    /// The in-flight mark is cleared before the event reaches the hub. Returns
    /// `None` when the outcome could not be recorded.
    pub async fn execute(
        &self,
        monitor: Monitor,
        settings: Settings,
        guard: InFlightGuard,
    ) -> Option<TelemetryEvent> {
        let result = self
            .prober
            .probe(&monitor.address, settings.icmp_payload_size as usize, settings.ping_timeout())
            .await;
        let outcome = ProbeOutcome::new(monitor.id, result);

        match outcome.failure {
            None => debug!(
                monitor_id = %monitor.id,
                address = %monitor.address,
                rtt_ms = outcome.rtt_ms.unwrap_or_default(),
                "Probe succeeded"
            ),
            Some(reason) => debug!(
                monitor_id = %monitor.id,
                address = %monitor.address,
                reason = %reason,
                "Probe failed"
            ),
        }

        let change = match self.directory.update_aggregate_state(monitor.id, &outcome).await {
            Ok(change) => change,
            Err(ServiceError::NotFound(_)) => {
                debug!(monitor_id = %monitor.id, "Monitor removed while probe was in flight, discarding outcome");
                return None;
            }
            Err(e) => {
                error!(monitor_id = %monitor.id, error = %e, "Failed to record probe outcome");
                return None;
            }
        };

        if change.is_transition() {
            match change.current.last_status {
                MonitorStatus::Up => info!(
                    monitor_id = %monitor.id,
                    address = %monitor.address,
                    previous = %change.previous.last_status,
                    "Monitor is up"
                ),
                MonitorStatus::Down => warn!(
                    monitor_id = %monitor.id,
                    address = %monitor.address,
                    previous = %change.previous.last_status,
                    failed_count = change.current.failed_count.unwrap_or_default(),
                    "Monitor is down"
                ),
                MonitorStatus::Unknown => {}
            }
        }

        guard.release();

        let event = TelemetryEvent::new(monitor.address, change.current, outcome);
        self.hub.publish(HubMessage::Probe(event.clone()));
        Some(event)
    }
}
