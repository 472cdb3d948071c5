//! Live telemetry fan-out to dashboard connections.
//!
//! - [`Hub`]: registry of subscriber sinks with per-sink bounded buffers
//! - [`HubMessage`]: what subscribers receive
//! - [`log_messages`]: a subscriber that writes messages to the log

mod hub;
mod journal;

pub use hub::{Hub, SinkId, Subscription};
pub use journal::log_messages;

use serde::{Deserialize, Serialize};

use crate::monitoring::types::TelemetryEvent;
use crate::settings::Settings;

/// Message delivered to every registered sink
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HubMessage {
    /// A probe outcome was recorded for a monitor
    Probe(TelemetryEvent),
    /// The probe settings were replaced
    SettingsChanged(Settings),
    /// A monitor was added, edited or removed
    MonitorsChanged,
}

impl HubMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            HubMessage::Probe(_) => "probe",
            HubMessage::SettingsChanged(_) => "settings_changed",
            HubMessage::MonitorsChanged => "monitors_changed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitoring::types::{MonitorAggregateState, ProbeFailure, ProbeOutcome};
    use serde_json::json;
    use uuid::Uuid;

    #[test]
    fn test_messages_are_tagged_by_type() {
        let value = serde_json::to_value(HubMessage::MonitorsChanged).unwrap();
        assert_eq!(value, json!({ "type": "monitors_changed" }));

        let value = serde_json::to_value(HubMessage::SettingsChanged(Settings::default())).unwrap();
        assert_eq!(value["type"], "settings_changed");
        assert_eq!(value["pingIntervalSec"], 30);
    }

    #[test]
    fn test_probe_event_carries_state_and_outcome() {
        let id = Uuid::new_v4();
        let outcome = ProbeOutcome::new(id, Err(ProbeFailure::ResolutionFailure));
        let state = MonitorAggregateState::default().apply(&outcome);
        let message = HubMessage::Probe(TelemetryEvent::new("nas.lan".into(), state, outcome));

        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["type"], "probe");
        assert_eq!(value["address"], "nas.lan");
        assert_eq!(value["state"]["last_status"], "down");
        assert_eq!(value["state"]["failed_count"], 1);
        assert_eq!(value["outcome"]["failure"], "resolution_failure");
        assert_eq!(message.kind(), "probe");
    }
}
