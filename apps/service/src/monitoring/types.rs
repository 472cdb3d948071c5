use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// Last observed reachability of a monitor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MonitorStatus {
    Up,
    Down,
    Unknown,
}

impl MonitorStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MonitorStatus::Up => "up",
            MonitorStatus::Down => "down",
            MonitorStatus::Unknown => "unknown",
        }
    }

    /// Parse the persisted column value; anything unrecognised is `Unknown`.
    pub fn from_db(value: &str) -> Self {
        match value {
            "up" => MonitorStatus::Up,
            "down" => MonitorStatus::Down,
            _ => MonitorStatus::Unknown,
        }
    }
}

impl std::fmt::Display for MonitorStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a single echo probe did not produce a reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(rename_all = "snake_case")]
pub enum ProbeFailure {
    #[error("no echo reply before the timeout")]
    Timeout,
    #[error("destination unreachable")]
    Unreachable,
    #[error("address could not be resolved")]
    ResolutionFailure,
    #[error("echo request could not be sent")]
    SendError,
}

/// Result of one probe attempt against one monitor.
///
/// `rtt_ms` is set exactly when `success` is true and `failure` exactly
/// when it is false; the constructors are the only way to build one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeOutcome {
    pub monitor_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub success: bool,
    pub rtt_ms: Option<f64>,
    pub failure: Option<ProbeFailure>,
}

impl ProbeOutcome {
    /// Build an outcome stamped with the current time
    pub fn new(monitor_id: Uuid, result: Result<Duration, ProbeFailure>) -> Self {
        Self::at(monitor_id, Utc::now(), result)
    }

    /// Build an outcome with an explicit timestamp
    pub fn at(
        monitor_id: Uuid,
        timestamp: DateTime<Utc>,
        result: Result<Duration, ProbeFailure>,
    ) -> Self {
        match result {
            Ok(rtt) => Self {
                monitor_id,
                timestamp,
                success: true,
                rtt_ms: Some(rtt.as_secs_f64() * 1000.0),
                failure: None,
            },
            Err(reason) => Self {
                monitor_id,
                timestamp,
                success: false,
                rtt_ms: None,
                failure: Some(reason),
            },
        }
    }
}

/// Persisted health summary of one monitor.
///
/// `failed_count` and the timestamps stay `None` until the first probe
/// is recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorAggregateState {
    pub last_success_on: Option<DateTime<Utc>>,
    pub failed_count: Option<u32>,
    pub last_status: MonitorStatus,
    pub last_checked_on: Option<DateTime<Utc>>,
}

impl Default for MonitorAggregateState {
    fn default() -> Self {
        Self {
            last_success_on: None,
            failed_count: None,
            last_status: MonitorStatus::Unknown,
            last_checked_on: None,
        }
    }
}

impl MonitorAggregateState {
    /// Fold one outcome into the state.
    ///
    /// A success resets the failure streak to zero, a failure extends it by
    /// one. `last_success_on` never moves backwards.
    pub fn apply(&self, outcome: &ProbeOutcome) -> Self {
        if outcome.success {
            let last_success_on = match self.last_success_on {
                Some(previous) if previous > outcome.timestamp => Some(previous),
                _ => Some(outcome.timestamp),
            };
            Self {
                last_success_on,
                failed_count: Some(0),
                last_status: MonitorStatus::Up,
                last_checked_on: Some(outcome.timestamp),
            }
        } else {
            Self {
                last_success_on: self.last_success_on,
                failed_count: Some(self.failed_count.unwrap_or(0).saturating_add(1)),
                last_status: MonitorStatus::Down,
                last_checked_on: Some(outcome.timestamp),
            }
        }
    }
}

/// State before and after recording an outcome
#[derive(Debug, Clone, PartialEq)]
pub struct StateChange {
    pub previous: MonitorAggregateState,
    pub current: MonitorAggregateState,
}

impl StateChange {
    /// True when the recorded outcome flipped the monitor between up and down
    pub fn is_transition(&self) -> bool {
        self.previous.last_status != self.current.last_status
    }
}

/// Published to the hub after a probe outcome has been persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryEvent {
    pub monitor_id: Uuid,
    pub address: String,
    pub state: MonitorAggregateState,
    pub outcome: ProbeOutcome,
    pub generated_at: DateTime<Utc>,
}

impl TelemetryEvent {
    pub fn new(address: String, state: MonitorAggregateState, outcome: ProbeOutcome) -> Self {
        Self { monitor_id: outcome.monitor_id, address, state, outcome, generated_at: Utc::now() }
    }
}
