/// Probe engine module - schedules ICMP probes and records their outcomes
///
/// This module is responsible for:
/// - Sending echo requests and classifying failures
/// - Scheduling one probe per enabled monitor per tick
/// - Folding outcomes into per-monitor aggregate state
pub mod engine;
pub mod executor;
pub mod inflight;
pub mod prober;
pub mod scheduler;
pub mod types;

pub use engine::{Engine, EngineConfig};
pub use executor::ProbeExecutor;
pub use inflight::{InFlight, InFlightGuard};
pub use prober::{IcmpProber, Prober};
pub use scheduler::CyclePhase;
pub use types::{
    MonitorAggregateState, MonitorStatus, ProbeFailure, ProbeOutcome, StateChange, TelemetryEvent,
};
