#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::time::Instant;

use echowatch_service::database::{DatabaseImpl, MonitorDirectory, MonitorDraft, Monitor};
use echowatch_service::monitoring::{Engine, EngineConfig, ProbeFailure, Prober};
use echowatch_service::settings::{PersistedSettings, Settings, SettingsStore};
use echowatch_service::telemetry::Hub;

/// Scripted reply for one address
#[derive(Debug, Clone, Copy)]
pub struct Reply {
    pub result: Result<Duration, ProbeFailure>,
    pub delay: Duration,
}

impl Reply {
    pub fn up(rtt_ms: u64) -> Self {
        Self { result: Ok(Duration::from_millis(rtt_ms)), delay: Duration::ZERO }
    }

    pub fn fail(reason: ProbeFailure) -> Self {
        Self { result: Err(reason), delay: Duration::ZERO }
    }

    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// One recorded probe call
#[derive(Debug, Clone)]
pub struct Call {
    pub address: String,
    pub payload_size: usize,
    pub timeout: Duration,
    pub at: Instant,
}

#[derive(Default)]
struct FakeState {
    replies: HashMap<String, Reply>,
    calls: Vec<Call>,
    active: HashMap<String, usize>,
    max_active: HashMap<String, usize>,
}

/// Prober answering from a script instead of the network
#[derive(Default, Clone)]
pub struct FakeProber {
    state: Arc<Mutex<FakeState>>,
}

impl FakeProber {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(&self, address: &str, reply: Reply) {
        self.state.lock().unwrap().replies.insert(address.to_string(), reply);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn calls_for(&self, address: &str) -> Vec<Call> {
        self.calls().into_iter().filter(|call| call.address == address).collect()
    }

    /// Highest number of simultaneous probes seen for `address`
    pub fn max_concurrent(&self, address: &str) -> usize {
        self.state.lock().unwrap().max_active.get(address).copied().unwrap_or_default()
    }
}

#[async_trait]
impl Prober for FakeProber {
    async fn probe(
        &self,
        address: &str,
        payload_size: usize,
        timeout: Duration,
    ) -> Result<Duration, ProbeFailure> {
        let reply = {
            let mut state = self.state.lock().unwrap();
            state.calls.push(Call {
                address: address.to_string(),
                payload_size,
                timeout,
                at: Instant::now(),
            });
            let active = state.active.entry(address.to_string()).or_default();
            *active += 1;
            let active = *active;
            let max = state.max_active.entry(address.to_string()).or_default();
            *max = (*max).max(active);
            state.replies.get(address).copied().unwrap_or(Reply::up(1))
        };

        if !reply.delay.is_zero() {
            tokio::time::sleep(reply.delay).await;
        }

        if let Some(active) = self.state.lock().unwrap().active.get_mut(address) {
            *active -= 1;
        }
        reply.result
    }
}

/// Database, settings and engine over a scratch directory
pub struct Harness {
    _dir: TempDir,
    pub database: Arc<DatabaseImpl>,
    pub settings: Arc<PersistedSettings>,
    pub hub: Hub,
    pub prober: FakeProber,
    pub engine: Engine,
}

impl Harness {
    pub async fn new(defaults: Settings, config: EngineConfig) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let database = Arc::new(DatabaseImpl::open(dir.path().join("echowatch.db"), 8).await.unwrap());
        let hub = Hub::new(1024);
        let settings = Arc::new(
            PersistedSettings::load(Arc::clone(&database), defaults)
                .await
                .unwrap()
                .with_hub(hub.clone()),
        );
        let prober = FakeProber::new();

        let directory: Arc<dyn MonitorDirectory> = database.clone();
        let store: Arc<dyn SettingsStore> = settings.clone();
        let engine = Engine::new(directory, store, Arc::new(prober.clone()), hub.clone(), config);

        Self { _dir: dir, database, settings, hub, prober, engine }
    }

    pub async fn add(&self, address: &str) -> Monitor {
        self.database.add_monitor(&MonitorDraft::new(address)).await.unwrap()
    }
}

pub fn fast_settings() -> Settings {
    Settings { ping_interval_sec: 1, icmp_payload_size: 56, ping_timeout_sec: 1, auto_refresh_sec: 10 }
}

pub async fn open_database() -> (TempDir, DatabaseImpl) {
    let dir = tempfile::tempdir().unwrap();
    let database = DatabaseImpl::open(dir.path().join("echowatch.db"), 4).await.unwrap();
    (dir, database)
}
