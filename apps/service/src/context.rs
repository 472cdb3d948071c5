use std::sync::Arc;
use tracing::info;

use crate::config::Config;
use crate::database::{DatabaseImpl, MonitorDirectory};
use crate::error::ServiceError;
use crate::monitoring::{Engine, Prober};
use crate::settings::{PersistedSettings, SettingsStore};
use crate::telemetry::Hub;

/// Open and migrate the configured database. Enough for administrative
/// commands, which never probe.
pub async fn open_database(config: &Config) -> Result<Arc<DatabaseImpl>, ServiceError> {
    let database = DatabaseImpl::open(&config.database.path, config.database.max_connections).await?;
    info!(path = %config.database.path.display(), "Database ready");
    Ok(Arc::new(database))
}

/// Everything a running service shares: storage, settings, hub and engine
#[derive(Clone)]
pub struct ServiceContext {
    pub database: Arc<DatabaseImpl>,
    pub settings: Arc<PersistedSettings>,
    pub hub: Hub,
    pub engine: Arc<Engine>,
}

impl ServiceContext {
    /// Open the database, seed settings and wire an engine around `prober`.
    /// The engine is built but not started.
    pub async fn build(config: &Config, prober: Arc<dyn Prober>) -> Result<Self, ServiceError> {
        let database = open_database(config).await?;

        let hub = Hub::new(config.hub.sink_buffer);
        let settings = Arc::new(PersistedSettings::load(Arc::clone(&database), config.defaults).await?.with_hub(hub.clone()));

        let directory: Arc<dyn MonitorDirectory> = database.clone();
        let store: Arc<dyn SettingsStore> = settings.clone();
        let engine = Arc::new(Engine::new(directory, store, prober, hub.clone(), config.engine.clone()));

        Ok(Self { database, settings, hub, engine })
    }

    /// Start the engine with the current settings snapshot
    pub async fn start_engine(&self) -> Result<(), ServiceError> {
        self.engine.start(self.settings.get()).await
    }
}
