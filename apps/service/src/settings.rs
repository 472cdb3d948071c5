//! Process-wide probe settings.
//!
//! Settings are replaced as a whole record. Readers get a copy of the
//! latest snapshot from an [`ArcSwap`], so a reader can never observe an
//! interval from one version paired with a timeout from another.

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::database::DatabaseImpl;
use crate::error::ServiceError;
use crate::telemetry::{Hub, HubMessage};
use crate::validation::validate_settings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub ping_interval_sec: u64,
    pub icmp_payload_size: u32,
    pub ping_timeout_sec: u64,
    pub auto_refresh_sec: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self { ping_interval_sec: 30, icmp_payload_size: 56, ping_timeout_sec: 2, auto_refresh_sec: 10 }
    }
}

impl Settings {
    pub fn ping_interval(&self) -> Duration {
        Duration::from_secs(self.ping_interval_sec)
    }

    pub fn ping_timeout(&self) -> Duration {
        Duration::from_secs(self.ping_timeout_sec)
    }

    pub fn validate(&self) -> Result<(), ServiceError> {
        validate_settings(self).into_result(ServiceError::InvalidSettings)
    }
}

/// Source of the current settings snapshot
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// The latest fully-formed settings record
    fn get(&self) -> Settings;

    /// Replace the whole record. Invalid input is rejected and the
    /// previous settings stay in effect.
    async fn replace(&self, settings: Settings) -> Result<Settings, ServiceError>;

    /// Persist `defaults` only if no settings exist yet; returns what is in effect
    async fn ensure_defaults(&self, defaults: Settings) -> Result<Settings, ServiceError>;
}

/// Settings backed by the database with an in-memory snapshot
pub struct PersistedSettings {
    database: Arc<DatabaseImpl>,
    current: ArcSwap<Settings>,
    hub: Option<Hub>,
}

impl PersistedSettings {
    /// Load the stored settings, seeding `defaults` on first run
    pub async fn load(database: Arc<DatabaseImpl>, defaults: Settings) -> Result<Self, ServiceError> {
        let store = Self { database, current: ArcSwap::from_pointee(defaults), hub: None };
        store.ensure_defaults(defaults).await?;
        Ok(store)
    }

    /// Announce successful replacements on `hub`
    pub fn with_hub(mut self, hub: Hub) -> Self {
        self.hub = Some(hub);
        self
    }
}

#[async_trait]
impl SettingsStore for PersistedSettings {
    fn get(&self) -> Settings {
        **self.current.load()
    }

    async fn replace(&self, settings: Settings) -> Result<Settings, ServiceError> {
        settings.validate()?;
        self.database.save_settings(&settings).await?;
        self.current.store(Arc::new(settings));

        info!(
            interval_sec = settings.ping_interval_sec,
            timeout_sec = settings.ping_timeout_sec,
            payload = settings.icmp_payload_size,
            "Probe settings replaced"
        );

        if let Some(hub) = &self.hub {
            hub.publish(HubMessage::SettingsChanged(settings));
        }
        Ok(settings)
    }

    async fn ensure_defaults(&self, defaults: Settings) -> Result<Settings, ServiceError> {
        defaults.validate()?;
        if self.database.insert_settings_if_absent(&defaults).await? {
            info!("Seeded default probe settings");
        }

        let effective = self.database.load_settings().await?.unwrap_or(defaults);
        self.current.store(Arc::new(effective));
        Ok(effective)
    }
}
