use async_trait::async_trait;
use chrono::Utc;
use libsql::{Row, params};
use std::path::Path;
use uuid::Uuid;

use super::models::{
    Monitor, MonitorDraft, MonitorEntry, optional_timestamp_from_db, timestamp_from_db,
    timestamp_to_db,
};
use super::ordering::MonitorOrder;
use crate::error::ServiceError;
use crate::monitoring::types::{MonitorAggregateState, MonitorStatus, ProbeOutcome, StateChange};
use crate::pool::{LibsqlManager, LibsqlPool, open_pool};
use crate::settings::Settings;

const MONITOR_COLUMNS: &str = "uuid, address, label, enabled, created_at, updated_at, \
     last_success_on, failed_count, last_status, last_checked_on";

/// The set of monitored endpoints and their persisted health state
#[async_trait]
pub trait MonitorDirectory: Send + Sync {
    /// Enabled monitors, address ascending
    async fn list_enabled(&self) -> Result<Vec<Monitor>, ServiceError>;

    /// Fold a probe outcome into the monitor's aggregate state and persist it
    async fn update_aggregate_state(
        &self,
        monitor_id: Uuid,
        outcome: &ProbeOutcome,
    ) -> Result<StateChange, ServiceError>;

    /// All monitors with their state, in the requested order
    async fn list_monitors(&self, order: &MonitorOrder) -> Result<Vec<MonitorEntry>, ServiceError>;

    async fn get_monitor(&self, monitor_id: Uuid) -> Result<Option<MonitorEntry>, ServiceError>;

    async fn add_monitor(&self, draft: &MonitorDraft) -> Result<Monitor, ServiceError>;

    async fn update_monitor(&self, monitor_id: Uuid, draft: &MonitorDraft) -> Result<Monitor, ServiceError>;

    async fn remove_monitor(&self, monitor_id: Uuid) -> Result<(), ServiceError>;
}

/// LibSQL database implementation
pub struct DatabaseImpl {
    pool: LibsqlPool,
}

impl DatabaseImpl {
    /// Create a new database instance from a pool
    pub fn new_from_pool(pool: LibsqlPool) -> Self {
        Self { pool }
    }

    /// Open the database file, migrating the schema if needed
    pub async fn open(path: impl AsRef<Path>, max_connections: usize) -> Result<Self, ServiceError> {
        let pool = open_pool(path, max_connections).await?;
        {
            let conn = pool.get().await.map_err(|e| ServiceError::Pool(e.to_string()))?;
            super::initialize_database(&conn).await?;
        }
        Ok(Self::new_from_pool(pool))
    }

    /// Get a connection from the pool
    async fn get_conn(&self) -> Result<deadpool::managed::Object<LibsqlManager>, ServiceError> {
        self.pool.get().await.map_err(|e| ServiceError::Pool(e.to_string()))
    }

    /// Read the settings row, if one has been written
    pub async fn load_settings(&self) -> Result<Option<Settings>, ServiceError> {
        let conn = self.get_conn().await?;
        let mut rows = conn
            .query(
                "SELECT ping_interval_sec, icmp_payload_size, ping_timeout_sec, auto_refresh_sec FROM settings WHERE id = 1",
                (),
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Settings {
                ping_interval_sec: row.get::<i64>(0)? as u64,
                icmp_payload_size: row.get::<i64>(1)? as u32,
                ping_timeout_sec: row.get::<i64>(2)? as u64,
                auto_refresh_sec: row.get::<i64>(3)? as u64,
            })),
            None => Ok(None),
        }
    }

    /// Overwrite the settings row as a whole
    pub async fn save_settings(&self, settings: &Settings) -> Result<(), ServiceError> {
        let conn = self.get_conn().await?;
        conn.execute(
            "INSERT INTO settings (id, ping_interval_sec, icmp_payload_size, ping_timeout_sec, auto_refresh_sec, updated_at)
             VALUES (1, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                ping_interval_sec = excluded.ping_interval_sec,
                icmp_payload_size = excluded.icmp_payload_size,
                ping_timeout_sec = excluded.ping_timeout_sec,
                auto_refresh_sec = excluded.auto_refresh_sec,
                updated_at = excluded.updated_at",
            params![
                settings.ping_interval_sec as i64,
                settings.icmp_payload_size as i64,
                settings.ping_timeout_sec as i64,
                settings.auto_refresh_sec as i64,
                timestamp_to_db(Utc::now())
            ],
        )
        .await?;
        Ok(())
    }

    /// Seed the settings row; returns false when one already existed
    pub async fn insert_settings_if_absent(&self, settings: &Settings) -> Result<bool, ServiceError> {
        let conn = self.get_conn().await?;
        let inserted = conn
            .execute(
                "INSERT OR IGNORE INTO settings (id, ping_interval_sec, icmp_payload_size, ping_timeout_sec, auto_refresh_sec, updated_at)
                 VALUES (1, ?, ?, ?, ?, ?)",
                params![
                    settings.ping_interval_sec as i64,
                    settings.icmp_payload_size as i64,
                    settings.ping_timeout_sec as i64,
                    settings.auto_refresh_sec as i64,
                    timestamp_to_db(Utc::now())
                ],
            )
            .await?;
        Ok(inserted > 0)
    }
}

fn entry_from_row(row: &Row) -> Result<MonitorEntry, ServiceError> {
    let uuid_str: String = row.get(0)?;
    let created_at: String = row.get(4)?;
    let updated_at: String = row.get(5)?;
    let status_str: String = row.get(8)?;

    Ok(MonitorEntry {
        monitor: Monitor {
            id: Uuid::parse_str(&uuid_str)?,
            address: row.get(1)?,
            label: row.get(2)?,
            enabled: row.get::<i64>(3)? != 0,
            created_at: timestamp_from_db(&created_at)?,
            updated_at: timestamp_from_db(&updated_at)?,
        },
        state: MonitorAggregateState {
            last_success_on: optional_timestamp_from_db(row.get(6)?)?,
            failed_count: row.get::<Option<i64>>(7)?.map(|v| v as u32),
            last_status: MonitorStatus::from_db(&status_str),
            last_checked_on: optional_timestamp_from_db(row.get(9)?)?,
        },
    })
}

#[async_trait]
impl MonitorDirectory for DatabaseImpl {
    async fn list_enabled(&self) -> Result<Vec<Monitor>, ServiceError> {
        let conn = self.get_conn().await?;
        let mut rows = conn
            .query(
                &format!("SELECT {MONITOR_COLUMNS} FROM monitors WHERE enabled = 1 ORDER BY address ASC"),
                (),
            )
            .await?;

        let mut monitors = Vec::new();
        while let Some(row) = rows.next().await? {
            monitors.push(entry_from_row(&row)?.monitor);
        }
        Ok(monitors)
    }

    async fn update_aggregate_state(
        &self,
        monitor_id: Uuid,
        outcome: &ProbeOutcome,
    ) -> Result<StateChange, ServiceError> {
        let conn = self.get_conn().await?;
        let mut rows = conn
            .query(
                &format!("SELECT {MONITOR_COLUMNS} FROM monitors WHERE uuid = ?"),
                params![monitor_id.to_string()],
            )
            .await?;

        let previous = match rows.next().await? {
            Some(row) => entry_from_row(&row)?.state,
            None => return Err(ServiceError::NotFound(monitor_id)),
        };
        drop(rows);
        let current = previous.apply(outcome);

        let updated = conn
            .execute(
                "UPDATE monitors SET last_success_on = ?, failed_count = ?, last_status = ?, last_checked_on = ? WHERE uuid = ?",
                params![
                    current.last_success_on.map(timestamp_to_db),
                    current.failed_count.map(i64::from),
                    current.last_status.as_str(),
                    current.last_checked_on.map(timestamp_to_db),
                    monitor_id.to_string()
                ],
            )
            .await?;

        if updated == 0 {
            return Err(ServiceError::NotFound(monitor_id));
        }

        Ok(StateChange { previous, current })
    }

    async fn list_monitors(&self, order: &MonitorOrder) -> Result<Vec<MonitorEntry>, ServiceError> {
        let conn = self.get_conn().await?;
        let mut rows = conn
            .query(
                &format!("SELECT {MONITOR_COLUMNS} FROM monitors ORDER BY {}", order.order_by_clause()),
                (),
            )
            .await?;

        let mut entries = Vec::new();
        while let Some(row) = rows.next().await? {
            entries.push(entry_from_row(&row)?);
        }
        Ok(entries)
    }

    async fn get_monitor(&self, monitor_id: Uuid) -> Result<Option<MonitorEntry>, ServiceError> {
        let conn = self.get_conn().await?;
        let mut rows = conn
            .query(
                &format!("SELECT {MONITOR_COLUMNS} FROM monitors WHERE uuid = ?"),
                params![monitor_id.to_string()],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(entry_from_row(&row)?)),
            None => Ok(None),
        }
    }

    async fn add_monitor(&self, draft: &MonitorDraft) -> Result<Monitor, ServiceError> {
        let draft = draft.normalized()?;
        let now = Utc::now();
        let monitor = Monitor {
            id: Uuid::new_v4(),
            address: draft.address,
            label: draft.label,
            enabled: draft.enabled,
            created_at: now,
            updated_at: now,
        };

        let conn = self.get_conn().await?;
        conn.execute(
            "INSERT INTO monitors (uuid, address, label, enabled, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)",
            params![
                monitor.id.to_string(),
                monitor.address.clone(),
                monitor.label.clone(),
                if monitor.enabled { 1 } else { 0 },
                timestamp_to_db(monitor.created_at),
                timestamp_to_db(monitor.updated_at)
            ],
        )
        .await?;

        tracing::info!(monitor = %monitor.id, address = %monitor.address, "Monitor added");
        Ok(monitor)
    }

    async fn update_monitor(&self, monitor_id: Uuid, draft: &MonitorDraft) -> Result<Monitor, ServiceError> {
        let draft = draft.normalized()?;
        let conn = self.get_conn().await?;
        let updated = conn
            .execute(
                "UPDATE monitors SET address = ?, label = ?, enabled = ?, updated_at = ? WHERE uuid = ?",
                params![
                    draft.address,
                    draft.label,
                    if draft.enabled { 1 } else { 0 },
                    timestamp_to_db(Utc::now()),
                    monitor_id.to_string()
                ],
            )
            .await?;

        if updated == 0 {
            return Err(ServiceError::NotFound(monitor_id));
        }

        self.get_monitor(monitor_id)
            .await?
            .map(|entry| entry.monitor)
            .ok_or(ServiceError::NotFound(monitor_id))
    }

    async fn remove_monitor(&self, monitor_id: Uuid) -> Result<(), ServiceError> {
        let conn = self.get_conn().await?;
        let deleted = conn
            .execute("DELETE FROM monitors WHERE uuid = ?", params![monitor_id.to_string()])
            .await?;

        if deleted == 0 {
            return Err(ServiceError::NotFound(monitor_id));
        }

        tracing::info!(monitor = %monitor_id, "Monitor removed");
        Ok(())
    }
}
