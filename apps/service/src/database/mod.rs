/// Database abstraction layer
///
/// Persists monitors with their aggregate health state and the single
/// probe settings row, on top of a pooled LibSQL (SQLite) database.

pub mod migrations;
pub mod models;
pub mod ordering;
pub mod repository;

pub use models::{Monitor, MonitorDraft, MonitorEntry};
pub use ordering::{MonitorOrder, SortDirection, SortField};
pub use repository::{DatabaseImpl, MonitorDirectory};

use crate::error::ServiceError;

/// Initialize database with schema
pub async fn initialize_database(conn: &libsql::Connection) -> Result<(), ServiceError> {
    migrations::run_migrations(conn).await
}
