use thiserror::Error;
use uuid::Uuid;

/// Errors surfaced by the stores and the engine boundary.
///
/// Probe failures never show up here; they are recorded as failed
/// outcomes instead.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Database query failed: {0}")]
    Database(#[from] libsql::Error),

    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Monitor {0} not found")]
    NotFound(Uuid),

    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    #[error("Invalid monitor: {0}")]
    InvalidMonitor(String),

    #[error("Invalid sort: {0}")]
    InvalidSort(String),

    #[error("Stored timestamp is malformed: {0}")]
    Timestamp(#[from] chrono::ParseError),

    #[error("Stored identifier is malformed: {0}")]
    Identifier(#[from] uuid::Error),
}

impl ServiceError {
    /// True for errors caused by caller input rather than the backend.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            ServiceError::InvalidSettings(_)
                | ServiceError::InvalidMonitor(_)
                | ServiceError::InvalidSort(_)
        )
    }
}
