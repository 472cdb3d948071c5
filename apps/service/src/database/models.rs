use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ServiceError;
use crate::monitoring::types::MonitorAggregateState;
use crate::validation::{validate_address, validate_label};

/// Monitor model - one endpoint probed by the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Monitor {
    pub id: Uuid,
    pub address: String,
    pub label: String,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A monitor together with its persisted health state, as listed to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorEntry {
    #[serde(flatten)]
    pub monitor: Monitor,
    #[serde(flatten)]
    pub state: MonitorAggregateState,
}

fn default_enabled() -> bool {
    true
}

/// Administrative input for creating or editing a monitor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorDraft {
    pub address: String,
    #[serde(default)]
    pub label: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl MonitorDraft {
    pub fn new(address: impl Into<String>) -> Self {
        Self { address: address.into(), label: String::new(), enabled: true }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Trimmed copy of the draft, rejected if the address or label is invalid
    pub fn normalized(&self) -> Result<Self, ServiceError> {
        let address = self.address.trim().to_string();
        let label = self.label.trim().to_string();
        validate_address(&address).into_result(ServiceError::InvalidMonitor)?;
        validate_label(&label).into_result(ServiceError::InvalidMonitor)?;
        Ok(Self { address, label, enabled: self.enabled })
    }
}

/// Fixed-width RFC 3339 text, so lexical order in SQL equals time order
pub fn timestamp_to_db(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn timestamp_from_db(value: &str) -> Result<DateTime<Utc>, ServiceError> {
    Ok(DateTime::parse_from_rfc3339(value)?.with_timezone(&Utc))
}

pub fn optional_timestamp_from_db(value: Option<String>) -> Result<Option<DateTime<Utc>>, ServiceError> {
    value.as_deref().map(timestamp_from_db).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_db_timestamps_sort_lexically() {
        let early = Utc.timestamp_opt(1_700_000_000, 5_000).unwrap();
        let late = Utc.timestamp_opt(1_700_000_001, 0).unwrap();
        assert!(timestamp_to_db(early) < timestamp_to_db(late));
        assert_eq!(timestamp_from_db(&timestamp_to_db(early)).unwrap(), early);
    }

    #[test]
    fn test_draft_normalization() {
        let draft = MonitorDraft::new("  10.0.0.1 ").with_label(" core switch ");
        let normalized = draft.normalized().unwrap();
        assert_eq!(normalized.address, "10.0.0.1");
        assert_eq!(normalized.label, "core switch");

        let err = MonitorDraft::new("not valid").normalized().unwrap_err();
        assert!(matches!(err, ServiceError::InvalidMonitor(_)));
    }
}
