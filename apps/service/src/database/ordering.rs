//! ORDER BY construction for monitor listings.
//!
//! The null placement rules are part of the listing contract:
//! - `last_success_on` ascending puts never-succeeded monitors first,
//!   descending puts them last;
//! - every other field puts NULLs last in both directions;
//! - `address ASC` is always appended as the final tie-break;
//! - no field at all means `address ASC` alone.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ServiceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    Address,
    Label,
    Enabled,
    LastStatus,
    LastSuccessOn,
    FailedCount,
    LastCheckedOn,
    CreatedAt,
}

impl SortField {
    /// Column name; only ever one of these literals reaches the SQL text
    fn column(&self) -> &'static str {
        match self {
            SortField::Address => "address",
            SortField::Label => "label",
            SortField::Enabled => "enabled",
            SortField::LastStatus => "last_status",
            SortField::LastSuccessOn => "last_success_on",
            SortField::FailedCount => "failed_count",
            SortField::LastCheckedOn => "last_checked_on",
            SortField::CreatedAt => "created_at",
        }
    }
}

impl FromStr for SortField {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "address" => Ok(SortField::Address),
            "label" | "name" => Ok(SortField::Label),
            "enabled" => Ok(SortField::Enabled),
            "last_status" | "status" => Ok(SortField::LastStatus),
            "last_success_on" | "lastsuccesson" => Ok(SortField::LastSuccessOn),
            "failed_count" | "failedcount" => Ok(SortField::FailedCount),
            "last_checked_on" | "lastcheckedon" => Ok(SortField::LastCheckedOn),
            "created_at" | "createdat" => Ok(SortField::CreatedAt),
            other => Err(ServiceError::InvalidSort(format!("unknown sort field '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl FromStr for SortDirection {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(SortDirection::Asc),
            "desc" | "descending" => Ok(SortDirection::Desc),
            other => Err(ServiceError::InvalidSort(format!("unknown sort direction '{other}'"))),
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortDirection::Asc => f.write_str("ASC"),
            SortDirection::Desc => f.write_str("DESC"),
        }
    }
}

/// Requested ordering of a monitor listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MonitorOrder {
    pub field: Option<SortField>,
    pub direction: Option<SortDirection>,
}

impl MonitorOrder {
    pub fn new(field: SortField, direction: SortDirection) -> Self {
        Self { field: Some(field), direction: Some(direction) }
    }

    /// Parse optional query-string values; blank strings count as absent
    pub fn parse(field: Option<&str>, direction: Option<&str>) -> Result<Self, ServiceError> {
        let field = field.filter(|f| !f.trim().is_empty()).map(str::parse::<SortField>).transpose()?;
        let direction =
            direction.filter(|d| !d.trim().is_empty()).map(str::parse::<SortDirection>).transpose()?;
        Ok(Self { field, direction })
    }

    pub fn order_by_clause(&self) -> String {
        let Some(field) = self.field else {
            return "address ASC".to_string();
        };
        let direction = self.direction.unwrap_or_default();

        let nulls = match (field, direction) {
            (SortField::LastSuccessOn, SortDirection::Asc) => "NULLS FIRST",
            _ => "NULLS LAST",
        };

        format!("{} {direction} {nulls}, address ASC", field.column())
    }
}
