//! Resources read from the resource manager on every run

use serde::Serialize;

/// A subscription that may contain SQL servers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Subscription {
    pub id: String,
    pub display_name: String,
}

/// A logical SQL server
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Server {
    /// Full resource ID, used to address child resources
    pub id: String,
    pub name: String,
    pub fully_qualified_domain_name: String,
}

/// A database hosted on a [`Server`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Database {
    /// Full resource ID, used to address replication links
    pub id: String,
    pub name: String,
}

/// Role of a database in one of its replication links
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ReplicationRole {
    Primary,
    Secondary,
    NonReadableSecondary,
    Source,
    Copy,
    /// Role missing or not recognised
    Unknown(Option<String>),
}

impl ReplicationRole {
    /// Parse the role as reported by the resource manager (case-insensitive)
    pub fn parse(raw: Option<&str>) -> Self {
        let Some(value) = raw else {
            return ReplicationRole::Unknown(None);
        };
        match value.to_ascii_lowercase().as_str() {
            "primary" => ReplicationRole::Primary,
            "secondary" => ReplicationRole::Secondary,
            "nonreadablesecondary" => ReplicationRole::NonReadableSecondary,
            "source" => ReplicationRole::Source,
            "copy" => ReplicationRole::Copy,
            _ => ReplicationRole::Unknown(Some(value.to_string())),
        }
    }

    pub fn is_primary(&self) -> bool {
        matches!(self, ReplicationRole::Primary)
    }
}

/// One replication link of a database
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplicationLink {
    pub name: String,
    pub role: ReplicationRole,
}
