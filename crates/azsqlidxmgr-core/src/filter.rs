//! Inclusion filters for subscriptions, servers and databases
//!
//! An empty list means "include everything". Matching is case-insensitive
//! equality; there is no wildcard or prefix matching.

use serde::Serialize;

use crate::model::{Database, ReplicationLink, Server, Subscription};

/// The only database never touched, whatever the filters say
pub const SYSTEM_DATABASE: &str = "master";

/// Allow-lists applied during traversal
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filters {
    pub subscriptions: Vec<String>,
    pub server_names: Vec<String>,
    pub database_names: Vec<String>,
}

/// Why a database was or was not selected for maintenance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DatabaseDecision {
    Include,
    /// System database
    System,
    /// At least one replication link is not primary
    NotPrimary,
    /// Not in the database allow-list
    NotSelected,
}

impl DatabaseDecision {
    pub fn is_included(&self) -> bool {
        matches!(self, DatabaseDecision::Include)
    }
}

fn contains_ignore_case(list: &[String], value: &str) -> bool {
    list.iter().any(|entry| entry.eq_ignore_ascii_case(value))
}

impl Filters {
    pub fn new(
        subscriptions: Vec<String>,
        server_names: Vec<String>,
        database_names: Vec<String>,
    ) -> Self {
        Self {
            subscriptions,
            server_names,
            database_names,
        }
    }

    /// Subscription passes when the list is empty or its ID or display name is listed
    pub fn includes_subscription(&self, subscription: &Subscription) -> bool {
        self.subscriptions.is_empty()
            || contains_ignore_case(&self.subscriptions, &subscription.id)
            || contains_ignore_case(&self.subscriptions, &subscription.display_name)
    }

    /// Server passes when the list is empty or its name is listed.
    ///
    /// No server is excluded implicitly.
    pub fn includes_server(&self, server: &Server) -> bool {
        self.server_names.is_empty() || contains_ignore_case(&self.server_names, &server.name)
    }

    /// Decide whether a database gets maintenance.
    ///
    /// The system database check runs first so an explicit
    /// `--database-name master` still excludes it.
    pub fn evaluate_database(
        &self,
        database: &Database,
        links: &[ReplicationLink],
    ) -> DatabaseDecision {
        if database.name == SYSTEM_DATABASE {
            return DatabaseDecision::System;
        }

        if !links.iter().all(|link| link.role.is_primary()) {
            return DatabaseDecision::NotPrimary;
        }

        if !self.database_names.is_empty()
            && !contains_ignore_case(&self.database_names, &database.name)
        {
            return DatabaseDecision::NotSelected;
        }

        DatabaseDecision::Include
    }

    pub fn includes_database(&self, database: &Database, links: &[ReplicationLink]) -> bool {
        self.evaluate_database(database, links).is_included()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ReplicationRole;

    fn db(name: &str) -> Database {
        Database {
            id: format!("/servers/s1/databases/{}", name),
            name: name.to_string(),
        }
    }

    fn link(role: ReplicationRole) -> ReplicationLink {
        ReplicationLink {
            name: "link".to_string(),
            role,
        }
    }

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_empty_filters_include_everything_but_master() {
        let filters = Filters::default();
        assert!(filters.includes_database(&db("orders"), &[]));
        assert_eq!(
            filters.evaluate_database(&db("master"), &[]),
            DatabaseDecision::System
        );
    }

    #[test]
    fn test_master_excluded_even_when_listed() {
        let filters = Filters::new(vec![], vec![], strings(&["master"]));
        assert_eq!(
            filters.evaluate_database(&db("master"), &[]),
            DatabaseDecision::System
        );
    }

    #[test]
    fn test_master_check_is_exact() {
        // Only the exact lowercase name is the system database.
        let filters = Filters::default();
        assert!(filters.includes_database(&db("Master"), &[]));
        assert!(filters.includes_database(&db("masterdata"), &[]));
    }

    #[test]
    fn test_database_name_match_is_case_insensitive() {
        let filters = Filters::new(vec![], vec![], strings(&["Orders"]));
        assert!(filters.includes_database(&db("orders"), &[]));
        assert!(filters.includes_database(&db("ORDERS"), &[]));
        assert_eq!(
            filters.evaluate_database(&db("billing"), &[]),
            DatabaseDecision::NotSelected
        );
    }

    #[test]
    fn test_any_non_primary_link_excludes() {
        let filters = Filters::new(vec![], vec![], strings(&["orders"]));
        let links = vec![
            link(ReplicationRole::Primary),
            link(ReplicationRole::Secondary),
            link(ReplicationRole::Primary),
        ];
        assert_eq!(
            filters.evaluate_database(&db("orders"), &links),
            DatabaseDecision::NotPrimary
        );
    }

    #[test]
    fn test_unknown_role_is_not_primary() {
        let filters = Filters::default();
        let links = vec![link(ReplicationRole::Unknown(None))];
        assert!(!filters.includes_database(&db("orders"), &links));
    }

    #[test]
    fn test_all_primary_links_include() {
        let filters = Filters::default();
        let links = vec![
            link(ReplicationRole::Primary),
            link(ReplicationRole::Primary),
        ];
        assert!(filters.includes_database(&db("orders"), &links));
    }

    #[test]
    fn test_subscription_matches_id_or_display_name() {
        let sub = Subscription {
            id: "00000000-0000-0000-0000-000000000001".to_string(),
            display_name: "Production".to_string(),
        };
        assert!(Filters::default().includes_subscription(&sub));
        assert!(Filters::new(strings(&["production"]), vec![], vec![]).includes_subscription(&sub));
        assert!(
            Filters::new(
                strings(&["00000000-0000-0000-0000-000000000001"]),
                vec![],
                vec![]
            )
            .includes_subscription(&sub)
        );
        assert!(!Filters::new(strings(&["staging"]), vec![], vec![]).includes_subscription(&sub));
    }

    #[test]
    fn test_server_filter() {
        let server = Server {
            id: "/servers/sql-prod".to_string(),
            name: "sql-prod".to_string(),
            fully_qualified_domain_name: "sql-prod.database.windows.net".to_string(),
        };
        assert!(Filters::default().includes_server(&server));
        assert!(Filters::new(vec![], strings(&["SQL-PROD"]), vec![]).includes_server(&server));
        assert!(!Filters::new(vec![], strings(&["sql-dev"]), vec![]).includes_server(&server));
    }
}
