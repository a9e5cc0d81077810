//! End-of-run report

use serde::Serialize;

use crate::error::SqlErrorKind;
use crate::filter::DatabaseDecision;
use crate::retry::RetryOutcome;

/// What happened to one eligible database
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DatabaseOutcome {
    Completed,
    DryRun,
    RetriesExhausted,
    IpBlocked,
    LoginFailed,
    ReadOnlyOrForbidden,
}

impl DatabaseOutcome {
    /// Outcome for a handled SQL failure, if the kind is one the run skips past
    pub fn from_skipped(kind: SqlErrorKind) -> Option<Self> {
        match kind {
            SqlErrorKind::IpBlocked => Some(DatabaseOutcome::IpBlocked),
            SqlErrorKind::LoginFailed => Some(DatabaseOutcome::LoginFailed),
            SqlErrorKind::ReadOnlyOrForbidden => Some(DatabaseOutcome::ReadOnlyOrForbidden),
            SqlErrorKind::TransientTimeout | SqlErrorKind::Cancelled | SqlErrorKind::Other => None,
        }
    }

    pub fn from_retry(outcome: RetryOutcome, dry_run: bool) -> Self {
        match outcome {
            RetryOutcome::Succeeded { .. } if dry_run => DatabaseOutcome::DryRun,
            RetryOutcome::Succeeded { .. } => DatabaseOutcome::Completed,
            RetryOutcome::Exhausted { .. } => DatabaseOutcome::RetriesExhausted,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DatabaseOutcome::Completed => "completed",
            DatabaseOutcome::DryRun => "dry-run",
            DatabaseOutcome::RetriesExhausted => "retries-exhausted",
            DatabaseOutcome::IpBlocked => "ip-blocked",
            DatabaseOutcome::LoginFailed => "login-failed",
            DatabaseOutcome::ReadOnlyOrForbidden => "read-only-or-forbidden",
        }
    }
}

/// One row of the report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatabaseReport {
    /// Subscription display name
    pub subscription: String,
    pub server: String,
    pub database: String,
    pub outcome: DatabaseOutcome,
    pub attempts: u32,
}

/// Databases passed over by the filters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SkipCounts {
    pub system: u32,
    pub not_primary: u32,
    pub not_selected: u32,
}

impl SkipCounts {
    pub fn record(&mut self, decision: DatabaseDecision) {
        match decision {
            DatabaseDecision::Include => {}
            DatabaseDecision::System => self.system += 1,
            DatabaseDecision::NotPrimary => self.not_primary += 1,
            DatabaseDecision::NotSelected => self.not_selected += 1,
        }
    }

    pub fn total(&self) -> u32 {
        self.system + self.not_primary + self.not_selected
    }
}

/// Summary of a complete traversal
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub dry_run: bool,
    pub subscriptions_visited: u32,
    pub subscriptions_skipped: u32,
    pub servers_visited: u32,
    pub servers_skipped: u32,
    pub databases_skipped: SkipCounts,
    pub databases: Vec<DatabaseReport>,
}

impl RunSummary {
    pub fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            ..Default::default()
        }
    }

    pub fn count(&self, outcome: DatabaseOutcome) -> usize {
        self.databases
            .iter()
            .filter(|report| report.outcome == outcome)
            .count()
    }

    /// Databases that got (or would have got) maintenance
    pub fn succeeded(&self) -> usize {
        self.count(DatabaseOutcome::Completed) + self.count(DatabaseOutcome::DryRun)
    }

    /// Eligible databases that did not get maintenance
    pub fn unsuccessful(&self) -> usize {
        self.databases.len() - self.succeeded()
    }
}
