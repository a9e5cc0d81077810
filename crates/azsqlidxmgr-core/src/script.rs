//! Maintenance procedure scripts

use std::fs;
use std::path::Path;

use crate::error::{CoreError, Result};

/// Name of the stored procedure kept in every database
pub const PROCEDURE_NAME: &str = "AzureSQLMaintenance";

/// Creates a placeholder procedure when none exists. The real body is applied
/// by the ALTER script right after.
pub const CREATE_PROCEDURE_SQL: &str = "if object_id('AzureSQLMaintenance') is null\n\texec('create procedure AzureSQLMaintenance as /*dummy procedure body*/ select 1;')";

/// Runs maintenance on all applicable objects
pub const EXECUTE_PROCEDURE_SQL: &str = "exec AzureSQLMaintenance 'all'";

const BUNDLED_ALTER_SQL: &str = include_str!("../sql/AzureSQLMaintenance.sql");

/// The ALTER definition of the maintenance procedure, loaded once per process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcedureScript {
    alter_sql: String,
    source: String,
}

impl ProcedureScript {
    /// The script shipped with the binary
    pub fn bundled() -> Self {
        Self {
            alter_sql: BUNDLED_ALTER_SQL.to_string(),
            source: "bundled".to_string(),
        }
    }

    /// Load an ALTER script from disk
    pub fn from_path(path: &Path) -> Result<Self> {
        let alter_sql = fs::read_to_string(path).map_err(|e| {
            CoreError::Validation(format!(
                "Failed to read procedure script {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_sql(alter_sql, path.display().to_string())
    }

    /// Wrap script text, rejecting blank scripts
    pub fn from_sql(alter_sql: impl Into<String>, source: impl Into<String>) -> Result<Self> {
        let alter_sql = alter_sql.into();
        let source = source.into();
        if alter_sql.trim().is_empty() {
            return Err(CoreError::Validation(format!(
                "Procedure script '{}' is empty",
                source
            )));
        }
        Ok(Self { alter_sql, source })
    }

    /// Load from `path` when given, otherwise use the bundled script
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_path(path),
            None => Ok(Self::bundled()),
        }
    }

    pub fn alter_sql(&self) -> &str {
        &self.alter_sql
    }

    /// Where the script came from, for logging
    pub fn source(&self) -> &str {
        &self.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_bundled_script_alters_the_procedure() {
        let script = ProcedureScript::bundled();
        assert_eq!(script.source(), "bundled");
        assert!(
            script
                .alter_sql()
                .to_lowercase()
                .contains("alter procedure [dbo].[azuresqlmaintenance]")
        );
    }

    #[test]
    fn test_create_statement_is_idempotent_guard() {
        assert!(CREATE_PROCEDURE_SQL.starts_with("if object_id('AzureSQLMaintenance') is null"));
        assert!(EXECUTE_PROCEDURE_SQL.ends_with("'all'"));
    }

    #[test]
    fn test_from_path_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "alter procedure AzureSQLMaintenance as select 2;").unwrap();

        let script = ProcedureScript::load(Some(file.path())).unwrap();
        assert!(script.alter_sql().contains("select 2"));
        assert_eq!(script.source(), file.path().display().to_string());
    }

    #[test]
    fn test_blank_script_rejected() {
        let err = ProcedureScript::from_sql("   \n", "fixture").unwrap_err();
        assert!(err.to_string().contains("empty"));
    }

    #[test]
    fn test_missing_file_is_validation_error() {
        let err = ProcedureScript::from_path(Path::new("/nonexistent/script.sql")).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }
}
