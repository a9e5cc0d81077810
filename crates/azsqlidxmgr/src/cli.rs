//! CLI structure
//!
//! A single root command with no subcommands. Every option can also be set
//! in the config file; values given here win.

use std::path::PathBuf;
use std::time::Duration;

use azsqlidxmgr_core::Overrides;
use azsqlidxmgr_core::duration::parse_duration;
use clap::Parser;

/// Azure SQL Index Manager
#[derive(Parser, Debug)]
#[command(name = "azsqlidxmgr")]
#[command(version, about = "Azure SQL Index Manager")]
#[command(long_about = "
Azure SQL Index Manager

Walks every subscription, SQL server and database your Azure identity can see
and runs the AzureSQLMaintenance procedure on each primary user database,
rebuilding or reorganizing fragmented indexes and refreshing statistics.

Authentication uses the default Azure credential chain (environment,
managed identity, Azure CLI). Pass --interactive to fall back to 'az login'.

EXAMPLES:
    # Maintain everything you have access to
    azsqlidxmgr

    # See what would be done without touching any database
    azsqlidxmgr --dry-run -v

    # Limit to one subscription and two databases
    azsqlidxmgr --subscription Production --database-name orders --database-name billing

    # Allow longer runs with fewer retries
    azsqlidxmgr --execution-timeout 02:00:00 --max-tries 3

    # Machine-readable summary
    azsqlidxmgr -o json
")]
pub struct Cli {
    /// Name or ID of subscriptions allowed. If none are provided, all subscriptions are checked.
    #[arg(long = "subscription", value_name = "NAME_OR_ID")]
    pub subscriptions: Vec<String>,

    /// The name of the server to work on. When none are provided, all servers are worked on.
    #[arg(long = "server-name", value_name = "NAME")]
    pub server_names: Vec<String>,

    /// The name of the databases to work on. When none are provided, all databases except system ones are worked on.
    #[arg(long = "database-name", value_name = "NAME")]
    pub database_names: Vec<String>,

    /// Allow interactive authentication mode (runs 'az login' when no credential is available).
    #[arg(long)]
    pub interactive: bool,

    /// Maximum number of tries executing the SQL script [default: 6]
    #[arg(long, value_name = "COUNT", value_parser = clap::value_parser!(u32).range(1..))]
    pub max_tries: Option<u32>,

    /// Maximum time the maintenance procedure may run per attempt, e.g. 01:00:00 or 90m [default: 60m]
    #[arg(long, value_name = "DURATION", value_parser = parse_duration)]
    pub execution_timeout: Option<Duration>,

    /// Test the logic without actually running the script.
    #[arg(long)]
    pub dry_run: bool,

    /// ALTER script to apply instead of the bundled procedure definition
    #[arg(long, value_name = "PATH", env = "AZSQLIDXMGR_PROCEDURE_SCRIPT")]
    pub procedure_script: Option<PathBuf>,

    /// Path to alternate configuration file
    #[arg(long, env = "AZSQLIDXMGR_CONFIG_FILE")]
    pub config_file: Option<PathBuf>,

    /// Output format for the run summary
    #[arg(long, short = 'o', value_enum, default_value = "table")]
    pub output: OutputFormat,

    /// Enable verbose logging
    #[arg(long, short, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table format
    Table,
    /// JSON output
    Json,
    /// YAML output
    Yaml,
}

impl Cli {
    /// Command-line values to layer over the config file
    pub fn overrides(&self) -> Overrides {
        Overrides {
            subscriptions: self.subscriptions.clone(),
            server_names: self.server_names.clone(),
            database_names: self.database_names.clone(),
            interactive: self.interactive,
            dry_run: self.dry_run,
            max_tries: self.max_tries,
            execution_timeout: self.execution_timeout,
            procedure_script: self.procedure_script.clone(),
        }
    }
}
