//! Run summary rendering

use anyhow::{Context, Result};
use azsqlidxmgr_core::{DatabaseOutcome, RunSummary};
use comfy_table::Table;

use crate::cli::OutputFormat;

pub fn print_summary(summary: &RunSummary, format: OutputFormat) -> Result<()> {
    println!("{}", render_summary(summary, format)?);
    Ok(())
}

pub fn render_summary(summary: &RunSummary, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => {
            serde_json::to_string_pretty(summary).context("Failed to render summary as JSON")
        }
        OutputFormat::Yaml => {
            serde_yaml::to_string(summary).context("Failed to render summary as YAML")
        }
        OutputFormat::Table => Ok(render_table(summary)),
    }
}

fn render_table(summary: &RunSummary) -> String {
    let mut out = String::new();

    if !summary.databases.is_empty() {
        let mut table = Table::new();
        table.set_header(vec![
            "Subscription",
            "Server",
            "Database",
            "Outcome",
            "Attempts",
        ]);
        for report in &summary.databases {
            table.add_row(vec![
                report.subscription.clone(),
                report.server.clone(),
                report.database.clone(),
                report.outcome.as_str().to_string(),
                report.attempts.to_string(),
            ]);
        }
        out.push_str(&table.to_string());
        out.push('\n');
    }

    let processed = if summary.dry_run {
        "would be maintained"
    } else {
        "maintained"
    };
    out.push_str(&format!(
        "{} database(s) {}, {} not maintained, {} skipped by filters",
        summary.succeeded(),
        processed,
        summary.unsuccessful(),
        summary.databases_skipped.total()
    ));

    let exhausted = summary.count(DatabaseOutcome::RetriesExhausted);
    if exhausted > 0 {
        out.push_str(&format!(
            "\n{} database(s) kept timing out; consider a longer --execution-timeout",
            exhausted
        ));
    }

    out
}
