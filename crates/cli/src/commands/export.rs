//! CSV export commands

use anyhow::{Context, Result};

use crate::client::ApiClient;
use crate::output::print_success;

/// Which CSV report to download
#[derive(Debug, Clone, Copy)]
pub enum Report {
    Healing,
    Metrics,
}

impl Report {
    fn path(self) -> &'static str {
        match self {
            Report::Healing => "api/reports/healing/csv",
            Report::Metrics => "api/reports/metrics/csv",
        }
    }

    fn default_filename(self) -> &'static str {
        match self {
            Report::Healing => "healing_logs.csv",
            Report::Metrics => "metrics.csv",
        }
    }
}

/// Download a CSV report to a file, or to stdout when `output` is `-`
pub async fn export(client: &ApiClient, report: Report, output: Option<String>) -> Result<()> {
    let csv = client.get_text(report.path()).await?;

    let target = output.unwrap_or_else(|| report.default_filename().to_string());
    if target == "-" {
        print!("{}", csv);
        return Ok(());
    }

    std::fs::write(&target, &csv).with_context(|| format!("Failed to write {}", target))?;
    let rows = csv.lines().count().saturating_sub(1);
    print_success(&format!("Exported {} rows to {}", rows, target));

    Ok(())
}
