//! Healing control and report commands

use anyhow::{Context, Result};
use colored::Colorize;
use tabled::Tabled;

use crate::client::{
    ActionOutcome, AgentStatus, AlertOutcome, AlertRequest, ApiClient, AutoHealRequest,
    HealingRecord, InsightsSummary, ManualHealRequest,
};
use crate::output::{
    color_action, color_status, format_timestamp, print_info, print_json, print_success,
    print_table, print_warning, OutputFormat,
};

/// Row for the healing log table
#[derive(Tabled)]
struct HealingRow {
    #[tabled(rename = "ID")]
    id: u64,
    #[tabled(rename = "Service")]
    service: String,
    #[tabled(rename = "Cluster")]
    cluster: String,
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "Timestamp")]
    timestamp: String,
}

/// Show agent status
pub async fn show_status(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let status: AgentStatus = client.get("api/status").await?;

    match format {
        OutputFormat::Json => print_json(&status)?,
        OutputFormat::Table => {
            println!("{}", "Healer Agent".bold());
            println!("{}", "=".repeat(40));
            println!("Status:    {}", color_status(&status.status));
            println!("Message:   {}", status.message);
            println!("Version:   {}", status.version);
            println!("Timestamp: {}", format_timestamp(&status.timestamp));
        }
    }

    Ok(())
}

/// Show the most recent healing records
pub async fn show_logs(client: &ApiClient, limit: usize, format: OutputFormat) -> Result<()> {
    let records: Vec<HealingRecord> = client
        .get(&format!("api/healing/logs?limit={}", limit))
        .await?;

    match format {
        OutputFormat::Json => print_json(&records)?,
        OutputFormat::Table => {
            if records.is_empty() {
                print_warning("No healing actions recorded");
                return Ok(());
            }

            let count = records.len();
            let rows: Vec<HealingRow> = records
                .into_iter()
                .map(|r| HealingRow {
                    id: r.id,
                    service: r.service_name,
                    cluster: if r.cluster < 0 {
                        "-".to_string()
                    } else {
                        r.cluster.to_string()
                    },
                    action: color_action(&r.action_taken),
                    timestamp: format_timestamp(&r.timestamp),
                })
                .collect();

            print_table(rows);
            println!("\nShowing {} most recent actions", count);
        }
    }

    Ok(())
}

/// Show the insights summary
pub async fn show_insights(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let insights: InsightsSummary = client.get("api/reports/insights").await?;

    match format {
        OutputFormat::Json => print_json(&insights)?,
        OutputFormat::Table => {
            println!("{}", "Healing Insights".bold());
            println!("{}", "=".repeat(40));
            println!("Total healings:     {}", insights.total_healings);
            println!("High-risk actions:  {}", insights.high_risk_actions);
            println!("Last action:        {}", color_action(&insights.last_action));
            println!(
                "Last action time:   {}",
                format_timestamp(&insights.last_failure_time)
            );
            println!("Average CPU:        {:.2}%", insights.average_cpu);
            println!("Average memory:     {:.2} MB", insights.average_memory);
            println!();
            print_info(&insights.summary);
        }
    }

    Ok(())
}

/// Decide and execute an action from a prediction and current usage
pub async fn auto_heal(
    client: &ApiClient,
    request: AutoHealRequest,
    format: OutputFormat,
) -> Result<()> {
    let outcome: ActionOutcome = client.post("api/healing/auto", &request).await?;
    print_outcome(&outcome, format)
}

/// Execute an operator-chosen action
pub async fn manual_heal(
    client: &ApiClient,
    request: ManualHealRequest,
    format: OutputFormat,
) -> Result<()> {
    let requested = request.action.clone();
    let outcome: ActionOutcome = client.post("api/healing/manual", &request).await?;

    let unknown = !outcome.action.eq_ignore_ascii_case(requested.trim());
    if matches!(format, OutputFormat::Table) && unknown {
        print_warning(&format!("Unknown action '{}', nothing was executed", requested));
    }
    print_outcome(&outcome, format)
}

/// Send an alert with optional `key=value` metrics
pub async fn send_alert(
    client: &ApiClient,
    service: String,
    metrics: Vec<String>,
    cluster: Option<i32>,
    format: OutputFormat,
) -> Result<()> {
    let request = AlertRequest {
        service_name: service.clone(),
        metrics: parse_metrics(&metrics)?,
        cluster,
    };
    let outcome: AlertOutcome = client.post("api/alerts", &request).await?;

    match format {
        OutputFormat::Json => print_json(&outcome)?,
        OutputFormat::Table => {
            print_success(&format!(
                "Alert {} for {} (cluster {})",
                color_status(&outcome.status),
                service.cyan(),
                outcome.cluster
            ));
            println!("Action: {}", color_action(&outcome.action));
            println!("Result: {}", outcome.result);
        }
    }

    Ok(())
}

fn print_outcome(outcome: &ActionOutcome, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(outcome)?,
        OutputFormat::Table => {
            print_success(&format!("{}: {}", outcome.service.cyan(), outcome.result));
            println!("Action: {}", color_action(&outcome.action));
        }
    }
    Ok(())
}

/// Parse `cpu=12.5`-style pairs into a JSON metrics map
fn parse_metrics(pairs: &[String]) -> Result<serde_json::Map<String, serde_json::Value>> {
    let mut metrics = serde_json::Map::new();
    for pair in pairs {
        let (key, value) = pair
            .split_once('=')
            .with_context(|| format!("Metric '{}' must be key=value", pair))?;
        let value: f64 = value
            .trim()
            .parse()
            .with_context(|| format!("Metric '{}' is not a number", key))?;
        metrics.insert(key.trim().to_string(), serde_json::json!(value));
    }
    Ok(metrics)
}
