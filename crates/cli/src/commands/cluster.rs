//! Kubernetes recovery commands

use anyhow::Result;
use colored::Colorize;
use tabled::Tabled;

use crate::client::{ApiClient, PodHealth, ScaleRequest, SweepReport, SweepRequest};
use crate::output::{
    color_reason, print_json, print_success, print_table, print_warning, OutputFormat,
};

/// Row for the pod health table
#[derive(Tabled)]
struct PodRow {
    #[tabled(rename = "Pod")]
    name: String,
    #[tabled(rename = "Ready")]
    ready: String,
    #[tabled(rename = "Waiting Reason")]
    reason: String,
}

/// Row for sweep failures
#[derive(Tabled)]
struct FailureRow {
    #[tabled(rename = "Pod")]
    pod: String,
    #[tabled(rename = "Error")]
    error: String,
    #[tabled(rename = "Retryable")]
    retryable: String,
}

/// List pods for an app label with their health
pub async fn list_pods(client: &ApiClient, app: &str, format: OutputFormat) -> Result<()> {
    let pods: Vec<PodHealth> = client.get(&format!("api/k8s/pods?app={}", app)).await?;

    match format {
        OutputFormat::Json => print_json(&pods)?,
        OutputFormat::Table => {
            if pods.is_empty() {
                print_warning(&format!("No pods found for app={}", app));
                return Ok(());
            }

            let rows: Vec<PodRow> = pods
                .iter()
                .map(|p| PodRow {
                    name: p.name.clone(),
                    ready: if p.ready {
                        "yes".green().to_string()
                    } else {
                        "no".red().to_string()
                    },
                    reason: color_reason(p.waiting_reason.as_deref()),
                })
                .collect();

            print_table(rows);
        }
    }

    Ok(())
}

/// Run a recovery sweep
pub async fn sweep(client: &ApiClient, app: &str, mode: &str, format: OutputFormat) -> Result<()> {
    let request = SweepRequest {
        app_label: app.to_string(),
        mode: mode.to_string(),
    };
    let report: SweepReport = client.post("api/k8s/sweep", &request).await?;

    match format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Table => {
            println!("{}", format!("Sweep app={} ({})", report.app_label, report.mode).bold());
            println!("Inspected: {}", report.inspected);

            if report.deleted.is_empty() {
                print_success("No pods needed recovery");
            } else {
                print_success(&format!("Deleted {} pods", report.deleted.len()));
                for pod in &report.deleted {
                    println!("  - {}", pod);
                }
            }

            if !report.failures.is_empty() {
                print_warning(&format!("{} pods could not be handled", report.failures.len()));
                let rows: Vec<FailureRow> = report
                    .failures
                    .into_iter()
                    .map(|f| FailureRow {
                        pod: f.pod,
                        error: f.error,
                        retryable: if f.retryable { "yes" } else { "no" }.to_string(),
                    })
                    .collect();
                print_table(rows);
            }
        }
    }

    Ok(())
}

/// Set a deployment's replica count
pub async fn scale(
    client: &ApiClient,
    deployment: &str,
    replicas: i32,
    format: OutputFormat,
) -> Result<()> {
    let response: serde_json::Value = client
        .post(
            &format!("api/k8s/deployments/{}/scale", deployment),
            &ScaleRequest { replicas },
        )
        .await?;

    match format {
        OutputFormat::Json => print_json(&response)?,
        OutputFormat::Table => print_success(&format!(
            "Deployment {} scaled to {} replicas",
            deployment.cyan(),
            replicas
        )),
    }

    Ok(())
}

/// Trigger a rolling restart of a deployment
pub async fn restart(client: &ApiClient, deployment: &str, format: OutputFormat) -> Result<()> {
    let response: serde_json::Value = client
        .post(
            &format!("api/k8s/deployments/{}/restart", deployment),
            &serde_json::json!({}),
        )
        .await?;

    match format {
        OutputFormat::Json => print_json(&response)?,
        OutputFormat::Table => {
            print_success(&format!("Restart requested for {}", deployment.cyan()))
        }
    }

    Ok(())
}
