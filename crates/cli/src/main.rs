//! Healer CLI
//!
//! A command-line tool for driving the healer agent: trigger healing
//! actions, inspect the healing ledger and insights, run Kubernetes
//! recovery sweeps and export CSV reports.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use client::{AutoHealRequest, ManualHealRequest};
use commands::{cluster, export, healing};

/// Energy-aware healer CLI
#[derive(Parser)]
#[command(name = "healctl")]
#[command(author, version, about = "CLI for the energy-aware healer agent", long_about = None)]
pub struct Cli {
    /// Agent API URL (can also be set via HEALER_API_URL env var)
    #[arg(long, env = "HEALER_API_URL")]
    pub api_url: Option<String>,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show agent status
    Status,

    /// Show recent healing actions, newest first
    Logs {
        /// Number of records to show
        #[arg(long, short, default_value_t = 10)]
        limit: usize,
    },

    /// Show the healing insights summary
    Insights,

    /// Trigger a healing action
    #[command(subcommand)]
    Heal(HealCommands),

    /// Send an alert for a service
    Alert {
        /// Service name
        service: String,

        /// Metric as key=value, repeatable (e.g. --metric cpu=12.5)
        #[arg(long = "metric", short)]
        metrics: Vec<String>,

        /// Risk cluster (0 low, 1 medium, 2 high)
        #[arg(long)]
        cluster: Option<i32>,
    },

    /// List pods for an app label with their health
    Pods {
        /// App label value (selects app=<label>)
        #[arg(long)]
        app: String,
    },

    /// Delete stuck or unready pods for an app label
    Sweep {
        /// App label value (selects app=<label>)
        #[arg(long)]
        app: String,

        /// Which pods to delete
        #[arg(long, value_enum, default_value = "stuck")]
        mode: SweepModeArg,
    },

    /// Set a deployment's replica count
    Scale {
        /// Deployment name
        deployment: String,

        /// Desired replicas
        #[arg(long)]
        replicas: i32,
    },

    /// Trigger a rolling restart of a deployment
    Restart {
        /// Deployment name
        deployment: String,
    },

    /// Export a CSV report
    Export {
        #[command(subcommand)]
        report: ExportCommands,
    },
}

#[derive(Subcommand)]
pub enum HealCommands {
    /// Decide an action from a prediction and current usage, then execute it
    Auto {
        /// Service name
        service: String,

        /// Prediction label (e.g. "high load", "low", "medium")
        #[arg(long)]
        prediction: String,

        /// CPU usage in percent
        #[arg(long)]
        cpu: f64,

        /// Memory usage in MB
        #[arg(long)]
        memory: f64,
    },

    /// Execute a named action
    Manual {
        /// Service name
        service: String,

        /// Action (RESTART_SERVICE, ENERGY_SCALE_DOWN, ENERGY_SCALE_UP, ENERGY_STABLE, NO_ACTION)
        #[arg(long)]
        action: String,
    },
}

#[derive(Subcommand)]
pub enum ExportCommands {
    /// Export the healing ledger
    Healing {
        /// Output file path, or - for stdout (default: healing_logs.csv)
        #[arg(long, short)]
        output: Option<String>,
    },

    /// Export retained metric samples
    Metrics {
        /// Output file path, or - for stdout (default: metrics.csv)
        #[arg(long, short)]
        output: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SweepModeArg {
    /// Pods waiting in CrashLoopBackOff, ErrImagePull or ImagePullBackOff
    Stuck,
    /// Pods with any container not ready
    Unready,
}

impl SweepModeArg {
    fn as_str(self) -> &'static str {
        match self {
            SweepModeArg::Stuck => "stuck",
            SweepModeArg::Unready => "unready",
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let api_url = config::Config::load()?.resolve_api_url(cli.api_url);
    let client = client::ApiClient::new(&api_url)?;
    let format = cli.format;

    match cli.command {
        Commands::Status => healing::show_status(&client, format).await?,
        Commands::Logs { limit } => healing::show_logs(&client, limit, format).await?,
        Commands::Insights => healing::show_insights(&client, format).await?,
        Commands::Heal(heal_cmd) => match heal_cmd {
            HealCommands::Auto {
                service,
                prediction,
                cpu,
                memory,
            } => {
                let request = AutoHealRequest {
                    service,
                    prediction,
                    cpu,
                    memory,
                };
                healing::auto_heal(&client, request, format).await?;
            }
            HealCommands::Manual { service, action } => {
                healing::manual_heal(&client, ManualHealRequest { service, action }, format)
                    .await?;
            }
        },
        Commands::Alert {
            service,
            metrics,
            cluster,
        } => healing::send_alert(&client, service, metrics, cluster, format).await?,
        Commands::Pods { app } => cluster::list_pods(&client, &app, format).await?,
        Commands::Sweep { app, mode } => {
            cluster::sweep(&client, &app, mode.as_str(), format).await?
        }
        Commands::Scale {
            deployment,
            replicas,
        } => cluster::scale(&client, &deployment, replicas, format).await?,
        Commands::Restart { deployment } => cluster::restart(&client, &deployment, format).await?,
        Commands::Export { report } => match report {
            ExportCommands::Healing { output } => {
                export::export(&client, export::Report::Healing, output).await?
            }
            ExportCommands::Metrics { output } => {
                export::export(&client, export::Report::Metrics, output).await?
            }
        },
    }

    Ok(())
}
