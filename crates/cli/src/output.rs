//! Output formatting utilities

use anyhow::Result;
use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print a value as pretty JSON
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print rows as a rounded table
pub fn print_table<T: Tabled>(rows: Vec<T>) {
    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{}", table);
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Color an action name by risk
pub fn color_action(action: &str) -> String {
    match action {
        "RESTART_SERVICE" => action.red().to_string(),
        "ENERGY_SCALE_UP" => action.yellow().to_string(),
        "ENERGY_SCALE_DOWN" => action.cyan().to_string(),
        "ENERGY_STABLE" | "NO_ACTION" => action.green().to_string(),
        _ => action.to_string(),
    }
}

/// Color status based on value
pub fn color_status(status: &str) -> String {
    match status.to_lowercase().as_str() {
        "up" | "healthy" | "ready" | "received" => status.green().to_string(),
        "degraded" | "warning" => status.yellow().to_string(),
        "unhealthy" | "error" | "failed" | "not ready" => status.red().to_string(),
        _ => status.to_string(),
    }
}

/// Color a pod's waiting reason; stuck reasons in red
pub fn color_reason(reason: Option<&str>) -> String {
    match reason {
        Some(r @ ("CrashLoopBackOff" | "ErrImagePull" | "ImagePullBackOff")) => {
            r.red().to_string()
        }
        Some(r) => r.yellow().to_string(),
        None => "-".to_string(),
    }
}

/// Format timestamp for display
pub fn format_timestamp(ts: &str) -> String {
    match chrono::DateTime::parse_from_rfc3339(ts) {
        Ok(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        Err(_) => ts.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_timestamp() {
        assert_eq!(
            format_timestamp("2024-03-01T12:30:45.123Z"),
            "2024-03-01 12:30:45"
        );
        assert_eq!(format_timestamp("N/A"), "N/A");
    }

    #[test]
    fn test_color_reason_without_reason() {
        assert_eq!(color_reason(None), "-");
    }
}
