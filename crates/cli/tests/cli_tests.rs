//! CLI integration tests

use std::process::Command;

fn healctl(args: &[&str]) -> (bool, String) {
    let output = Command::new("cargo")
        .args(["run", "-q", "-p", "healctl", "--"])
        .args(args)
        .output()
        .expect("Failed to execute command");

    (
        output.status.success(),
        String::from_utf8_lossy(&output.stdout).into_owned(),
    )
}

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let (success, stdout) = healctl(&["--help"]);

    assert!(success, "CLI help should succeed");
    assert!(stdout.contains("healer agent"), "Should show app description");
    for command in [
        "status", "logs", "insights", "heal", "alert", "pods", "sweep", "scale", "restart",
        "export",
    ] {
        assert!(stdout.contains(command), "Should show {} command", command);
    }
}

/// Test that the CLI shows version
#[test]
fn test_cli_version() {
    let (success, stdout) = healctl(&["--version"]);

    assert!(success, "CLI version should succeed");
    assert!(stdout.contains("healctl"), "Should show binary name");
}

#[test]
fn test_heal_auto_help() {
    let (success, stdout) = healctl(&["heal", "auto", "--help"]);

    assert!(success, "Heal auto help should succeed");
    assert!(stdout.contains("--prediction"));
    assert!(stdout.contains("--cpu"));
    assert!(stdout.contains("--memory"));
}

#[test]
fn test_heal_manual_help() {
    let (success, stdout) = healctl(&["heal", "manual", "--help"]);

    assert!(success, "Heal manual help should succeed");
    assert!(stdout.contains("--action"));
}

#[test]
fn test_logs_help() {
    let (success, stdout) = healctl(&["logs", "--help"]);

    assert!(success, "Logs help should succeed");
    assert!(stdout.contains("--limit"));
}

#[test]
fn test_alert_help() {
    let (success, stdout) = healctl(&["alert", "--help"]);

    assert!(success, "Alert help should succeed");
    assert!(stdout.contains("--metric"));
    assert!(stdout.contains("--cluster"));
}

#[test]
fn test_sweep_help() {
    let (success, stdout) = healctl(&["sweep", "--help"]);

    assert!(success, "Sweep help should succeed");
    assert!(stdout.contains("--app"));
    assert!(stdout.contains("--mode"));
    assert!(stdout.contains("stuck"));
    assert!(stdout.contains("unready"));
}

#[test]
fn test_scale_help() {
    let (success, stdout) = healctl(&["scale", "--help"]);

    assert!(success, "Scale help should succeed");
    assert!(stdout.contains("--replicas"));
}

#[test]
fn test_export_help() {
    let (success, stdout) = healctl(&["export", "--help"]);

    assert!(success, "Export help should succeed");
    assert!(stdout.contains("healing"));
    assert!(stdout.contains("metrics"));
}

#[test]
fn test_format_option() {
    let (success, stdout) = healctl(&["--help"]);

    assert!(success);
    assert!(stdout.contains("--format"));
    assert!(stdout.contains("--api-url"));
}

#[test]
fn test_invalid_sweep_mode_rejected() {
    let (success, _) = healctl(&["sweep", "--app", "payments", "--mode", "everything"]);
    assert!(!success, "Unknown sweep mode should fail to parse");
}

#[test]
fn test_missing_subcommand_fails() {
    let (success, _) = healctl(&[]);
    assert!(!success, "Running without a subcommand should fail");
}
