//! CSV exports of the ledger and metric samples

use std::fmt::Write;

use crate::models::{HealingRecord, MetricSample};

pub const HEALING_CSV_HEADER: &str = "ID,Service,Cluster,Action,Timestamp";
pub const METRICS_CSV_HEADER: &str = "CPU,Memory,Network,Disk,Timestamp";

pub const HEALING_CSV_FILENAME: &str = "healing_logs.csv";
pub const METRICS_CSV_FILENAME: &str = "metrics.csv";

/// Render healing records, one row per record in the given order
pub fn healing_csv(records: &[HealingRecord]) -> String {
    let mut out = String::with_capacity(64 * (records.len() + 1));
    out.push_str(HEALING_CSV_HEADER);
    out.push('\n');

    for record in records {
        let _ = writeln!(
            out,
            "{},{},{},{},{}",
            record.id,
            escape(&record.service_name),
            record.cluster,
            record.action_taken,
            record.timestamp.to_rfc3339()
        );
    }
    out
}

/// Render metric samples, one row per sample in the given order
pub fn metrics_csv(samples: &[MetricSample]) -> String {
    let mut out = String::with_capacity(64 * (samples.len() + 1));
    out.push_str(METRICS_CSV_HEADER);
    out.push('\n');

    // Debug keeps the decimal point on whole numbers: 512.0, not 512
    for sample in samples {
        let _ = writeln!(
            out,
            "{:?},{:?},{:?},{:?},{}",
            sample.cpu,
            sample.memory,
            sample.network,
            sample.disk_io,
            sample.timestamp.to_rfc3339()
        );
    }
    out
}

/// Quote a field containing a delimiter, quote or line break
fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Action;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_healing_csv() {
        let timestamp = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let records = vec![
            HealingRecord {
                id: 1,
                service_name: "payment-service".to_string(),
                cluster: 2,
                action_taken: Action::RestartService,
                timestamp,
            },
            HealingRecord {
                id: 2,
                service_name: "orders, eu".to_string(),
                cluster: -1,
                action_taken: Action::NoAction,
                timestamp,
            },
        ];

        let csv = healing_csv(&records);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], HEALING_CSV_HEADER);
        assert_eq!(
            lines[1],
            "1,payment-service,2,RESTART_SERVICE,2024-05-01T12:00:00+00:00"
        );
        assert_eq!(
            lines[2],
            "2,\"orders, eu\",-1,NO_ACTION,2024-05-01T12:00:00+00:00"
        );
    }

    #[test]
    fn test_metrics_csv() {
        let sample = MetricSample {
            service_name: "api".to_string(),
            cpu: 42.5,
            memory: 512.0,
            network: 3.25,
            disk_io: 1.0,
            energy: 10.0,
            latency_ms: 4,
            timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap(),
        };

        let csv = metrics_csv(&[sample]);
        assert_eq!(
            csv,
            "CPU,Memory,Network,Disk,Timestamp\n42.5,512.0,3.25,1.0,2024-05-01T00:00:00+00:00\n"
        );
    }

    #[test]
    fn test_empty_exports_have_header_only() {
        assert_eq!(healing_csv(&[]), "ID,Service,Cluster,Action,Timestamp\n");
        assert_eq!(metrics_csv(&[]), "CPU,Memory,Network,Disk,Timestamp\n");
    }

    #[test]
    fn test_escape_quotes() {
        assert_eq!(escape("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(escape("plain"), "plain");
    }
}
