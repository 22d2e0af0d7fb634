//! Core data models for the healing control loop

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{HealError, HealResult};

/// Remediation or energy action chosen for a service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    RestartService,
    EnergyScaleDown,
    EnergyScaleUp,
    EnergyStable,
    NoAction,
}

impl Action {
    pub const ALL: [Action; 5] = [
        Action::RestartService,
        Action::EnergyScaleDown,
        Action::EnergyScaleUp,
        Action::EnergyStable,
        Action::NoAction,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::RestartService => "RESTART_SERVICE",
            Action::EnergyScaleDown => "ENERGY_SCALE_DOWN",
            Action::EnergyScaleUp => "ENERGY_SCALE_UP",
            Action::EnergyStable => "ENERGY_STABLE",
            Action::NoAction => "NO_ACTION",
        }
    }

    /// Parse an action name, ignoring case and surrounding whitespace
    pub fn parse(raw: &str) -> Option<Action> {
        let raw = raw.trim();
        Action::ALL
            .into_iter()
            .find(|action| action.as_str().eq_ignore_ascii_case(raw))
    }

    /// Restart and scale actions count as high-risk in insights
    pub fn is_high_risk(&self) -> bool {
        let name = self.as_str().to_ascii_lowercase();
        name.contains("restart") || name.contains("scale")
    }
}

impl std::str::FromStr for Action {
    type Err = HealError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::parse(s).ok_or_else(|| HealError::UnknownAction(s.to_string()))
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse classification of a classifier's free-text prediction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PredictionLabel {
    Low,
    Medium,
    High,
    Overload,
    Unknown,
}

impl PredictionLabel {
    /// Classify a raw label by case-insensitive substring.
    ///
    /// Precedence is overload, high, low, medium.
    pub fn classify(raw: &str) -> Self {
        let lower = raw.to_lowercase();
        if lower.contains("overload") {
            PredictionLabel::Overload
        } else if lower.contains("high") {
            PredictionLabel::High
        } else if lower.contains("low") {
            PredictionLabel::Low
        } else if lower.contains("medium") {
            PredictionLabel::Medium
        } else {
            PredictionLabel::Unknown
        }
    }

    /// High and overload predictions demand immediate remediation
    pub fn is_failure_risk(&self) -> bool {
        matches!(self, PredictionLabel::High | PredictionLabel::Overload)
    }
}

/// Pre-computed risk buckets carried on alerts and ledger records
pub mod cluster {
    pub const LOW: i32 = 0;
    pub const MEDIUM: i32 = 1;
    pub const HIGH: i32 = 2;
    /// Manual triggers and metric-driven auto-heal
    pub const UNSCOPED: i32 = -1;
}

/// Resource usage sample for one service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricSample {
    pub service_name: String,
    pub cpu: f64,
    /// Memory in MB
    pub memory: f64,
    pub network: f64,
    #[serde(rename = "diskIO")]
    pub disk_io: f64,
    pub energy: f64,
    pub latency_ms: u64,
    pub timestamp: DateTime<Utc>,
}

impl MetricSample {
    /// Reject negative, non-finite or unnamed samples
    pub fn validate(&self) -> HealResult<()> {
        if self.service_name.trim().is_empty() {
            return Err(HealError::invalid_input("serviceName must not be empty"));
        }
        for (field, value) in [
            ("cpu", self.cpu),
            ("memory", self.memory),
            ("network", self.network),
            ("diskIO", self.disk_io),
            ("energy", self.energy),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(HealError::invalid_input(format!(
                    "{field} must be a non-negative number"
                )));
            }
        }
        Ok(())
    }
}

/// Audit record of one executed action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealingRecord {
    pub id: u64,
    pub service_name: String,
    pub cluster: i32,
    pub action_taken: Action,
    pub timestamp: DateTime<Utc>,
}

/// Ledger input; the ledger assigns id and timestamp under its writer lock
#[derive(Debug, Clone, PartialEq)]
pub struct NewHealingRecord {
    pub service_name: String,
    pub cluster: i32,
    pub action_taken: Action,
}

impl NewHealingRecord {
    pub fn new(service_name: impl Into<String>, cluster: i32, action_taken: Action) -> Self {
        Self {
            service_name: service_name.into(),
            cluster,
            action_taken,
        }
    }

    pub(crate) fn into_record(self, id: u64, timestamp: DateTime<Utc>) -> HealingRecord {
        HealingRecord {
            id,
            service_name: self.service_name,
            cluster: self.cluster,
            action_taken: self.action_taken,
            timestamp,
        }
    }
}

/// Live health of one pod, valid for the duration of a sweep
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodHealth {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub waiting_reason: Option<String>,
    pub ready: bool,
}
