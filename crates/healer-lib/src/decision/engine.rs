//! Final healing decision
//!
//! Failure remediation takes strict priority over energy optimization: a
//! high-risk prediction is never downgraded to an energy action.

use super::EnergyRuleEngine;
use crate::models::{cluster, Action, PredictionLabel};

/// Combines failure-priority rules with the energy rules
#[derive(Debug, Clone, Default)]
pub struct HealingDecisionEngine {
    energy: EnergyRuleEngine,
}

impl HealingDecisionEngine {
    pub fn new(energy: EnergyRuleEngine) -> Self {
        Self { energy }
    }

    pub fn energy(&self) -> &EnergyRuleEngine {
        &self.energy
    }

    /// Decide from a raw prediction string
    pub fn decide_final_action(&self, prediction: &str, cpu: f64, memory: f64) -> Action {
        self.decide(PredictionLabel::classify(prediction), cpu, memory)
    }

    /// Decide from a classified prediction
    pub fn decide(&self, label: PredictionLabel, cpu: f64, memory: f64) -> Action {
        if label.is_failure_risk() {
            return Action::RestartService;
        }

        // The energy sentinel doubles as the final "nothing to do"
        self.energy.decide(cpu, memory, label)
    }

    /// Map a pre-computed risk cluster straight to an action.
    ///
    /// Independent of the metric-based path; callers use one or the other.
    pub fn decide_cluster_action(cluster_id: i32) -> Action {
        match cluster_id {
            cluster::HIGH => Action::RestartService,
            cluster::LOW => Action::EnergyScaleDown,
            _ => Action::EnergyStable,
        }
    }
}
