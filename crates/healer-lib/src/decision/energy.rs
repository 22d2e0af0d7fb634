//! Energy-oriented action rules
//!
//! Maps current CPU/memory usage and the predicted load label to an energy
//! action. Rules are evaluated in a fixed order and the first match wins.

use serde::{Deserialize, Serialize};

use crate::models::{Action, PredictionLabel};

/// CPU percentage below which a low-load service may scale down
pub const DEFAULT_LOW_CPU_PERCENT: f64 = 30.0;

/// CPU percentage above which a high-load service may scale up
pub const DEFAULT_HIGH_CPU_PERCENT: f64 = 70.0;

/// Memory (MB) below which a low-load service may scale down
pub const DEFAULT_LOW_MEMORY_MB: f64 = 500.0;

/// Thresholds for the energy rules
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnergyThresholds {
    pub low_cpu_percent: f64,
    pub high_cpu_percent: f64,
    pub low_memory_mb: f64,
}

impl Default for EnergyThresholds {
    fn default() -> Self {
        Self {
            low_cpu_percent: DEFAULT_LOW_CPU_PERCENT,
            high_cpu_percent: DEFAULT_HIGH_CPU_PERCENT,
            low_memory_mb: DEFAULT_LOW_MEMORY_MB,
        }
    }
}

/// Pure rule engine for energy actions
#[derive(Debug, Clone, Default)]
pub struct EnergyRuleEngine {
    thresholds: EnergyThresholds,
}

impl EnergyRuleEngine {
    pub fn new(thresholds: EnergyThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &EnergyThresholds {
        &self.thresholds
    }

    /// Decide from a raw prediction string
    ///
    /// Matches `low` and `high` as case-insensitive substrings of the raw
    /// text, so a label containing both can satisfy either rule.
    pub fn decide_energy_action(&self, cpu: f64, memory: f64, prediction: &str) -> Action {
        let lower = prediction.to_lowercase();
        self.apply(cpu, memory, lower.contains("low"), lower.contains("high"))
    }

    /// Decide from a classified prediction
    ///
    /// # Returns
    /// * `EnergyScaleDown` for low usage with a low prediction
    /// * `EnergyStable` for CPU inside the stable band
    /// * `EnergyScaleUp` for high CPU with a high prediction
    /// * `NoAction` when no energy rule applies
    pub fn decide(&self, cpu: f64, memory: f64, label: PredictionLabel) -> Action {
        self.apply(
            cpu,
            memory,
            label == PredictionLabel::Low,
            label == PredictionLabel::High,
        )
    }

    fn apply(&self, cpu: f64, memory: f64, predicts_low: bool, predicts_high: bool) -> Action {
        let t = &self.thresholds;

        if cpu < t.low_cpu_percent && memory < t.low_memory_mb && predicts_low {
            return Action::EnergyScaleDown;
        }

        if cpu >= t.low_cpu_percent && cpu <= t.high_cpu_percent {
            return Action::EnergyStable;
        }

        if cpu > t.high_cpu_percent && predicts_high {
            return Action::EnergyScaleUp;
        }

        Action::NoAction
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> EnergyRuleEngine {
        EnergyRuleEngine::default()
    }

    #[test]
    fn test_low_load_scales_down() {
        assert_eq!(
            engine().decide_energy_action(10.0, 200.0, "Low"),
            Action::EnergyScaleDown
        );
    }

    #[test]
    fn test_low_load_requires_low_prediction() {
        assert_eq!(
            engine().decide_energy_action(10.0, 200.0, "stable"),
            Action::NoAction
        );
    }

    #[test]
    fn test_low_cpu_with_high_memory_is_not_scaled_down() {
        assert_eq!(
            engine().decide_energy_action(10.0, 500.0, "low"),
            Action::NoAction
        );
    }

    #[test]
    fn test_stable_band_is_inclusive() {
        let engine = engine();
        assert_eq!(engine.decide_energy_action(30.0, 9000.0, "x"), Action::EnergyStable);
        assert_eq!(engine.decide_energy_action(50.0, 100.0, "low"), Action::EnergyStable);
        assert_eq!(engine.decide_energy_action(70.0, 100.0, "high"), Action::EnergyStable);
    }

    #[test]
    fn test_high_load_scales_up_only_when_predicted() {
        let engine = engine();
        assert_eq!(
            engine.decide_energy_action(85.0, 1500.0, "HIGH"),
            Action::EnergyScaleUp
        );
        assert_eq!(
            engine.decide_energy_action(85.0, 1500.0, "medium"),
            Action::NoAction
        );
    }

    #[test]
    fn test_custom_thresholds() {
        let engine = EnergyRuleEngine::new(EnergyThresholds {
            low_cpu_percent: 20.0,
            high_cpu_percent: 60.0,
            low_memory_mb: 1024.0,
        });

        assert_eq!(engine.decide_energy_action(25.0, 800.0, "low"), Action::EnergyStable);
        assert_eq!(engine.decide_energy_action(15.0, 800.0, "low"), Action::EnergyScaleDown);
        assert_eq!(engine.decide_energy_action(65.0, 800.0, "high"), Action::EnergyScaleUp);
    }

    #[test]
    fn test_total_over_edge_inputs() {
        let engine = engine();
        let inputs = [
            (f64::NAN, 100.0),
            (f64::INFINITY, 100.0),
            (-5.0, -5.0),
            (0.0, f64::NAN),
            (100.0, 0.0),
        ];
        for (cpu, memory) in inputs {
            for prediction in ["", "low", "high", "overload", "???"] {
                let action = engine.decide_energy_action(cpu, memory, prediction);
                assert!(Action::ALL.contains(&action));
            }
        }
        assert_eq!(engine.decide_energy_action(f64::NAN, 100.0, "low"), Action::NoAction);
    }

    #[test]
    fn test_raw_label_matches_substrings() {
        let engine = engine();
        assert_eq!(
            engine.decide_energy_action(10.0, 200.0, "high-low transition"),
            Action::EnergyScaleDown
        );
        assert_eq!(
            engine.decide(10.0, 200.0, PredictionLabel::classify("high-low transition")),
            Action::NoAction
        );
    }
}
