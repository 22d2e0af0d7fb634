//! Healing decision rules
//!
//! This module provides:
//! - Energy rules mapping usage and predicted load to an energy action
//! - The final decision combining failure priority with energy rules
//! - Cluster-based decisions for callers with a pre-computed risk bucket

mod energy;
mod engine;

pub use energy::{
    EnergyRuleEngine, EnergyThresholds, DEFAULT_HIGH_CPU_PERCENT, DEFAULT_LOW_CPU_PERCENT,
    DEFAULT_LOW_MEMORY_MB,
};
pub use engine::HealingDecisionEngine;
